//! GitHub token discovery.
//!
//! Sources, first hit wins: `GH_TOKEN`, `GITHUB_TOKEN`, then the GitHub
//! CLI's `~/.config/gh/hosts.yml`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Environment variables checked in order.
const TOKEN_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Host whose entry holds the token.
const GITHUB_HOST: &str = "github.com";

/// One host entry of `hosts.yml`. Other keys are ignored.
#[derive(Deserialize)]
struct HostEntry {
    /// Stored OAuth token. Absent when the CLI keeps it in a keyring.
    #[serde(default)]
    oauth_token: Option<String>,
}

/// Find a token for the GitHub API.
///
/// # Errors
///
/// Returns `Error::MissingToken` if no source has one, or `Error::Yaml` /
/// `Error::Io` if the hosts file exists but cannot be read.
pub fn github_token() -> Result<String, Error> {
    let hosts = dirs::home_dir().map(|home| return home.join(".config").join("gh").join("hosts.yml"));
    return token_from(|name| return std::env::var(name).ok(), hosts.as_deref());
}

/// Token lookup against an injectable environment and hosts file.
///
/// # Errors
///
/// Same as [`github_token`].
fn token_from(env: impl Fn(&str) -> Option<String>, hosts: Option<&Path>) -> Result<String, Error> {
    for name in TOKEN_VARS {
        if let Some(token) = env(name).filter(|t| return !t.trim().is_empty()) {
            debug!("using token from ${name}");
            return Ok(token);
        }
    }

    let Some(path) = hosts else {
        return Err(Error::MissingToken);
    };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::MissingToken),
        Err(e) => return Err(Error::Io(e)),
    };
    let token = token_from_hosts(&content)?.ok_or(Error::MissingToken)?;
    debug!("using token from {}", path.display());
    return Ok(token);
}

/// The `github.com` token in a `hosts.yml` document, if present.
///
/// # Errors
///
/// Returns `Error::Yaml` if the document is not a host map.
fn token_from_hosts(content: &str) -> Result<Option<String>, Error> {
    if content.trim().is_empty() {
        return Ok(None);
    }
    let mut hosts: HashMap<String, HostEntry> = serde_yaml::from_str(content)?;
    let token = hosts
        .remove(GITHUB_HOST)
        .and_then(|entry| return entry.oauth_token)
        .filter(|t| return !t.trim().is_empty());
    return Ok(token);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    /// Environment with the given variables set.
    fn env_of(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        return move |name| {
            return vars.iter().find(|(k, _)| return *k == name).map(|(_, v)| return (*v).to_string());
        };
    }

    #[test]
    fn gh_token_wins_over_github_token() {
        let env = env_of(&[("GITHUB_TOKEN", "second"), ("GH_TOKEN", "first")]);
        assert_eq!(token_from(env, None).unwrap(), "first");
    }

    #[test]
    fn blank_variables_are_skipped() {
        let env = env_of(&[("GH_TOKEN", "  "), ("GITHUB_TOKEN", "second")]);
        assert_eq!(token_from(env, None).unwrap(), "second");
    }

    #[test]
    fn hosts_file_is_the_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.yml");
        std::fs::write(
            &path,
            "github.com:\n    user: octocat\n    oauth_token: gho_abc\n    git_protocol: https\n",
        )
        .unwrap();
        assert_eq!(token_from(env_of(&[]), Some(&path)).unwrap(), "gho_abc");
    }

    #[test]
    fn nothing_found_is_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("hosts.yml");
        assert!(matches!(token_from(env_of(&[]), Some(&absent)), Err(Error::MissingToken)));
        assert!(matches!(token_from(env_of(&[]), None), Err(Error::MissingToken)));
    }

    #[test]
    fn keyring_backed_hosts_have_no_token() {
        let content = "github.com:\n    users:\n        octocat: {}\n    user: octocat\n";
        assert_eq!(token_from_hosts(content).unwrap(), None);
        assert_eq!(token_from_hosts("ghe.example.com:\n    oauth_token: x\n").unwrap(), None);
    }

    #[test]
    fn garbage_hosts_file_is_an_error() {
        assert!(matches!(token_from_hosts("- just\n- a list\n"), Err(Error::Yaml(_))));
    }
}
