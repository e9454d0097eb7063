use std::path::Path;

use crate::error::Error;
use crate::types::{Policy, ResolveOptions};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".actpin.toml";

/// Project configuration loaded from `.actpin.toml`.
/// Command-line flags take precedence over every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Page through every tag in same-major searches.
    pub exhaustive_tag_scan: bool,
    /// Expand moving major tags to their full version in comments.
    pub expand_major: bool,
    /// Default update policy.
    pub policy: Policy,
}

/// Raw TOML structure for `.actpin.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ActpinTomlConfig {
    /// Page through every tag in same-major searches.
    #[serde(default)]
    exhaustive_tag_scan: bool,
    /// Expand moving major tags.
    #[serde(default)]
    expand_major: bool,
    /// Policy name or alias.
    #[serde(default)]
    policy: Option<String>,
}

impl Config {
    /// Load config from `.actpin.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. A file that exists but is
    /// malformed or names an unknown policy is an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or `Error::ConfigInvalid`
    /// if the policy name is unknown.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: ActpinTomlConfig = toml::from_str(&content)?;
        let policy = raw
            .policy
            .map(|name| return name.parse::<Policy>())
            .transpose()
            .map_err(|e| return Error::ConfigInvalid { path: path.clone(), reason: e.to_string() })?
            .unwrap_or_default();
        return Ok(Self {
            exhaustive_tag_scan: raw.exhaustive_tag_scan,
            expand_major: raw.expand_major,
            policy,
        });
    }

    /// Merge command-line overrides into run options.
    pub fn options(self, policy: Option<Policy>, expand_major: bool) -> ResolveOptions {
        return ResolveOptions {
            exhaustive_tag_scan: self.exhaustive_tag_scan,
            expand_major: expand_major || self.expand_major,
            policy: policy.unwrap_or(self.policy),
        };
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    /// Write `content` as the config file of a fresh directory.
    fn dir_with(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        return dir;
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn fields_are_read_with_policy_aliases() {
        let dir = dir_with("policy = \"minor\"\nexpand_major = true\nexhaustive_tag_scan = true\n");
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.policy, Policy::SameMajor);
        assert!(config.expand_major);
        assert!(config.exhaustive_tag_scan);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let dir = dir_with("policy = \"newest\"\n");
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { ref reason, .. } if reason.contains("newest")), "{err}");
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let dir = dir_with("policy = \n");
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = dir_with("polcy = \"latest\"\n");
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn flags_override_config() {
        let config = Config { exhaustive_tag_scan: true, expand_major: false, policy: Policy::SameMajor };
        let options = config.options(Some(Policy::Requested), true);
        assert_eq!(options.policy, Policy::Requested);
        assert!(options.expand_major);
        assert!(options.exhaustive_tag_scan);
        assert_eq!(config.options(None, false).policy, Policy::SameMajor);
    }
}
