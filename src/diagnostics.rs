use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::report::{BOLD, RESET};

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// do something about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::MissingToken => render_missing_token(),
        Error::UnknownPolicy { name } => render_unknown_policy(name),
        Error::Api { message, status, url } => render_api(message, *status, url),
        _ => render_generic(e),
    };
}

/// Variants with a short fixed layout.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::ConfigInvalid { path, reason } => format!(
            "\
# Error: Invalid Config

`{}`: {reason}

## Fix

Valid policies are `latest`, `same-major` and `requested`.
",
            path.display()
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}

## Fix

Check `{CONFIG_FILE}`. Known keys are `policy`, `expand_major` and
`exhaustive_tag_scan`.
"
        ),

        Error::Http(e) => format!(
            "\
# Error: Network

{e}
"
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),

        Error::Yaml(e) => format!(
            "\
# Error: Unreadable GitHub CLI Config

{e}

## Fix

Repair `~/.config/gh/hosts.yml` or set `GH_TOKEN`.
"
        ),

        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Non-success API answer outside per-action resolution.
fn render_api(message: &str, status: u16, url: &str) -> String {
    let mut out = format!(
        "\
# Error: GitHub API

`{url}` answered {status}: {message}
"
    );
    if status == 401 || status == 403 {
        out.push_str(
            "\
\n## Fix

Check that the token is valid and not rate limited:

    gh auth status
",
        );
    }
    return out;
}

/// No token source was found.
fn render_missing_token() -> String {
    return "\
# Error: No GitHub Token

actpin needs a token to query the GitHub API.

## Fix

Export one:

    export GH_TOKEN=$(gh auth token)

Or log in with the GitHub CLI:

    gh auth login
"
    .to_string();
}

/// Policy name from the command line did not match.
fn render_unknown_policy(name: &str) -> String {
    return format!(
        "\
# Error: Unknown Policy

`{name}` is not a policy.

## Policies

- `latest` (aliases `major`, `latest-major`): newest release across majors
- `same-major` (aliases `stay-major`, `minor`, `patch`): newest within the requested major
- `requested` (aliases `exact`, `pin-requested`): pin what is written
"
    );
}
