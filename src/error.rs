/// Crate-level error types for actpin diagnostics.
use std::path::PathBuf;

/// All errors in actpin carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, action, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The hosting API answered with a status other than success or not-found.
    #[error("api error: {status} for {url}: {message}")]
    Api {
        /// Message extracted from the response body, if any.
        message: String,
        /// HTTP status code returned by the API.
        status: u16,
        /// Request URL that failed.
        url: String,
    },

    /// A config value could not be interpreted.
    #[error("invalid config {}: {reason}", path.display())]
    ConfigInvalid {
        /// Config file that contained the bad value.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A referenced workflow file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Transport-level HTTP failure (connect, TLS, body decode).
    #[error("http: {0}")]
    Http(
        /// The wrapped reqwest error.
        #[from]
        reqwest::Error,
    ),

    /// Underlying I/O error from the filesystem or terminal.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// An action identity cannot be split into owner and repository.
    #[error("malformed action `{action}`: expected owner/repo")]
    MalformedAction {
        /// The identity text as written in the workflow.
        action: String,
    },

    /// No credential source yielded a token.
    #[error("no GitHub token found")]
    MissingToken,

    /// An annotated tag chain did not end at a commit.
    #[error("tag `{tag}` in {owner}/{repo} does not point at a commit ({reason})")]
    TagNotCommit {
        /// Repository owner.
        owner: String,
        /// Description of where the chain broke.
        reason: String,
        /// Repository name.
        repo: String,
        /// Tag name being resolved.
        tag: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A policy name does not match any known alias.
    #[error("unknown policy: `{name}`")]
    UnknownPolicy {
        /// The policy text as given.
        name: String,
    },

    /// YAML deserialization failed.
    #[error("yaml: {0}")]
    Yaml(
        /// The wrapped YAML error.
        #[from]
        serde_yaml::Error,
    ),
}
