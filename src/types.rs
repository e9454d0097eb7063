/// Core domain types for actpin occurrences, resolutions, and policies.
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::Error;

/// A commit id: exactly 40 hex chars, case preserved as the API returned it.
/// Newtype prevents mixing with tag names and other refs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(
    /// The hex-encoded object id.
    String,
);

impl CommitId {
    /// Borrow the hex string.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// Wrap a string that has the shape of a full commit id.
    /// Returns `None` for anything else, including abbreviated ids.
    pub fn parse(raw: &str) -> Option<Self> {
        if crate::version::is_full_sha(raw) {
            return Some(Self(raw.to_string()));
        }
        return None;
    }
}

impl fmt::Display for CommitId {
    /// Write the full hex id.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// One `uses: owner/repo@ref` match in a workflow document.
/// Spans are byte offsets into the original text and never overlap
/// another occurrence from the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The identity text as written, e.g. `github/codeql-action/init`.
    pub action: String,
    /// One-based column of the identity's first byte.
    pub column: usize,
    /// Same-line trailing comment without the `#`, e.g. `v4.1.0`.
    pub comment: Option<String>,
    /// One-based line of the identity.
    pub line: usize,
    /// The whole match, from `uses:` through any trailing comment.
    pub match_span: Range<usize>,
    /// Text before the first `/`.
    pub owner: String,
    /// Sub-directory of a nested action, if the identity has more than two segments.
    pub path: Option<String>,
    /// Span rewritten on update: from the `@` to the end of the match.
    pub replace_span: Range<usize>,
    /// Repository segment queried against the hosting API.
    pub repo: String,
    /// The ref text after `@`, verbatim.
    pub requested_ref: String,
}

impl Occurrence {
    /// Whether the identity names a queryable repository.
    pub fn is_well_formed(&self) -> bool {
        return !self.owner.is_empty() && !self.repo.is_empty();
    }

    /// `owner/repo`, without any nested action path.
    pub fn repository(&self) -> String {
        return format!("{}/{}", self.owner, self.repo);
    }
}

/// Which version a resolver should prefer relative to the requested ref.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Best available version across all majors.
    #[default]
    Latest,
    /// Pin exactly what is written, resolving only to a commit.
    Requested,
    /// Best version sharing the requested ref's major number.
    SameMajor,
}

impl FromStr for Policy {
    type Err = Error;

    /// Accepts the canonical names plus the aliases users already type.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        return match raw.trim().to_lowercase().as_str() {
            "" | "major" | "latest-major" | "latest" => Ok(Self::Latest),
            "exact" | "pin-requested" | "requested" => Ok(Self::Requested),
            "minor" | "patch" | "same-major" | "stay-major" => Ok(Self::SameMajor),
            _ => Err(Error::UnknownPolicy { name: raw.to_string() }),
        };
    }
}

impl fmt::Display for Policy {
    /// Canonical policy name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latest => "latest",
            Self::Requested => "requested",
            Self::SameMajor => "same-major",
        };
        return f.write_str(name);
    }
}

/// Outcome of resolving one occurrence. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolution gave up; the occurrence is left untouched.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
    /// Resolution found a commit.
    Pinned {
        /// Commit written into the document.
        commit_id: CommitId,
        /// Display version for the trailing comment.
        version: String,
    },
}

impl Resolution {
    /// Build a failed resolution from any displayable cause.
    pub fn failed(reason: impl fmt::Display) -> Self {
        return Self::Failed { reason: reason.to_string() };
    }
}

/// Run-wide resolution knobs, chosen once per invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Page through every tag instead of stopping at the end of the same-major run.
    pub exhaustive_tag_scan: bool,
    /// Report the full semver tag behind a moving major tag as the version.
    pub expand_major: bool,
    /// Version preference.
    pub policy: Policy,
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn policy_aliases_parse() {
        let cases = [
            ("", Policy::Latest),
            ("major", Policy::Latest),
            ("latest-major", Policy::Latest),
            ("latest", Policy::Latest),
            ("same-major", Policy::SameMajor),
            ("stay-major", Policy::SameMajor),
            ("minor", Policy::SameMajor),
            ("patch", Policy::SameMajor),
            ("requested", Policy::Requested),
            ("exact", Policy::Requested),
            ("pin-requested", Policy::Requested),
            ("  Same-Major ", Policy::SameMajor),
        ];
        for (raw, want) in cases {
            assert_eq!(raw.parse::<Policy>().unwrap(), want, "policy {raw:?}");
        }
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let err = "unknown-policy".parse::<Policy>().unwrap_err();
        assert!(matches!(err, Error::UnknownPolicy { name } if name == "unknown-policy"));
    }

    #[test]
    fn commit_id_rejects_short_ids() {
        assert!(CommitId::parse("8ade135a41bc03ea155e62e844d188df1ea18608").is_some());
        assert!(CommitId::parse("8ade135").is_none());
    }
}
