//! Change reporter: what a rewrite would do, as plain data and as text.

use std::fmt::Write as _;

use crate::types::{Occurrence, Resolution};
use crate::version::is_full_sha;

/// ANSI bold, used for section headings on a terminal.
pub const BOLD: &str = "\x1b[1m";
/// ANSI reset.
pub const RESET: &str = "\x1b[0m";

/// One occurrence whose ref would be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    /// `owner/repo` being updated.
    pub action: String,
    /// One-based column of the identity.
    pub column: usize,
    /// One-based line of the identity.
    pub line: usize,
    /// Commit that replaces the ref.
    pub new_commit: String,
    /// Ref as currently written.
    pub old_ref: String,
    /// Version label written as the trailing comment.
    pub version: String,
}

/// One occurrence that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLookup {
    /// Identity as written.
    pub action: String,
    /// One-based line of the identity.
    pub line: usize,
    /// Why resolution failed.
    pub reason: String,
    /// Ref as written.
    pub requested_ref: String,
}

/// Every occurrence that a rewrite would change, in document order.
pub fn plan_changes(occurrences: &[Occurrence], resolutions: &[Resolution]) -> Vec<PlannedChange> {
    return occurrences
        .iter()
        .zip(resolutions)
        .filter_map(|(occurrence, resolution)| {
            let Resolution::Pinned { commit_id, version } = resolution else {
                return None;
            };
            if occurrence.requested_ref == commit_id.as_str() {
                return None;
            }
            return Some(PlannedChange {
                action: occurrence.repository(),
                column: occurrence.column,
                line: occurrence.line,
                new_commit: commit_id.to_string(),
                old_ref: occurrence.requested_ref.clone(),
                version: version.clone(),
            });
        })
        .collect();
}

/// Every occurrence whose resolution failed, in document order.
pub fn failures(occurrences: &[Occurrence], resolutions: &[Resolution]) -> Vec<FailedLookup> {
    return occurrences
        .iter()
        .zip(resolutions)
        .filter_map(|(occurrence, resolution)| {
            let Resolution::Failed { reason } = resolution else {
                return None;
            };
            return Some(FailedLookup {
                action: occurrence.action.clone(),
                line: occurrence.line,
                reason: reason.clone(),
                requested_ref: occurrence.requested_ref.clone(),
            });
        })
        .collect();
}

/// Short display form of a ref: `(none)` for blanks, 12 chars plus an
/// ellipsis for full commit ids, anything else verbatim.
pub fn pretty_ref(reference: &str) -> String {
    if reference.trim().is_empty() {
        return "(none)".to_string();
    }
    if is_full_sha(reference) {
        let short = reference.get(..12).unwrap_or(reference);
        return format!("{short}…");
    }
    return reference.to_string();
}

/// Section heading, bold when `styled`.
pub fn heading(text: &str, styled: bool) -> String {
    if styled {
        return format!("{BOLD}{text}{RESET}");
    }
    return text.to_string();
}

/// `  - owner/repo (L12:C9): v4 → 5e2f1c1…  (v4.2.2)` per change, or a
/// single "no changes" line.
pub fn render_plan(changes: &[PlannedChange]) -> String {
    if changes.is_empty() {
        return "  No changes needed. All actions already pinned to the latest commits.\n".to_string();
    }
    let mut out = String::new();
    for change in changes {
        let _ = writeln!(
            out,
            "  - {} (L{}:C{}): {} → {}  ({})",
            change.action,
            change.line,
            change.column,
            pretty_ref(&change.old_ref),
            pretty_ref(&change.new_commit),
            change.version,
        );
    }
    return out;
}

/// One warning line per failed lookup.
pub fn render_failures(failed: &[FailedLookup]) -> String {
    let mut out = String::new();
    for f in failed {
        let _ = writeln!(out, "  ! {}@{} (L{}): {}", f.action, f.requested_ref, f.line, f.reason);
    }
    return out;
}

/// `  owner/repo@commit # version` for every pinned occurrence.
pub fn render_pinned(occurrences: &[Occurrence], resolutions: &[Resolution]) -> String {
    let mut out = String::new();
    for (occurrence, resolution) in occurrences.iter().zip(resolutions) {
        if let Resolution::Pinned { commit_id, version } = resolution {
            let _ = writeln!(out, "  {}@{commit_id} # {version}", occurrence.repository());
        }
    }
    return out;
}
