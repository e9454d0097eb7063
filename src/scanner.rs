//! Occurrence extraction: finds every `uses: owner/repo@ref` in a workflow
//! document and records byte-exact spans for later rewriting.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::Occurrence;

/// `uses:` + identity + `@ref` + optional inline comment.
/// Local (`./`) and `docker://` entries never match: owners can't start with `.` or contain `:`.
/// The comment group never crosses a line break.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static OCCURRENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"uses:\s+([^@/\s"'.:][^@/\s"':]*/[^@\s]+)@([^\s#]+)([ \t]*#[^\r\n]*)?"#)
        .expect("valid regex");
});

/// `uses:` + identity, with or without a ref.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static ACTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"uses:\s+([^@/\s"'.:][^@/\s"':]*/[^@\s]+)"#).expect("valid regex");
});

/// List each distinct action identity in first-appearance order.
/// Bare entries without `@ref` are included.
pub fn discover_actions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut actions = Vec::new();
    for cap in ACTION_PATTERN.captures_iter(content) {
        let Some(identity) = cap.get(1) else {
            continue;
        };
        let action = identity.as_str();
        if seen.insert(action) {
            actions.push(action.to_string());
        }
    }
    return actions;
}

/// Find every rewritable reference in document order. Never de-duplicated:
/// two identical lines yield two occurrences with their own spans.
pub fn extract(content: &str) -> Vec<Occurrence> {
    return OCCURRENCE_PATTERN
        .captures_iter(content)
        .filter_map(|cap| return parse_occurrence_capture(content, &cap))
        .collect();
}

/// One-based line and column for a byte offset. Offsets past the end clamp
/// to the end of the content.
pub fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let end = offset.min(content.len());
    let mut line = 1_usize;
    let mut line_start = 0_usize;
    for (idx, byte) in content.bytes().take(end).enumerate() {
        if byte == b'\n' {
            line = line.saturating_add(1);
            line_start = idx.saturating_add(1);
        }
    }
    return (line, end.saturating_sub(line_start).saturating_add(1));
}

/// Turn a regex capture into an occurrence. Returns `None` only if a
/// mandatory group is missing, which the pattern rules out.
fn parse_occurrence_capture(content: &str, cap: &Captures<'_>) -> Option<Occurrence> {
    let whole = cap.get(0)?;
    let identity = cap.get(1)?;
    let reference = cap.get(2)?;

    let comment = cap
        .get(3)
        .map(|c| return c.as_str().trim_start().trim_start_matches('#').trim().to_string())
        .filter(|c| return !c.is_empty());

    let action = identity.as_str();
    let (owner, rest) = action.split_once('/')?;
    let (repo, path) = match rest.split_once('/') {
        None => (rest, None),
        Some((repo, path)) => (repo, Some(path.to_string())),
    };
    let (line, column) = line_col(content, identity.start());

    return Some(Occurrence {
        action: action.to_string(),
        column,
        comment,
        line,
        match_span: whole.start()..whole.end(),
        owner: owner.to_string(),
        path,
        // The `@` sits directly after the identity.
        replace_span: identity.end()..whole.end(),
        repo: repo.to_string(),
        requested_ref: reference.as_str().to_string(),
    });
}
