//! Rewrite engine: splice pinned commits back into the workflow text.

use tracing::debug;

use crate::types::{Occurrence, Resolution};

/// A pending splice of `text` over `span` of the original document.
#[derive(Debug)]
struct Replacement {
    /// Byte offset where the replaced range ends.
    end: usize,
    /// Byte offset where the replaced range starts.
    start: usize,
    /// `@<commit> # <version>`.
    text: String,
}

/// Apply every pinned resolution to `document`.
///
/// `resolutions` is aligned index-for-index with `occurrences`. Failed
/// lookups and occurrences already pinned to the resolved commit are left
/// alone. Bytes outside the replaced spans are preserved exactly, so running
/// the result through the pipeline again changes nothing.
pub fn apply(document: &str, occurrences: &[Occurrence], resolutions: &[Resolution]) -> String {
    let mut replacements: Vec<Replacement> = occurrences
        .iter()
        .zip(resolutions)
        .filter_map(|(occurrence, resolution)| return replacement(occurrence, resolution))
        .collect();
    if replacements.is_empty() {
        return document.to_string();
    }
    replacements.sort_by_key(|r| return r.start);

    let mut out = String::with_capacity(document.len());
    let mut cursor = 0;
    for r in &replacements {
        if r.start < cursor {
            debug!("skipping overlapping replacement at byte {}", r.start);
            continue;
        }
        let Some(kept) = document.get(cursor..r.start) else {
            debug!("skipping replacement outside the document at byte {}", r.start);
            continue;
        };
        out.push_str(kept);
        out.push_str(&r.text);
        cursor = r.end;
    }
    out.push_str(document.get(cursor..).unwrap_or_default());
    return out;
}

/// The splice for one occurrence, or `None` when it must stay untouched.
fn replacement(occurrence: &Occurrence, resolution: &Resolution) -> Option<Replacement> {
    let Resolution::Pinned { commit_id, version } = resolution else {
        return None;
    };
    let span = &occurrence.replace_span;
    if span.end <= span.start || occurrence.requested_ref == commit_id.as_str() {
        return None;
    }
    return Some(Replacement {
        end: span.end,
        start: span.start,
        text: format!("@{commit_id} # {version}"),
    });
}
