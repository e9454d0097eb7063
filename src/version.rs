//! Ref-shape predicates and lenient semantic version parsing for tag names.
//!
//! Tags in the wild rarely follow strict semver: `v4`, `v4.2`, `v1.0.0-beta`
//! and `4` all show up. Parsing here strips a leading `v`, pads missing minor
//! and patch components with zero, and hands the result to [`semver::Version`].

use semver::{BuildMetadata, Prerelease, Version};

/// Length of a full hex commit id.
const FULL_SHA_LEN: usize = 40;

/// Whether `s` is exactly 40 hex digits (either case).
pub fn is_full_sha(s: &str) -> bool {
    return s.len() == FULL_SHA_LEN && s.bytes().all(|b| return b.is_ascii_hexdigit());
}

/// Whether `r` is a moving major tag: `v` followed by digits, or digits alone.
pub fn is_moving_major_tag(r: &str) -> bool {
    let digits = r.strip_prefix('v').unwrap_or(r);
    return !digits.is_empty() && digits.bytes().all(|b| return b.is_ascii_digit());
}

/// Ensure a major ref carries the leading `v` most repositories use.
pub fn normalize_major_ref(r: &str) -> String {
    if r.starts_with('v') {
        return r.to_string();
    }
    return format!("v{r}");
}

/// Extract the major number from `v4`, `4`, or any parseable tag like `v4.2.2`.
pub fn parse_major(r: &str) -> Option<u64> {
    if is_moving_major_tag(r) {
        return r.strip_prefix('v').unwrap_or(r).parse().ok();
    }
    return parse_tag_version(r).map(|v| return v.major);
}

/// Parse a tag name as a semantic version, tolerating a `v` prefix,
/// missing minor/patch components, and leading zeros.
pub fn parse_tag_version(tag: &str) -> Option<Version> {
    let raw = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    let (core, suffix) = match raw.find(['-', '+']) {
        None => (raw, ""),
        Some(at) => raw.split_at(at),
    };

    let mut numbers = [0_u64; 3];
    let mut count = 0_usize;
    for part in core.split('.') {
        if part.is_empty() || !part.bytes().all(|b| return b.is_ascii_digit()) {
            return None;
        }
        let slot = numbers.get_mut(count)?;
        *slot = part.parse().ok()?;
        count = count.saturating_add(1);
    }

    let [major, minor, patch] = numbers;
    let mut version = Version::new(major, minor, patch);
    let (pre, build) = split_suffix(suffix);
    if !pre.is_empty() {
        version.pre = Prerelease::new(pre).ok()?;
    }
    if !build.is_empty() {
        version.build = BuildMetadata::new(build).ok()?;
    }
    return Some(version);
}

/// Split `-pre+build`, `-pre`, or `+build` into its two halves.
fn split_suffix(suffix: &str) -> (&str, &str) {
    if let Some(build) = suffix.strip_prefix('+') {
        return ("", build);
    }
    let pre = suffix.strip_prefix('-').unwrap_or(suffix);
    return pre.split_once('+').unwrap_or((pre, ""));
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn full_sha_shape() {
        let cases = [
            ("1234567890abcdef1234567890abcdef12345678", true),
            ("1234567890ABCDEF1234567890ABCDEF12345678", true),
            ("1234567890AbCdEf1234567890AbCdEf12345678", true),
            ("0000000000000000000000000000000000000000", true),
            ("1234567890abcdef1234567890abcdef1234567", false),
            ("1234567890abcdef1234567890abcdef123456789", false),
            ("1234567890abcdef1234567890abcdef1234567g", false),
            ("1234567890abcdef 234567890abcdef12345678", false),
            ("", false),
        ];
        for (input, want) in cases {
            assert_eq!(is_full_sha(input), want, "is_full_sha({input:?})");
        }
    }

    #[test]
    fn moving_major_shape() {
        let cases = [
            ("v4", true),
            ("4", true),
            ("v10", true),
            ("v0", true),
            ("0", true),
            ("v4.2", false),
            ("4.2", false),
            ("main", false),
            ("v4-alpha", false),
            ("v", false),
            ("", false),
        ];
        for (input, want) in cases {
            assert_eq!(is_moving_major_tag(input), want, "is_moving_major_tag({input:?})");
        }
    }

    #[test]
    fn major_from_refs() {
        let cases = [
            ("v4", Some(4)),
            ("4", Some(4)),
            ("123", Some(123)),
            ("v4.2.2", Some(4)),
            ("4.2.2", Some(4)),
            ("v1.0.0-alpha", Some(1)),
            ("v4-alpha", Some(4)),
            ("v0.1.0", Some(0)),
            ("main", None),
            ("1234567890abcdef1234567890abcdef12345678", None),
            ("", None),
            ("v", None),
            ("invalid.version", None),
        ];
        for (input, want) in cases {
            assert_eq!(parse_major(input), want, "parse_major({input:?})");
        }
    }

    #[test]
    fn lenient_parse_pads_and_orders() {
        let short = parse_tag_version("v4.2").unwrap();
        assert_eq!(short, Version::new(4, 2, 0));

        let padded = parse_tag_version("v04.01.3").unwrap();
        assert_eq!(padded, Version::new(4, 1, 3));

        let beta = parse_tag_version("v2.0.0-beta.1+build.7").unwrap();
        assert_eq!(beta.pre.as_str(), "beta.1");
        assert_eq!(beta.build.as_str(), "build.7");
        assert!(beta < Version::new(2, 0, 0));

        assert!(parse_tag_version("1.2.3.4").is_none());
        assert!(parse_tag_version("release-1").is_none());
    }

    #[test]
    fn normalizes_major_refs() {
        assert_eq!(normalize_major_ref("4"), "v4");
        assert_eq!(normalize_major_ref("v4"), "v4");
        assert_eq!(normalize_major_ref("10"), "v10");
        assert_eq!(normalize_major_ref("0"), "v0");
    }
}
