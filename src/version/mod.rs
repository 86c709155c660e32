// src/version/mod.rs

//! Version comparison across package ecosystems.
//!
//! This module provides ordering for version strings as package managers
//! report them (`24.0.7-1`, `5.0.0`, `1.24.0`). Versions are untrusted
//! external data: comparison never fails, it degrades to lexicographic
//! ordering for tokens it cannot interpret numerically.

use std::cmp::Ordering;

/// Which component of a version first differs between two versions.
///
/// Derived from the index of the first differing token. Used only for
/// warning messages; ordering decisions never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum VersionDelta {
    Major,
    Minor,
    Patch,
    Other,
}

impl VersionDelta {
    fn from_token_index(index: usize) -> Self {
        match index {
            0 => Self::Major,
            1 => Self::Minor,
            2 => Self::Patch,
            _ => Self::Other,
        }
    }
}

/// Full result of a version comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionComparison {
    pub ordering: Ordering,
    /// Component classification of the difference, `None` when equal
    pub delta: Option<VersionDelta>,
    /// True if any token pair fell back to lexicographic comparison
    pub lexical_fallback: bool,
}

/// Split a version string into tokens on `.` and `-`
///
/// `24.0.7-1` -> `["24", "0", "7", "1"]`. Empty tokens from doubled
/// delimiters are preserved and compare lexicographically.
fn tokenize(version: &str) -> Vec<&str> {
    if version.is_empty() {
        return Vec::new();
    }
    version.split(['.', '-']).collect()
}

/// Compare one token pair, preferring numeric comparison
///
/// Returns the ordering and whether lexicographic fallback was needed
/// (mixed or non-numeric tokens).
fn compare_tokens(a: &str, b: &str) -> (Ordering, bool) {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(na), Ok(nb)) => (na.cmp(&nb), false),
        _ => (a.cmp(b), true),
    }
}

/// Compare two version strings
///
/// Policy: token-by-token, numeric where both tokens are numeric,
/// lexicographic otherwise. A version that is a strict token prefix of
/// another orders before it (`1.2` < `1.2.1`).
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_detailed(a, b).ordering
}

/// Compare two version strings, reporting the difference classification
/// and whether lexicographic fallback occurred along the way
pub fn compare_detailed(a: &str, b: &str) -> VersionComparison {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    let mut fallback = false;

    for (index, (ta, tb)) in tokens_a.iter().zip(tokens_b.iter()).enumerate() {
        let (ordering, fell_back) = compare_tokens(ta, tb);
        fallback = fallback || fell_back;
        if ordering != Ordering::Equal {
            return VersionComparison {
                ordering,
                delta: Some(VersionDelta::from_token_index(index)),
                lexical_fallback: fallback,
            };
        }
    }

    // Equal prefix: the shorter version is "less"
    let ordering = tokens_a.len().cmp(&tokens_b.len());
    let delta = if ordering == Ordering::Equal {
        None
    } else {
        Some(VersionDelta::from_token_index(
            tokens_a.len().min(tokens_b.len()),
        ))
    };

    VersionComparison {
        ordering,
        delta,
        lexical_fallback: fallback,
    }
}

/// Extract the leading numeric component of a version string
///
/// `"1.4.2"` -> `Some(1)`; returns `None` when the first token is not
/// numeric. Callers treat `None` as advisory, never as a hard failure.
pub fn major_of(version: &str) -> Option<u64> {
    tokenize(version).first().and_then(|t| t.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_versions() {
        for v in ["1.0.0", "24.0.7-1", "1.24.0", "", "alpha"] {
            assert_eq!(compare(v, v), Ordering::Equal, "compare({v}, {v})");
        }
    }

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(compare("1.20.0", "1.24.0"), Ordering::Less);
        assert_eq!(compare("1.24.0", "1.20.0"), Ordering::Greater);
        // Numeric, not lexicographic: 2 < 10
        assert_eq!(compare("1.2.0", "1.10.0"), Ordering::Less);
    }

    #[test]
    fn test_release_suffix_ordering() {
        assert_eq!(compare("24.0.7-1", "24.0.7-2"), Ordering::Less);
        assert_eq!(compare("24.0.7-2", "24.0.7-1"), Ordering::Greater);
    }

    #[test]
    fn test_shorter_prefix_is_less() {
        assert_eq!(compare("1.2", "1.2.1"), Ordering::Less);
        assert_eq!(compare("1.2.1", "1.2"), Ordering::Greater);
        assert_eq!(compare("24.0.7", "24.0.7-1"), Ordering::Less);
    }

    #[test]
    fn test_transitivity_on_numeric_versions() {
        let versions = ["1.0.0", "1.2.0", "1.2.1", "1.10.0", "2.0.0"];
        for window in versions.windows(2) {
            assert_eq!(compare(window[0], window[1]), Ordering::Less);
        }
        // Spot-check the long jumps implied by transitivity
        assert_eq!(compare("1.0.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare("1.2.0", "1.10.0"), Ordering::Less);
    }

    #[test]
    fn test_non_numeric_tokens_compare_lexicographically() {
        assert_eq!(compare("1.0-alpha", "1.0-beta"), Ordering::Less);
        let cmp = compare_detailed("1.0-alpha", "1.0-beta");
        assert!(cmp.lexical_fallback);
    }

    #[test]
    fn test_mixed_tokens_fail_open() {
        // "7a" vs "8" cannot both parse numerically; falls back to strings
        let cmp = compare_detailed("1.7a", "1.8");
        assert!(cmp.lexical_fallback);
        assert_eq!(cmp.ordering, Ordering::Less);
    }

    #[test]
    fn test_delta_classification() {
        assert_eq!(
            compare_detailed("1.0.0", "2.0.0").delta,
            Some(VersionDelta::Major)
        );
        assert_eq!(
            compare_detailed("1.0.0", "1.1.0").delta,
            Some(VersionDelta::Minor)
        );
        assert_eq!(
            compare_detailed("1.0.0", "1.0.1").delta,
            Some(VersionDelta::Patch)
        );
        assert_eq!(
            compare_detailed("24.0.7-1", "24.0.7-2").delta,
            Some(VersionDelta::Other)
        );
        assert_eq!(compare_detailed("1.0.0", "1.0.0").delta, None);
    }

    #[test]
    fn test_prefix_difference_classification() {
        // "1.2" vs "1.2.1" differs at token index 2 -> patch-level
        assert_eq!(
            compare_detailed("1.2", "1.2.1").delta,
            Some(VersionDelta::Patch)
        );
    }

    #[test]
    fn test_major_of() {
        assert_eq!(major_of("1.4.2"), Some(1));
        assert_eq!(major_of("24.0.7-1"), Some(24));
        assert_eq!(major_of("nightly"), None);
        assert_eq!(major_of(""), None);
    }

    #[test]
    fn test_empty_version_orders_before_any() {
        assert_eq!(compare("", "0.0.1"), Ordering::Less);
    }
}
