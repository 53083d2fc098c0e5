//! Package version helpers used when picking a cached package.

use std::cmp::Ordering;

/// Keywords that name a moving build rather than a release.
pub const BUILD_KEYWORDS: &[&str] = &["dev", "current", "cibuild"];

/// Split a version into base and optional label ("1.2.3-ballot" -> ("1.2.3", Some("ballot"))).
pub fn parse_version(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((base, label)) => (base, Some(label)),
        None => (version, None),
    }
}

/// Order two versions numerically when both are numeric, otherwise lexically. Labels are ignored.
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    let (base1, _) = parse_version(v1);
    let (base2, _) = parse_version(v2);

    if is_numeric(base1) && is_numeric(base2) {
        let parts1 = numeric_parts(base1);
        let parts2 = numeric_parts(base2);
        let len = parts1.len().max(parts2.len());
        (0..len)
            .map(|i| {
                let a = parts1.get(i).copied().unwrap_or(0);
                let b = parts2.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    } else {
        base1.cmp(base2)
    }
}

/// Whether `version` satisfies `reference` (exact, patch wildcard "1.2.x", or same base ignoring labels).
pub fn version_matches(version: &str, reference: &str) -> bool {
    if version == reference {
        return true;
    }

    if let Some(prefix) = reference.strip_suffix(".x") {
        return version
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|patch| parse_version(patch).0.parse::<u32>().is_ok());
    }

    parse_version(version).0 == parse_version(reference).0
}

fn is_numeric(version: &str) -> bool {
    version.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn numeric_parts(version: &str) -> Vec<u32> {
    version.split('.').filter_map(|p| p.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version_splits_label() {
        assert_eq!(parse_version("1.2.3"), ("1.2.3", None));
        assert_eq!(parse_version("5.0.0-ballot"), ("5.0.0", Some("ballot")));
    }

    #[test]
    fn compare_versions_is_numeric() {
        assert_eq!(compare_versions("1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(compare_versions("1.10.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.3", "1.2.3-release"), Ordering::Equal);
        assert_eq!(compare_versions("current", "dev"), Ordering::Less);
    }

    #[test]
    fn version_matches_wildcards_and_labels() {
        assert!(version_matches("1.2.3", "1.2.3"));
        assert!(version_matches("1.2.7", "1.2.x"));
        assert!(!version_matches("1.3.0", "1.2.x"));
        assert!(!version_matches("1.20.0", "1.2.x"));
        assert!(version_matches("1.2.3-ballot", "1.2.3"));
        assert!(!version_matches("1.2.4", "1.2.3"));
    }
}
