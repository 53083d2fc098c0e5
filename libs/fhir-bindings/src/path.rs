//! Element and instance path normalization.
//!
//! Profile element paths carry slice names (`Observation.category:VSCat`) and
//! polymorphic choices (`Observation.value[x]`, `valueCodeableConcept`) that an
//! instance path never spells the same way. Both sides are reduced to the same
//! shape before comparing:
//!
//! - `name:slice` becomes `name`
//! - any segment starting with `value` becomes `value`

const VALUE_TOKEN: &str = "value";
const CODING_HOP: &str = ".coding.";

/// Canonical form of an element or instance path. Idempotent.
pub fn normalize(path: &str) -> String {
    path.split('.')
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join(".")
}

fn normalize_segment(segment: &str) -> &str {
    let name = match segment.split_once(':') {
        Some((name, _slice)) => name,
        None => segment,
    };
    if name.starts_with(VALUE_TOKEN) {
        VALUE_TOKEN
    } else {
        name
    }
}

/// Drop the first `.coding.` hop, so `Medication.code.coding.extension`
/// lines up with a binding declared on `Medication.code.extension`.
pub fn without_first_coding_hop(path: &str) -> Option<String> {
    path.find(CODING_HOP).map(|idx| {
        let mut rewritten = String::with_capacity(path.len());
        rewritten.push_str(&path[..idx]);
        rewritten.push('.');
        rewritten.push_str(&path[idx + CODING_HOP.len()..]);
        rewritten
    })
}

/// The path with its last segment removed, or `None` for a single segment.
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

/// Whether any segment of the path is an `extension` (slice names ignored).
pub fn has_extension_segment(path: &str) -> bool {
    path.split('.')
        .any(|segment| segment == "extension" || segment.starts_with("extension:"))
}

/// Strip a `|version` suffix from a canonical reference.
pub fn clean(canonical: &str) -> &str {
    match canonical.split_once('|') {
        Some((base, _version)) => base,
        None => canonical,
    }
}

/// Split a canonical reference into base and optional version.
pub fn split_canonical(canonical: &str) -> (&str, Option<&str>) {
    match canonical.split_once('|') {
        Some((base, version)) if !version.is_empty() => (base, Some(version)),
        Some((base, _)) => (base, None),
        None => (canonical, None),
    }
}
