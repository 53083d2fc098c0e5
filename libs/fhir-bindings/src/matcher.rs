//! Match a coding's instance path to the most specific binding path.
//!
//! Candidates for a coding at `P` are `normalize(P)` and, when present, the
//! same path without its first `.coding.` hop. A binding path matches when a
//! candidate equals it or descends from it. Only the longest matching binding
//! paths are returned, so `Patient.identifier.extension` wins over
//! `Patient.identifier` for a coding nested in the extension.
//!
//! Codings inside an extension only match binding paths that themselves go
//! through an extension. When nothing matches and the coding sits at a
//! `.coding` or `.valueCoding` leaf, the parent path is tried with prefix
//! containment in either direction.

use crate::path::{has_extension_segment, normalize, parent, without_first_coding_hop};

/// Binding paths (as given) that best match `coding_path`. Ties are all returned.
pub fn best_binding_paths<'a, I>(coding_path: &str, binding_paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize(coding_path);
    let in_extension = has_extension_segment(&normalized);

    let keys: Vec<(&str, String)> = binding_paths
        .into_iter()
        .map(|raw| (raw, normalize(raw)))
        .filter(|(_, norm)| !in_extension || has_extension_segment(norm))
        .collect();

    let mut variants = vec![normalized.clone()];
    variants.extend(without_first_coding_hop(&normalized));

    let direct = longest(keys.iter().filter(|(_, key)| {
        variants
            .iter()
            .any(|candidate| candidate == key || is_descendant(candidate, key))
    }));
    if !direct.is_empty() {
        return direct;
    }

    if !(coding_path.ends_with(".coding") || coding_path.ends_with(".valueCoding")) {
        return Vec::new();
    }
    let Some(parent) = parent(&normalized) else {
        return Vec::new();
    };

    tracing::trace!(coding_path, parent, "Falling back to parent element bindings");
    longest(keys.iter().filter(|(_, key)| {
        parent == key.as_str() || is_descendant(parent, key) || is_descendant(key, parent)
    }))
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

fn longest<'k, 'r: 'k, I>(matches: I) -> Vec<String>
where
    I: Iterator<Item = &'k (&'r str, String)>,
{
    let matches: Vec<_> = matches.collect();
    let Some(max) = matches.iter().map(|(_, key)| key.len()).max() else {
        return Vec::new();
    };

    let mut best: Vec<String> = matches
        .into_iter()
        .filter(|(_, key)| key.len() == max)
        .map(|(raw, _)| raw.to_string())
        .collect();
    best.dedup();
    best
}
