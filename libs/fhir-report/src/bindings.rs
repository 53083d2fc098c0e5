//! ValueSet → profile binding table.

use crate::titles::{last_segment, TitleCatalog};
use std::collections::{BTreeMap, HashSet};
use txcheck_bindings::{extract_bindings, BindingOptions, TerminologyService, View};
use txcheck_package::{read_json, IgPackage};

/// Identity of a profile as shown in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// One binding of one profile to a ValueSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBinding {
    pub value_set: String,
    pub profile: ProfileRef,
}

/// Whether `url` is an international HL7 ValueSet. HL7 Australia content is not.
pub fn is_international_value_set(url: &str) -> bool {
    (url.contains("hl7.org/fhir") || url.contains("terminology.hl7.org/"))
        && !url.contains("terminology.hl7.org.au")
}

/// Bindings of every StructureDefinition in `package` that pass `options`.
///
/// Both views are read, differential first. Unreadable files are skipped.
/// With `skip_international` and must-support not required, international
/// HL7 ValueSets are left out.
pub fn package_bindings(
    package: &IgPackage,
    options: &BindingOptions,
    skip_international: bool,
) -> Vec<ProfileBinding> {
    let drop_international = skip_international && !options.require_must_support;
    let mut rows = Vec::new();
    for path in package.structure_definition_files() {
        let profile = match read_json(&path) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping StructureDefinition");
                continue;
            }
        };
        if profile.get("resourceType").and_then(|v| v.as_str()) != Some("StructureDefinition") {
            continue;
        }

        let name = profile
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Profile")
            .to_string();
        let reference = ProfileRef {
            title: profile
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(&name)
                .to_string(),
            url: profile
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown URL")
                .to_string(),
            name,
        };

        let mut map = extract_bindings(&profile, View::Differential, options);
        map.merge(extract_bindings(&profile, View::Snapshot, options));
        for binding in map.bindings() {
            if drop_international && is_international_value_set(&binding.value_set) {
                continue;
            }
            rows.push(ProfileBinding {
                value_set: binding.value_set.clone(),
                profile: reference.clone(),
            });
        }
    }
    tracing::info!(package = %package.label(), bindings = rows.len(), "Collected profile bindings");
    rows
}

/// Profiles bound to one ValueSet URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingGroup {
    pub value_set: String,
    /// Unique by URL, sorted by lower-cased title.
    pub profiles: Vec<ProfileRef>,
}

/// Group bindings by ValueSet URL.
pub fn group_bindings(bindings: impl IntoIterator<Item = ProfileBinding>) -> Vec<BindingGroup> {
    let mut grouped: BTreeMap<String, Vec<ProfileRef>> = BTreeMap::new();
    for binding in bindings {
        grouped
            .entry(binding.value_set)
            .or_default()
            .push(binding.profile);
    }

    grouped
        .into_iter()
        .map(|(value_set, profiles)| {
            let mut seen = HashSet::new();
            let mut profiles: Vec<ProfileRef> = profiles
                .into_iter()
                .filter(|p| seen.insert(p.url.clone()))
                .collect();
            profiles.sort_by_key(|p| p.title.to_lowercase());
            BindingGroup {
                value_set,
                profiles,
            }
        })
        .collect()
}

/// A row of the binding report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSetRow {
    pub title: String,
    pub url: String,
    /// Concepts in the server-side expansion, when it could be expanded.
    pub expansion_count: Option<u64>,
    pub profiles: Vec<ProfileRef>,
}

impl ValueSetRow {
    /// ValueSet name as the last URL segment.
    pub fn name(&self) -> &str {
        last_segment(&self.url)
    }
}

/// Resolve titles and expansion sizes, then sort rows by lower-cased title.
pub async fn value_set_rows<T>(
    groups: Vec<BindingGroup>,
    titles: &TitleCatalog,
    terminology: &T,
) -> Vec<ValueSetRow>
where
    T: TerminologyService + ?Sized,
{
    let mut rows = Vec::with_capacity(groups.len());
    for group in groups {
        let title = titles.resolve(&group.value_set, terminology).await;
        let expansion_count = terminology.expansion_count(&group.value_set).await;
        rows.push(ValueSetRow {
            title,
            url: group.value_set,
            expansion_count,
            profiles: group.profiles,
        });
    }
    rows.sort_by_key(|row| row.title.to_lowercase());
    rows
}

/// Human-readable statement of the binding filter.
pub fn criteria_description(options: &BindingOptions, include_dependencies: bool) -> String {
    let elements = if options.require_must_support {
        "MustSupport elements"
    } else {
        "all elements"
    };
    let strengths: Vec<&str> = options.minimum_strengths.iter().map(|s| s.as_str()).collect();
    let source = if include_dependencies {
        "the IG packages and their dependencies"
    } else {
        "the main IG package"
    };
    format!(
        "Includes ValueSets bound to {elements} with binding strength: {} from {source} (both snapshot and differential views).",
        strengths.join(", ")
    )
}
