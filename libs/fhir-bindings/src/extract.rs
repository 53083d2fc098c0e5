//! Binding extraction from StructureDefinition element lists.
//!
//! Three binding styles are read from each element:
//!
//! - the primary `binding.valueSet` / `binding.strength`
//! - the tools `additional-binding` extension on the binding, whose nested
//!   `purpose` stands in for the strength when it names one
//! - the older array-valued `binding.additionalBinding`
//!
//! Results are keyed by the normalized element path.

use crate::json::{as_list, resource_type, str_field};
use crate::model::{Binding, BindingMap, Strength};
use crate::path::normalize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

pub const ADDITIONAL_BINDING_URL: &str =
    "http://hl7.org/fhir/tools/StructureDefinition/additional-binding";
pub const BINDING_NAME_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/elementdefinition-bindingName";

/// Which element list of a StructureDefinition to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Snapshot,
    Differential,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Snapshot => "snapshot",
            View::Differential => "differential",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element and strength filters applied during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOptions {
    pub require_must_support: bool,
    pub minimum_strengths: BTreeSet<Strength>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            require_must_support: true,
            minimum_strengths: [Strength::Required, Strength::Extensible, Strength::Preferred]
                .into_iter()
                .collect(),
        }
    }
}

impl BindingOptions {
    fn accepts(&self, strength: Strength) -> bool {
        self.minimum_strengths.contains(&strength)
    }
}

/// Extract the bindings of one view of a StructureDefinition.
///
/// Elements without a usable binding are skipped; a document that is not a
/// StructureDefinition yields an empty map.
pub fn extract_bindings(profile: &Value, view: View, options: &BindingOptions) -> BindingMap {
    let mut map = BindingMap::new();
    if resource_type(profile) != Some("StructureDefinition") {
        return map;
    }

    let elements = as_list(profile.get(view.as_str()).and_then(|v| v.get("element")));
    for element in elements {
        let Some(path) = str_field(element, "path") else {
            continue;
        };
        if options.require_must_support && !is_must_support(element) {
            continue;
        }
        let Some(binding) = element.get("binding").filter(|b| b.is_object()) else {
            continue;
        };

        let key = normalize(path);
        for found in element_bindings(binding, options) {
            map.push(key.clone(), found);
        }
    }
    map
}

/// Bindings of both views of a profile file, snapshot first.
///
/// Unreadable files are logged and produce an empty map.
pub fn extract_profile_file(path: &Path, options: &BindingOptions) -> BindingMap {
    match txcheck_package::read_json(path) {
        Ok(profile) => extract_profile(&profile, options),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable profile");
            BindingMap::new()
        }
    }
}

/// Bindings of both views of an already parsed profile, snapshot first.
pub fn extract_profile(profile: &Value, options: &BindingOptions) -> BindingMap {
    let mut map = extract_bindings(profile, View::Snapshot, options);
    map.merge(extract_bindings(profile, View::Differential, options));
    map
}

fn is_must_support(element: &Value) -> bool {
    element
        .get("mustSupport")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn element_bindings(binding: &Value, options: &BindingOptions) -> Vec<Binding> {
    let mut found = Vec::new();
    let primary_strength = str_field(binding, "strength").and_then(Strength::from_code);
    let extensions = as_list(binding.get("extension"));

    if let Some(value_set) = str_field(binding, "valueSet") {
        if let Some(strength) = primary_strength.filter(|s| options.accepts(*s)) {
            found.push(Binding {
                value_set: value_set.to_string(),
                strength,
                binding_name: binding_name(&extensions),
            });
        }
    }

    for extension in &extensions {
        if str_field(extension, "url") != Some(ADDITIONAL_BINDING_URL) {
            continue;
        }
        let (value_set, purpose) = additional_binding_parts(extension);
        let strength = purpose.and_then(Strength::from_code).or(primary_strength);
        if let (Some(value_set), Some(strength)) = (value_set, strength) {
            if options.accepts(strength) {
                found.push(Binding::new(value_set, strength));
            }
        }
    }

    for legacy in as_list(binding.get("additionalBinding")) {
        let strength = str_field(legacy, "strength").and_then(Strength::from_code);
        if let (Some(value_set), Some(strength)) = (str_field(legacy, "valueSet"), strength) {
            if options.accepts(strength) {
                found.push(Binding::new(value_set, strength));
            }
        }
    }

    found
}

fn additional_binding_parts(extension: &Value) -> (Option<&str>, Option<&str>) {
    let mut value_set = None;
    let mut purpose = None;
    for nested in as_list(extension.get("extension")) {
        match str_field(nested, "url") {
            Some("valueSet") => {
                value_set = str_field(nested, "valueCanonical").or(str_field(nested, "valueUri"))
            }
            Some("purpose") => purpose = str_field(nested, "valueCode"),
            _ => {}
        }
    }
    (value_set, purpose)
}

fn binding_name(extensions: &[&Value]) -> Option<String> {
    extensions
        .iter()
        .find(|ext| str_field(ext, "url") == Some(BINDING_NAME_URL))
        .and_then(|ext| str_field(ext, "valueString"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(elements: Value) -> Value {
        json!({
            "resourceType": "StructureDefinition",
            "url": "http://example.org/StructureDefinition/p",
            "differential": { "element": elements }
        })
    }

    #[test]
    fn primary_binding_with_name() {
        let sd = profile(json!([{
            "path": "Patient.gender",
            "mustSupport": true,
            "binding": {
                "strength": "required",
                "valueSet": "http://hl7.org/fhir/ValueSet/administrative-gender|4.0.1",
                "extension": [{
                    "url": BINDING_NAME_URL,
                    "valueString": "AdministrativeGender"
                }]
            }
        }]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        let bindings = map.get("Patient.gender");
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].strength, Strength::Required);
        assert_eq!(bindings[0].binding_name.as_deref(), Some("AdministrativeGender"));
    }

    #[test]
    fn additional_binding_purpose_as_strength() {
        let sd = profile(json!([{
            "path": "Condition.code",
            "mustSupport": true,
            "binding": {
                "strength": "example",
                "valueSet": "http://example.org/ValueSet/main",
                "extension": [
                    {
                        "url": ADDITIONAL_BINDING_URL,
                        "extension": [
                            {"url": "purpose", "valueCode": "extensible"},
                            {"url": "valueSet", "valueCanonical": "http://example.org/ValueSet/extra"}
                        ]
                    },
                    {
                        "url": ADDITIONAL_BINDING_URL,
                        "extension": [
                            {"url": "purpose", "valueCode": "ui"},
                            {"url": "valueSet", "valueCanonical": "http://example.org/ValueSet/ui"}
                        ]
                    }
                ]
            }
        }]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        let bindings = map.get("Condition.code");
        assert_eq!(bindings.len(), 1, "{bindings:?}");
        assert_eq!(bindings[0].value_set, "http://example.org/ValueSet/extra");
        assert_eq!(bindings[0].strength, Strength::Extensible);
    }

    #[test]
    fn unrecognized_purpose_falls_back_to_primary_strength() {
        let sd = profile(json!([{
            "path": "Condition.code",
            "mustSupport": true,
            "binding": {
                "strength": "preferred",
                "valueSet": "http://example.org/ValueSet/main",
                "extension": [{
                    "url": ADDITIONAL_BINDING_URL,
                    "extension": [
                        {"url": "purpose", "valueCode": "candidate"},
                        {"url": "valueSet", "valueCanonical": "http://example.org/ValueSet/extra"}
                    ]
                }]
            }
        }]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        let strengths: Vec<_> = map.get("Condition.code").iter().map(|b| b.strength).collect();
        assert_eq!(strengths, vec![Strength::Preferred, Strength::Preferred]);
    }

    #[test]
    fn legacy_additional_binding_object_or_array() {
        let sd = profile(json!([
            {
                "path": "Observation.code",
                "mustSupport": true,
                "binding": {
                    "additionalBinding": {"valueSet": "http://example.org/ValueSet/a", "strength": "required"}
                }
            },
            {
                "path": "Observation.method",
                "mustSupport": true,
                "binding": {
                    "additionalBinding": [
                        {"valueSet": "http://example.org/ValueSet/b", "strength": "extensible"},
                        {"valueSet": "http://example.org/ValueSet/c", "strength": "example"}
                    ]
                }
            }
        ]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        assert_eq!(map.get("Observation.code").len(), 1);
        assert_eq!(map.get("Observation.method").len(), 1);
    }

    #[test]
    fn keys_are_normalized_and_duplicates_kept() {
        let sd = profile(json!([
            {
                "path": "Observation.category:VSCat",
                "mustSupport": true,
                "binding": {"strength": "required", "valueSet": "http://example.org/ValueSet/cat"}
            },
            {
                "path": "Observation.category",
                "mustSupport": true,
                "binding": {"strength": "extensible", "valueSet": "http://example.org/ValueSet/cat"}
            }
        ]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Observation.category").len(), 2);
    }

    #[test]
    fn malformed_elements_are_skipped() {
        let sd = profile(json!([
            {"mustSupport": true, "binding": {"strength": "required", "valueSet": "x"}},
            {"path": "Patient.a", "mustSupport": true, "binding": "oops"},
            {"path": "Patient.b", "mustSupport": true, "binding": {"strength": "required"}},
            {"path": "Patient.c", "mustSupport": true, "binding": {"strength": "bogus", "valueSet": "x"}},
            "not an element"
        ]));

        let map = extract_bindings(&sd, View::Differential, &BindingOptions::default());
        assert!(map.is_empty());
    }

    #[test]
    fn non_profile_yields_empty_map() {
        let doc = json!({"resourceType": "ValueSet", "differential": {"element": []}});
        assert!(extract_profile(&doc, &BindingOptions::default()).is_empty());
    }

    #[test]
    fn unreadable_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StructureDefinition-broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(extract_profile_file(&path, &BindingOptions::default()).is_empty());
    }
}
