//! Exclusion lists and outcome classification.
//!
//! Exclusions are decided locally before any remote call: an excluded code
//! system takes precedence over an excluded ValueSet. A remote "not a member"
//! answer may be downgraded to NOT_APPLICABLE when the coding's system and the
//! ValueSet clearly belong to different terminology domains (national
//! registry or formulary codes against SNOMED/LOINC/ICD/AMT sets, or the
//! reverse). That marker test is a substring heuristic driven by
//! [`NotApplicableMarkers`], not a terminology mapping.

use crate::model::{Classification, Coding, Outcome};
use crate::path::clean;
use crate::service::{MembershipVerdict, TerminologyService};
use serde::Deserialize;
use std::collections::HashMap;

pub const NOT_APPLICABLE_REASON: &str = "Code system not applicable to this ValueSet";
const CODE_SYSTEM_EXCLUDED: &str = "Codesystem is excluded";
const VALUE_SET_EXCLUDED: &str = "ValueSet excluded from validation";

/// One configured exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExclusionEntry {
    pub uri: String,
    #[serde(default)]
    pub reason: Option<String>,
    /// Forced result reported by the flat CodeSystem check.
    #[serde(default)]
    pub result: Option<String>,
}

impl ExclusionEntry {
    pub fn new(uri: impl Into<String>, reason: Option<&str>) -> Self {
        Self {
            uri: uri.into(),
            reason: reason.map(str::to_string),
            result: None,
        }
    }
}

/// Exclusions keyed by unversioned URI. The first entry for a URI wins.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    entries: HashMap<String, ExclusionEntry>,
}

impl ExclusionList {
    pub fn new(entries: impl IntoIterator<Item = ExclusionEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            if entry.uri.is_empty() {
                continue;
            }
            map.entry(clean(&entry.uri).to_string()).or_insert(entry);
        }
        Self { entries: map }
    }

    /// The entry covering `uri`, ignoring any `|version` suffix on either side.
    pub fn get(&self, uri: &str) -> Option<&ExclusionEntry> {
        self.entries.get(clean(uri))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Substring markers for the cross-domain NOT_APPLICABLE heuristic.
///
/// Matching is case-insensitive. A failed check is not applicable when the
/// system matches a registry marker and the ValueSet a standard marker, or
/// the ValueSet matches a registry marker and the system a standard marker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotApplicableMarkers {
    pub registry_system_markers: Vec<String>,
    pub standard_valueset_markers: Vec<String>,
    pub registry_valueset_markers: Vec<String>,
    pub standard_system_markers: Vec<String>,
}

impl Default for NotApplicableMarkers {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        Self {
            registry_system_markers: owned(&["air-", "/air/", "pbs", "mims"]),
            standard_valueset_markers: owned(&["snomed", "loinc", "icd", "amt"]),
            registry_valueset_markers: owned(&["air", "australian-immunisation-register"]),
            standard_system_markers: owned(&["snomed", "loinc", "icd", "amt"]),
        }
    }
}

impl NotApplicableMarkers {
    pub fn is_cross_domain(&self, system: &str, value_set: &str) -> bool {
        let system = system.to_lowercase();
        let value_set = value_set.to_lowercase();
        let any = |markers: &[String], text: &str| {
            markers
                .iter()
                .any(|m| !m.is_empty() && text.contains(&m.to_lowercase()))
        };

        (any(&self.registry_system_markers, &system)
            && any(&self.standard_valueset_markers, &value_set))
            || (any(&self.registry_valueset_markers, &value_set)
                && any(&self.standard_system_markers, &system))
    }
}

/// Read-only classification settings for one run.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPolicy {
    pub excluded_value_sets: ExclusionList,
    pub excluded_code_systems: ExclusionList,
    pub not_applicable: NotApplicableMarkers,
}

impl ClassificationPolicy {
    /// EXCLUDED classification when the coding's system or the ValueSet is
    /// excluded. The code system is checked first.
    pub fn exclusion(&self, coding: &Coding, value_set: &str) -> Option<Classification> {
        if let Some(entry) = self.excluded_code_systems.get(&coding.system) {
            let reason = match entry.reason.as_deref() {
                Some(reason) => format!("{CODE_SYSTEM_EXCLUDED}: {reason}"),
                None => CODE_SYSTEM_EXCLUDED.to_string(),
            };
            return Some(Classification::new(Outcome::Excluded, reason));
        }

        self.excluded_value_sets.get(value_set).map(|entry| {
            Classification::new(
                Outcome::Excluded,
                entry.reason.as_deref().unwrap_or(VALUE_SET_EXCLUDED),
            )
        })
    }

    /// Classify a remote verdict for a coding that was not excluded.
    pub fn classify_verdict(
        &self,
        coding: &Coding,
        value_set: &str,
        verdict: MembershipVerdict,
    ) -> Classification {
        match verdict {
            MembershipVerdict::Member => Classification::pass(),
            MembershipVerdict::NotMember { reason } => {
                if self.not_applicable.is_cross_domain(&coding.system, value_set) {
                    Classification::new(Outcome::NotApplicable, NOT_APPLICABLE_REASON)
                } else {
                    Classification::new(Outcome::Check, reason)
                }
            }
            MembershipVerdict::Unverifiable { reason } => {
                Classification::new(Outcome::Check, reason)
            }
        }
    }

    /// Exclusions first, otherwise ask `terminology` and classify its verdict.
    pub async fn classify<T>(
        &self,
        coding: &Coding,
        value_set: &str,
        terminology: &T,
    ) -> Classification
    where
        T: TerminologyService + ?Sized,
    {
        if let Some(excluded) = self.exclusion(coding, value_set) {
            tracing::debug!(
                system = %coding.system,
                value_set,
                reason = %excluded.reason,
                "Skipping remote check for excluded terminology"
            );
            return excluded;
        }

        let verdict = terminology.validate_in_value_set(value_set, coding).await;
        self.classify_verdict(coding, value_set, verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ClassificationPolicy {
        ClassificationPolicy {
            excluded_value_sets: ExclusionList::new([ExclusionEntry::new(
                "http://example.org/ValueSet/skip|1.0.0",
                Some("Not on server"),
            )]),
            excluded_code_systems: ExclusionList::new([
                ExclusionEntry::new("http://example.org/cs/private", Some("Local codes")),
                ExclusionEntry::new("http://example.org/cs/bare", None),
            ]),
            not_applicable: NotApplicableMarkers::default(),
        }
    }

    #[test]
    fn code_system_exclusion_precedes_value_set_exclusion() {
        let coding = Coding::new("http://example.org/cs/private|2", "x");
        let result = policy()
            .exclusion(&coding, "http://example.org/ValueSet/skip")
            .unwrap();
        assert_eq!(result.outcome, Outcome::Excluded);
        assert_eq!(result.reason, "Codesystem is excluded: Local codes");
    }

    #[test]
    fn value_set_exclusion_ignores_versions() {
        let coding = Coding::new("http://snomed.info/sct", "1");
        let result = policy()
            .exclusion(&coding, "http://example.org/ValueSet/skip|2.0.0")
            .unwrap();
        assert_eq!(result.reason, "Not on server");

        let bare = policy()
            .exclusion(&Coding::new("http://example.org/cs/bare", "1"), "vs")
            .unwrap();
        assert_eq!(bare.reason, "Codesystem is excluded");
        assert!(policy().exclusion(&coding, "http://example.org/ValueSet/keep").is_none());
    }

    #[test]
    fn registry_codes_against_standard_sets_are_not_applicable() {
        let coding = Coding::new(
            "https://www.humanservices.gov.au/AIR/vaccine-code",
            "COVAST",
        );
        // "/air/" only matches once lower-cased.
        let result = policy().classify_verdict(
            &coding,
            "https://healthterminologies.gov.au/fhir/ValueSet/amt-vaccine-1",
            MembershipVerdict::NotMember {
                reason: "Not a member of ValueSet".into(),
            },
        );
        assert_eq!(result.outcome, Outcome::NotApplicable);
        assert_eq!(result.reason, NOT_APPLICABLE_REASON);
    }

    #[test]
    fn reverse_direction_is_not_applicable() {
        let coding = Coding::new("http://snomed.info/sct", "1234");
        let result = policy().classify_verdict(
            &coding,
            "https://example.org/ValueSet/australian-immunisation-register-vaccine",
            MembershipVerdict::NotMember {
                reason: "Not a member of ValueSet".into(),
            },
        );
        assert_eq!(result.outcome, Outcome::NotApplicable);
    }

    #[test]
    fn failures_stay_check_with_reason_verbatim() {
        let coding = Coding::new("http://pbs.gov.au/code/item", "1234X");
        let result = policy().classify_verdict(
            &coding,
            "http://snomed.info/sct?fhir_vs",
            MembershipVerdict::Unverifiable {
                reason: "exception: timed out".into(),
            },
        );
        assert_eq!(result, Classification::new(Outcome::Check, "exception: timed out"));

        let plain = policy().classify_verdict(
            &Coding::new("http://loinc.org", "1-8"),
            "http://example.org/ValueSet/labs",
            MembershipVerdict::NotMember {
                reason: "Not a member of ValueSet".into(),
            },
        );
        assert_eq!(plain.outcome, Outcome::Check);
        assert_eq!(
            policy().classify_verdict(&coding, "x", MembershipVerdict::Member),
            Classification::pass()
        );
    }

    #[test]
    fn markers_deserialize_with_defaults() {
        let markers: NotApplicableMarkers =
            serde_json::from_value(serde_json::json!({"registry-system-markers": ["nzmt"]}))
                .unwrap();
        assert_eq!(markers.registry_system_markers, vec!["nzmt"]);
        assert_eq!(markers.standard_valueset_markers.len(), 4);
    }
}
