//! Example instance checks.
//!
//! [`MembershipCheck`] runs one package's examples against the bindings of
//! their profiles. [`check_code_systems`] is the flat check of every coding
//! against its own CodeSystem, independent of profiles.

use crate::collect::{collect_codings, instances};
use crate::extract::{extract_profile_file, BindingOptions};
use crate::matcher::best_binding_paths;
use crate::model::{BindingMap, Coding, MatchResult};
use crate::policy::{ClassificationPolicy, ExclusionList};
use crate::profiles::{resolve_profiles, ProfileIndex};
use crate::service::{MembershipVerdict, TerminologyService};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Run-wide settings threaded through every check.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub options: &'a BindingOptions,
    pub policy: &'a ClassificationPolicy,
    pub terminology: &'a dyn TerminologyService,
}

/// ValueSet membership checks for the examples of one package.
///
/// Binding maps are extracted once per profile URL and reused for every
/// example that references the profile.
pub struct MembershipCheck<'a> {
    ctx: CheckContext<'a>,
    index: ProfileIndex,
    bindings: HashMap<String, BindingMap>,
}

impl<'a> MembershipCheck<'a> {
    pub fn new(ctx: CheckContext<'a>, index: ProfileIndex) -> Self {
        Self {
            ctx,
            index,
            bindings: HashMap::new(),
        }
    }

    pub fn index(&self) -> &ProfileIndex {
        &self.index
    }

    /// Check a document; Bundles are checked entry by entry.
    pub async fn check_document(&mut self, document: &Value) -> Vec<MatchResult> {
        let mut results = Vec::new();
        for resource in instances(document) {
            results.extend(self.check_instance(resource).await);
        }
        results
    }

    /// Check one resource against the merged bindings of its profiles.
    ///
    /// Codings that match no binding path are left out.
    pub async fn check_instance(&mut self, resource: &Value) -> Vec<MatchResult> {
        let profiles = resolve_profiles(resource, &self.index);
        let merged = self.merged_bindings(&profiles);
        if merged.is_empty() {
            tracing::debug!(profiles = ?profiles, "No bindings in scope for instance");
            return Vec::new();
        }

        let mut results = Vec::new();
        for found in collect_codings(resource) {
            for binding_path in best_binding_paths(&found.path, merged.paths()) {
                for binding in merged.get(&binding_path) {
                    let classification = self
                        .ctx
                        .policy
                        .classify(&found.coding, &binding.value_set, self.ctx.terminology)
                        .await;
                    results.push(MatchResult {
                        coding_path: found.path.clone(),
                        matched_binding_path: binding_path.clone(),
                        coding: found.coding.clone(),
                        binding: binding.clone(),
                        outcome: classification.outcome,
                        reason: classification.reason,
                    });
                }
            }
        }
        results
    }

    fn merged_bindings(&mut self, profiles: &[String]) -> BindingMap {
        let mut merged = BindingMap::new();
        for url in profiles {
            if !self.bindings.contains_key(url) {
                let map = match self.index.find(url) {
                    Some(profile) => extract_profile_file(&profile.path, self.ctx.options),
                    None => {
                        tracing::debug!(profile = %url, "Profile not found in package");
                        BindingMap::new()
                    }
                };
                self.bindings.insert(url.clone(), map);
            }
            if let Some(map) = self.bindings.get(url) {
                merged.merge(map.clone());
            }
        }
        merged
    }
}

/// Result of the flat CodeSystem check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCheckResult {
    Pass,
    Fail,
    /// Result configured on a code-system exclusion.
    Forced(String),
}

impl fmt::Display for SystemCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemCheckResult::Pass => f.write_str("PASS"),
            SystemCheckResult::Fail => f.write_str("FAIL"),
            SystemCheckResult::Forced(result) => f.write_str(result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCheck {
    pub path: String,
    pub coding: Coding,
    pub result: SystemCheckResult,
    pub reason: String,
}

/// Check every coding of a document against its own CodeSystem.
///
/// Codings with a blank system or code are skipped. Excluded systems are
/// reported with their configured result and no remote call is made.
pub async fn check_code_systems(
    document: &Value,
    excluded: &ExclusionList,
    terminology: &dyn TerminologyService,
) -> Vec<SystemCheck> {
    let mut checks = Vec::new();
    for resource in instances(document) {
        for found in collect_codings(resource) {
            let coding = &found.coding;
            if coding.system.trim().is_empty() || coding.code.trim().is_empty() {
                tracing::warn!(path = %found.path, system = %coding.system, code = %coding.code, "Invalid system or code");
                continue;
            }

            let (result, reason) = match excluded.get(&coding.system) {
                Some(entry) => (
                    SystemCheckResult::Forced(entry.result.clone().unwrap_or_else(|| "EXCLUDED".into())),
                    entry.reason.clone().unwrap_or_default(),
                ),
                None => match terminology.validate_in_code_system(coding).await {
                    MembershipVerdict::Member => (SystemCheckResult::Pass, String::new()),
                    MembershipVerdict::NotMember { .. } => {
                        (SystemCheckResult::Fail, "Not a valid code".to_string())
                    }
                    MembershipVerdict::Unverifiable { reason } => (SystemCheckResult::Fail, reason),
                },
            };

            checks.push(SystemCheck {
                path: found.path.clone(),
                coding: found.coding.clone(),
                result,
                reason,
            });
        }
    }
    checks
}
