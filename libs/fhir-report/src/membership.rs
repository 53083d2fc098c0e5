//! Example check rows.

use std::collections::HashSet;
use std::path::Path;
use txcheck_bindings::{MatchResult, Outcome, SystemCheck};

/// One ValueSet membership check of one example coding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRow {
    /// File name of the example.
    pub file: String,
    /// Full path of the example.
    pub source: String,
    pub path: String,
    pub binding_path: String,
    pub system: String,
    pub code: String,
    pub value_set: String,
    pub strength: String,
    pub outcome: Outcome,
    pub reason: String,
}

impl MembershipRow {
    pub fn from_match(example: &Path, result: MatchResult) -> Self {
        Self {
            file: file_name(example),
            source: example.display().to_string(),
            path: result.coding_path,
            binding_path: result.matched_binding_path,
            system: result.coding.system,
            code: result.coding.code,
            value_set: result.binding.value_set,
            strength: result.binding.strength.to_string(),
            outcome: result.outcome,
            reason: result.reason,
        }
    }

    fn key(&self) -> [String; 7] {
        [
            self.file.clone(),
            self.path.clone(),
            self.binding_path.clone(),
            self.system.clone(),
            self.code.clone(),
            self.value_set.clone(),
            self.strength.clone(),
        ]
    }
}

/// Drop repeated checks, keeping the first occurrence.
///
/// Rows are the same check when file, path, binding path, system, code,
/// ValueSet and strength agree.
pub fn dedup_rows(rows: Vec<MembershipRow>) -> Vec<MembershipRow> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if seen.insert(row.key()) {
            unique.push(row);
        }
    }
    unique
}

/// One flat CodeSystem check of one example coding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSystemRow {
    pub file: String,
    pub path: String,
    pub code: String,
    pub system: String,
    pub result: String,
    pub reason: String,
}

impl CodeSystemRow {
    pub fn from_check(example: &Path, check: SystemCheck) -> Self {
        Self {
            file: file_name(example),
            path: check.path,
            code: check.coding.code,
            system: check.coding.system,
            result: check.result.to_string(),
            reason: check.reason,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result == "FAIL"
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
