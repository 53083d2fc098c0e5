//! Bindings, codings and match results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Binding strength (required | extensible | preferred | example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl Strength {
    pub const ALL: [Strength; 4] = [
        Strength::Required,
        Strength::Extensible,
        Strength::Preferred,
        Strength::Example,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::Required => "required",
            Strength::Extensible => "extensible",
            Strength::Preferred => "preferred",
            Strength::Example => "example",
        }
    }

    /// Parse a code, returning `None` for anything that is not a strength
    /// (additional-binding purposes such as `ui` or `maximum`).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == code)
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown binding strength: {0}")]
pub struct UnknownStrength(pub String);

impl FromStr for Strength {
    type Err = UnknownStrength;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| UnknownStrength(s.to_string()))
    }
}

/// One ValueSet binding taken from a profile element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Canonical ValueSet reference, possibly `|version` suffixed.
    pub value_set: String,
    pub strength: Strength,
    /// Display-only fallback name from the binding-name extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_name: Option<String>,
}

impl Binding {
    pub fn new(value_set: impl Into<String>, strength: Strength) -> Self {
        Self {
            value_set: value_set.into(),
            strength,
            binding_name: None,
        }
    }
}

/// Normalized element path to the bindings declared on that element.
///
/// Lists keep every binding in extraction order; equal value sets with
/// different strengths are distinct entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingMap {
    entries: BTreeMap<String, Vec<Binding>>,
}

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, binding: Binding) {
        self.entries.entry(path.into()).or_default().push(binding);
    }

    /// Union per key; lists are concatenated.
    pub fn merge(&mut self, other: BindingMap) {
        for (path, bindings) in other.entries {
            self.entries.entry(path).or_default().extend(bindings);
        }
    }

    pub fn get(&self, path: &str) -> &[Binding] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Binding])> {
        self.entries
            .iter()
            .map(|(path, bindings)| (path.as_str(), bindings.as_slice()))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.entries.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A system + code pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for Coding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.system, self.code)
    }
}

/// A coding and the path it was found at inside its resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundCoding {
    pub path: String,
    pub coding: Coding,
}

/// Final outcome of one coding checked against one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pass,
    Check,
    NotApplicable,
    Excluded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Check => "CHECK",
            Outcome::NotApplicable => "NOT_APPLICABLE",
            Outcome::Excluded => "EXCLUDED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome plus the reason shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub reason: String,
}

impl Classification {
    pub fn new(outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
        }
    }

    pub fn pass() -> Self {
        Self::new(Outcome::Pass, "")
    }
}

/// One coding matched to one binding and classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub coding_path: String,
    pub matched_binding_path: String,
    pub coding: Coding,
    pub binding: Binding,
    pub outcome: Outcome,
    pub reason: String,
}
