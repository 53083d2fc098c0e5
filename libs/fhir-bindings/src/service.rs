//! Terminology server seam.

use crate::model::Coding;
use async_trait::async_trait;

/// Result of asking the terminology server whether a coding is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipVerdict {
    Member,
    /// The server answered and the coding is not in the ValueSet or CodeSystem.
    NotMember { reason: String },
    /// The server could not answer (transport failure, HTTP error, missing
    /// dependency, unparseable response).
    Unverifiable { reason: String },
}

/// Remote terminology operations used by the checks and reports.
///
/// Implementations never fail: transport problems are folded into the
/// verdict or an absent value.
#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// `ValueSet/$validate-code` for a possibly `|version` suffixed ValueSet.
    async fn validate_in_value_set(&self, value_set: &str, coding: &Coding) -> MembershipVerdict;

    /// `CodeSystem/$validate-code` for a flat system + code check.
    async fn validate_in_code_system(&self, coding: &Coding) -> MembershipVerdict;

    /// Concept count of a ValueSet expansion.
    async fn expansion_count(&self, value_set: &str) -> Option<u64>;

    /// Title (or name) of a ValueSet published on the server.
    async fn value_set_title(&self, value_set: &str) -> Option<String>;
}
