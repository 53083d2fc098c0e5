//! Interpretation of terminology server responses.
//!
//! Everything here works on `(status, body)` pairs so the rules can be
//! exercised without a server. A `None` body means the response was not JSON.

use serde_json::Value;
use txcheck_bindings::MembershipVerdict;

pub const TERMINOLOGY_SERVER_CAPABILITY: &str =
    "http://hl7.org/fhir/CapabilityStatement/terminology-server";

pub const NOT_A_MEMBER: &str = "Not a member of ValueSet";
pub const NOT_A_VALID_CODE: &str = "Not a valid code";
const UNPARSEABLE_RESULT: &str = "Unable to parse validation result";

/// Outcome of the `/metadata` capability check as an HTTP-like status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityStatus(pub u16);

impl CapabilityStatus {
    pub const OK: CapabilityStatus = CapabilityStatus(200);
    /// The statement is not a terminology server of the supported version.
    pub const MISMATCH: CapabilityStatus = CapabilityStatus(418);
    /// No response at all.
    pub const UNREACHABLE: CapabilityStatus = CapabilityStatus(0);

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    pub fn code(&self) -> u16 {
        self.0
    }
}

/// Value of the first `Parameters.parameter` named `name`.
pub fn parameter<'a>(parameters: &'a Value, name: &str) -> Option<&'a Value> {
    parameters
        .get("parameter")?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
}

fn result_flag(parameters: &Value) -> Option<bool> {
    parameter(parameters, "result")?
        .get("valueBoolean")?
        .as_bool()
}

fn message(parameters: &Value) -> Option<&str> {
    parameter(parameters, "message")?
        .get("valueString")?
        .as_str()
}

/// First error-severity `OperationOutcome.issue.details.text`.
pub fn error_issue_text(outcome: &Value) -> Option<&str> {
    outcome
        .get("issue")?
        .as_array()?
        .iter()
        .filter(|issue| issue.get("severity").and_then(Value::as_str) == Some("error"))
        .find_map(|issue| issue.get("details")?.get("text")?.as_str())
}

/// `ValueSet/$validate-code` response for ValueSet `base` (and `version`).
pub fn value_set_verdict(
    status: u16,
    body: Option<&Value>,
    base: &str,
    version: Option<&str>,
) -> MembershipVerdict {
    match status {
        200 => {
            let Some(body) = body else {
                return MembershipVerdict::Unverifiable {
                    reason: UNPARSEABLE_RESULT.to_string(),
                };
            };
            if result_flag(body) == Some(true) {
                return MembershipVerdict::Member;
            }
            match message(body) {
                Some(text) if is_missing_dependency(text) => MembershipVerdict::Unverifiable {
                    reason: format!("Cannot validate: dependency ValueSet missing on server - {text}"),
                },
                _ => MembershipVerdict::NotMember {
                    reason: NOT_A_MEMBER.to_string(),
                },
            }
        }
        404 => MembershipVerdict::Unverifiable {
            reason: match version {
                Some(version) => {
                    format!("ValueSet not found on terminology server: {base}|{version}")
                }
                None => format!(
                    "ValueSet not found on terminology server (unversioned; no version in binding): {base}"
                ),
            },
        },
        _ => MembershipVerdict::Unverifiable {
            reason: body
                .and_then(error_issue_text)
                .map(str::to_string)
                .unwrap_or_else(|| format!("http status: {status}")),
        },
    }
}

fn is_missing_dependency(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("could not be found") && lower.contains("unable to check")
}

/// `CodeSystem/$validate-code` response.
pub fn code_system_verdict(status: u16, body: Option<&Value>) -> MembershipVerdict {
    if status != 200 {
        return MembershipVerdict::Unverifiable {
            reason: format!("http status: {status}"),
        };
    }
    match body.and_then(result_flag) {
        Some(true) => MembershipVerdict::Member,
        Some(false) => MembershipVerdict::NotMember {
            reason: NOT_A_VALID_CODE.to_string(),
        },
        None => MembershipVerdict::Unverifiable {
            reason: UNPARSEABLE_RESULT.to_string(),
        },
    }
}

/// `/metadata` response checked against the supported FHIR version.
pub fn capability_status(status: u16, body: Option<&Value>, fhir_version: &str) -> CapabilityStatus {
    if status != 200 {
        return CapabilityStatus(status);
    }
    let Some(body) = body else {
        return CapabilityStatus::MISMATCH;
    };

    let instantiates = body
        .get("instantiates")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_str);
    let version = body.get("fhirVersion").and_then(Value::as_str);

    if instantiates == Some(TERMINOLOGY_SERVER_CAPABILITY) && version == Some(fhir_version) {
        CapabilityStatus::OK
    } else {
        CapabilityStatus::MISMATCH
    }
}

/// Concept count of an expansion: `expansion.total`, else the size of
/// `expansion.contains`, else zero.
pub fn expansion_total(value_set: &Value) -> u64 {
    let Some(expansion) = value_set.get("expansion") else {
        return 0;
    };
    expansion
        .get("total")
        .and_then(Value::as_u64)
        .or_else(|| {
            expansion
                .get("contains")
                .and_then(Value::as_array)
                .map(|c| c.len() as u64)
        })
        .unwrap_or(0)
}

/// Title, else name, of the first ValueSet in a search Bundle.
pub fn search_title(bundle: &Value) -> Option<String> {
    let resource = bundle.get("entry")?.as_array()?.first()?.get("resource")?;
    ["title", "name"]
        .iter()
        .find_map(|key| {
            resource
                .get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
}
