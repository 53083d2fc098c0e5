//! Terminology server REST client

use crate::error::{Error, Result};
use crate::response::{
    capability_status, code_system_verdict, expansion_total, search_title, value_set_verdict,
    CapabilityStatus,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use txcheck_bindings::path::split_canonical;
use txcheck_bindings::{Coding, MembershipVerdict, TerminologyService};

const FHIR_JSON: &str = "application/fhir+json";

/// Connection settings for a terminology server.
#[derive(Debug, Clone)]
pub struct TerminologySettings {
    pub endpoint: String,
    /// FHIR version the capability check requires.
    pub fhir_version: String,
    /// Timeout for `$validate-code` calls.
    pub validate_timeout: Duration,
    /// Timeout for capability, expansion and title lookups.
    pub lookup_timeout: Duration,
}

impl TerminologySettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fhir_version: "4.0.1".to_string(),
            validate_timeout: Duration::from_secs(30),
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

/// Client for a FHIR terminology server.
pub struct TerminologyClient {
    client: Client,
    base_url: String,
    settings: TerminologySettings,
}

impl TerminologyClient {
    pub fn new(settings: TerminologySettings) -> Result<Self> {
        let base_url = settings.endpoint.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidEndpoint(settings.endpoint.clone()));
        }

        let client = Client::builder()
            .timeout(settings.validate_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch `/metadata` and check it describes a terminology server of the
    /// configured FHIR version.
    pub async fn capability_check(&self) -> CapabilityStatus {
        let url = format!("{}/metadata", self.base_url);
        let request = self
            .client
            .get(&url)
            .header(ACCEPT, FHIR_JSON)
            .timeout(self.settings.lookup_timeout);

        match send(request).await {
            Ok((status, body)) => {
                let result = capability_status(status, body.as_ref(), &self.settings.fhir_version);
                tracing::info!(
                    url = %url,
                    http_status = status,
                    result = result.code(),
                    "Capability check completed"
                );
                result
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Terminology server unreachable");
                CapabilityStatus::UNREACHABLE
            }
        }
    }

    /// Concept count of a ValueSet expansion (`$expand?count=0`).
    pub async fn expand_count(&self, value_set: &str) -> Result<Option<u64>> {
        let url = format!(
            "{}/ValueSet/$expand?url={}&count=0",
            self.base_url,
            urlencoding::encode(value_set)
        );
        let (status, body) = send(self.lookup(&url)).await?;
        if status != 200 {
            tracing::debug!(value_set, http_status = status, "Expansion not available");
            return Ok(None);
        }
        Ok(Some(body.as_ref().map(expansion_total).unwrap_or(0)))
    }

    /// Title of a ValueSet found with `ValueSet?url=`.
    pub async fn find_title(&self, value_set: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/ValueSet?url={}",
            self.base_url,
            urlencoding::encode(value_set)
        );
        let (status, body) = send(self.lookup(&url)).await?;
        if status != 200 {
            return Ok(None);
        }
        Ok(body.as_ref().and_then(search_title))
    }

    fn lookup(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(ACCEPT, FHIR_JSON)
            .timeout(self.settings.lookup_timeout)
    }
}

/// Send a request and read the body as JSON when possible.
async fn send(request: RequestBuilder) -> Result<(u16, Option<Value>)> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    let body = serde_json::from_slice::<Value>(&bytes).ok();
    Ok((status, body))
}

/// `Parameters` body for `ValueSet/$validate-code`.
pub fn validate_code_parameters(base: &str, version: Option<&str>, coding: &Coding) -> Value {
    let mut parameter = vec![json!({"name": "url", "valueUri": base})];
    if let Some(version) = version {
        parameter.push(json!({"name": "version", "valueString": version}));
    }
    parameter.push(json!({
        "name": "coding",
        "valueCoding": {"system": coding.system, "code": coding.code}
    }));
    json!({"resourceType": "Parameters", "parameter": parameter})
}

#[async_trait]
impl TerminologyService for TerminologyClient {
    async fn validate_in_value_set(&self, value_set: &str, coding: &Coding) -> MembershipVerdict {
        let (base, version) = split_canonical(value_set);
        let url = format!("{}/ValueSet/$validate-code", self.base_url);
        let body = validate_code_parameters(base, version, coding);

        let request = self
            .client
            .post(&url)
            .header(ACCEPT, FHIR_JSON)
            .header(CONTENT_TYPE, FHIR_JSON)
            .body(body.to_string());

        match send(request).await {
            Ok((status, response)) => {
                let verdict = value_set_verdict(status, response.as_ref(), base, version);
                tracing::debug!(value_set, coding = %coding, http_status = status, verdict = ?verdict, "ValueSet $validate-code");
                verdict
            }
            Err(e) => {
                tracing::debug!(value_set, coding = %coding, error = %e, "ValueSet $validate-code failed");
                MembershipVerdict::Unverifiable {
                    reason: format!("exception: {e}"),
                }
            }
        }
    }

    async fn validate_in_code_system(&self, coding: &Coding) -> MembershipVerdict {
        let url = format!(
            "{}/CodeSystem/$validate-code?url={}&code={}",
            self.base_url,
            urlencoding::encode(&coding.system),
            urlencoding::encode(&coding.code)
        );
        let request = self.client.get(&url).header(ACCEPT, FHIR_JSON);

        match send(request).await {
            Ok((status, response)) => code_system_verdict(status, response.as_ref()),
            Err(e) => {
                tracing::debug!(coding = %coding, error = %e, "CodeSystem $validate-code failed");
                MembershipVerdict::Unverifiable {
                    reason: format!("exception: {e}"),
                }
            }
        }
    }

    async fn expansion_count(&self, value_set: &str) -> Option<u64> {
        match self.expand_count(value_set).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(value_set, error = %e, "ValueSet expansion failed");
                None
            }
        }
    }

    async fn value_set_title(&self, value_set: &str) -> Option<String> {
        match self.find_title(value_set).await {
            Ok(title) => title,
            Err(e) => {
                tracing::debug!(value_set, error = %e, "ValueSet title lookup failed");
                None
            }
        }
    }
}
