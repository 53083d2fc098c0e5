use std::time::Duration;
use txcheck_bindings::{
    ClassificationPolicy, Coding, MembershipVerdict, Outcome, TerminologyService,
};
use txcheck_terminology::{CapabilityStatus, TerminologyClient, TerminologySettings};

/// A client pointed at a closed local port.
fn offline_client() -> TerminologyClient {
    let mut settings = TerminologySettings::new("http://127.0.0.1:9/fhir");
    settings.validate_timeout = Duration::from_secs(2);
    settings.lookup_timeout = Duration::from_secs(2);
    TerminologyClient::new(settings).unwrap()
}

#[tokio::test]
async fn capability_check_reports_unreachable() {
    let client = offline_client();
    assert_eq!(client.capability_check().await, CapabilityStatus::UNREACHABLE);
}

#[tokio::test]
async fn transport_failure_is_unverifiable() {
    let client = offline_client();
    let coding = Coding::new("http://hl7.org/fhir/administrative-gender", "male");

    let verdict = client
        .validate_in_value_set("http://hl7.org/fhir/ValueSet/administrative-gender|4.0.1", &coding)
        .await;
    let MembershipVerdict::Unverifiable { reason } = verdict else {
        panic!("expected unverifiable, got {verdict:?}");
    };
    assert!(reason.starts_with("exception: "));

    assert!(client.expansion_count("http://x/vs").await.is_none());
    assert!(client.value_set_title("http://x/vs").await.is_none());
}

#[tokio::test]
async fn transport_failure_classifies_as_check() {
    let client = offline_client();
    let policy = ClassificationPolicy::default();
    let coding = Coding::new("http://snomed.info/sct", "248153007");

    let classification = policy
        .classify(&coding, "http://hl7.org/fhir/ValueSet/administrative-gender", &client)
        .await;
    assert_eq!(classification.outcome, Outcome::Check);
}
