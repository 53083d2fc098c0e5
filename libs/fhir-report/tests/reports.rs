use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use txcheck_bindings::{BindingOptions, Coding, MembershipVerdict, TerminologyService};
use txcheck_package::IgPackage;
use txcheck_report::{
    criteria_description, group_bindings, package_bindings, value_set_rows, ReportWriter,
    TitleCatalog,
};

/// Knows one server-side title and expands everything to three concepts.
struct StubServer;

#[async_trait]
impl TerminologyService for StubServer {
    async fn validate_in_value_set(&self, _value_set: &str, _coding: &Coding) -> MembershipVerdict {
        MembershipVerdict::Member
    }

    async fn validate_in_code_system(&self, _coding: &Coding) -> MembershipVerdict {
        MembershipVerdict::Member
    }

    async fn expansion_count(&self, _value_set: &str) -> Option<u64> {
        Some(3)
    }

    async fn value_set_title(&self, value_set: &str) -> Option<String> {
        (value_set == "http://hl7.org/fhir/ValueSet/marital-status|4.0.1")
            .then(|| "Marital Status|4.0.1".to_string())
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn profile(url: &str, title: &str, elements: Value) -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": url,
        "name": title.replace(' ', ""),
        "title": title,
        "kind": "resource",
        "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Patient",
        "snapshot": {"element": elements}
    })
}

fn seed_package(root: &Path) {
    let content = root.join("package");
    write_json(
        &content.join("StructureDefinition-b-patient.json"),
        &profile(
            "http://example.org/sd/b-patient",
            "b Patient",
            json!([
                {"path": "Patient.gender", "mustSupport": true,
                 "binding": {"strength": "required", "valueSet": "http://example.org/ValueSet/gender"}},
                {"path": "Patient.maritalStatus", "mustSupport": true,
                 "binding": {"strength": "extensible", "valueSet": "http://hl7.org/fhir/ValueSet/marital-status|4.0.1"}},
                {"path": "Patient.language", "mustSupport": true,
                 "binding": {"strength": "example", "valueSet": "http://example.org/ValueSet/languages"}}
            ]),
        ),
    );
    write_json(
        &content.join("StructureDefinition-a-patient.json"),
        &profile(
            "http://example.org/sd/a-patient",
            "A Patient",
            json!([
                {"path": "Patient.gender", "mustSupport": true,
                 "binding": {"strength": "required", "valueSet": "http://example.org/ValueSet/gender"}}
            ]),
        ),
    );
    write_json(
        &content.join("ValueSet-gender.json"),
        &json!({"resourceType": "ValueSet", "url": "http://example.org/ValueSet/gender", "title": "Gender"}),
    );
    fs::write(content.join("StructureDefinition-broken.json"), "{ nope").unwrap();
}

#[tokio::test]
async fn binding_report_from_package() {
    let dir = tempfile::tempdir().unwrap();
    seed_package(dir.path());
    let package = IgPackage::new(dir.path());
    let options = BindingOptions::default();

    let bindings = package_bindings(&package, &options, false);
    let groups = group_bindings(bindings);
    assert_eq!(groups.len(), 2);

    let titles = TitleCatalog::load(std::slice::from_ref(&package), None);
    let rows = value_set_rows(groups, &titles, &StubServer).await;

    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.title.as_str(), r.profiles.len(), r.expansion_count))
        .collect();
    assert_eq!(summary, vec![("Gender", 2, Some(3)), ("Marital Status", 1, Some(3))]);
    assert_eq!(rows[0].profiles[0].title, "A Patient");

    let out = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(out.path().join("reports")).unwrap();
    let (html, tsv) = writer
        .write_bindings(
            &["example.ig".to_string()],
            &rows,
            &criteria_description(&options, false),
        )
        .unwrap();

    assert!(html.ends_with("ValueSetBindings-example.ig.html"));
    let html = fs::read_to_string(html).unwrap();
    assert!(html.contains("Total ValueSets found:</strong> 2"));
    assert!(!html.contains("languages"));
    assert_eq!(fs::read_to_string(tsv).unwrap().lines().count(), 3);
}

#[tokio::test]
async fn unknown_titles_fall_back_to_url_segment() {
    let titles = TitleCatalog::new();
    let title = titles
        .resolve("http://example.org/ValueSet/unknown-codes|1.0.0", &StubServer)
        .await;
    assert_eq!(title, "unknown-codes");
}
