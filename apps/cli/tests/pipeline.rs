use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use txcheck_bindings::{Coding, MembershipVerdict, TerminologyService};
use txcheck_cli::{resolve_packages, Config, Pipeline};
use txcheck_report::ReportWriter;

/// Accepts only the listed `system|code` pairs, everywhere.
struct KnownCodes {
    codes: HashSet<String>,
    calls: AtomicUsize,
}

impl KnownCodes {
    fn new(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn verdict(&self, coding: &Coding) -> MembershipVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.codes.contains(&coding.to_string()) {
            MembershipVerdict::Member
        } else {
            MembershipVerdict::NotMember {
                reason: "Not a member of ValueSet".into(),
            }
        }
    }
}

#[async_trait]
impl TerminologyService for KnownCodes {
    async fn validate_in_value_set(&self, _value_set: &str, coding: &Coding) -> MembershipVerdict {
        self.verdict(coding)
    }

    async fn validate_in_code_system(&self, coding: &Coding) -> MembershipVerdict {
        self.verdict(coding)
    }

    async fn expansion_count(&self, _value_set: &str) -> Option<u64> {
        None
    }

    async fn value_set_title(&self, _value_set: &str) -> Option<String> {
        None
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

fn seed_package(root: &Path) {
    let content = root.join("package");
    write_json(
        &content.join("package.json"),
        &json!({"name": "example.ig", "version": "0.1.0"}),
    );
    write_json(
        &content.join("StructureDefinition-example-patient.json"),
        &json!({
            "resourceType": "StructureDefinition",
            "url": "http://example.org/sd/example-patient",
            "name": "ExamplePatient",
            "title": "Example Patient",
            "kind": "resource",
            "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Patient",
            "snapshot": {"element": [
                {"path": "Patient.maritalStatus", "mustSupport": true,
                 "binding": {"strength": "extensible", "valueSet": "http://hl7.org/fhir/ValueSet/marital-status"}}
            ]}
        }),
    );
    write_json(
        &content.join("example").join("Patient-married.json"),
        &json!({
            "resourceType": "Patient",
            "meta": {"profile": ["http://example.org/sd/example-patient"]},
            "maritalStatus": {"coding": [
                {"system": "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "code": "M"}
            ]}
        }),
    );
    write_json(
        &content.join("example").join("Patient-unknown.json"),
        &json!({
            "resourceType": "Patient",
            "maritalStatus": {"coding": [
                {"system": "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "code": "Z"},
                {"system": "urn:ietf:bcp:47", "code": "en-AU"}
            ]}
        }),
    );
}

fn config_for(package_dir: &Path) -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let contents = json!({
        "endpoint": "https://tx.example.org/fhir",
        "fhir-package-cache": dir.path().join("no-cache"),
        "packages": [{"name": "example.ig", "version": "0.1.0", "path": package_dir}],
        "codesystem-excluded": [{"uri": "urn:ietf:bcp:47", "result": "EXCLUDED"}]
    });
    fs::write(&path, contents.to_string()).unwrap();
    Config::load(&path).unwrap()
}

#[tokio::test]
async fn run_writes_every_report() {
    let package_dir = tempfile::tempdir().unwrap();
    seed_package(package_dir.path());
    let config = config_for(package_dir.path());
    config.validate().unwrap();

    let packages = resolve_packages(&config, None);
    assert_eq!(packages.len(), 1);

    let terminology = KnownCodes::new(&["http://terminology.hl7.org/CodeSystem/v3-MaritalStatus|M"]);
    let out = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(out.path().join("reports")).unwrap();
    let pipeline = Pipeline::new(&config, &terminology, writer);

    let summary = pipeline.run(&packages).await.unwrap();
    let label = packages[0].package.label();

    let names: Vec<String> = summary
        .reports
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&format!("ExampleCodeSystemChecks-{label}.html")));
    assert!(names.contains(&format!("ExampleValueSetMembershipChecks-{label}.html")));
    assert!(names.contains(&"ValueSetBindings-example.ig.html".to_string()));
    assert!(names.contains(&"ValueSetBindings-example.ig.tsv".to_string()));

    // Patient-unknown has no meta.profile and is matched through the inferred profile.
    assert_eq!(summary.membership_rows, 3);
    assert_eq!(summary.code_system_failures, 1);

    let membership = fs::read_to_string(
        out.path()
            .join("reports")
            .join(format!("ExampleValueSetMembershipChecks-{label}.html")),
    )
    .unwrap();
    assert!(membership.contains("<td class=\"status-check\">CHECK</td>"));
    assert!(membership.contains("<td class=\"status-excluded\">EXCLUDED</td>"));
}

#[tokio::test]
async fn missing_package_folder_is_skipped() {
    let config = config_for(Path::new("/nonexistent/package"));
    assert!(resolve_packages(&config, None).is_empty());
}
