//! Reports for IG terminology checks.
//!
//! - `ValueSetBindings-<packages>.html` / `.tsv`: every ValueSet bound by the
//!   packages' profiles, with its expansion size and the binding profiles
//! - `ExampleValueSetMembershipChecks-<package>.html`: example codings
//!   checked against the bindings of their profiles
//! - `ExampleCodeSystemChecks-<package>.html`: example codings checked
//!   against their own CodeSystem

pub mod bindings;
pub mod error;
pub mod html;
pub mod membership;
pub mod titles;
pub mod tsv;

pub use bindings::{
    criteria_description, group_bindings, is_international_value_set, package_bindings,
    value_set_rows, BindingGroup, ProfileBinding, ProfileRef, ValueSetRow,
};
pub use error::{ReportError, ReportResult};
pub use membership::{dedup_rows, CodeSystemRow, MembershipRow};
pub use titles::TitleCatalog;

use std::fs;
use std::path::{Path, PathBuf};

/// Writes report files into one output folder.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    /// Create the writer, creating `out_dir` when missing.
    pub fn new(out_dir: impl Into<PathBuf>) -> ReportResult<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).map_err(|source| ReportError::Write {
            path: out_dir.clone(),
            source,
        })?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write the binding table as HTML and TSV; returns both paths.
    pub fn write_bindings(
        &self,
        package_names: &[String],
        rows: &[ValueSetRow],
        criteria: &str,
    ) -> ReportResult<(PathBuf, PathBuf)> {
        let stem = if package_names.is_empty() {
            "ValueSetBindings".to_string()
        } else {
            format!("ValueSetBindings-{}", package_names.join("-"))
        };
        let html_path = self.write(
            &format!("{stem}.html"),
            &html::binding_report(rows, criteria, &generated_on()),
        )?;
        let tsv_path = self.write(&format!("{stem}.tsv"), &tsv::binding_tsv(rows))?;
        tracing::info!(
            path = %html_path.display(),
            value_sets = rows.len(),
            "ValueSet bindings report written"
        );
        Ok((html_path, tsv_path))
    }

    /// Write the membership report of one package. Rows are deduplicated first.
    pub fn write_membership(
        &self,
        package: &str,
        endpoint: &str,
        rows: Vec<MembershipRow>,
    ) -> ReportResult<PathBuf> {
        let rows = dedup_rows(rows);
        let path = self.write(
            &format!("ExampleValueSetMembershipChecks-{package}.html"),
            &html::membership_report(&rows, endpoint, package),
        )?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Membership report written");
        Ok(path)
    }

    /// Write the flat CodeSystem report of one package.
    pub fn write_code_systems(
        &self,
        package: &str,
        endpoint: &str,
        rows: &[CodeSystemRow],
    ) -> ReportResult<PathBuf> {
        let path = self.write(
            &format!("ExampleCodeSystemChecks-{package}.html"),
            &html::code_system_report(rows, endpoint, package),
        )?;
        let failures = rows.iter().filter(|r| r.is_failure()).count();
        tracing::info!(path = %path.display(), rows = rows.len(), failures, "CodeSystem report written");
        Ok(path)
    }

    fn write(&self, file_name: &str, contents: &str) -> ReportResult<PathBuf> {
        let path = self.out_dir.join(file_name);
        fs::write(&path, contents).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn generated_on() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
