//! Per-run processing of the configured IG packages.

use crate::config::{Config, PackageConfig};
use anyhow::Context;
use std::path::PathBuf;
use txcheck_bindings::{
    check_code_systems, BindingOptions, CheckContext, ClassificationPolicy, MembershipCheck,
    ProfileIndex, TerminologyService,
};
use txcheck_package::{read_json, IgPackage, PackageCache};
use txcheck_report::{
    criteria_description, dedup_rows, group_bindings, package_bindings, value_set_rows, CodeSystemRow,
    MembershipRow, ReportWriter, TitleCatalog,
};

/// A configured package found on disk.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub config: PackageConfig,
    pub package: IgPackage,
}

/// Locate every configured package. Packages that cannot be found are
/// logged and left out.
pub fn resolve_packages(config: &Config, cache: Option<&PackageCache>) -> Vec<ResolvedPackage> {
    let mut resolved = Vec::new();
    for entry in &config.packages {
        let package = match (&entry.path, cache) {
            (Some(path), _) if path.is_dir() => IgPackage::new(path),
            (Some(path), _) => {
                tracing::error!(package = %entry.name, path = %path.display(), "Package folder not found");
                continue;
            }
            (None, Some(cache)) => match cache.locate(&entry.name, &entry.version) {
                Ok(package) => package,
                Err(e) => {
                    tracing::error!(package = %entry.name, version = %entry.version, error = %e, "Package not available");
                    continue;
                }
            },
            (None, None) => {
                tracing::error!(package = %entry.name, "No package path and no package cache configured");
                continue;
            }
        };
        tracing::info!(
            package = %entry.name,
            version = %entry.version,
            root = %package.root().display(),
            "Using package"
        );
        resolved.push(ResolvedPackage {
            config: entry.clone(),
            package,
        });
    }
    resolved
}

/// Report files written by a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<PathBuf>,
    pub membership_rows: usize,
    pub code_system_failures: usize,
}

/// Everything one run needs, built once from the configuration.
pub struct Pipeline<'a> {
    pub endpoint: &'a str,
    pub options: BindingOptions,
    pub include_dependencies: bool,
    pub skip_international: bool,
    pub policy: ClassificationPolicy,
    pub cache: Option<PackageCache>,
    pub terminology: &'a dyn TerminologyService,
    pub writer: ReportWriter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        terminology: &'a dyn TerminologyService,
        writer: ReportWriter,
    ) -> Self {
        Self {
            endpoint: &config.endpoint,
            options: config.valueset_binding_options.binding_options(),
            include_dependencies: config.valueset_binding_options.include_dependencies,
            skip_international: config.valueset_binding_options.skip_international_valuesets,
            policy: config.classification_policy(),
            cache: config
                .package_cache_dir()
                .filter(|dir| dir.is_dir())
                .map(PackageCache::new),
            terminology,
            writer,
        }
    }

    /// Example checks for each package, then the binding report over all of them.
    pub async fn run(&self, packages: &[ResolvedPackage]) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::default();

        for resolved in packages {
            self.check_examples(resolved, &mut summary).await?;
        }
        self.binding_report(packages, &mut summary).await?;

        Ok(summary)
    }

    async fn check_examples(
        &self,
        resolved: &ResolvedPackage,
        summary: &mut RunSummary,
    ) -> anyhow::Result<()> {
        let package = &resolved.package;
        let label = package.label();
        let ctx = CheckContext {
            options: &self.options,
            policy: &self.policy,
            terminology: self.terminology,
        };
        let mut membership = MembershipCheck::new(ctx, ProfileIndex::load(package));
        let mut membership_rows = Vec::new();
        let mut code_system_rows = Vec::new();

        let examples = package.example_files();
        tracing::info!(package = %label, examples = examples.len(), "Checking examples");

        for file in examples {
            let document = match read_json(&file) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "Skipping unreadable example");
                    continue;
                }
            };

            for check in
                check_code_systems(&document, &self.policy.excluded_code_systems, self.terminology)
                    .await
            {
                code_system_rows.push(CodeSystemRow::from_check(&file, check));
            }
            for result in membership.check_document(&document).await {
                membership_rows.push(MembershipRow::from_match(&file, result));
            }
        }

        summary.code_system_failures += code_system_rows.iter().filter(|r| r.is_failure()).count();
        summary.reports.push(
            self.writer
                .write_code_systems(&label, self.endpoint, &code_system_rows)
                .context("Failed to write CodeSystem report")?,
        );

        let membership_rows = dedup_rows(membership_rows);
        summary.membership_rows += membership_rows.len();
        summary.reports.push(
            self.writer
                .write_membership(&label, self.endpoint, membership_rows)
                .context("Failed to write membership report")?,
        );
        Ok(())
    }

    async fn binding_report(
        &self,
        packages: &[ResolvedPackage],
        summary: &mut RunSummary,
    ) -> anyhow::Result<()> {
        let mut sources: Vec<IgPackage> = packages.iter().map(|p| p.package.clone()).collect();
        if self.include_dependencies {
            if let Some(cache) = &self.cache {
                for resolved in packages {
                    for dependency in cache.dependencies_of(&resolved.package) {
                        if !sources.contains(&dependency) {
                            sources.push(dependency);
                        }
                    }
                }
            }
        }

        let mut bindings = Vec::new();
        for package in &sources {
            bindings.extend(package_bindings(package, &self.options, self.skip_international));
        }

        let local: Vec<IgPackage> = packages.iter().map(|p| p.package.clone()).collect();
        let titles = TitleCatalog::load(&local, self.cache.as_ref());
        let rows = value_set_rows(group_bindings(bindings), &titles, self.terminology).await;

        let names: Vec<String> = packages.iter().map(|p| p.config.name.clone()).collect();
        let criteria = criteria_description(&self.options, self.include_dependencies);
        let (html, tsv) = self
            .writer
            .write_bindings(&names, &rows, &criteria)
            .context("Failed to write ValueSet bindings report")?;
        summary.reports.push(html);
        summary.reports.push(tsv);
        Ok(())
    }
}
