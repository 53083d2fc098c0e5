//! Run configuration.
//!
//! Read from a JSON file and layered with `TXCHECK_*` environment variables
//! (`__` separates nested keys, `_` stands for `-` within a key, e.g.
//! `TXCHECK_VALUESET_BINDING_OPTIONS__REQUIRE_MUST_SUPPORT=false`).
//! Every section except `endpoint` is optional.

use config::{Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use txcheck_bindings::{
    BindingOptions, ClassificationPolicy, ExclusionEntry, ExclusionList, NotApplicableMarkers,
    Strength,
};
use txcheck_terminology::TerminologySettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Terminology server base URL.
    pub endpoint: String,

    #[serde(default = "default_fhir_version")]
    pub fhir_version: String,

    /// Defaults to `~/.fhir/packages`.
    #[serde(default)]
    pub fhir_package_cache: Option<PathBuf>,

    #[serde(default)]
    pub packages: Vec<PackageConfig>,

    #[serde(default)]
    pub valueset_binding_options: BindingOptionsConfig,

    #[serde(default)]
    pub valueset_excluded: Vec<ExclusionEntry>,

    #[serde(default)]
    pub codesystem_excluded: Vec<ExclusionEntry>,

    #[serde(default)]
    pub not_applicable_policy: NotApplicableMarkers,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// An IG package to check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Package folder; when absent the package is looked up in the cache.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BindingOptionsConfig {
    pub require_must_support: bool,
    pub minimum_binding_strength: Vec<Strength>,
    /// Also report bindings of the packages' dependencies.
    pub include_dependencies: bool,
    /// Leave international HL7 ValueSets out of the binding report when
    /// must-support is not required.
    pub skip_international_valuesets: bool,
}

impl Default for BindingOptionsConfig {
    fn default() -> Self {
        let options = BindingOptions::default();
        Self {
            require_must_support: options.require_must_support,
            minimum_binding_strength: options.minimum_strengths.into_iter().collect(),
            include_dependencies: false,
            skip_international_valuesets: false,
        }
    }
}

impl BindingOptionsConfig {
    pub fn binding_options(&self) -> BindingOptions {
        BindingOptions {
            require_must_support: self.require_must_support,
            minimum_strengths: self.minimum_binding_strength.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    pub validate_seconds: u64,
    pub lookup_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            validate_seconds: 30,
            lookup_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// `daily`, `hourly`, `minutely` or `never`.
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: true,
            file_directory: "logs".to_string(),
            file_prefix: "ig-tx-check".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
    #[error("minimum-binding-strength must name at least one strength")]
    NoStrengths,
    #[error("timeouts must be greater than zero")]
    ZeroTimeout,
    #[error("package entry {0} needs both a name and a version")]
    IncompletePackage(usize),
}

fn default_fhir_version() -> String {
    "4.0.1".to_string()
}

const ENV_PREFIX: &str = "TXCHECK";

/// Map `TXCHECK_*` variable names onto the kebab-case keys: `_` inside a key
/// becomes `-`, `__` still separates nested keys.
fn kebab_env(vars: impl IntoIterator<Item = (String, String)>) -> config::Map<String, String> {
    let prefix = format!("{ENV_PREFIX}_");
    vars.into_iter()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(&prefix)?;
            let nested: Vec<String> = rest.split("__").map(|part| part.replace('_', "-")).collect();
            Some((format!("{prefix}{}", nested.join("__")), value))
        })
        .collect()
}

impl Config {
    /// Load `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load_from(path, std::env::vars(), None)
    }

    /// Like [`Config::load`] with a log level taking precedence over both sources.
    pub fn load_with_log_level(
        path: &Path,
        log_level: Option<&str>,
    ) -> Result<Self, config::ConfigError> {
        Self::load_from(path, std::env::vars(), log_level)
    }

    fn load_from(
        path: &Path,
        vars: impl IntoIterator<Item = (String, String)>,
        log_level: Option<&str>,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(kebab_env(vars))),
            )
            .set_override_option("logging.level", log_level)?
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.endpoint.trim().is_empty() {
            return Err(InvalidConfig::EmptyEndpoint);
        }
        if self
            .valueset_binding_options
            .minimum_binding_strength
            .is_empty()
        {
            return Err(InvalidConfig::NoStrengths);
        }
        if self.timeouts.validate_seconds == 0 || self.timeouts.lookup_seconds == 0 {
            return Err(InvalidConfig::ZeroTimeout);
        }
        if let Some(index) = self
            .packages
            .iter()
            .position(|p| p.name.trim().is_empty() || p.version.trim().is_empty())
        {
            return Err(InvalidConfig::IncompletePackage(index));
        }
        Ok(())
    }

    pub fn package_cache_dir(&self) -> Option<PathBuf> {
        self.fhir_package_cache
            .clone()
            .or_else(txcheck_package::PackageCache::default_location)
    }

    pub fn terminology_settings(&self) -> TerminologySettings {
        TerminologySettings {
            endpoint: self.endpoint.clone(),
            fhir_version: self.fhir_version.clone(),
            validate_timeout: Duration::from_secs(self.timeouts.validate_seconds),
            lookup_timeout: Duration::from_secs(self.timeouts.lookup_seconds),
        }
    }

    pub fn classification_policy(&self) -> ClassificationPolicy {
        ClassificationPolicy {
            excluded_value_sets: ExclusionList::new(self.valueset_excluded.iter().cloned()),
            excluded_code_systems: ExclusionList::new(self.codesystem_excluded.iter().cloned()),
            not_applicable: self.not_applicable_policy.clone(),
        }
    }
}
