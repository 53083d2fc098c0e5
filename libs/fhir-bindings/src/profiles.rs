//! Profile resolution for example instances.

use crate::json::{as_list, resource_type, str_field};
use serde_json::Value;
use std::path::{Path, PathBuf};
use txcheck_package::{read_json, IgPackage};

/// Header fields of a StructureDefinition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub url: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub base_definition: Option<String>,
    pub path: PathBuf,
}

impl ProfileSummary {
    fn from_json(value: &Value, path: &Path) -> Option<Self> {
        if resource_type(value) != Some("StructureDefinition") {
            return None;
        }
        Some(Self {
            url: str_field(value, "url")?.to_string(),
            name: str_field(value, "name").map(str::to_string),
            title: str_field(value, "title").map(str::to_string),
            kind: str_field(value, "kind").map(str::to_string),
            base_definition: str_field(value, "baseDefinition").map(str::to_string),
            path: path.to_path_buf(),
        })
    }

    /// Title, else name, else the canonical URL.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.url)
    }

    fn constrains(&self, resource_type: &str) -> bool {
        self.kind.as_deref() == Some("resource")
            && self
                .base_definition
                .as_deref()
                .is_some_and(|base| base.contains(resource_type))
    }
}

/// StructureDefinitions of one package, scanned once in file-name order.
#[derive(Debug, Clone, Default)]
pub struct ProfileIndex {
    profiles: Vec<ProfileSummary>,
}

impl ProfileIndex {
    /// Scan every StructureDefinition file of `package`. Unreadable files are
    /// logged and skipped.
    pub fn load(package: &IgPackage) -> Self {
        Self::from_files(package.structure_definition_files())
    }

    pub fn from_files(files: impl IntoIterator<Item = PathBuf>) -> Self {
        let profiles = files
            .into_iter()
            .filter_map(|path| match read_json(&path) {
                Ok(value) => ProfileSummary::from_json(&value, &path),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable StructureDefinition");
                    None
                }
            })
            .collect();
        Self { profiles }
    }

    pub fn profiles(&self) -> &[ProfileSummary] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// First profile declaring exactly `url`.
    pub fn find(&self, url: &str) -> Option<&ProfileSummary> {
        self.profiles.iter().find(|p| p.url == url)
    }

    /// Resource profiles whose base definition mentions `resource_type`.
    pub fn for_resource_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ProfileSummary> + 'a {
        self.profiles.iter().filter(move |p| p.constrains(resource_type))
    }
}

/// Profiles an instance should be checked against.
///
/// `meta.profile` is used verbatim when it names anything; otherwise every
/// resource profile of the package built on the instance's type is inferred.
pub fn resolve_profiles(resource: &Value, index: &ProfileIndex) -> Vec<String> {
    let declared = declared_profiles(resource);
    if !declared.is_empty() {
        return declared;
    }

    let Some(resource_type) = resource_type(resource) else {
        return Vec::new();
    };
    let inferred: Vec<String> = index
        .for_resource_type(resource_type)
        .map(|p| p.url.clone())
        .collect();
    tracing::debug!(
        resource_type,
        count = inferred.len(),
        "No meta.profile, inferred profiles from resource type"
    );
    inferred
}

/// `meta.profile` as a list with empty entries dropped.
pub fn declared_profiles(resource: &Value) -> Vec<String> {
    as_list(resource.get("meta").and_then(|m| m.get("profile")))
        .into_iter()
        .filter_map(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Linear scan of a package folder for the StructureDefinition declaring `url`.
pub fn find_profile_by_url(package: &IgPackage, url: &str) -> Option<PathBuf> {
    package
        .structure_definition_files()
        .into_iter()
        .find(|path| match read_json(path) {
            Ok(value) => {
                resource_type(&value) == Some("StructureDefinition")
                    && str_field(&value, "url") == Some(url)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable StructureDefinition");
                false
            }
        })
}
