//! ValueSet title lookup.

use serde_json::Value;
use std::collections::HashMap;
use txcheck_bindings::{clean, TerminologyService};
use txcheck_package::{read_json, IgPackage, PackageCache};

/// Titles of the ValueSets available on disk, keyed by canonical URL.
///
/// Local packages are indexed before the package cache, so a ValueSet shipped
/// with the IG wins over a cached copy of the same URL.
#[derive(Debug, Clone, Default)]
pub struct TitleCatalog {
    titles: HashMap<String, String>,
}

impl TitleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(packages: &[IgPackage], cache: Option<&PackageCache>) -> Self {
        let mut catalog = Self::new();
        for package in packages {
            catalog.index_package(package);
        }
        if let Some(cache) = cache {
            for package in cache.packages() {
                catalog.index_package(&package);
            }
        }
        tracing::debug!(count = catalog.len(), "Indexed ValueSet titles");
        catalog
    }

    fn index_package(&mut self, package: &IgPackage) {
        for path in package.value_set_files() {
            let value = match read_json(&path) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping ValueSet file");
                    continue;
                }
            };
            if let Some((url, title)) = value_set_title(&value) {
                self.insert(url, title);
            }
        }
    }

    /// Record a title unless the URL already has one.
    pub fn insert(&mut self, url: impl Into<String>, title: impl Into<String>) {
        self.titles.entry(url.into()).or_insert_with(|| title.into());
    }

    /// Title known on disk for `url`, matching versioned or unversioned.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.titles
            .get(url)
            .or_else(|| self.titles.get(clean(url)))
            .map(String::as_str)
    }

    /// Title from disk, else from the terminology server, else the last URL
    /// segment. Always without a `|version` suffix.
    pub async fn resolve<T>(&self, url: &str, terminology: &T) -> String
    where
        T: TerminologyService + ?Sized,
    {
        if let Some(title) = self.get(url) {
            return clean(title).to_string();
        }
        if let Some(title) = terminology.value_set_title(url).await {
            return clean(&title).to_string();
        }
        tracing::warn!(value_set = url, "No title found for ValueSet, using its id");
        clean(last_segment(url)).to_string()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

fn value_set_title(value: &Value) -> Option<(String, String)> {
    if value.get("resourceType").and_then(Value::as_str) != Some("ValueSet") {
        return None;
    }
    let url = value.get("url").and_then(Value::as_str)?;
    let title = ["title", "name"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })?;
    Some((url.to_string(), title.to_string()))
}

pub(crate) fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
