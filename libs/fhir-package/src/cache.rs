//! Local FHIR package cache (`~/.fhir/packages/<name>#<version>/package/...`).

use crate::error::{PackageError, PackageResult};
use crate::layout::IgPackage;
use crate::version::{compare_versions, version_matches, BUILD_KEYWORDS};
use std::fs;
use std::path::{Path, PathBuf};

/// Read-only view over a package cache directory.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The conventional cache location shared with other FHIR tooling.
    pub fn default_location() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fhir").join("packages"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate `name#version`, falling back to the best cached version of `name`.
    ///
    /// A cached version satisfying the reference (e.g. `1.2.x`) is preferred;
    /// otherwise the highest cached version is used. Build keywords such as
    /// `current` only match their exact directory.
    pub fn locate(&self, name: &str, version: &str) -> PackageResult<IgPackage> {
        let exact = self.root.join(format!("{name}#{version}"));
        if exact.is_dir() {
            return Ok(IgPackage::new(exact));
        }

        let mut cached = self.cached_versions(name);
        cached.sort_by(|a, b| compare_versions(b, a));

        let chosen = if BUILD_KEYWORDS.contains(&version) {
            cached.iter().find(|v| v.as_str() == version)
        } else {
            cached
                .iter()
                .find(|v| version_matches(v, version))
                .or_else(|| cached.first())
        };

        match chosen {
            Some(found) => {
                if found != version {
                    tracing::info!(
                        package = name,
                        requested = version,
                        using = %found,
                        "Requested package version not cached, using closest cached version"
                    );
                }
                Ok(IgPackage::new(self.root.join(format!("{name}#{found}"))))
            }
            None => Err(PackageError::NotInCache {
                name: name.to_string(),
                version: version.to_string(),
            }),
        }
    }

    /// Versions of `name` present in the cache, unordered.
    pub fn cached_versions(&self, name: &str) -> Vec<String> {
        let prefix = format!("{name}#");
        self.entries()
            .into_iter()
            .filter_map(|(dir_name, _)| dir_name.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Every package folder in the cache, sorted by folder name.
    pub fn packages(&self) -> Vec<IgPackage> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(_, path)| IgPackage::new(path))
            .collect()
    }

    /// Resolve the manifest dependencies of `package` against the cache.
    ///
    /// Dependencies that cannot be found are logged and left out.
    pub fn dependencies_of(&self, package: &IgPackage) -> Vec<IgPackage> {
        let manifest = match package.manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(package = %package.root().display(), error = %e, "Cannot read package manifest");
                return Vec::new();
            }
        };

        manifest
            .dependencies
            .iter()
            .filter_map(|(name, version)| match self.locate(name, version) {
                Ok(dep) => Some(dep),
                Err(e) => {
                    tracing::warn!(error = %e, "Dependency package not found in cache");
                    None
                }
            })
            .collect()
    }

    fn entries(&self) -> Vec<(String, PathBuf)> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::debug!(cache = %self.root.display(), error = %e, "Package cache not readable");
                return Vec::new();
            }
        };

        read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some((name, path))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(dirs: &[&str]) -> (tempfile::TempDir, PackageCache) {
        let tmp = tempfile::tempdir().unwrap();
        for dir in dirs {
            fs::create_dir_all(tmp.path().join(dir).join("package")).unwrap();
        }
        let cache = PackageCache::new(tmp.path());
        (tmp, cache)
    }

    #[test]
    fn locate_exact_version() {
        let (_tmp, cache) = cache_with(&["hl7.fhir.au.base#4.1.0", "hl7.fhir.au.base#4.2.0"]);
        let package = cache.locate("hl7.fhir.au.base", "4.1.0").unwrap();
        assert_eq!(package.label(), "hl7.fhir.au.base#4.1.0");
    }

    #[test]
    fn locate_wildcard_picks_highest_match() {
        let (_tmp, cache) = cache_with(&[
            "hl7.fhir.au.base#4.1.0",
            "hl7.fhir.au.base#4.1.2",
            "hl7.fhir.au.base#4.2.0",
        ]);
        let package = cache.locate("hl7.fhir.au.base", "4.1.x").unwrap();
        assert_eq!(package.label(), "hl7.fhir.au.base#4.1.2");
    }

    #[test]
    fn locate_falls_back_to_highest_cached() {
        let (_tmp, cache) = cache_with(&["hl7.fhir.au.base#4.1.0", "hl7.fhir.au.base#4.2.0"]);
        let package = cache.locate("hl7.fhir.au.base", "5.0.0").unwrap();
        assert_eq!(package.label(), "hl7.fhir.au.base#4.2.0");
    }

    #[test]
    fn build_keyword_requires_exact_directory() {
        let (_tmp, cache) = cache_with(&["hl7.fhir.au.base#4.2.0"]);
        let err = cache.locate("hl7.fhir.au.base", "current").unwrap_err();
        assert!(matches!(err, PackageError::NotInCache { .. }));
    }

    #[test]
    fn dependencies_resolve_from_manifest() {
        let (tmp, cache) = cache_with(&["hl7.terminology.r4#5.3.0"]);
        let ig = tmp.path().join("my.ig#1.0.0");
        fs::create_dir_all(ig.join("package")).unwrap();
        fs::write(
            ig.join("package").join("package.json"),
            r#"{"name":"my.ig","version":"1.0.0","dependencies":{"hl7.terminology.r4":"5.3.0","missing.pkg":"1.0.0"}}"#,
        )
        .unwrap();

        let deps = cache.dependencies_of(&IgPackage::new(ig));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].label(), "hl7.terminology.r4#5.3.0");
    }
}
