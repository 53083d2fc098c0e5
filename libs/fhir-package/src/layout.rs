//! IG package folder layout.
//!
//! A package root holds a `package/` folder with the conformance resources
//! (`StructureDefinition-*.json`, `ValueSet-*.json`, `package.json`) and an
//! `example/` subfolder with instance JSON files. Loose folders without the
//! `package/` level are accepted as well; their files are read from the root.

use crate::error::{PackageError, PackageResult};
use crate::manifest::PackageManifest;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXAMPLE_DIRS: &[&str] = &["example", "examples"];

/// A package on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgPackage {
    root: PathBuf,
}

impl IgPackage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder name of the package root, used to keep per-package report files apart.
    pub fn label(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.to_string_lossy().into_owned())
    }

    /// `<root>/package` when present, otherwise the root itself.
    pub fn content_dir(&self) -> PathBuf {
        let nested = self.root.join("package");
        if nested.is_dir() {
            nested
        } else {
            self.root.clone()
        }
    }

    pub fn manifest(&self) -> PackageResult<PackageManifest> {
        let path = self.content_dir().join("package.json");
        if !path.is_file() {
            return Err(PackageError::MissingFile(path));
        }
        let value = read_json(&path)?;
        serde_json::from_value(value).map_err(|source| PackageError::Json { path, source })
    }

    /// Every `StructureDefinition*.json` below the content folder, in a stable order.
    pub fn structure_definition_files(&self) -> Vec<PathBuf> {
        prefixed_json_files(&self.content_dir(), "StructureDefinition")
    }

    /// Every `ValueSet*.json` below the content folder, in a stable order.
    pub fn value_set_files(&self) -> Vec<PathBuf> {
        prefixed_json_files(&self.content_dir(), "ValueSet")
    }

    /// Instance files directly inside the example folder(s).
    pub fn example_files(&self) -> Vec<PathBuf> {
        let content = self.content_dir();
        EXAMPLE_DIRS
            .iter()
            .map(|dir| content.join(dir))
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| {
                WalkDir::new(dir)
                    .min_depth(1)
                    .max_depth(1)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file() && has_json_extension(e.path()))
                    .map(|e| e.into_path())
            })
            .collect()
    }
}

/// Read a JSON file, tolerating a UTF-8 byte order mark and stray control characters.
pub fn read_json(path: &Path) -> PackageResult<Value> {
    let bytes = fs::read(path).map_err(|source| PackageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = clean_bytes(path, &bytes)?;
    serde_json::from_str(&content).map_err(|source| PackageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn clean_bytes(path: &Path, bytes: &[u8]) -> PackageResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let content =
        std::str::from_utf8(bytes).map_err(|e| PackageError::InvalidStructure {
            path: path.to_path_buf(),
            reason: format!("invalid UTF-8: {e}"),
        })?;

    Ok(content
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\x7F'))
        .collect::<String>()
        .trim()
        .to_string())
}

fn prefixed_json_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_json_extension(e.path()))
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .map(|e| e.into_path())
        .collect()
}

fn has_json_extension(path: &Path) -> bool {
    path.extension() == Some("json".as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn read_json_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ValueSet-a.json");
        fs::write(&path, b"\xEF\xBB\xBF{\"resourceType\":\"ValueSet\"}").unwrap();

        let value = read_json(&path).unwrap();
        assert_eq!(value["resourceType"], "ValueSet");
    }

    #[test]
    fn read_json_reports_path_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, PackageError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn lists_files_from_nested_package_folder() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("package");
        write(&content.join("StructureDefinition-b.json"), "{}");
        write(&content.join("StructureDefinition-a.json"), "{}");
        write(&content.join("ValueSet-x.json"), "{}");
        write(&content.join("package.json"), "{}");
        write(&content.join("example").join("Patient-1.json"), "{}");
        write(&content.join("example").join("notes.txt"), "");

        let package = IgPackage::new(dir.path());
        assert_eq!(package.content_dir(), content);

        let sds = package.structure_definition_files();
        assert_eq!(sds.len(), 2);
        assert!(sds[0].ends_with("StructureDefinition-a.json"));
        assert_eq!(package.value_set_files().len(), 1);
        assert_eq!(package.example_files().len(), 1);
    }

    #[test]
    fn loose_folder_is_its_own_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("StructureDefinition-p.json"), "{}");

        let package = IgPackage::new(dir.path());
        assert_eq!(package.content_dir(), dir.path());
        assert_eq!(package.structure_definition_files().len(), 1);
        assert!(package.example_files().is_empty());
    }
}
