//! Error types for package handling

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid structure in {path}: {reason}")]
    InvalidStructure { path: PathBuf, reason: String },

    #[error("Missing file: {0}")]
    MissingFile(PathBuf),

    #[error("Package not found in cache: {name}#{version}")]
    NotInCache { name: String, version: String },
}

pub type PackageResult<T> = Result<T, PackageError>;
