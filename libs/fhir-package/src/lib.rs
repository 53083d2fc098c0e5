//! On-disk FHIR NPM packages as consumed by the terminology checks.
//!
//! Provides the `package.json` manifest model, version comparison helpers,
//! the IG folder layout (`package/`, `package/example/`) and lookup of
//! dependency packages in a local package cache keyed by `name#version`.
//!
//! Packages are never downloaded here; they are expected on disk already.

pub mod cache;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod version;

pub use cache::PackageCache;
pub use error::{PackageError, PackageResult};
pub use layout::{read_json, IgPackage};
pub use manifest::PackageManifest;
pub use version::{compare_versions, parse_version, version_matches};
