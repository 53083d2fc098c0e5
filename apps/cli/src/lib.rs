//! `ig-tx-check`: terminology checks for FHIR Implementation Guide packages.
//!
//! For every configured package the example instances are checked against
//! the terminology server twice (ValueSet membership through the bindings of
//! their profiles, and plain CodeSystem validity), and one binding report is
//! written for all packages together.

pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{resolve_packages, Pipeline, ResolvedPackage, RunSummary};
