//! FHIR terminology server client
//!
//! Implements [`txcheck_bindings::TerminologyService`] over the REST
//! operations of a FHIR terminology server.
//!
//! # Examples
//!
//! ```rust,no_run
//! use txcheck_terminology::{TerminologyClient, TerminologySettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TerminologyClient::new(TerminologySettings::new("https://tx.fhir.org/r4"))?;
//! if !client.capability_check().await.is_ok() {
//!     return Err("not a terminology server".into());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod response;

pub use client::{validate_code_parameters, TerminologyClient, TerminologySettings};
pub use error::{Error, Result};
pub use response::{
    capability_status, code_system_verdict, expansion_total, search_title, value_set_verdict,
    CapabilityStatus,
};
