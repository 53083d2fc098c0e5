//! Terminology binding checks for FHIR Implementation Guide examples.
//!
//! Bindings are extracted from a package's StructureDefinitions, codings are
//! collected from example instances, and each coding is matched to the most
//! specific binding of the instance's profiles before being classified:
//!
//! ```text
//! example ──► profiles ──► BindingMap (normalized path → bindings)
//!    │                          │
//!    └──► codings (path) ──► best_binding_paths ──► classify ──► MatchResult
//! ```
//!
//! Remote terminology calls go through the [`TerminologyService`] trait; this
//! crate performs no network I/O itself.

pub mod check;
pub mod collect;
pub mod extract;
mod json;
pub mod matcher;
pub mod model;
pub mod path;
pub mod policy;
pub mod profiles;
pub mod service;

pub use check::{check_code_systems, CheckContext, MembershipCheck, SystemCheck, SystemCheckResult};
pub use collect::{as_coding, collect_codings, instances};
pub use extract::{extract_bindings, extract_profile, extract_profile_file, BindingOptions, View};
pub use matcher::best_binding_paths;
pub use model::{
    Binding, BindingMap, Classification, Coding, FoundCoding, MatchResult, Outcome, Strength,
};
pub use path::{clean, normalize, without_first_coding_hop};
pub use policy::{ClassificationPolicy, ExclusionEntry, ExclusionList, NotApplicableMarkers};
pub use profiles::{find_profile_by_url, resolve_profiles, ProfileIndex, ProfileSummary};
pub use service::{MembershipVerdict, TerminologyService};
