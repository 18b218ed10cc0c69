//! Shared types and wire formats for cfpack.
//!
//! Holds the fixed platform table, the GitHub release and NuGet registry
//! response schemas, and release-tag parsing. Nothing in here performs IO.

pub mod platform;
pub mod registry;
pub mod release;
pub mod version;

// Re-exports
pub use platform::*;
pub use registry::{CatalogEntry, RegistrationIndex, RegistrationLeaf, RegistrationPage};
pub use registry::{REGISTRATIONS_BASE_URL, ServiceIndex, ServiceResource};
pub use release::GithubRelease;
pub use version::{VersionError, parse_release_tag};

/// Prefix shared by every published package identifier.
pub const PACKAGE_ID_PREFIX: &str = "CloudFoundry.CommandLine";
