//! cfpack core library.
//!
//! Mirrors the Cloud Foundry CLI's upstream binary releases into one NuGet
//! package per platform. Every stage is a plain function over an immutable
//! [`PipelineConfig`]; [`pipeline::Pipeline`] calls them in order.
//!
//! # Stages
//!
//! 1. [`resolve`]: latest GitHub release tag → [`semver::Version`].
//! 2. [`io::download`]: per-platform archive download, skipped when the
//!    archive is already on disk.
//! 3. [`io::extract`]: zip / tar.gz extraction and binary name normalization.
//! 4. [`pack`]: one `nuget pack` per platform.
//! 5. [`registry`]: has this version already been published?
//! 6. [`publish`]: push every package, five at a time.
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── nuspec/       # Package descriptors, one per platform
//! ├── artifacts/    # Built .nupkg files (cleaned every pack run)
//! └── .tmp/
//!     ├── cf-<rid>-<version>.<zip|tgz>   # Cached upstream archives
//!     └── cli/                           # Working directory (cleaned every pack run)
//!         ├── <rid>/                     # Extracted binaries
//!         └── *.nuspec
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod pack;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod reporter;
pub mod resolve;

pub use config::PipelineConfig;
pub use error::{PipelineError, PlatformFailure, PushFailure};
pub use pack::{NugetCli, PackageTool};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for outbound HTTP requests
pub const USER_AGENT: &str = concat!("cfpack/", env!("CARGO_PKG_VERSION"));
