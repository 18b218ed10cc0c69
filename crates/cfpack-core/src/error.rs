//! Domain-specific errors for pipeline stages

use std::path::PathBuf;

use cfpack_schema::VersionError;
use thiserror::Error;

/// Everything that can stop a resolve, pack or push run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The release index could not be queried or returned no usable release.
    #[error("Upstream release index unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A release tag or explicit version is not valid semver.
    #[error("Malformed version '{tag}': {source}")]
    MalformedVersion {
        /// Text that failed to parse.
        tag: String,
        /// Underlying parse failure.
        #[source]
        source: VersionError,
    },

    /// An archive download ended in a transport error or bad status.
    #[error("Download of {url} failed: {reason}")]
    DownloadFailed {
        /// Requested URL.
        url: String,
        /// Transport error or HTTP status.
        reason: String,
    },

    /// No file in the extraction directory matched the binary pattern.
    #[error("Binary '{}' not found in {}", .expected, .dir.display())]
    BinaryNotFound {
        /// Final binary name the platform expects.
        expected: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// More than one file matched the binary pattern.
    #[error("Ambiguous binary in {}: {}", .dir.display(), .candidates.join(", "))]
    AmbiguousBinary {
        /// Directory that was searched.
        dir: PathBuf,
        /// Every matching file name.
        candidates: Vec<String>,
    },

    /// The packaging tool failed or produced no package.
    #[error("Packaging {platform} failed: {reason}")]
    PackagingFailed {
        /// Platform identifier.
        platform: String,
        /// Tool output or failure description.
        reason: String,
    },

    /// The package registry could not be queried.
    #[error("Package registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// At least one push was rejected.
    #[error("{} of {} pushes failed", .failures.len(), .attempted)]
    PushFailed {
        /// Rejected artifacts with reasons.
        failures: Vec<PushFailure>,
        /// Number of pushes attempted.
        attempted: usize,
    },

    /// None of the expected packages exist in the artifacts directory.
    #[error("No packages to push in {}", .0.display())]
    NoArtifacts(PathBuf),

    /// Some, but not all, expected packages exist.
    #[error("Missing packages: {}", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    MissingArtifacts(Vec<PathBuf>),

    /// One or more platforms failed during a pack run.
    #[error("{} platform(s) failed to package", .0.len())]
    Incomplete(Vec<PlatformFailure>),

    /// An archive was corrupt or held an entry that cannot be extracted.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One artifact that could not be pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    /// Package file that was pushed.
    pub artifact: PathBuf,
    /// Tool output or failure description.
    pub reason: String,
}

impl std::fmt::Display for PushFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.artifact.display(), self.reason)
    }
}

/// One platform whose fetch, extraction or packaging failed.
#[derive(Debug)]
pub struct PlatformFailure {
    /// Platform identifier.
    pub platform: String,
    /// What went wrong.
    pub error: PipelineError,
}

impl std::fmt::Display for PlatformFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.platform, self.error)
    }
}

impl PipelineError {
    /// Wrap a version parse failure with the offending tag.
    pub fn malformed(tag: impl Into<String>, source: VersionError) -> Self {
        Self::MalformedVersion {
            tag: tag.into(),
            source,
        }
    }

    /// Build a [`PipelineError::DownloadFailed`].
    pub fn download(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`PipelineError::PackagingFailed`].
    pub fn packaging(platform: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::PackagingFailed {
            platform: platform.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the registry query.
    pub fn is_registry_unavailable(&self) -> bool {
        matches!(self, Self::RegistryUnavailable(_))
    }
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}
