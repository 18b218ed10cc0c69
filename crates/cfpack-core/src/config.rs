//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once per invocation and handed to every
//! stage by reference. All directories hang off a single root so tests can
//! point the whole pipeline at a temp dir.

use std::path::PathBuf;
use std::time::Duration;

use cfpack_schema::{PLATFORMS, PlatformDescriptor};
use reqwest::Client;
use semver::Version;

/// GitHub REST API base.
pub const DEFAULT_RELEASE_API: &str = "https://api.github.com";

/// Repository whose releases are mirrored.
pub const DEFAULT_UPSTREAM_REPO: &str = "cloudfoundry/cli";

/// Upstream release-distribution endpoint.
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://packages.cloudfoundry.org/stable";

/// Public NuGet feed, used both as push source and for the publication check.
pub const DEFAULT_SERVICE_INDEX: &str = "https://api.nuget.org/v3/index.json";

/// Platform whose package id is queried to decide whether a version is out.
pub const DEFAULT_CHECK_PLATFORM: &str = "linux-x64";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_mins(5);

/// Immutable settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Repository root holding `nuspec/` and receiving `artifacts/`.
    pub root_dir: PathBuf,
    /// Persistent scratch directory; cached archives live directly in here.
    pub temp_dir: PathBuf,
    /// Output directory for built packages.
    pub artifacts_dir: PathBuf,
    /// Directory holding one `.nuspec` per platform.
    pub nuspec_dir: PathBuf,
    /// GitHub API base URL.
    pub release_api_url: String,
    /// `owner/repo` of the upstream project.
    pub upstream_repo: String,
    /// Optional token for authenticated GitHub API calls.
    pub github_token: Option<String>,
    /// Base of the templated archive download URL.
    pub download_base_url: String,
    /// Service index queried by the publication check.
    pub service_index_url: String,
    /// Feed packages are pushed to.
    pub push_source: String,
    /// API key for authenticated pushes.
    pub api_key: Option<String>,
    /// Package id whose version list decides whether a version is published.
    pub check_package_id: String,
    /// Version to package instead of resolving the latest release.
    pub explicit_version: Option<String>,
    /// Platforms to package, in order.
    pub platforms: Vec<PlatformDescriptor>,
    /// How many platforms may be fetched/extracted/packed at once.
    pub jobs: usize,
    /// Treat an unreachable registry as "not yet published" instead of failing.
    pub assume_unpublished_on_error: bool,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
}

impl PipelineConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root_dir = root.into();
        let check_package_id = PlatformDescriptor::find(DEFAULT_CHECK_PLATFORM)
            .map(|p| p.package_id())
            .unwrap_or_default();

        Self {
            temp_dir: root_dir.join(".tmp"),
            artifacts_dir: root_dir.join("artifacts"),
            nuspec_dir: root_dir.join("nuspec"),
            root_dir,
            release_api_url: DEFAULT_RELEASE_API.to_string(),
            upstream_repo: DEFAULT_UPSTREAM_REPO.to_string(),
            github_token: None,
            download_base_url: DEFAULT_DOWNLOAD_BASE.to_string(),
            service_index_url: DEFAULT_SERVICE_INDEX.to_string(),
            push_source: DEFAULT_SERVICE_INDEX.to_string(),
            api_key: None,
            check_package_id,
            explicit_version: None,
            platforms: PLATFORMS.to_vec(),
            jobs: 1,
            assume_unpublished_on_error: false,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Override the scratch directory holding cached archives.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Override where built packages are written.
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Override where package descriptors are read from.
    pub fn with_nuspec_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.nuspec_dir = dir.into();
        self
    }

    /// Point release lookups at another GitHub API base.
    pub fn with_release_api_url(mut self, url: impl Into<String>) -> Self {
        self.release_api_url = url.into();
        self
    }

    /// Authenticate release lookups. Empty tokens are ignored.
    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Point archive downloads at another base URL.
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        self.download_base_url = url.into();
        self
    }

    /// Service index queried by the publication check.
    pub fn with_service_index_url(mut self, url: impl Into<String>) -> Self {
        self.service_index_url = url.into();
        self
    }

    /// Feed packages are pushed to.
    pub fn with_push_source(mut self, source: impl Into<String>) -> Self {
        self.push_source = source.into();
        self
    }

    /// API key for pushes. Empty keys are ignored.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Package this version instead of the latest release.
    pub fn with_explicit_version(mut self, version: Option<String>) -> Self {
        self.explicit_version = version;
        self
    }

    /// Restrict the run to `platforms`. An empty list keeps the full set.
    pub fn with_platforms(mut self, platforms: Vec<PlatformDescriptor>) -> Self {
        if !platforms.is_empty() {
            self.platforms = platforms;
        }
        self
    }

    /// Platforms processed at once, at least one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Treat an unreachable feed as "not published".
    pub fn with_assume_unpublished_on_error(mut self, assume: bool) -> Self {
        self.assume_unpublished_on_error = assume;
        self
    }

    /// Per-request HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Working directory: `<temp>/cli`. Cleaned at the start of every pack run.
    pub fn working_dir(&self) -> PathBuf {
        self.temp_dir.join("cli")
    }

    /// Extraction directory for one platform: `<working>/<rid>`.
    pub fn platform_dir(&self, platform: &PlatformDescriptor) -> PathBuf {
        self.working_dir().join(platform.platform_id)
    }

    /// Cache location of a platform's upstream archive for `version`.
    pub fn archive_path(&self, platform: &PlatformDescriptor, version: &Version) -> PathBuf {
        self.temp_dir.join(platform.archive_file_name(version))
    }

    /// Package built for a platform at `version`: `<artifacts>/<id>.<version>.nupkg`.
    pub fn artifact_path(&self, platform: &PlatformDescriptor, version: &Version) -> PathBuf {
        self.artifacts_dir.join(platform.package_file_name(version))
    }

    /// Source descriptor for a platform: `<nuspec_dir>/<package id>.nuspec`.
    pub fn nuspec_path(&self, platform: &PlatformDescriptor) -> PathBuf {
        self.nuspec_dir.join(platform.nuspec_file_name())
    }

    /// Build the HTTP client shared by every stage of a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> reqwest::Result<Client> {
        Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(self.http_timeout)
            .build()
    }
}
