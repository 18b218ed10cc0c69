//! Stage orchestration.
//!
//! [`Pipeline`] owns nothing but the shared HTTP client; configuration, the
//! packaging tool and the reporter are borrowed for the length of a run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use cfpack_schema::PlatformDescriptor;
use futures::StreamExt;
use reqwest::Client;
use semver::Version;
use tracing::{debug, info, warn};

use crate::io::download::fetch_archive;
use crate::io::extract::extract;
use crate::pack::build_package;
use crate::publish::{collect_artifacts, publish_all};
use crate::registry::RegistryClient;
use crate::{PackageTool, PipelineConfig, PipelineError, PlatformFailure, Reporter, resolve};

/// Result of a successful pack run.
#[derive(Debug, Clone)]
pub struct PackOutcome {
    /// Version that was packaged.
    pub version: Version,
    /// One package per configured platform, in platform order.
    pub artifacts: Vec<PathBuf>,
}

/// Result of a successful push run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The feed already has this version; nothing was pushed.
    AlreadyPublished(Version),
    /// Dry run: these artifacts would have been pushed.
    DryRun {
        /// Resolved version.
        version: Version,
        /// Packages that were found.
        artifacts: Vec<PathBuf>,
    },
    /// Every artifact was accepted by the feed.
    Pushed {
        /// Resolved version.
        version: Version,
        /// Packages the feed accepted.
        artifacts: Vec<PathBuf>,
    },
}

/// One run of the mirroring pipeline.
pub struct Pipeline<'a, T: ?Sized, R: ?Sized> {
    config: &'a PipelineConfig,
    client: Client,
    tool: &'a T,
    reporter: &'a R,
}

impl<T: ?Sized, R: ?Sized> std::fmt::Debug for Pipeline<'_, T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, T, R> Pipeline<'a, T, R>
where
    T: PackageTool + ?Sized,
    R: Reporter + ?Sized,
{
    /// Create a pipeline with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &'a PipelineConfig, tool: &'a T, reporter: &'a R) -> reqwest::Result<Self> {
        Ok(Self::with_client(config.http_client()?, config, tool, reporter))
    }

    /// Create a pipeline around an existing client.
    pub fn with_client(
        client: Client,
        config: &'a PipelineConfig,
        tool: &'a T,
        reporter: &'a R,
    ) -> Self {
        Self {
            config,
            client,
            tool,
            reporter,
        }
    }

    /// Configuration this run was created with.
    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Version to package: explicit if configured, else the latest release.
    ///
    /// # Errors
    ///
    /// See [`resolve::resolve_version`].
    pub async fn resolve_version(&self) -> Result<Version, PipelineError> {
        resolve::resolve_version(&self.client, self.config).await
    }

    /// Delete and recreate the working and artifacts directories.
    ///
    /// Cached archives in the temp directory are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if a directory cannot be removed or created.
    pub async fn prepare_directories(&self) -> Result<(), PipelineError> {
        for dir in [self.config.working_dir(), self.config.artifacts_dir.clone()] {
            clean_dir(&dir).await?;
        }
        Ok(())
    }

    /// Fetch, extract and package a single platform.
    ///
    /// # Errors
    ///
    /// Returns the first stage error for this platform.
    pub async fn package_platform(
        &self,
        platform: &PlatformDescriptor,
        version: &Version,
    ) -> Result<PathBuf, PipelineError> {
        let archive = fetch_archive(&self.client, self.config, platform, version, self.reporter).await?;

        let dest = self.config.platform_dir(platform);
        let descriptor = *platform;
        let binary = tokio::task::spawn_blocking(move || extract(&archive, &descriptor, &dest))
            .await
            .map_err(|e| PipelineError::Archive(format!("extraction task failed: {e}")))??;
        debug!(platform = platform.platform_id, binary = %binary.display(), "binary ready");

        build_package(self.tool, self.config, platform, version).await
    }

    /// Resolve the version and build one package per configured platform.
    ///
    /// Every platform is attempted even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns version resolution and directory errors directly, and
    /// [`PipelineError::Incomplete`] listing every platform that failed.
    pub async fn pack(&self) -> Result<PackOutcome, PipelineError> {
        let started = Instant::now();
        let version = self.resolve_version().await?;
        self.reporter
            .section(&format!("Packaging Cloud Foundry CLI {version}"));
        self.prepare_directories().await?;

        let version_ref = &version;
        let mut results = futures::stream::iter(&self.config.platforms)
            .map(|platform| async move {
                (platform, self.package_platform(platform, version_ref).await)
            })
            .buffered(self.config.jobs.max(1));

        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        while let Some((platform, result)) = results.next().await {
            match result {
                Ok(artifact) => {
                    self.reporter.done(platform.platform_id, &file_name(&artifact));
                    artifacts.push(artifact);
                }
                Err(error) => {
                    warn!(platform = platform.platform_id, %error, "platform failed");
                    self.reporter.failed(platform.platform_id, &error.to_string());
                    failures.push(PlatformFailure {
                        platform: platform.platform_id.to_string(),
                        error,
                    });
                }
            }
        }
        // Releases the borrow of `version` held by the stream.
        drop(results);

        if !failures.is_empty() {
            return Err(PipelineError::Incomplete(failures));
        }

        info!(%version, count = artifacts.len(), "packaging complete");
        self.reporter
            .summary(artifacts.len(), "packaged", started.elapsed().as_secs_f64());
        Ok(PackOutcome { version, artifacts })
    }

    /// Whether `version` is already on the feed.
    ///
    /// # Errors
    ///
    /// See [`check_published`].
    pub async fn check_published(&self, version: &Version) -> Result<bool, PipelineError> {
        check_published(&self.client, self.config, version, self.reporter).await
    }

    /// Push each configured platform's package for the resolved version unless
    /// that version is already published.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoArtifacts`] or
    /// [`PipelineError::MissingArtifacts`] if expected packages are absent,
    /// [`PipelineError::PushFailed`] if any push failed, plus resolution and
    /// registry errors.
    pub async fn push(&self, dry_run: bool) -> Result<PushOutcome, PipelineError> {
        let version = self.resolve_version().await?;
        self.push_version(version, dry_run).await
    }

    /// Pack every platform, then push unless the version is already published.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::pack`] and [`Pipeline::push`].
    pub async fn release(&self, dry_run: bool) -> Result<PushOutcome, PipelineError> {
        let packed = self.pack().await?;
        self.push_version(packed.version, dry_run).await
    }

    async fn push_version(&self, version: Version, dry_run: bool) -> Result<PushOutcome, PipelineError> {
        let started = Instant::now();
        self.reporter.section(&format!("Publishing {version}"));

        if self.check_published(&version).await? {
            info!(%version, "already published, skipping push");
            self.reporter
                .info(&format!("{version} is already published to {}", self.config.push_source));
            return Ok(PushOutcome::AlreadyPublished(version));
        }

        let artifacts = collect_artifacts(self.config, &version).await?;
        if dry_run {
            for artifact in &artifacts {
                self.reporter.done(&file_name(artifact), "would push");
            }
            return Ok(PushOutcome::DryRun { version, artifacts });
        }

        let report = publish_all(
            self.tool,
            &artifacts,
            &self.config.push_source,
            self.config.api_key.as_deref(),
            self.reporter,
        )
        .await;
        let pushed = report.into_result()?;

        self.reporter
            .summary(pushed.len(), "pushed", started.elapsed().as_secs_f64());
        Ok(PushOutcome::Pushed {
            version,
            artifacts: pushed,
        })
    }
}

/// Whether `version` is already on the configured feed.
///
/// # Errors
///
/// Returns [`PipelineError::RegistryUnavailable`] when the feed cannot be
/// queried, unless the configuration assumes "not published" instead.
pub async fn check_published<R: Reporter + ?Sized>(
    client: &Client,
    config: &PipelineConfig,
    version: &Version,
    reporter: &R,
) -> Result<bool, PipelineError> {
    let registry = RegistryClient::new(client.clone(), &config.service_index_url);
    match registry
        .is_version_published(&config.check_package_id, version)
        .await
    {
        Ok(published) => Ok(published),
        Err(e) if config.assume_unpublished_on_error && e.is_registry_unavailable() => {
            warn!(error = %e, "registry unavailable, assuming not published");
            reporter.warning(&format!("{e}; assuming {version} is not published"));
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn clean_dir(dir: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
