//! Pushing built packages to the feed.
//!
//! Every artifact is pushed exactly once, at most [`PUSH_CONCURRENCY`] at a
//! time. A failed push never cancels the others; failures are collected and
//! reported together once every push has finished.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use semver::Version;
use tracing::{info, warn};

use crate::{PackageTool, PipelineConfig, PipelineError, PushFailure, Reporter};

/// Maximum number of pushes in flight.
pub const PUSH_CONCURRENCY: usize = 5;

/// Outcome of pushing a batch of artifacts.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Artifacts the feed accepted, in completion order.
    pub pushed: Vec<PathBuf>,
    /// Artifacts the feed rejected or that could not be sent.
    pub failures: Vec<PushFailure>,
}

impl PublishReport {
    /// Number of pushes attempted.
    pub fn attempted(&self) -> usize {
        self.pushed.len() + self.failures.len()
    }

    /// `Ok` with the pushed artifacts if nothing failed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PushFailed`] carrying every failure.
    pub fn into_result(self) -> Result<Vec<PathBuf>, PipelineError> {
        if self.failures.is_empty() {
            Ok(self.pushed)
        } else {
            let attempted = self.attempted();
            Err(PipelineError::PushFailed {
                failures: self.failures,
                attempted,
            })
        }
    }
}

/// The package each configured platform should have produced for `version`,
/// in platform order.
///
/// Anything else in the artifacts directory is ignored.
///
/// # Errors
///
/// Returns [`PipelineError::NoArtifacts`] if none of the packages exist and
/// [`PipelineError::MissingArtifacts`] if only some do.
pub async fn collect_artifacts(
    config: &PipelineConfig,
    version: &Version,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut present = Vec::with_capacity(config.platforms.len());
    let mut missing = Vec::new();
    for platform in &config.platforms {
        let artifact = config.artifact_path(platform, version);
        if tokio::fs::try_exists(&artifact).await? {
            present.push(artifact);
        } else {
            missing.push(artifact);
        }
    }

    if present.is_empty() {
        return Err(PipelineError::NoArtifacts(config.artifacts_dir.clone()));
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingArtifacts(missing));
    }
    Ok(present)
}

/// Push every artifact to `source`.
pub async fn publish_all<T, R>(
    tool: &T,
    artifacts: &[PathBuf],
    source: &str,
    api_key: Option<&str>,
    reporter: &R,
) -> PublishReport
where
    T: PackageTool + ?Sized,
    R: Reporter + ?Sized,
{
    let mut stream = futures::stream::iter(artifacts)
        .map(|artifact| async move {
            let result = tool.push(artifact, source, api_key).await;
            (artifact, result)
        })
        .buffer_unordered(PUSH_CONCURRENCY);

    let mut report = PublishReport::default();
    while let Some((artifact, result)) = stream.next().await {
        let name = artifact_name(artifact);
        match result {
            Ok(()) => {
                info!(artifact = %artifact.display(), "pushed");
                reporter.done(&name, "pushed");
                report.pushed.push(artifact.clone());
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(artifact = %artifact.display(), %reason, "push failed");
                reporter.failed(&name, &reason);
                report.failures.push(PushFailure {
                    artifact: artifact.clone(),
                    reason,
                });
            }
        }
    }
    report
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
