//! Upstream version resolution.
//!
//! The latest release is read from the GitHub releases API. A version given
//! explicitly by the caller always wins and never touches the network.

use cfpack_schema::{GithubRelease, parse_release_tag};
use reqwest::Client;
use reqwest::header::ACCEPT;
use semver::Version;
use tracing::{debug, info};

use crate::{PipelineConfig, PipelineError};

/// Resolve the version to package: the explicit one if configured, otherwise
/// the latest upstream release.
///
/// # Errors
///
/// See [`resolve_latest_version`] and [`parse_explicit_version`].
pub async fn resolve_version(
    client: &Client,
    config: &PipelineConfig,
) -> Result<Version, PipelineError> {
    if let Some(explicit) = &config.explicit_version {
        let version = parse_explicit_version(explicit)?;
        info!(%version, "using explicit version, skipping release lookup");
        return Ok(version);
    }
    resolve_latest_version(client, config).await
}

/// Parse a caller-supplied version with the same prefix rule as release tags.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedVersion`] if `text` is not a version.
pub fn parse_explicit_version(text: &str) -> Result<Version, PipelineError> {
    parse_release_tag(text).map_err(|e| PipelineError::malformed(text, e))
}

/// Query the upstream project's latest release and parse its tag.
///
/// # Errors
///
/// Returns [`PipelineError::UpstreamUnavailable`] if the API cannot be
/// reached, answers with a non-success status, or reports a release without
/// a tag, and [`PipelineError::MalformedVersion`] if the tag is not semver.
pub async fn resolve_latest_version(
    client: &Client,
    config: &PipelineConfig,
) -> Result<Version, PipelineError> {
    let url = format!(
        "{}/repos/{}/releases/latest",
        config.release_api_url.trim_end_matches('/'),
        config.upstream_repo
    );
    debug!(%url, "querying latest release");

    let mut request = client.get(&url).header(ACCEPT, "application/vnd.github+json");
    if let Some(token) = &config.github_token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(PipelineError::UpstreamUnavailable(format!(
            "GitHub API error for {}: HTTP {}",
            config.upstream_repo,
            response.status()
        )));
    }

    let release: GithubRelease = response
        .json()
        .await
        .map_err(|e| PipelineError::UpstreamUnavailable(format!("invalid release JSON: {e}")))?;

    // Some releases are only titled; fall back to the name when the tag is blank.
    let tag = Some(release.tag_name.as_str())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| release.name.as_deref().filter(|n| !n.trim().is_empty()))
        .ok_or_else(|| {
            PipelineError::UpstreamUnavailable(format!(
                "latest release of {} has no tag",
                config.upstream_repo
            ))
        })?;

    let version = parse_release_tag(tag).map_err(|e| PipelineError::malformed(tag, e))?;
    info!(tag, %version, "resolved latest upstream release");
    Ok(version)
}
