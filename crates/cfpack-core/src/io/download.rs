//! Upstream archive download.
//!
//! Each platform's archive is cached under a path derived from its platform
//! id and the version. An existing file is the only idempotence marker: when
//! it is present the download is skipped outright. Bytes are streamed into a
//! `.part` sibling and renamed into place once complete, so a failed
//! transfer never leaves a marker behind.

use std::path::{Path, PathBuf};

use cfpack_schema::PlatformDescriptor;
use futures::StreamExt;
use reqwest::{Client, Url};
use semver::Version;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{PipelineConfig, PipelineError, Reporter};

/// Build `{base}?release={channel}&version={version}` for a platform.
///
/// # Errors
///
/// Returns [`PipelineError::DownloadFailed`] if `base` is not a valid URL.
pub fn download_url(
    base: &str,
    platform: &PlatformDescriptor,
    version: &Version,
) -> Result<Url, PipelineError> {
    let version = version.to_string();
    Url::parse_with_params(
        base,
        &[
            ("release", platform.release_channel),
            ("version", version.as_str()),
        ],
    )
    .map_err(|e| PipelineError::download(base, format!("invalid download URL: {e}")))
}

/// Ensure the archive for `platform` at `version` is on disk and return its path.
///
/// Performs no network call when the archive already exists.
///
/// # Errors
///
/// Returns [`PipelineError::DownloadFailed`] on a network error or a
/// non-success status, and [`PipelineError::Io`] if the file cannot be written.
pub async fn fetch_archive<R: Reporter + ?Sized>(
    client: &Client,
    config: &PipelineConfig,
    platform: &PlatformDescriptor,
    version: &Version,
    reporter: &R,
) -> Result<PathBuf, PipelineError> {
    let dest = config.archive_path(platform, version);
    if tokio::fs::try_exists(&dest).await? {
        debug!(path = %dest.display(), "archive already present, skipping download");
        reporter.info(&format!("{platform}: using cached {}", display_name(&dest)));
        return Ok(dest);
    }

    let url = download_url(&config.download_base_url, platform, version)?;
    tokio::fs::create_dir_all(&config.temp_dir).await?;
    let partial = config
        .temp_dir
        .join(format!("{}.part", platform.archive_file_name(version)));

    match stream_to_file(client, &url, &partial, platform.platform_id, reporter).await {
        Ok(size) => {
            tokio::fs::rename(&partial, &dest).await?;
            info!(%url, path = %dest.display(), size, "downloaded archive");
            Ok(dest)
        }
        Err(e) => {
            tokio::fs::remove_file(&partial).await.ok();
            Err(e)
        }
    }
}

/// Stream a GET response body into `dest`, returning the byte count.
async fn stream_to_file<R: Reporter + ?Sized>(
    client: &Client,
    url: &Url,
    dest: &Path,
    platform_id: &str,
    reporter: &R,
) -> Result<u64, PipelineError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| PipelineError::download(url.as_str(), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::download(url.as_str(), format!("HTTP {status}")));
    }

    let total = response.content_length();
    reporter.downloading(platform_id, 0, total);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PipelineError::download(url.as_str(), e))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(platform_id, downloaded, total);
    }

    file.flush().await?;
    Ok(downloaded)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
