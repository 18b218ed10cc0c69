//! cfpack - Cloud Foundry CLI release mirroring
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Downloads the official `cf` binaries for every supported platform,
//! repackages each one as a `CloudFoundry.CommandLine.<rid>` NuGet package
//! and publishes them when the feed does not have that version yet.
//!
//! Typical runs:
//!
//! ```text
//! cfpack pack                      # latest release → ./artifacts/*.nupkg
//! cfpack release --api-key $KEY    # pack, then push unless already published
//! cfpack check --cf-version 7.2.0  # is 7.2.0 on the feed?
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use cfpack_core::config::{DEFAULT_DOWNLOAD_BASE, DEFAULT_RELEASE_API, DEFAULT_SERVICE_INDEX};
use cfpack_core::{NugetCli, PipelineConfig};
use cfpack_schema::PlatformDescriptor;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cfpack")]
#[command(author, version = env!("CFPACK_VERSION"), about = "Mirror Cloud Foundry CLI releases into NuGet packages")]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download, normalize and package every platform
    Pack,
    /// Push the packages in the artifacts directory unless already published
    Push,
    /// Pack, then push unless already published
    Release,
    /// Print the version that would be packaged
    Resolve,
    /// Report whether the version is already published
    Check,
    /// List supported platforms
    Platforms,
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOptions {
    /// Repository root holding nuspec/ and receiving artifacts/
    #[arg(long, global = true, env = "CFPACK_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Package this version instead of the latest upstream release
    #[arg(long = "cf-version", global = true, env = "CF_VERSION")]
    pub cf_version: Option<String>,

    /// Feed to push to
    #[arg(long, global = true, env = "NUGET_SOURCE", default_value = DEFAULT_SERVICE_INDEX)]
    pub source: String,

    /// API key for the feed
    #[arg(long, global = true, env = "NUGET_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to nuget (default: found on PATH)
    #[arg(long, global = true, env = "NUGET_EXE")]
    pub nuget: Option<PathBuf>,

    /// Token for GitHub API requests
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Number of platforms to process at once
    #[arg(short, long, global = true, default_value_t = 1)]
    pub jobs: usize,

    /// Only process this platform (repeatable)
    #[arg(short, long = "platform", global = true)]
    pub platforms: Vec<PlatformDescriptor>,

    /// Treat an unreachable feed as "not published" instead of failing
    #[arg(long, global = true)]
    pub assume_unpublished: bool,

    /// Do not pass -Deterministic to nuget pack
    #[arg(long, global = true)]
    pub no_deterministic: bool,

    /// Show what would be pushed without pushing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Service index used for the publication check (default: --source)
    #[arg(long, global = true, env = "CFPACK_CHECK_SOURCE")]
    pub check_source: Option<String>,

    /// GitHub API base URL
    #[arg(long, global = true, env = "CFPACK_RELEASE_API", default_value = DEFAULT_RELEASE_API, hide = true)]
    pub release_api: String,

    /// Upstream archive download base URL
    #[arg(long, global = true, env = "CFPACK_DOWNLOAD_BASE", default_value = DEFAULT_DOWNLOAD_BASE, hide = true)]
    pub download_base: String,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value_t = 300, hide = true)]
    pub timeout: u64,
}

impl GlobalOptions {
    /// Build the run configuration from the command line.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let check_source = self
            .check_source
            .clone()
            .unwrap_or_else(|| self.source.clone());

        PipelineConfig::new(&self.root)
            .with_explicit_version(self.cf_version.clone())
            .with_release_api_url(&self.release_api)
            .with_github_token(self.github_token.clone())
            .with_download_base_url(&self.download_base)
            .with_service_index_url(check_source)
            .with_push_source(&self.source)
            .with_api_key(self.api_key.clone())
            .with_platforms(self.platforms.clone())
            .with_jobs(self.jobs)
            .with_assume_unpublished_on_error(self.assume_unpublished)
            .with_http_timeout(Duration::from_secs(self.timeout))
    }

    /// Locate the packaging tool.
    pub fn package_tool(&self) -> Result<NugetCli> {
        let tool = NugetCli::locate(self.nuget.clone())
            .context("Cannot pack or push without nuget")?;
        Ok(tool.with_deterministic(!self.no_deterministic))
    }
}
