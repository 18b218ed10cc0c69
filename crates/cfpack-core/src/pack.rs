//! Package building.
//!
//! The packaging tool is abstracted behind [`PackageTool`] so the pipeline
//! can be driven without a NuGet installation; [`NugetCli`] is the real
//! implementation and shells out to `nuget`.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use cfpack_schema::PlatformDescriptor;
use semver::Version;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{PipelineConfig, PipelineError};

/// An external tool that can build and upload packages.
#[async_trait]
pub trait PackageTool: Send + Sync {
    /// Build a package from `nuspec` at `version`, writing it into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be run or reports failure.
    async fn pack(&self, nuspec: &Path, version: &Version, output_dir: &Path) -> Result<()>;

    /// Upload `artifact` to the feed at `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be run or the feed rejects the package.
    async fn push(&self, artifact: &Path, source: &str, api_key: Option<&str>) -> Result<()>;
}

/// `nuget.exe` (or a `nuget` wrapper script) invoked as a child process.
#[derive(Debug, Clone)]
pub struct NugetCli {
    program: PathBuf,
    deterministic: bool,
}

impl NugetCli {
    /// Use the executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            deterministic: true,
        }
    }

    /// Use `explicit` if given, otherwise find `nuget` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if no explicit path is given and `nuget` is not on `PATH`.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(program) = explicit {
            return Ok(Self::new(program));
        }
        which::which("nuget")
            .or_else(|_| which::which("nuget.exe"))
            .map(Self::new)
            .context("nuget not found on PATH; set NUGET_EXE or pass --nuget")
    }

    /// Toggle `-Deterministic` on `pack` (on by default).
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Path of the executable being invoked.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `nuget.exe` outside Windows runs under mono.
    fn command(&self) -> Command {
        let is_exe = self
            .program
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));

        if is_exe && !cfg!(windows) {
            let mut cmd = Command::new("mono");
            cmd.arg(&self.program);
            cmd
        } else {
            Command::new(&self.program)
        }
    }

    async fn run<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command();
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                tail(&stdout, 10)
            } else {
                tail(&stderr, 10)
            };
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                detail
            );
        }
        Ok(())
    }
}

#[async_trait]
impl PackageTool for NugetCli {
    async fn pack(&self, nuspec: &Path, version: &Version, output_dir: &Path) -> Result<()> {
        let version = version.to_string();
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("pack"),
            nuspec.as_os_str(),
            OsStr::new("-Version"),
            OsStr::new(&version),
            OsStr::new("-OutputDirectory"),
            output_dir.as_os_str(),
            OsStr::new("-NonInteractive"),
        ];
        if self.deterministic {
            args.push(OsStr::new("-Deterministic"));
        }

        debug!(nuspec = %nuspec.display(), %version, "nuget pack");
        self.run(args, nuspec.parent()).await
    }

    async fn push(&self, artifact: &Path, source: &str, api_key: Option<&str>) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("push"),
            artifact.as_os_str(),
            OsStr::new("-Source"),
            OsStr::new(source),
            OsStr::new("-NonInteractive"),
        ];
        if let Some(key) = api_key {
            args.push(OsStr::new("-ApiKey"));
            args.push(OsStr::new(key));
        }

        debug!(artifact = %artifact.display(), source, "nuget push");
        self.run(args, None).await
    }
}

/// Last `n` non-empty lines of tool output.
fn tail(output: &str, n: usize) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Build the package for one platform into the artifacts directory.
///
/// The platform's nuspec is copied into the working directory first so its
/// relative `src` paths resolve against the extracted `<rid>/` directories.
///
/// # Errors
///
/// Returns [`PipelineError::PackagingFailed`] if the nuspec is missing, the
/// tool fails, or the expected package file was not produced.
pub async fn build_package<T: PackageTool + ?Sized>(
    tool: &T,
    config: &PipelineConfig,
    platform: &PlatformDescriptor,
    version: &Version,
) -> Result<PathBuf, PipelineError> {
    let source = config.nuspec_path(platform);
    let working_dir = config.working_dir();
    let nuspec = working_dir.join(platform.nuspec_file_name());

    tokio::fs::create_dir_all(&working_dir).await?;
    tokio::fs::copy(&source, &nuspec).await.map_err(|e| {
        PipelineError::packaging(platform, format!("cannot copy {}: {e}", source.display()))
    })?;
    tokio::fs::create_dir_all(&config.artifacts_dir).await?;

    tool.pack(&nuspec, version, &config.artifacts_dir)
        .await
        .map_err(|e| PipelineError::packaging(platform, format!("{e:#}")))?;

    let artifact = config.artifact_path(platform, version);
    if !tokio::fs::try_exists(&artifact).await? {
        return Err(PipelineError::packaging(
            platform,
            format!("packaging tool did not produce {}", artifact.display()),
        ));
    }

    info!(platform = platform.platform_id, artifact = %artifact.display(), "built package");
    Ok(artifact)
}

/// SHA-256 of a file as lowercase hex.
///
/// # Errors
///
/// Returns any IO error from reading `path`.
pub fn artifact_digest(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
