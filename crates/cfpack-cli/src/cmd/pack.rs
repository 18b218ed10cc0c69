//! Pack command

use anyhow::{Context, Result};
use cfpack_core::pipeline::Pipeline;

use crate::GlobalOptions;
use crate::ui::Output;

/// Build one package per platform into the artifacts directory.
pub async fn pack(options: &GlobalOptions) -> Result<()> {
    let config = options.pipeline_config();
    let tool = options.package_tool()?;
    let output = Output::new(options.quiet);

    let pipeline = Pipeline::new(&config, &tool, &output).context("Failed to build HTTP client")?;
    let outcome = pipeline.pack().await.context("Packaging failed")?;

    tracing::debug!(version = %outcome.version, artifacts = outcome.artifacts.len(), "pack finished");
    Ok(())
}
