//! Push and release commands

use anyhow::{Context, Result};
use cfpack_core::NugetCli;
use cfpack_core::Reporter;
use cfpack_core::pipeline::{Pipeline, PushOutcome};

use crate::GlobalOptions;
use crate::ui::Output;

/// Push the existing artifacts unless the version is already published.
pub async fn push(options: &GlobalOptions) -> Result<()> {
    let output = Output::new(options.quiet);
    let config = options.pipeline_config();
    let tool = push_tool(options)?;
    warn_without_api_key(options, &output);

    let pipeline = Pipeline::new(&config, &tool, &output).context("Failed to build HTTP client")?;
    let outcome = pipeline.push(options.dry_run).await.context("Push failed")?;
    report(&outcome, &output);
    Ok(())
}

/// Pack every platform, then push unless the version is already published.
pub async fn release(options: &GlobalOptions) -> Result<()> {
    let output = Output::new(options.quiet);
    let config = options.pipeline_config();
    let tool = options.package_tool()?;
    warn_without_api_key(options, &output);

    let pipeline = Pipeline::new(&config, &tool, &output).context("Failed to build HTTP client")?;
    let outcome = pipeline.release(options.dry_run).await.context("Release failed")?;
    report(&outcome, &output);
    Ok(())
}

/// A dry run never invokes the tool, so a missing nuget is not fatal there.
fn push_tool(options: &GlobalOptions) -> Result<NugetCli> {
    match options.package_tool() {
        Ok(tool) => Ok(tool),
        Err(_) if options.dry_run => Ok(NugetCli::new("nuget")),
        Err(e) => Err(e),
    }
}

fn warn_without_api_key(options: &GlobalOptions, output: &Output) {
    if options.api_key.is_none() && !options.dry_run {
        output.warning("No API key given; nuget will use its own configuration for the feed");
    }
}

fn report(outcome: &PushOutcome, output: &Output) {
    match outcome {
        PushOutcome::AlreadyPublished(version) => {
            output.success(&format!("{version} is already published, nothing to push"));
        }
        PushOutcome::DryRun { version, artifacts } => {
            output.info(&format!(
                "Dry run: would push {} package(s) for {version}",
                artifacts.len()
            ));
        }
        PushOutcome::Pushed { .. } => {}
    }
}
