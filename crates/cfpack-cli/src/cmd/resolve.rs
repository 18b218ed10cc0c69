//! Resolve command

use anyhow::{Context, Result};
use cfpack_core::resolve::resolve_version;

use crate::GlobalOptions;

/// Print the version a pack run would use.
pub async fn resolve(options: &GlobalOptions) -> Result<()> {
    let config = options.pipeline_config();
    let client = config.http_client().context("Failed to build HTTP client")?;
    let version = resolve_version(&client, &config)
        .await
        .context("Failed to resolve version")?;
    println!("{version}");
    Ok(())
}
