//! Check command

use anyhow::{Context, Result};
use cfpack_core::pipeline::check_published;
use cfpack_core::resolve::resolve_version;

use crate::GlobalOptions;
use crate::ui::Output;

/// Print whether the resolved version is already on the feed.
pub async fn check(options: &GlobalOptions) -> Result<()> {
    let config = options.pipeline_config();
    let output = Output::new(options.quiet);
    let client = config.http_client().context("Failed to build HTTP client")?;

    let version = resolve_version(&client, &config)
        .await
        .context("Failed to resolve version")?;
    let published = check_published(&client, &config, &version, &output)
        .await
        .with_context(|| format!("Failed to check {} on {}", config.check_package_id, config.service_index_url))?;

    if published {
        println!("{version} published");
    } else {
        println!("{version} not published");
    }
    Ok(())
}
