//! cfpack - Cloud Foundry CLI NuGet packager

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cfpack_cli::cmd;
use cfpack_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cfpack_core=info,cfpack_cli=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = &cli.options;

    match cli.command {
        Commands::Pack => cmd::pack::pack(options).await,
        Commands::Push => cmd::push::push(options).await,
        Commands::Release => cmd::push::release(options).await,
        Commands::Resolve => cmd::resolve::resolve(options).await,
        Commands::Check => cmd::check::check(options).await,
        Commands::Platforms => {
            cmd::platforms::platforms(options.quiet);
            Ok(())
        }
    }
}
