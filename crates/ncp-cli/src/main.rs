mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use config::{Cli, Command};
use tracing::metadata::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let options = cli.command.connection_options();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        match cli.command {
            Command::Connect { host, port, identity, .. } => commands::run_connect(&host, port, &identity, options).await,
            Command::Serve {
                host,
                port,
                allowed_identities,
                ..
            } => commands::run_serve(&host, port, allowed_identities, options).await,
        }
    })
}

fn setup_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init()?;

    Ok(())
}
