mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::commands::Commands;
use crate::config::AppConfig;

/// Operator tool for the multi-tenant invoice database
#[derive(Parser)]
#[command(name = "invoice-admin", version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(
        dsn = %tenantkit_db::redact_credentials_in_dsn(Some(&config.database.dsn)),
        "configuration loaded"
    );

    let conn = tenantkit_db::connect(&config.database)
        .await
        .context("failed to open the database")?;
    cli.command.run(&conn).await
}
