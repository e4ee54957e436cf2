//! hivestore storage plugin runner
//!
//! Usage:
//!   hivestore create-schema --config hivestore.toml
//!   hivestore run --config hivestore.toml < messages.ndjson
//!
//! `run` waits for the schemas to exist (see `[plugin]` in the config), then
//! stores one JSON message envelope per stdin line until EOF.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hivestore_runner::{
    build_plugin, create_schema, load_config, load_schema_file, open_backend, process_lines,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hivestore")]
#[command(about = "Stores device commands and notifications in column-family tables")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the plugin, reading messages from stdin
    Run {
        /// Path to the config file
        #[arg(short, long, default_value = "hivestore.toml")]
        config: PathBuf,

        /// Create the schemas before starting
        #[arg(long)]
        create_schema: bool,
    },
    /// Create all tables and UDTs, then exit
    CreateSchema {
        /// Path to the config file
        #[arg(short, long, default_value = "hivestore.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::CreateSchema { config } => {
            let config = load_config(&config)?;
            let schema = load_schema_file(&config)?;
            let backend = open_backend(&config)?;
            create_schema(&backend, &schema).await
        }
        Command::Run {
            config,
            create_schema: bootstrap,
        } => {
            let config = load_config(&config)?;
            let schema = load_schema_file(&config)?;
            let backend = Arc::new(open_backend(&config)?);
            if bootstrap {
                create_schema(&backend, &schema).await?;
            }

            info!(storage = %config.storage.path, "hivestore starting");
            let plugin = build_plugin(backend, &config, schema)?;
            plugin.after_start().await?;

            let stdin = BufReader::new(tokio::io::stdin());
            process_lines(&plugin, stdin).await?;
            Ok(())
        }
    }
}
