//! # replica
//!
//! CLI for keeping a local event replica in sync with a set of relays.
//!
//! ## Commands
//!
//! - `init`: Write a default configuration
//! - `sync`: Run one sync pass against every configured relay
//! - `list`: Print cached events, most recent first
//! - `status`: Show cache size, watermark and relay configuration
//!
//! ## Example
//!
//! ```bash
//! # Create replica.toml in the data directory
//! replica init
//!
//! # Fetch new events
//! replica sync
//!
//! # Show the ten newest direct messages from one author
//! replica list --kind 4 --author <hex> --limit 10
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for per-relay detail.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use sync_client::WebSocketConnector;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{init, list, status, sync};
use config::Paths;

/// Keep a local event replica in sync with a set of relays.
#[derive(Parser, Debug)]
#[command(name = "replica")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the config and replica database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/replica.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Run one sync pass
    Sync,

    /// Print cached events, most recent first
    List {
        /// Only events by this author (hex public key)
        #[arg(long)]
        author: Option<String>,

        /// Only events of this kind
        #[arg(long)]
        kind: Option<u32>,

        /// Maximum number of events to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show replica status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let paths = Paths::new(&data_dir, cli.config);

    match cli.command {
        Commands::Init { force } => {
            init::run(&paths, force).await?;
        }
        Commands::Sync => {
            sync::run(&paths, Arc::new(WebSocketConnector::new())).await?;
        }
        Commands::List {
            author,
            kind,
            limit,
        } => {
            let filter = list::ListFilter {
                author,
                kind,
                limit,
            };
            list::run(&paths, &filter).await?;
        }
        Commands::Status => {
            status::run(&paths).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let default_level = "info";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Get the default data directory for replica.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "replica-sync", "replica")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
