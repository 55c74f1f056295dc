//! Write a default replica configuration.

use anyhow::{Context, Result};

use crate::config::Paths;
use sync_client::ReplicaConfig;

/// Run the init command.
pub async fn run(paths: &Paths, force: bool) -> Result<()> {
    if paths.config.exists() && !force {
        anyhow::bail!(
            "Replica already initialized. Use --force to overwrite {}.",
            paths.config.display()
        );
    }

    if let Some(parent) = paths.config.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create config directory")?;
    }

    let config = ReplicaConfig::default();
    tokio::fs::write(&paths.config, config.to_toml()?)
        .await
        .context("Failed to write configuration")?;

    println!("Replica initialized!");
    println!();
    println!("  Config:   {}", paths.config.display());
    println!("  Database: {}", config.database_path(&paths.data_dir).display());
    println!("  Relays:   {}", config.relays.urls.len());
    println!();
    println!("Next steps:");
    println!("  1. Set filter.authors and filter.addressed_to in the config");
    println!("  2. Fetch events: replica sync");

    Ok(())
}
