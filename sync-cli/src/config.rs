//! Replica files for the CLI.
//!
//! Everything lives under one data directory: the TOML config and, unless the
//! config points elsewhere, the SQLite replica.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_client::{Connector, ReplicaConfig, SyncCoordinator, SyncSettings};
use sync_store::SqliteEventStore;

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "replica.toml";

/// Resolved locations for one invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory.
    pub data_dir: PathBuf,
    /// Config file.
    pub config: PathBuf,
}

impl Paths {
    /// Config defaults to `<data_dir>/replica.toml`.
    pub fn new(data_dir: &Path, config: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config: config.unwrap_or_else(|| data_dir.join(CONFIG_FILE)),
        }
    }
}

/// Load and validate the replica configuration.
pub fn load(paths: &Paths) -> Result<ReplicaConfig> {
    if !paths.config.exists() {
        anyhow::bail!(
            "Replica not initialized ({} missing). Run 'replica init' first.",
            paths.config.display()
        );
    }
    let config = ReplicaConfig::from_file(&paths.config)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", paths.config.display()))?;
    Ok(config)
}

/// Open (creating if needed) the SQLite replica the config points at.
pub async fn open_store(paths: &Paths, config: &ReplicaConfig) -> Result<SqliteEventStore> {
    let path = config.database_path(&paths.data_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    SqliteEventStore::open(&path)
        .await
        .with_context(|| format!("Failed to open replica {}", path.display()))
}

/// Wire config, store and connector into a coordinator.
pub async fn coordinator(paths: &Paths, connector: Arc<dyn Connector>) -> Result<SyncCoordinator> {
    let config = load(paths)?;
    let store = open_store(paths, &config).await?;
    Ok(SyncCoordinator::new(
        Arc::new(store),
        connector,
        SyncSettings::from(&config),
    ))
}
