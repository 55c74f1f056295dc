//! Configuration loading for sync-client.
//!
//! Configuration is loaded from a TOML file (default: `replica.toml`).
//! Every section and field is optional; missing values fall back to the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_core::{SyncWindow, DEFAULT_BOOTSTRAP_SECS, DEFAULT_OVERLAP_SECS};
use sync_types::{Filter, KIND_ENCRYPTED_DIRECT_MESSAGE};
use url::Url;

/// Root configuration for a replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Relays to synchronize against.
    #[serde(default)]
    pub relays: RelaysConfig,
    /// Which events to request.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Incremental fetch window.
    #[serde(default)]
    pub window: WindowConfig,
    /// Local replica storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaysConfig {
    /// Relay WebSocket URLs (`ws://` or `wss://`).
    #[serde(default = "default_relay_urls")]
    pub urls: Vec<String>,
    /// Per-relay fetch budget in seconds (default: 8).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Query configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Event kinds (default: encrypted direct messages).
    #[serde(default = "default_kinds")]
    pub kinds: Vec<u32>,
    /// Author public keys. Empty means any author.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Recipient public keys, sent as a `#p` tag constraint.
    #[serde(default)]
    pub addressed_to: Vec<String>,
    /// Per-relay result cap (default: 200).
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Sync window configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Seconds re-fetched behind the watermark (default: 1 hour).
    #[serde(default = "default_overlap_secs")]
    pub overlap_secs: u64,
    /// Lookback for an empty replica (default: 90 days).
    #[serde(default = "default_bootstrap_secs")]
    pub bootstrap_secs: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite replica. Relative paths resolve against the data dir.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

// Default value functions
fn default_relay_urls() -> Vec<String> {
    vec![
        "wss://relay.damus.io".to_string(),
        "wss://relay.primal.net".to_string(),
        "wss://nos.lol".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_kinds() -> Vec<u32> {
    vec![KIND_ENCRYPTED_DIRECT_MESSAGE]
}

fn default_limit() -> u32 {
    200
}

fn default_overlap_secs() -> u64 {
    DEFAULT_OVERLAP_SECS
}

fn default_bootstrap_secs() -> u64 {
    DEFAULT_BOOTSTRAP_SECS
}

fn default_database_path() -> PathBuf {
    PathBuf::from("replica.db")
}

impl Default for RelaysConfig {
    fn default() -> Self {
        Self {
            urls: default_relay_urls(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kinds: default_kinds(),
            authors: Vec::new(),
            addressed_to: Vec::new(),
            limit: default_limit(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            overlap_secs: default_overlap_secs(),
            bootstrap_secs: default_bootstrap_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl ReplicaConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. The result is
    /// not validated; call [`validate`](Self::validate) before use.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Check the configuration is usable for a sync pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relays.urls.is_empty() {
            return Err(ConfigError::Invalid("relays.urls is empty".into()));
        }
        for raw in &self.relays.urls {
            let url = Url::parse(raw)
                .map_err(|e| ConfigError::Invalid(format!("relay url {raw:?}: {e}")))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(ConfigError::Invalid(format!(
                    "relay url {raw:?}: scheme must be ws or wss"
                )));
            }
        }
        if self.relays.timeout_secs == 0 {
            return Err(ConfigError::Invalid("relays.timeout_secs must be > 0".into()));
        }
        if self.filter.kinds.is_empty() {
            return Err(ConfigError::Invalid(
                "filter.kinds is empty; relays would match nothing".into(),
            ));
        }
        if self.filter.limit == 0 {
            return Err(ConfigError::Invalid("filter.limit must be > 0".into()));
        }
        Ok(())
    }

    /// Per-relay fetch budget.
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relays.timeout_secs)
    }

    /// Overlap and bootstrap parameters.
    pub fn sync_window(&self) -> SyncWindow {
        SyncWindow::new(self.window.overlap_secs, self.window.bootstrap_secs)
    }

    /// The filter sent to every relay, without a `since` bound.
    pub fn base_filter(&self) -> Filter {
        let mut filter = Filter::new()
            .kinds(self.filter.kinds.iter().copied())
            .limit(self.filter.limit);
        if !self.filter.authors.is_empty() {
            filter = filter.authors(self.filter.authors.iter().cloned());
        }
        if !self.filter.addressed_to.is_empty() {
            filter = filter.tag('p', self.filter.addressed_to.iter().cloned());
        }
        filter
    }

    /// Database path, resolved against `data_dir` when relative.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            data_dir.join(&self.storage.database)
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to render configuration.
    #[error("failed to serialize config: {0}")]
    SerializeError(toml::ser::Error),
    /// Parsed but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAFF: &str = "d4ed245d98f8867bba709f820e83f65884791076d189e92be0c595f78daf1ccd";
    const SHOP: &str = "c1a9ea801212d71b39146d2d867f8744000cab935d062dce6756eac8ad408c72";

    #[test]
    fn default_config_is_valid() {
        let config = ReplicaConfig::default();
        config.validate().unwrap();
        assert_eq!(config.relays.timeout_secs, 8);
        assert_eq!(config.filter.kinds, vec![4]);
        assert_eq!(config.filter.limit, 200);
        assert_eq!(config.window.overlap_secs, 3600);
        assert_eq!(config.window.bootstrap_secs, 90 * 24 * 60 * 60);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = format!(
            r#"
[relays]
urls = ["wss://relay.damus.io", "ws://127.0.0.1:7777"]
timeout_secs = 5

[filter]
kinds = [4, 30078]
authors = ["{STAFF}"]
addressed_to = ["{SHOP}"]
limit = 50

[window]
overlap_secs = 600

[storage]
database = "/data/replica.db"
"#
        );

        let config: ReplicaConfig = toml::from_str(&toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.relays.urls.len(), 2);
        assert_eq!(config.relay_timeout(), Duration::from_secs(5));
        assert_eq!(config.filter.kinds, vec![4, 30078]);
        assert_eq!(config.window.overlap_secs, 600);
        assert_eq!(config.window.bootstrap_secs, DEFAULT_BOOTSTRAP_SECS);
        assert_eq!(config.storage.database, PathBuf::from("/data/replica.db"));
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: ReplicaConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReplicaConfig::default());
    }

    #[test]
    fn base_filter_carries_authors_and_recipients() {
        let mut config = ReplicaConfig::default();
        config.filter.authors = vec![STAFF.to_string()];
        config.filter.addressed_to = vec![SHOP.to_string()];

        let filter = config.base_filter();
        assert_eq!(filter.kinds, Some(vec![4]));
        assert_eq!(filter.authors, Some(vec![STAFF.to_string()]));
        assert_eq!(filter.tags.get("#p"), Some(&vec![SHOP.to_string()]));
        assert_eq!(filter.limit, Some(200));
        assert_eq!(filter.since, None);
    }

    #[test]
    fn base_filter_omits_empty_author_list() {
        let filter = ReplicaConfig::default().base_filter();
        assert_eq!(filter.authors, None);
        assert!(filter.tags.is_empty());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ReplicaConfig::default();
        config.relays.urls.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReplicaConfig::default();
        config.relays.urls = vec!["https://relay.example.com".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReplicaConfig::default();
        config.relays.urls = vec!["not a url".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReplicaConfig::default();
        config.relays.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReplicaConfig::default();
        config.filter.limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_empty_kinds() {
        let config: ReplicaConfig = toml::from_str(
            r#"
            [filter]
            kinds = []
            "#,
        )
        .unwrap();

        match config.validate() {
            Err(ConfigError::Invalid(reason)) => assert!(reason.contains("filter.kinds")),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn to_toml_round_trips() {
        let mut config = ReplicaConfig::default();
        config.filter.authors = vec![STAFF.to_string()];

        let text = config.to_toml().unwrap();
        let parsed: ReplicaConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn database_path_resolves_relative_to_data_dir() {
        let config = ReplicaConfig::default();
        assert_eq!(
            config.database_path(Path::new("/var/lib/replica")),
            PathBuf::from("/var/lib/replica/replica.db")
        );

        let mut config = ReplicaConfig::default();
        config.storage.database = PathBuf::from("/abs/db.sqlite");
        assert_eq!(
            config.database_path(Path::new("/ignored")),
            PathBuf::from("/abs/db.sqlite")
        );
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = ReplicaConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn from_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replica.toml");
        std::fs::write(&path, "[relays\nurls = 3").unwrap();

        let err = ReplicaConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
