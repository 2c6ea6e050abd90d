/*!
common/src/lib.rs

Shared configuration types and DB helper functions for fetchcast.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges an optional override file over defaults
- Helpers to initialize an SQLite database pool
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Database configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite registry file (e.g. "feeds.db")
    pub path: Option<String>,
}

/// Download target configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory downloaded payloads are written to. Required at startup,
    /// either here or via the --target flag.
    pub target_dir: Option<String>,
    /// Seconds to wait before downloading a freshly published item, to give
    /// the origin server time to finish publishing the payload.
    pub delay_seconds: Option<u64>,
}

/// Polling cadence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between checks during normal operation
    pub check_interval_seconds: Option<u64>,
    /// Seconds between checks inside a feed's rapid window
    pub rapid_check_interval_seconds: Option<u64>,
    /// Length of the rapid window, in seconds
    pub rapid_check_duration_seconds: Option<u64>,
}

/// Politeness / outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolitenessConfig {
    pub request_delay_seconds: Option<u64>,
    pub fetch_timeout_seconds: Option<u64>,
}

/// Update notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub update_url: Option<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub politeness: Option<PolitenessConfig>,
    pub notify: Option<NotifyConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Path of the sqlite feed registry.
    pub fn db_path(&self) -> &str {
        self.database.path.as_deref().unwrap_or("feeds.db")
    }

    /// Configured download directory, if any. Empty strings count as unset.
    pub fn target_dir(&self) -> Option<&str> {
        self.download.target_dir.as_deref().filter(|d| !d.is_empty())
    }

    pub fn download_delay_seconds(&self) -> u64 {
        self.download.delay_seconds.unwrap_or(30)
    }

    pub fn check_interval_seconds(&self) -> u64 {
        self.scheduler.check_interval_seconds.unwrap_or(3600)
    }

    pub fn rapid_check_interval_seconds(&self) -> u64 {
        self.scheduler.rapid_check_interval_seconds.unwrap_or(60)
    }

    pub fn rapid_check_duration_seconds(&self) -> u64 {
        self.scheduler.rapid_check_duration_seconds.unwrap_or(3600)
    }

    pub fn request_delay_seconds(&self) -> u64 {
        self.politeness
            .as_ref()
            .and_then(|p| p.request_delay_seconds)
            .unwrap_or(5)
    }

    pub fn fetch_timeout_seconds(&self) -> u64 {
        self.politeness
            .as_ref()
            .and_then(|p| p.fetch_timeout_seconds)
            .unwrap_or(10)
    }

    /// Notification endpoint, if one is configured and non-empty.
    pub fn update_notify_url(&self) -> Option<&str> {
        self.notify
            .as_ref()
            .and_then(|n| n.update_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary, ensure the DB file exists
/// (attempting to create it if missing), and return a configured `SqlitePool`. Defaults are
/// conservative for resource-constrained platforms:
/// - max_connections: 5
/// - connection timeout default provided by `sqlx`
///
/// Example:
///   let pool = init_db_pool("feeds.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    // Try to create the DB file if it does not already exist. This gives a clearer error
    // earlier (filesystem permission or path issues) instead of only surfacing it via the
    // SQLite connection attempt.
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create or open DB file: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_defaults_and_overrides() {
        // Minimal TOML to test parsing; unset keys fall back to defaults.
        let toml = r#"
            [download]
            target_dir = "/data/incoming"

            [scheduler]
            rapid_check_interval_seconds = 30
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.db_path(), "feeds.db");
        assert_eq!(cfg.target_dir(), Some("/data/incoming"));
        assert_eq!(cfg.check_interval_seconds(), 3600);
        assert_eq!(cfg.rapid_check_interval_seconds(), 30);
        assert_eq!(cfg.request_delay_seconds(), 5);
        assert_eq!(cfg.update_notify_url(), None);
    }

    #[tokio::test]
    async fn empty_strings_count_as_unset() {
        let toml = r#"
            [download]
            target_dir = ""

            [notify]
            update_url = ""
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.target_dir(), None);
        assert_eq!(cfg.update_notify_url(), None);
    }

    #[tokio::test]
    async fn override_file_wins_key_by_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        tokio::fs::write(
            &default_path,
            "[database]\npath = \"feeds.db\"\n[scheduler]\ncheck_interval_seconds = 3600\n",
        )
        .await
        .expect("write default");
        tokio::fs::write(&override_path, "[scheduler]\ncheck_interval_seconds = 600\n")
            .await
            .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged config");

        // Overridden key wins, untouched keys survive from the defaults.
        assert_eq!(cfg.check_interval_seconds(), 600);
        assert_eq!(cfg.db_path(), "feeds.db");
    }

    #[tokio::test]
    async fn db_pool_initializes_on_fresh_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("data").join("feeds.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        // Simple sanity: acquire a connection
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
    }
}
