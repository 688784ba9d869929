use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::WatcherSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding the messages table.
    pub database_path: String,
    /// Pre-filled username; blank sends as "Anonymous".
    pub default_username: String,
    /// Show a delete button on every message.
    pub allow_delete: bool,
    /// How many of the newest messages the bulk load fetches.
    pub recent_limit: usize,
    /// Buffer size for command, reply and feed channels.
    pub channel_capacity: usize,
    /// How often the change log is checked for writes from any process.
    pub poll_interval_ms: u64,
    /// Change-log rows older than this are pruned.
    pub change_retention_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "data/chat.db".to_string(),
            default_username: String::new(),
            allow_delete: true,
            recent_limit: 100,
            channel_capacity: 100,
            poll_interval_ms: 250,
            change_retention_secs: 600,
        }
    }
}

/// The slice of configuration a chat page needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub default_username: String,
    pub allow_delete: bool,
    pub recent_limit: usize,
    pub channel_capacity: usize,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PageSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_username: config.default_username.clone(),
            allow_delete: config.allow_delete,
            recent_limit: config.recent_limit,
            channel_capacity: config.channel_capacity,
        }
    }
}

impl From<&AppConfig> for WatcherSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            batch_size: config.channel_capacity.max(1),
            retention: Duration::from_secs(config.change_retention_secs),
        }
    }
}

/// Environment variables that win over the config file.
pub const ENV_DATABASE_PATH: &str = "LIVE_CHAT_DATABASE_PATH";
pub const ENV_USERNAME: &str = "LIVE_CHAT_USERNAME";

/// Read `path` (defaults when missing or malformed), then apply overrides
/// from the process environment.
pub fn load_config(path: &str) -> AppConfig {
    apply_overrides(read_config_file(path), |key| std::env::var(key).ok())
}

fn read_config_file(path: &str) -> AppConfig {
    let path = Path::new(path);
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}; using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            log::warn!("Failed to read config {} ({err}); using defaults", path.display());
            return AppConfig::default();
        }
    };

    serde_json::from_str::<AppConfig>(&content).unwrap_or_else(|err| {
        log::warn!("Failed to parse config {} ({err}); using defaults", path.display());
        AppConfig::default()
    })
}

/// `lookup` resolves an environment variable name. Blank values are ignored.
pub fn apply_overrides(mut config: AppConfig, lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = set(ENV_DATABASE_PATH) {
        log::debug!("{ENV_DATABASE_PATH} overrides database_path");
        config.database_path = path;
    }
    if let Some(name) = set(ENV_USERNAME) {
        config.default_username = name;
    }
    config
}
