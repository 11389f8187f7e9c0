use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::service::AccountRef;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "tubemirror";
const STORE_FILE_NAME: &str = "videos.redb";

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub youtube: YouTubeConfig,
    pub store: StoreConfig,
}

/// YouTube Data API settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API key sent with every request
    pub api_key: String,
    /// Fill only one: username OR channel id
    pub username: String,
    pub channel_id: String,
    /// Comma-separated playlist names; empty = all
    pub playlists: String,
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            username: String::new(),
            channel_id: String::new(),
            playlists: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for YouTubeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.trim().is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("YouTubeConfig")
            .field("api_key", &key)
            .field("username", &self.username)
            .field("channel_id", &self.channel_id)
            .field("playlists", &self.playlists)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl YouTubeConfig {
    /// Resolve the account to mirror. Blank values count as unset.
    pub fn account(&self) -> SyncResult<AccountRef> {
        let user = self.username.trim();
        let channel = self.channel_id.trim();
        match (user.is_empty(), channel.is_empty()) {
            (false, true) => Ok(AccountRef::User(user.to_string())),
            (true, false) => Ok(AccountRef::Channel(channel.to_string())),
            (true, true) => Err(SyncError::SelectorConflict(
                "neither username nor channel_id is set".to_string(),
            )),
            (false, false) => Err(SyncError::SelectorConflict(
                "both username and channel_id are set".to_string(),
            )),
        }
    }

    /// The playlist filter, or None when every playlist should be synced
    pub fn playlist_filter(&self) -> Option<&str> {
        let filter = self.playlists.trim();
        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }
}

/// Local store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// redb file (empty = default data dir)
    pub path: Option<String>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => {
                let data_dir = dirs::data_dir()
                    .context("Failed to get data directory")?
                    .join(APP_DIR);
                Ok(data_dir.join(STORE_FILE_NAME))
            }
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path, or create default if not exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Generate example config content for documentation
    pub fn example_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
