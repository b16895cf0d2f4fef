use anyhow::{Context, Result};
use std::path::PathBuf;

use campusfeed::{FeedConfig, FilePreferences, LocalIdentity, RedisStore};

/// Loaded configuration plus lazily opened device state for one CLI run
pub struct AppContext {
    /// Explicit `--config` path, if any
    pub config_path: Option<PathBuf>,
    /// Resolved configuration with environment overrides applied
    pub config: FeedConfig,
}

impl AppContext {
    /// Load configuration from `path`, or from `campusfeed.toml` in the
    /// current directory when present
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config = FeedConfig::load(path.as_deref()).context("Failed to load configuration")?;
        Ok(Self {
            config_path: path,
            config,
        })
    }

    /// Open the device preference file
    pub fn preferences(&self) -> Result<FilePreferences> {
        let path = &self.config.device.preferences_path;
        FilePreferences::open(path).with_context(|| format!("Failed to open preferences at {}", path.display()))
    }

    /// Read the device identity, minting a user id on first use
    pub fn identity(&self) -> Result<(FilePreferences, LocalIdentity)> {
        let mut prefs = self.preferences()?;
        let identity = LocalIdentity::load_or_mint(&mut prefs).context("Failed to establish local identity")?;
        Ok((prefs, identity))
    }

    /// Connect to the configured Redis Stack server
    pub async fn connect(&self) -> Result<RedisStore> {
        RedisStore::connect(&self.config).await.context(
            "Failed to connect to Redis. Set REDIS_URL or [redis].url in campusfeed.toml.",
        )
    }
}
