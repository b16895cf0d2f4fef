//! Runtime configuration loaded from `campusfeed.toml` plus environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::FeedError;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "campusfeed.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub links: LinkSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "campus".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Collection holding post documents.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Sub-collection and document id of each post's comment bundle.
    #[serde(default = "default_comment_collection")]
    pub comment_collection: String,
    #[serde(default = "default_comment_bundle")]
    pub comment_bundle: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            comment_collection: default_comment_collection(),
            comment_bundle: default_comment_bundle(),
        }
    }
}

fn default_collection() -> String {
    "social".to_string()
}

fn default_comment_collection() -> String {
    "comments".to_string()
}

fn default_comment_bundle() -> String {
    "comment1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// File holding the device identity and display name.
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            preferences_path: default_preferences_path(),
        }
    }
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from(".campusfeed/preferences.toml")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSettings {
    #[serde(default = "default_links_collection")]
    pub collection: String,
    #[serde(default = "default_links_document")]
    pub document: String,
    #[serde(default = "default_site_search")]
    pub site_search: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            collection: default_links_collection(),
            document: default_links_document(),
            site_search: default_site_search(),
        }
    }
}

fn default_links_collection() -> String {
    "menuItems".to_string()
}

fn default_links_document() -> String {
    "Links".to_string()
}

fn default_site_search() -> String {
    "https://gustavus.edu/search/".to_string()
}

impl FeedConfig {
    /// Loads `path` if given, otherwise `campusfeed.toml` when present, otherwise defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, FeedError> {
        let candidate = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        let mut config = if candidate.exists() {
            let content = std::fs::read_to_string(&candidate)?;
            Self::from_toml(&content)?
        } else if path.is_some() {
            return Err(FeedError::Config {
                message: format!("config file {} does not exist", candidate.display()),
            });
        } else {
            log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, FeedError> {
        toml::from_str(content).map_err(|err| FeedError::Config {
            message: format!("failed to parse config: {err}"),
        })
    }

    /// Applies `REDIS_URL`, `CAMPUSFEED_PREFIX` and `CAMPUSFEED_PREFERENCES`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL").filter(|v| !v.is_empty()) {
            // An explicit URL in the file wins over the environment.
            if self.redis.url.starts_with("${") {
                self.redis.url = url;
            }
        }
        if let Some(prefix) = lookup("CAMPUSFEED_PREFIX").filter(|v| !v.is_empty()) {
            self.redis.prefix = prefix;
        }
        if let Some(path) = lookup("CAMPUSFEED_PREFERENCES").filter(|v| !v.is_empty()) {
            self.device.preferences_path = PathBuf::from(path);
        }
    }

    /// The Redis URL with a `${VAR}` placeholder expanded.
    pub fn redis_url(&self) -> Result<String, FeedError> {
        self.resolve_redis_url(|key| std::env::var(key).ok())
    }

    fn resolve_redis_url<F>(&self, lookup: F) -> Result<String, FeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = self.redis.url.as_str();
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = &url[2..url.len() - 1];
            lookup(var_name).ok_or_else(|| FeedError::Config {
                message: format!("environment variable {var_name} not set"),
            })
        } else {
            Ok(url.to_string())
        }
    }
}
