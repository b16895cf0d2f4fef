//! Device-local identity: the persisted user id and display name that act as
//! the "who liked / who commented" actor.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{errors::FeedError, id::generate_local_user_id};

pub const USER_ID_KEY: &str = "app_user_id";
pub const PROFILE_NAME_KEY: &str = "profileName";

/// Author name used when no display name is set.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Flat string key-value store persisted as a TOML table.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Opens the file at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|err| FeedError::Config {
                message: format!("failed to parse preferences {}: {err}", path.display()),
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stores `value` and writes the whole table back to disk.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), FeedError> {
        self.values.insert(key.to_string(), value.into());
        self.flush()
    }

    fn flush(&self) -> Result<(), FeedError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&self.values).map_err(|err| FeedError::Config {
            message: format!("failed to encode preferences: {err}"),
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Identity injected into the feed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalIdentity {
    user_id: Option<String>,
    display_name: Option<String>,
}

impl LocalIdentity {
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            display_name,
        }
    }

    /// An identity with no user id yet; like toggles are no-ops.
    pub fn unestablished() -> Self {
        Self::default()
    }

    /// Reads the persisted identity, minting and persisting a user id on first use.
    pub fn load_or_mint(prefs: &mut FilePreferences) -> Result<Self, FeedError> {
        let user_id = match prefs.get(USER_ID_KEY).filter(|id| !id.is_empty()) {
            Some(existing) => existing.to_string(),
            None => {
                let minted = generate_local_user_id();
                log::info!("minted local user id {minted}");
                prefs.set(USER_ID_KEY, minted.clone())?;
                minted
            }
        };
        let display_name = prefs.get(PROFILE_NAME_KEY).map(str::to_string);
        Ok(Self {
            user_id: Some(user_id),
            display_name,
        })
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Name attached to new comments; falls back to [`ANONYMOUS_AUTHOR`].
    pub fn author_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS_AUTHOR)
    }

    /// Updates the display name and persists it.
    pub fn set_display_name(&mut self, prefs: &mut FilePreferences, name: &str) -> Result<(), FeedError> {
        prefs.set(PROFILE_NAME_KEY, name)?;
        self.display_name = Some(name.to_string());
        Ok(())
    }
}
