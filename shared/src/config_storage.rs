//! Configuration storage for focus and catalog settings.
//!
//! Provides centralized storage for observatory-specific configuration like the
//! last known best focus position and the catalog bucket layout.
//! All config is stored in ~/.cf_config/ by default.

use crate::star_catalog::BucketConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Best focus position recorded at the end of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastFocus {
    /// Focuser step count
    pub position: i32,
    /// Timestamp when the run finished (Unix epoch seconds)
    pub timestamp: u64,
}

impl LastFocus {
    /// Record a focus position with the current time
    pub fn now(position: i32) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            position,
            timestamp,
        }
    }
}

/// Configuration storage manager.
///
/// Manages loading and saving of configuration files from a centralized
/// directory (defaults to ~/.cf_config/).
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all configuration (e.g., ~/.cf_config)
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.cf_config)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        let root_path = PathBuf::from(home).join(".cf_config");
        Ok(Self { root_path })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Get the root configuration path
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn json_path(&self, name: &str) -> std::io::Result<PathBuf> {
        if name.contains('/') || name.contains('\\') {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Config name cannot contain path separators: {name}"),
            ));
        }
        Ok(self.root_path.join(format!("{name}.json")))
    }

    /// Load a named JSON document.
    ///
    /// Returns None if no document exists.
    /// Returns Some(Err) if the file exists but cannot be loaded.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> Option<std::io::Result<T>> {
        let path = match self.json_path(name) {
            Ok(path) => path,
            Err(e) => return Some(Err(e)),
        };

        if !path.exists() {
            return None;
        }

        Some(std::fs::read_to_string(&path).and_then(|json| {
            serde_json::from_str(&json)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }))
    }

    /// Save a named JSON document.
    ///
    /// Creates the config directory if it doesn't exist.
    /// Returns the path where the document was saved.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> std::io::Result<PathBuf> {
        let path = self.json_path(name)?;
        std::fs::create_dir_all(&self.root_path)?;

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Delete a named JSON document.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete_json(&self, name: &str) -> std::io::Result<bool> {
        let path = self.json_path(name)?;

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(path)?;
        Ok(true)
    }

    // =========================================================================
    // Last Focus
    // =========================================================================

    /// Get the last recorded best focus position.
    pub fn get_last_focus(&self) -> Option<std::io::Result<LastFocus>> {
        self.get_json("last_focus")
    }

    /// Record the best focus position of a finished run.
    pub fn save_last_focus(&self, last: &LastFocus) -> std::io::Result<PathBuf> {
        self.save_json("last_focus", last)
    }

    /// Delete the last focus record.
    pub fn delete_last_focus(&self) -> std::io::Result<bool> {
        self.delete_json("last_focus")
    }

    // =========================================================================
    // Catalog Buckets
    // =========================================================================

    /// Get the catalog bucket layout.
    pub fn get_bucket_config(&self) -> Option<std::io::Result<BucketConfig>> {
        self.get_json("catalog_buckets")
    }

    /// Save the catalog bucket layout.
    pub fn save_bucket_config(&self, config: &BucketConfig) -> std::io::Result<PathBuf> {
        self.save_json("catalog_buckets", config)
    }
}

impl Default for ConfigStorage {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(".cf_config")))
    }
}
