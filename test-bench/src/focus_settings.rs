//! Focus search settings kept in the shared config store.

use std::path::PathBuf;

use autofocus::FocusConfig;
use shared::config_storage::ConfigStorage;

const FOCUS_CONFIG_NAME: &str = "focus_config";

/// Focus search config accessors for [`ConfigStorage`].
pub trait FocusConfigStore {
    /// Get the stored focus search config.
    ///
    /// Returns None if none has been saved.
    fn get_focus_config(&self) -> Option<std::io::Result<FocusConfig>>;

    /// Save the focus search config used by later runs.
    fn save_focus_config(&self, config: &FocusConfig) -> std::io::Result<PathBuf>;

    /// Delete the stored focus search config.
    fn delete_focus_config(&self) -> std::io::Result<bool>;
}

impl FocusConfigStore for ConfigStorage {
    fn get_focus_config(&self) -> Option<std::io::Result<FocusConfig>> {
        self.get_json(FOCUS_CONFIG_NAME)
    }

    fn save_focus_config(&self, config: &FocusConfig) -> std::io::Result<PathBuf> {
        self.save_json(FOCUS_CONFIG_NAME, config)
    }

    fn delete_focus_config(&self) -> std::io::Result<bool> {
        self.delete_json(FOCUS_CONFIG_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_focus_config() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::with_path(dir.path().join("cf_config"));
        assert!(storage.get_focus_config().is_none());

        let config = FocusConfig {
            samples_per_position: 5,
            initial_guess: 5400,
            ..Default::default()
        };
        let path = storage.save_focus_config(&config).unwrap();
        assert!(path.ends_with("focus_config.json"));

        let loaded = storage.get_focus_config().unwrap().unwrap();
        assert_eq!(loaded, config);

        assert!(storage.delete_focus_config().unwrap());
        assert!(storage.get_focus_config().is_none());
    }
}
