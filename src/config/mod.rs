use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shortest accepted poll interval
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Player configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// How often the position display is refreshed while playing
    pub poll_interval_ms: u64,
    /// Step used by `forward`/`rewind` when no amount is given
    pub skip_step_ms: u64,
    /// Microseconds per display unit (1_000_000 shows whole seconds)
    pub display_unit_micros: u64,
    pub preferred_device: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            skip_step_ms: 5000,
            display_unit_micros: 1_000_000,
            preferred_device: None,
        }
    }
}

impl PlayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn skip_step_micros(&self) -> u64 {
        self.skip_step_ms.saturating_mul(1000)
    }

    pub fn display_unit_micros(&self) -> u64 {
        self.display_unit_micros.max(1)
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: PlayerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from `~/.config/solo-player/config.toml`, falling back to
    /// defaults when the file is missing or unreadable
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Ok(Self::with_path(config_path))
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config at {}: {}", config_path.display(), e);
                PlayerConfig::default()
            }
        };
        Self {
            config,
            config_path,
        }
    }

    pub fn get_config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut PlayerConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.update_config(|config| config.preferred_device = device)
    }

    pub fn set_skip_step_ms(&mut self, step_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.skip_step_ms = step_ms)
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.update_config(|config| *config = PlayerConfig::default())
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("solo-player");

        std::fs::create_dir_all(&config_dir).map_err(ConfigError::IoError)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<PlayerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlayerConfig::default());
        }

        let config_content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: PlayerConfig =
            toml::from_str(&config_content).map_err(ConfigError::DeserializationError)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }

        let config_content =
            toml::to_string_pretty(&self.config).map_err(ConfigError::SerializationError)?;
        std::fs::write(&self.config_path, config_content).map_err(ConfigError::IoError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        (ConfigManager::with_path(config_path), temp_dir)
    }

    #[test]
    fn test_player_config_default() {
        let config = PlayerConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.skip_step_micros(), 5_000_000);
        assert_eq!(config.display_unit_micros(), 1_000_000);
        assert_eq!(config.preferred_device, None);
    }

    #[test]
    fn test_degenerate_values_are_bounded() {
        let config = PlayerConfig {
            poll_interval_ms: 0,
            display_unit_micros: 0,
            ..PlayerConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
        assert_eq!(config.display_unit_micros(), 1);
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.poll_interval_ms = 250;
                config.preferred_device = Some("Test Device".to_string());
            })
            .unwrap();

        let loaded = ConfigManager::load_config(config_manager.config_path()).unwrap();
        assert_eq!(loaded.poll_interval_ms, 250);
        assert_eq!(loaded.preferred_device, Some("Test Device".to_string()));
        assert_eq!(loaded, *config_manager.get_config());
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_config(&temp_dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "skip_step_ms = 10000\n").unwrap();

        let config = ConfigManager::load_config(&config_path).unwrap();
        assert_eq!(config.skip_step_ms, 10_000);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::load_config(&config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }

        // The manager itself falls back to defaults
        let manager = ConfigManager::with_path(config_path);
        assert_eq!(*manager.get_config(), PlayerConfig::default());
    }

    #[test]
    fn test_setters_persist() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_preferred_device(Some("My DAC".to_string())).unwrap();
        config_manager.set_skip_step_ms(2500).unwrap();

        let reloaded = ConfigManager::with_path(config_manager.config_path().to_path_buf());
        assert_eq!(reloaded.get_config().preferred_device, Some("My DAC".to_string()));
        assert_eq!(reloaded.get_config().skip_step_ms, 2500);

        config_manager.reset_to_defaults().unwrap();
        let reloaded = ConfigManager::with_path(config_manager.config_path().to_path_buf());
        assert_eq!(*reloaded.get_config(), PlayerConfig::default());
    }

    #[test]
    fn test_config_path_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("config").join("config.toml");

        let config_manager = ConfigManager::with_path(nested_path.clone());
        config_manager.save_config().unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_config_manager_new() {
        match ConfigManager::new() {
            Ok(config_manager) => {
                let path = config_manager.config_path().to_string_lossy().to_string();
                assert!(path.contains("solo-player"));
                assert!(path.ends_with("config.toml"));
            }
            Err(ConfigError::ConfigDirNotFound) | Err(ConfigError::IoError(_)) => {}
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_toml_format() {
        let config = PlayerConfig {
            preferred_device: Some("AudioQuest DragonFly".to_string()),
            ..PlayerConfig::default()
        };

        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("poll_interval_ms = 1000"));
        assert!(toml_string.contains("skip_step_ms = 5000"));
        assert!(toml_string.contains("display_unit_micros = 1000000"));
        assert!(toml_string.contains("AudioQuest DragonFly"));
    }
}
