//! Console settings

use std::path::{Path, PathBuf};

use bridge_node::{NodeConfig, SENSOR_CLASS};
use bridge_sim::SimulationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine settings path")]
    NoPath,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Object created on startup (class followed by creation arguments),
    /// empty to start without one
    #[serde(default = "default_startup_object")]
    pub startup_object: String,
    /// Send `config` to the startup object right after creating it
    #[serde(default = "default_true")]
    pub auto_configure: bool,
    /// Node configuration handed to every constructor
    #[serde(default)]
    pub node: NodeConfig,
    /// Fault injection for the simulated device
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Simulated sample period (ms), 0 disables the generator
    #[serde(default = "default_generator_interval_ms")]
    pub generator_interval_ms: u64,
}

fn default_startup_object() -> String {
    format!("{} 4", SENSOR_CLASS)
}

fn default_true() -> bool {
    true
}

fn default_generator_interval_ms() -> u64 {
    250
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            startup_object: default_startup_object(),
            auto_configure: true,
            node: NodeConfig::default(),
            simulation: SimulationConfig::default(),
            generator_interval_ms: default_generator_interval_ms(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for strainlink
    /// Uses $XDG_CONFIG_HOME/strainlink, falls back to ~/.config/strainlink
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("strainlink"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("strainlink"))
    }

    /// Get the default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from the default location
    ///
    /// A missing file gives the defaults; an unreadable one is reported and
    /// also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("{}", e);
            Self::default()
        })
    }

    /// Save settings to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoPath)?;
        self.save_to(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.startup_object, "vratio 4");
        assert_eq!(settings.node.attach_timeout_ms, 5000);
    }

    #[test]
    fn test_partial_settings() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "startup_object": "vratio 2",
                "simulation": { "timeout_channels": [1] },
                "generator_interval_ms": 0
            }"#,
        )
        .unwrap();
        assert_eq!(settings.startup_object, "vratio 2");
        assert_eq!(settings.simulation.timeout_channels, vec![1]);
        assert_eq!(settings.generator_interval_ms, 0);
        assert!(settings.auto_configure);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("strainlink-test-{}", std::process::id()));
        let path = dir.join("settings.json");
        let settings = Settings {
            auto_configure: false,
            ..Default::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Settings::load_from(Path::new("/nonexistent/strainlink.json"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }
}
