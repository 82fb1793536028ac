//! Configuration system
//!
//! Any serde config type can implement [`Config`] to be read from or written
//! to TOML or RON, chosen by file extension.

mod engine_config;

pub use engine_config::{EngineConfig, LoggingConfig, RendererConfig, WindowConfig};
pub use serde::{Deserialize, Serialize};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Load configuration from file, or fall back to defaults when the file is missing
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            log::info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but make no sense
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("invaders_engine_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("engine.toml");
        let config = EngineConfig::default().with_window_size(800, 600);
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.window.width, 800);
        assert_eq!(loaded.window.height, 600);
        assert_eq!(loaded.window.title, config.window.title);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_ron_load() {
        let path = temp_path("engine.ron");
        EngineConfig::default().save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.renderer.clear_color, [0.0, 0.5, 1.0, 1.0]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_unsupported_extension() {
        let path = temp_path("engine.json");
        std::fs::write(&path, "{}").unwrap();
        let result = EngineConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = EngineConfig::load_or_default(temp_path("missing.toml")).unwrap();
        assert_eq!(loaded.window.width, 640);
    }
}
