//! Engine-level configuration: window, renderer and logging

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Window creation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
    /// Whether the user can resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "I N V A D E R S ! ! !".to_string(),
            width: 640,
            height: 480,
            resizable: true,
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory holding the compiled SPIR-V shaders
    pub shader_dir: String,
    /// Background clear colour (RGBA)
    pub clear_color: [f32; 4],
    /// Enable Vulkan validation layers (debug builds only)
    pub enable_validation: bool,
    /// Prefer MAILBOX presentation over FIFO when available
    pub prefer_mailbox: bool,
    /// Upper bound on textures the backend keeps descriptor sets for
    pub max_textures: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_dir: "target/shaders".to_string(),
            clear_color: [0.0, 0.5, 1.0, 1.0],
            enable_validation: cfg!(debug_assertions),
            prefer_mailbox: true,
            max_textures: 64,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    /// Parsed level filter, falling back to `Info` on unknown names
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    /// Set the initial window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set the background clear colour
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.renderer.clear_color = clear_color;
        self
    }

    /// Set the compiled shader directory
    pub fn with_shader_dir(mut self, shader_dir: impl Into<String>) -> Self {
        self.renderer.shader_dir = shader_dir.into();
        self
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.renderer.max_textures == 0 {
            return Err(ConfigError::Invalid("renderer.max_textures must be at least 1".to_string()));
        }
        if self.renderer.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("renderer.clear_color components must be in 0..=1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_game_window() {
        let config = EngineConfig::default();
        assert_eq!(config.window.title, "I N V A D E R S ! ! !");
        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let config = EngineConfig::default().with_window_size(0, 480);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("[window]\nwidth = 1024\n").unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
    }
}
