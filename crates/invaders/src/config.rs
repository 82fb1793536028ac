//! Game configuration
//!
//! Every value defaults to what the game was tuned with, so running without
//! an `invaders.toml` plays the stock game.

use invaders_engine::config::{Config, ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};

/// Default config file looked up next to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "invaders.toml";

/// Top-level game configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Window, renderer and logging
    pub engine: EngineConfig,

    /// Loop pacing
    pub timing: TimingConfig,

    /// Pool sizes and movement constants
    pub gameplay: GameplayConfig,

    /// Camera and lighting
    pub camera: CameraConfig,

    /// Asset file locations
    pub assets: AssetManifest,
}

impl Config for GameConfig {}

impl GameConfig {
    /// Reject values the game cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        let gameplay = &self.gameplay;
        if gameplay.max_shots == 0 || gameplay.max_aliens == 0 {
            return Err(ConfigError::Invalid("pool sizes must be at least 1".to_string()));
        }
        if gameplay.lateral_limit <= 0.0 || gameplay.hit_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "gameplay.lateral_limit and gameplay.hit_radius must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loop pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep after every tick, in milliseconds
    pub tick_millis: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { tick_millis: 20 }
    }
}

/// Gameplay constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Player shot pool size
    pub max_shots: usize,
    /// Aliens per wave
    pub max_aliens: usize,
    /// Particles in each alien's explosion
    pub explosion_particles: usize,
    /// Shot travel along -Z per tick
    pub shot_speed: f32,
    /// Shots die once their z passes below this
    pub shot_limit: f32,
    /// Player movement along X per tick
    pub lateral_speed: f32,
    /// Player x stays within `[-lateral_limit, lateral_limit]`
    pub lateral_limit: f32,
    /// Roll target while moving (sign follows direction)
    pub roll_intent: f32,
    /// Ticks between shots
    pub fire_cooldown: i32,
    /// Shot to alien distance that counts as a hit
    pub hit_radius: f32,
    /// Rotation phase advance per frame, in radians
    pub phase_step: f32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            max_shots: 3,
            max_aliens: 12,
            explosion_particles: 40,
            shot_speed: 0.08,
            shot_limit: -10.0,
            lateral_speed: 0.1,
            lateral_limit: 10.0,
            roll_intent: 0.2,
            fire_cooldown: 15,
            hit_radius: 0.7,
            phase_step: 0.035,
        }
    }
}

/// Camera placement and lighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial eye position
    pub eye: [f32; 3],
    /// Eye x follows the player x times this
    pub eye_follow: f32,
    /// Initial look-at centre
    pub centre: [f32; 3],
    /// Centre sits this far above the player
    pub centre_height: f32,
    /// Direction towards the light (normalized on use)
    pub light_direction: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 2.0, 4.0],
            eye_follow: 1.25,
            centre: [0.0, 0.0, -5.0],
            centre_height: 1.0,
            light_direction: [0.5, 0.7, -0.5],
        }
    }
}

/// Where every texture and model is loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    /// Cube texture
    pub cube_texture: String,
    /// Player ship texture
    pub ship_texture: String,
    /// Alien texture
    pub alien_texture: String,
    /// Shot texture
    pub shot_texture: String,
    /// Explosion point sprite
    pub explosion_texture: String,
    /// Small HUD font
    pub small_font: String,
    /// Large HUD font
    pub big_font: String,
    /// Cube model
    pub cube_model: String,
    /// Player ship model
    pub ship_model: String,
    /// Alien model
    pub alien_model: String,
    /// Shot model
    pub shot_model: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            cube_texture: "resources/textures/dice.png".to_string(),
            ship_texture: "resources/textures/shipv2.png".to_string(),
            alien_texture: "resources/textures/alien.png".to_string(),
            shot_texture: "resources/textures/shot.png".to_string(),
            explosion_texture: "resources/textures/explosion.png".to_string(),
            small_font: "resources/textures/font.png".to_string(),
            big_font: "resources/textures/bigfont.png".to_string(),
            cube_model: "resources/models/cube.obj".to_string(),
            ship_model: "resources/models/ship.obj".to_string(),
            alien_model: "resources/models/alien.obj".to_string(),
            shot_model: "resources/models/shot.obj".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gameplay.max_shots, 3);
        assert_eq!(config.gameplay.max_aliens, 12);
        assert_eq!(config.timing.tick_millis, 20);
        assert_eq!(config.engine.window.title, "I N V A D E R S ! ! !");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("invaders_partial_{}.toml", std::process::id()));
        std::fs::write(&path, "[gameplay]\nmax_shots = 5\n\n[timing]\ntick_millis = 10\n").unwrap();

        let config = GameConfig::load_from_file(&path).unwrap();
        assert_eq!(config.gameplay.max_shots, 5);
        assert_eq!(config.gameplay.max_aliens, 12);
        assert_eq!(config.timing.tick_millis, 10);
        assert_eq!(config.camera, CameraConfig::default());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_pool_rejected() {
        let mut config = GameConfig::default();
        config.gameplay.max_aliens = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
