//! Top-level game errors

use invaders_engine::config::ConfigError;
use invaders_engine::EngineError;
use thiserror::Error;

/// Anything that stops the game before or while it runs
#[derive(Error, Debug)]
pub enum GameError {
    /// The config file could not be read or is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Window, renderer or loop failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
