//! I N V A D E R S
//!
//! Usage: `invaders [config.toml]`. Without an argument `invaders.toml` is
//! read from the working directory when present.

mod app;
mod assets;
mod config;
mod error;
mod pid;
mod state;

use std::time::Duration;

use invaders_engine::config::Config;
use invaders_engine::foundation::logging;
use invaders_engine::Engine;

use crate::app::InvadersApp;
use crate::config::{GameConfig, DEFAULT_CONFIG_PATH};
use crate::error::GameError;

fn main() -> Result<(), GameError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = GameConfig::load_or_default(&path)?;
    config.validate()?;

    logging::init_with_level(config.engine.logging.level_filter());
    log::info!("Starting {}", config.engine.window.title);

    let engine = Engine::new(&config.engine)?.with_tick_interval(Duration::from_millis(config.timing.tick_millis));
    let mut app = InvadersApp::new(config);
    engine.run(&mut app)?;

    log::info!("Bye");
    Ok(())
}
