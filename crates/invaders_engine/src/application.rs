//! Application trait and lifecycle management

use thiserror::Error;

use crate::assets::AssetError;
use crate::input::InputState;
use crate::render::{GraphicsEngine, RenderError};

/// Application lifecycle trait
///
/// Implement this trait to drive a game with [`Engine`](crate::Engine).
pub trait Application {
    /// Load assets and set up the initial state.
    ///
    /// Called once after the graphics engine exists and before the first tick.
    fn initialize(&mut self, graphics: &mut GraphicsEngine) -> Result<(), AppError>;

    /// Advance one fixed tick and queue this tick's draws.
    ///
    /// # Arguments
    /// * `graphics` - Drawing entry points; queued draws are presented after the call
    /// * `input` - Actions held during this tick
    fn update(&mut self, graphics: &mut GraphicsEngine, input: InputState) -> Result<(), AppError>;

    /// The surface changed size. The graphics engine has already reprojected.
    fn on_resize(&mut self, _graphics: &mut GraphicsEngine, _width: u32, _height: u32) {}

    /// Release everything created in [`Self::initialize`].
    ///
    /// Called once after the loop ends, with the GPU idle.
    fn cleanup(&mut self, graphics: &mut GraphicsEngine);
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Rendering failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Asset loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
