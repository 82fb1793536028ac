//! # Invaders Engine
//!
//! A small Vulkan rendering core for a fixed-tick 3D arcade game.
//!
//! ## Features
//!
//! - **Object pipeline**: textured, lit meshes placed by a model matrix
//! - **Point-cloud particles**: analytic explosion effects drawn as point sprites
//! - **Overlay**: formatted bitmap-font text and rotated sprites in pixel space
//! - **Ordered passes**: opaque, then particles, then overlay, whatever order draws were queued in
//! - **Headless testing**: a recording backend stands in for the GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invaders_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, graphics: &mut GraphicsEngine) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, graphics: &mut GraphicsEngine, input: InputState) -> Result<(), AppError> {
//!         graphics.draw_sprite(320.0, 240.0, 64.0, 64.0, 0.0, TextureHandle::NULL);
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, graphics: &mut GraphicsEngine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(&EngineConfig::default())?;
//!     engine.run(&mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc
)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod render;
pub mod window;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError, EventSource, DEFAULT_TICK};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{load_mesh, load_texture, AssetError},
        config::{Config, ConfigError, EngineConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::FixedTicker,
        },
        input::InputState,
        render::{
            compose, Font, FontMetrics, GraphicsEngine, MeshHandle, PointCloud, RenderError, RenderObject, Rotation,
            TextureHandle,
        },
        AppError, Application, Engine, EngineError,
    };
}
