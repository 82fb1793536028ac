//! The game as an engine application

use invaders_engine::foundation::math::Vec3;
use invaders_engine::input::InputState;
use invaders_engine::render::GraphicsEngine;
use invaders_engine::{AppError, Application};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assets::GameAssets;
use crate::config::GameConfig;
use crate::state::GameState;

/// Wobble radius of the frame counter, in pixels
const HUD_WOBBLE: f32 = 16.0;

/// Invaders game application
pub struct InvadersApp {
    config: GameConfig,
    rng: StdRng,
    assets: Option<GameAssets>,
    state: Option<GameState>,
}

impl InvadersApp {
    /// Create the game; nothing is loaded until the engine initializes it
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create the game with a fixed random source
    pub fn with_rng(config: GameConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng,
            assets: None,
            state: None,
        }
    }

    /// Live game state, once initialized
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Loaded assets, once initialized
    pub fn assets(&self) -> Option<&GameAssets> {
        self.assets.as_ref()
    }

    fn draw_hud(graphics: &mut GraphicsEngine, assets: &GameAssets, state: &GameState) {
        let phase = state.phase();
        let (eye, centre) = (state.eye(), state.centre());

        graphics.print(
            &assets.big_font,
            50.0 + phase.sin() * HUD_WOBBLE,
            240.0 + phase.cos() * HUD_WOBBLE,
            format_args!("frame={}", state.frame()),
        );
        graphics.print(
            &assets.small_font,
            100.0,
            280.0,
            format_args!("eye    {:3.2} {:3.2} {:3.2}", eye.x, eye.y, eye.z),
        );
        graphics.print(
            &assets.small_font,
            100.0,
            296.0,
            format_args!("centre {:3.2} {:3.2} {:3.2}", centre.x, centre.y, centre.z),
        );
        graphics.print(
            &assets.small_font,
            100.0,
            340.0,
            format_args!("frame {} {}", state.frame(), state.frame() % 20),
        );
    }
}

impl Application for InvadersApp {
    fn initialize(&mut self, graphics: &mut GraphicsEngine) -> Result<(), AppError> {
        let camera = &self.config.camera;
        graphics.set_light_direction(Vec3::from(camera.light_direction));
        let view = graphics.camera_mut();
        view.set_position(Vec3::from(camera.eye));
        view.set_target(Vec3::from(camera.centre));
        graphics.refresh_view();

        let assets = GameAssets::load(graphics, &self.config.assets)?;
        let state = GameState::new(
            graphics.backend_mut(),
            &self.config.gameplay,
            &self.config.camera,
            &mut self.rng,
        )?;
        self.assets = Some(assets);
        self.state = Some(state);
        log::info!("Invaders initialized");
        Ok(())
    }

    fn update(&mut self, graphics: &mut GraphicsEngine, input: InputState) -> Result<(), AppError> {
        let (Some(assets), Some(state)) = (&self.assets, &mut self.state) else {
            return Err(AppError::Custom("update before initialize".to_string()));
        };
        state.tick(graphics, &assets.scene, input, &mut self.rng);
        Self::draw_hud(graphics, assets, state);
        Ok(())
    }

    fn cleanup(&mut self, graphics: &mut GraphicsEngine) {
        if let Some(state) = self.state.take() {
            log::info!("Leaving after {} frames", state.frame());
            state.destroy(graphics.backend_mut());
        }
        if let Some(assets) = self.assets.take() {
            assets.release(graphics.backend_mut());
        }
    }
}
