//! Core engine implementation
//!
//! One loop iteration is: poll the window, apply a resize, stop on quit, run
//! one application tick, present the queued draws, sleep the fixed delay.
//! Errors from a tick or a frame are logged and the loop carries on.

use std::time::Duration;

use thiserror::Error;

use crate::application::{AppError, Application};
use crate::config::{ConfigError, EngineConfig};
use crate::foundation::time::FixedTicker;
use crate::input::InputState;
use crate::render::backends::VulkanBackend;
use crate::render::{GraphicsEngine, RenderError};
use crate::window::{GlfwWindow, WindowError, WindowEvents};

/// Default delay between loop iterations
pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

/// Source of per-tick window events and input
pub trait EventSource {
    /// Pump the event queue
    fn poll(&mut self) -> WindowEvents;

    /// Actions held right now
    fn input_state(&self) -> InputState;

    /// Block while the surface has no area; returns the size once it has
    fn wait_while_minimized(&mut self) -> (u32, u32);

    /// Tell the window the loop is done
    fn request_close(&mut self);
}

impl EventSource for GlfwWindow {
    fn poll(&mut self) -> WindowEvents {
        GlfwWindow::poll(self)
    }

    fn input_state(&self) -> InputState {
        GlfwWindow::input_state(self)
    }

    fn wait_while_minimized(&mut self) -> (u32, u32) {
        GlfwWindow::wait_while_minimized(self)
    }

    fn request_close(&mut self) {
        self.set_should_close(true);
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window creation failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Renderer creation or teardown failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The application failed to start
    #[error("Application error: {0}")]
    Application(#[from] AppError),

    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Main engine struct
///
/// Owns the graphics engine and the window. The graphics engine is declared
/// first so the GPU objects are gone before the window that backs the surface.
pub struct Engine<W: EventSource = GlfwWindow> {
    graphics: GraphicsEngine,
    window: W,
    ticker: FixedTicker,
    running: bool,
}

impl Engine<GlfwWindow> {
    /// Open the window and bring up the Vulkan renderer
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let window = GlfwWindow::new(&config.window)?;
        let backend = VulkanBackend::new(&window, &config.renderer, &config.window.title)?;
        let graphics = GraphicsEngine::new(Box::new(backend), config.renderer.clear_color)?;

        Ok(Self::with_parts(graphics, window, FixedTicker::new(DEFAULT_TICK)))
    }
}

impl<W: EventSource> Engine<W> {
    /// Assemble an engine from already-built parts
    pub fn with_parts(graphics: GraphicsEngine, window: W, ticker: FixedTicker) -> Self {
        Self {
            graphics,
            window,
            ticker,
            running: true,
        }
    }

    /// Replace the loop pacing
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.ticker = FixedTicker::new(interval);
        self
    }

    /// Run `app` until quit, then tear down.
    ///
    /// Only a failed [`Application::initialize`] ends the run with an error;
    /// the application is cleaned up either way.
    pub fn run<A: Application>(mut self, app: &mut A) -> Result<(), EngineError> {
        if let Err(e) = app.initialize(&mut self.graphics) {
            log::error!("Application failed to initialize: {}", e);
            self.teardown(app);
            return Err(e.into());
        }

        log::info!("Starting main loop...");
        while self.running {
            self.step(app);
        }

        self.teardown(app);
        log::info!("Engine shutdown complete after {} ticks", self.ticker.tick_count());
        Ok(())
    }

    /// One loop iteration
    fn step<A: Application>(&mut self, app: &mut A) {
        let events = self.window.poll();
        if events.close_requested {
            self.quit();
            return;
        }

        if let Some((mut width, mut height)) = events.resized {
            if width == 0 || height == 0 {
                (width, height) = self.window.wait_while_minimized();
            }
            match self.graphics.on_resize(width, height) {
                Ok(()) => app.on_resize(&mut self.graphics, width, height),
                Err(e) => log::error!("Resize to {}x{} failed: {}", width, height, e),
            }
        }

        let input = self.window.input_state();
        if input.contains(InputState::QUIT) {
            self.quit();
            return;
        }

        if let Err(e) = app.update(&mut self.graphics, input) {
            log::error!("Update failed: {}", e);
        }
        if let Err(e) = self.graphics.render_frame() {
            log::error!("Frame failed: {}", e);
        }

        self.ticker.wait();
    }

    /// Stop after the current iteration
    pub fn quit(&mut self) {
        if self.running {
            log::info!("Engine shutdown requested");
        }
        self.running = false;
        self.window.request_close();
    }

    fn teardown<A: Application>(&mut self, app: &mut A) {
        if let Err(e) = self.graphics.wait_idle() {
            log::warn!("Wait for idle failed: {}", e);
        }
        app.cleanup(&mut self.graphics);
        if let Err(e) = self.graphics.shutdown() {
            log::warn!("Graphics shutdown failed: {}", e);
        }
    }

    /// The graphics engine
    pub fn graphics(&self) -> &GraphicsEngine {
        &self.graphics
    }

    /// Mutable graphics engine
    pub fn graphics_mut(&mut self) -> &mut GraphicsEngine {
        &mut self.graphics
    }
}
