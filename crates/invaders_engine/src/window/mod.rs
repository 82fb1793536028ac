//! Window management using GLFW
//!
//! Creates a Vulkan-ready window (no client API) and turns GLFW's event queue
//! and key polling into the small per-tick snapshot the game loop consumes.

use thiserror::Error;

use crate::config::WindowConfig;
use crate::input::{InputState, KeyCode};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// GLFW refused to create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// Other GLFW failure
    #[error("GLFW error: {0}")]
    Glfw(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// What happened to the window since the previous poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowEvents {
    /// The user asked to close the window
    pub close_requested: bool,
    /// Latest framebuffer size if it changed
    pub resized: Option<(u32, u32)>,
}

/// GLFW window wrapper with proper resource management
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Create a window for Vulkan rendering
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self { glfw, window, events })
    }

    /// Pump GLFW and collect close/resize notifications
    pub fn poll(&mut self) -> WindowEvents {
        self.glfw.poll_events();

        let mut result = WindowEvents {
            close_requested: self.window.should_close(),
            resized: None,
        };
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Close => result.close_requested = true,
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    result.resized = Some((width.max(0) as u32, height.max(0) as u32));
                }
                _ => {}
            }
        }
        result
    }

    /// Sample the keys the game cares about
    pub fn input_state(&self) -> InputState {
        InputState::from_keys(KeyCode::POLLED.into_iter().filter(|&key| {
            matches!(
                self.window.get_key(to_glfw_key(key)),
                glfw::Action::Press | glfw::Action::Repeat
            )
        }))
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Block until the window has a non-zero framebuffer (e.g. while minimized)
    pub fn wait_while_minimized(&mut self) -> (u32, u32) {
        let mut size = self.framebuffer_size();
        while (size.0 == 0 || size.1 == 0) && !self.window.should_close() {
            self.glfw.wait_events();
            size = self.framebuffer_size();
        }
        size
    }

    /// Mark the window as closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::Glfw("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::Glfw(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }
}

fn to_glfw_key(key: KeyCode) -> glfw::Key {
    match key {
        KeyCode::Escape => glfw::Key::Escape,
        KeyCode::Left => glfw::Key::Left,
        KeyCode::Right => glfw::Key::Right,
        KeyCode::LeftControl => glfw::Key::LeftControl,
        KeyCode::Space => glfw::Key::Space,
    }
}
