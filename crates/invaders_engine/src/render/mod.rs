//! Rendering system
//!
//! [`GraphicsEngine`] is what game code talks to. It owns the backend, the
//! 3D camera and the three drawing subsystems (objects, particles, overlay),
//! and collects everything drawn during an update into a [`DrawQueue`] that
//! is replayed in pass order by [`GraphicsEngine::render_frame`].
//!
//! ```text
//! update()                                   render_frame()
//!   draw_object   ──► opaque list    ──┐
//!   draw_particles ──► particles list ──┼──► Opaque ► Particles ► Overlay
//!   print / draw_sprite ► overlay list ─┘
//! ```

pub mod api;
pub mod backends;
pub mod draw_queue;
pub mod overlay;
pub mod particles;
pub mod pipeline;
pub mod primitives;

use std::fmt;

use thiserror::Error;

use crate::foundation::math::{safe_normalize, Mat4, Vec3};
pub use api::{
    BackendResult, BufferHandle, MeshHandle, RenderBackend, RenderPass, TextureHandle,
};
pub use backends::vulkan::VulkanError;
pub use draw_queue::DrawQueue;
pub use overlay::{Font, FontMetrics, SpriteRenderer, TextRenderer};
pub use particles::{PointCloud, PointCloudRenderer};
pub use pipeline::{compose, FrameMatrices, ObjectPipeline, RenderObject, Rotation};
pub use primitives::{Camera, Mesh, Vertex};

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Backend-specific failure
    #[error("Backend error: {0}")]
    BackendError(String),

    /// A handle that the backend does not know
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// A compiled shader could not be read
    #[error("Shader load failed: {0}")]
    ShaderLoad(String),

    /// A pass was started after a later one in the same frame
    #[error("Pass {requested:?} requested after {current:?}")]
    PassOrder {
        /// Pass the frame is in
        current: RenderPass,
        /// Pass that was asked for
        requested: RenderPass,
    },

    /// A draw was issued outside the pass it belongs to
    #[error("Draw for pass {expected:?} issued while in {current:?}")]
    WrongPass {
        /// Pass the draw needs
        expected: RenderPass,
        /// Pass the frame is in, if any
        current: Option<RenderPass>,
    },

    /// A frame operation was called between frames
    #[error("No frame in progress")]
    NoActiveFrame,

    /// Vulkan failure
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Default direction towards the light
pub const DEFAULT_LIGHT_DIRECTION: [f32; 3] = [0.5, 0.7, -0.5];

/// Backend plus the per-frame drawing state game code works with
pub struct GraphicsEngine {
    backend: Box<dyn RenderBackend>,
    camera: Camera,
    view: Mat4,
    view_projection: Mat4,
    light_dir: Vec3,
    objects: ObjectPipeline,
    particles: PointCloudRenderer,
    text: TextRenderer,
    sprites: Option<SpriteRenderer>,
    queue: DrawQueue,
    clear_color: [f32; 4],
}

impl GraphicsEngine {
    /// Wrap `backend`, sizing every projection to its current surface
    pub fn new(mut backend: Box<dyn RenderBackend>, clear_color: [f32; 4]) -> RenderResult<Self> {
        let (width, height) = backend.surface_size();
        let sprites = SpriteRenderer::new(backend.as_mut(), width, height)?;
        let camera = Camera::for_viewport(Vec3::zeros(), width, height);

        let mut engine = Self {
            backend,
            view: Mat4::identity(),
            view_projection: Mat4::identity(),
            camera,
            light_dir: Vec3::from(DEFAULT_LIGHT_DIRECTION).normalize(),
            objects: ObjectPipeline::new(),
            particles: PointCloudRenderer::new(width),
            text: TextRenderer::new(width, height),
            sprites: Some(sprites),
            queue: DrawQueue::new(),
            clear_color,
        };
        engine.refresh_view();
        log::info!("Graphics engine ready ({}x{})", width, height);
        Ok(engine)
    }

    /// The 3D camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable 3D camera; call [`Self::refresh_view`] to latch changes
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Recompute the cached view and view-projection from the camera
    pub fn refresh_view(&mut self) {
        self.view = self.camera.view_matrix();
        self.view_projection = self.camera.view_projection_matrix();
    }

    /// Cached view-projection (as of the last [`Self::refresh_view`])
    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Set the direction towards the light; zero-length falls back to +Y
    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light_dir = safe_normalize(direction, Vec3::y());
    }

    /// Inputs shared by every object draw this frame
    pub fn frame_matrices(&self) -> FrameMatrices {
        FrameMatrices {
            view: self.view,
            view_projection: self.view_projection,
            light_dir: self.light_dir,
            view_dir: self.camera.view_direction(),
        }
    }

    /// Queue a solid model placed by `model`
    pub fn draw_object(&mut self, object: &RenderObject, model: &Mat4) {
        let frame = self.frame_matrices();
        self.objects.draw_model(&mut self.queue, object, model, &frame);
    }

    /// Upload an effect's positions and queue it placed by `model`
    pub fn draw_particles(&mut self, effect: &PointCloud, model: &Mat4, texture: TextureHandle) -> RenderResult<()> {
        let mvp = self.view_projection * model;
        self.particles
            .draw(self.backend.as_mut(), &mut self.queue, effect, mvp, texture)
    }

    /// Queue formatted text with the pen starting at pixel `(x, y)`
    pub fn print(&mut self, font: &Font, x: f32, y: f32, args: fmt::Arguments<'_>) {
        self.text.draw(&mut self.queue, font, x, y, args);
    }

    /// Queue a sprite centred at pixel `(x, y)`
    pub fn draw_sprite(&mut self, x: f32, y: f32, width: f32, height: f32, rotation: f32, texture: TextureHandle) {
        if let Some(sprites) = &self.sprites {
            sprites.draw(&mut self.queue, x, y, width, height, rotation, texture);
        }
    }

    /// The surface changed size: update the camera, overlay and particle
    /// projections and the backend. Zero-sized surfaces only reach the backend.
    pub fn on_resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        log::debug!("Resize to {}x{}", width, height);
        self.backend.resize(width, height)?;
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.camera.set_aspect_from_size(width, height);
        self.text.reproject(width, height);
        if let Some(sprites) = &mut self.sprites {
            sprites.reproject(width, height);
        }
        self.particles.resize(width);
        Ok(())
    }

    /// Replay the queued draws as one frame, then empty the queue.
    ///
    /// The queue is emptied even when the frame is skipped or fails so draws
    /// never leak into the next frame.
    pub fn render_frame(&mut self) -> RenderResult<()> {
        let result = self.submit_queue();
        self.queue.clear();
        result
    }

    fn submit_queue(&mut self) -> RenderResult<()> {
        if !self.backend.begin_frame(self.clear_color)? {
            log::trace!("Frame skipped");
            return Ok(());
        }
        // An opened frame is always closed, even after a failed draw
        let drawn = self.queue.execute(self.backend.as_mut());
        let ended = self.backend.end_frame();
        drawn.and(ended)
    }

    /// Draws queued since the last frame
    pub fn queue(&self) -> &DrawQueue {
        &self.queue
    }

    /// Resource creation and direct backend access
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Read-only backend access
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Build a font over `texture`
    pub fn create_font(&mut self, texture: TextureHandle, metrics: FontMetrics) -> RenderResult<Font> {
        Font::new(self.backend.as_mut(), texture, metrics)
    }

    /// Wait for the GPU to finish everything submitted
    pub fn wait_idle(&self) -> RenderResult<()> {
        self.backend.wait_idle()
    }

    /// Release the engine's own GPU resources. Call after the application has
    /// released its own and before dropping the engine.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        self.backend.wait_idle()?;
        if let Some(sprites) = self.sprites.take() {
            sprites.destroy(self.backend.as_mut());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageData;
    use crate::foundation::math::{Mat4Ext, Vec4};
    use crate::render::backends::recording::Recorded;
    use crate::render::backends::RecordingBackend;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Engine over a recording backend; the backend is reachable through `backend()`
    fn engine() -> GraphicsEngine {
        GraphicsEngine::new(Box::new(RecordingBackend::new(640, 480)), [0.0, 0.5, 1.0, 1.0]).unwrap()
    }

    fn recording(engine: &GraphicsEngine) -> &RecordingBackend {
        engine.backend().as_any().downcast_ref::<RecordingBackend>().unwrap()
    }

    fn small_font(engine: &mut GraphicsEngine) -> Font {
        let texture = engine
            .backend_mut()
            .create_texture(&ImageData::solid_color(256, 256, [255; 4]))
            .unwrap();
        let metrics = FontMetrics {
            base: 0,
            texture_height: 256.0,
            lines: 16.0,
            glyph_width: 16.0,
            glyph_height: 16.0,
        };
        engine.create_font(texture, metrics).unwrap()
    }

    #[test]
    fn test_frame_runs_passes_in_order() {
        let mut engine = engine();
        let font = small_font(&mut engine);
        let mut effect = PointCloud::create(engine.backend_mut(), 40).unwrap();
        effect.reset(&mut StdRng::seed_from_u64(1), -1.0..1.0);

        // Submitted out of pass order on purpose
        engine.print(&font, 10.0, 10.0, format_args!("hi"));
        engine.draw_particles(&effect, &Mat4::identity(), TextureHandle::NULL).unwrap();
        engine.draw_object(&RenderObject::new(MeshHandle(99), TextureHandle::NULL), &Mat4::identity());
        engine.render_frame().unwrap();

        let kinds: Vec<&str> = recording(&engine).frame_log().iter().map(Recorded::kind).collect();
        assert_eq!(
            kinds,
            ["begin_frame", "pass", "mesh", "pass", "points", "pass", "quad", "quad", "end_frame"]
        );
        assert!(engine.queue().is_empty());
    }

    #[test]
    fn test_draws_use_latched_view_projection() {
        let mut engine = engine();
        let before = *engine.view_projection();

        engine.camera_mut().set_position(Vec3::new(0.0, 2.0, 4.0));
        engine.camera_mut().set_target(Vec3::new(0.0, 1.0, -5.0));
        engine.draw_object(&RenderObject::default(), &Mat4::identity());
        assert_eq!(engine.queue().opaque()[0].mvp, before);

        engine.refresh_view();
        engine.draw_object(&RenderObject::default(), &Mat4::identity());
        assert_eq!(engine.queue().opaque()[1].mvp, engine.camera().view_projection_matrix());
    }

    #[test]
    fn test_resize_updates_projections() {
        let mut engine = engine();
        engine.on_resize(960, 480).unwrap();
        assert_relative_eq!(engine.camera().aspect, 2.0);
        assert_eq!(recording(&engine).resizes(), &[(960, 480)]);

        let effect = PointCloud::create(engine.backend_mut(), 4).unwrap();
        engine.draw_particles(&effect, &Mat4::identity(), TextureHandle::NULL).unwrap();
        assert_relative_eq!(engine.queue().particles()[0].point_size, 40.0);

        engine.draw_sprite(960.0, 0.0, 2.0, 2.0, 0.0, TextureHandle::NULL);
        let centre = engine.queue().overlay()[0].transform * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(centre.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_resize_keeps_projections() {
        let mut engine = engine();
        engine.on_resize(0, 0).unwrap();
        assert_relative_eq!(engine.camera().aspect, 640.0 / 480.0);
        // Backend reports an empty surface so the frame is skipped
        engine.draw_object(&RenderObject::default(), &Mat4::identity());
        engine.render_frame().unwrap();
        assert_eq!(recording(&engine).frames_completed(), 0);
        assert!(engine.queue().is_empty());
    }

    #[test]
    fn test_particles_placed_by_model() {
        let mut engine = engine();
        let effect = PointCloud::create(engine.backend_mut(), 4).unwrap();
        let model = Mat4::new_translation(&Vec3::new(1.0, 0.0, -6.0)) * Mat4::rotation_y(0.0);
        engine.draw_particles(&effect, &model, TextureHandle(5)).unwrap();
        let draw = &engine.queue().particles()[0];
        assert_eq!(draw.mvp, engine.view_projection() * model);
        assert_eq!(draw.count, 4);
    }

    #[test]
    fn test_zero_light_direction_falls_back() {
        let mut engine = engine();
        engine.set_light_direction(Vec3::zeros());
        assert_eq!(engine.frame_matrices().light_dir, Vec3::y());
    }

    #[test]
    fn test_shutdown_releases_sprite_quad() {
        let mut engine = engine();
        let before = recording(&engine).live_resources().2;
        engine.shutdown().unwrap();
        assert_eq!(recording(&engine).live_resources().2, before - 2);
    }
}
