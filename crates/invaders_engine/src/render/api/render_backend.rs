//! Backend abstraction for the rendering system
//!
//! Everything above this trait works with opaque handles and plain draw
//! descriptions. A backend owns the GPU objects behind the handles and turns
//! draws into API calls.

use crate::assets::ImageData;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::primitives::Mesh;
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// Handle that refers to nothing; what failed loads hand back
            pub const NULL: Self = Self(0);

            /// Whether this is the null handle
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

resource_handle!(
    /// Handle to a texture stored in the backend
    TextureHandle
);
resource_handle!(
    /// Handle to an uploaded mesh (vertex + index buffers)
    MeshHandle
);
resource_handle!(
    /// Handle to a raw vertex buffer of `f32` components
    BufferHandle
);

/// How often a vertex buffer is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once at creation
    Static,
    /// Rewritten every frame
    Dynamic,
}

/// Render passes in the order a frame must execute them.
///
/// Solid geometry fills the depth buffer first, particles then test against
/// it without writing, and the overlay is painted last with no depth test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPass {
    /// Depth test and write on, blending off, triangles
    Opaque,
    /// Depth test on, depth write off, blending on, points
    Particles,
    /// Depth test off, blending on, screen-space triangles
    Overlay,
}

/// Fixed-function state a pass runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassState {
    /// Fragments are depth tested
    pub depth_test: bool,
    /// Fragments write depth
    pub depth_write: bool,
    /// Alpha blending
    pub blend: bool,
}

impl RenderPass {
    /// All passes in execution order
    pub const ORDER: [RenderPass; 3] = [RenderPass::Opaque, RenderPass::Particles, RenderPass::Overlay];

    /// Pipeline state this pass binds
    pub fn state(self) -> PassState {
        match self {
            RenderPass::Opaque => PassState {
                depth_test: true,
                depth_write: true,
                blend: false,
            },
            RenderPass::Particles => PassState {
                depth_test: true,
                depth_write: false,
                blend: true,
            },
            RenderPass::Overlay => PassState {
                depth_test: false,
                depth_write: false,
                blend: true,
            },
        }
    }
}

/// Guards the pass order within one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct PassTracker {
    current: Option<RenderPass>,
}

impl PassTracker {
    /// Start a new frame
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Move to `pass`; going back to an earlier pass is an error
    pub fn enter(&mut self, pass: RenderPass) -> BackendResult<()> {
        if let Some(current) = self.current {
            if pass < current {
                return Err(RenderError::PassOrder { current, requested: pass });
            }
        }
        self.current = Some(pass);
        Ok(())
    }

    /// Fail unless the frame is currently in `pass`
    pub fn require(&self, pass: RenderPass) -> BackendResult<()> {
        match self.current {
            Some(current) if current == pass => Ok(()),
            current => Err(RenderError::WrongPass { expected: pass, current }),
        }
    }

    /// Pass the frame is in, if any
    pub fn current(&self) -> Option<RenderPass> {
        self.current
    }
}

/// One textured, lit mesh draw
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Texture bound to unit 0
    pub texture: TextureHandle,
    /// Model-view-projection matrix
    pub mvp: Mat4,
    /// Model-view matrix (normals)
    pub model_view: Mat4,
    /// Unit direction towards the light
    pub light_dir: Vec3,
    /// Unit direction towards the viewer
    pub view_dir: Vec3,
}

/// One point-cloud draw
#[derive(Debug, Clone, PartialEq)]
pub struct PointsDraw {
    /// Buffer of `xyz` positions
    pub buffer: BufferHandle,
    /// Number of points
    pub count: u32,
    /// Sprite texture for every point
    pub texture: TextureHandle,
    /// Model-view-projection matrix
    pub mvp: Mat4,
    /// Point size in pixels
    pub point_size: f32,
}

/// One screen-space quad draw (a glyph or a sprite)
#[derive(Debug, Clone, PartialEq)]
pub struct QuadDraw {
    /// Buffer of six `xyz` corner positions
    pub vertices: BufferHandle,
    /// Buffer of six `uv` coordinates
    pub uvs: BufferHandle,
    /// Texture to sample
    pub texture: TextureHandle,
    /// Orthographic projection times the quad's placement
    pub transform: Mat4,
    /// Added to every UV (glyph cell)
    pub uv_offset: [f32; 2],
    /// Multiplies every corner's x and y (sprite size)
    pub size: [f32; 2],
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Current drawable size in pixels
    fn surface_size(&self) -> (u32, u32);

    /// Upload an RGBA8 image
    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle>;

    /// Release a texture; null and unknown handles are ignored
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Upload a mesh
    fn create_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle>;

    /// Release a mesh; null and unknown handles are ignored
    fn destroy_mesh(&mut self, mesh: MeshHandle);

    /// Create a vertex buffer holding `data`
    fn create_vertex_buffer(&mut self, data: &[f32], usage: BufferUsage) -> BackendResult<BufferHandle>;

    /// Overwrite the start of a vertex buffer with `data`
    fn update_vertex_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> BackendResult<()>;

    /// Release a vertex buffer; null and unknown handles are ignored
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Start a frame. `Ok(false)` means the frame must be skipped (surface out of date).
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> BackendResult<bool>;

    /// Switch to `pass`; passes only move forward within a frame
    fn begin_pass(&mut self, pass: RenderPass) -> BackendResult<()>;

    /// Draw a mesh (Opaque pass)
    fn draw_mesh(&mut self, draw: &MeshDraw) -> BackendResult<()>;

    /// Draw a point cloud (Particles pass)
    fn draw_points(&mut self, draw: &PointsDraw) -> BackendResult<()>;

    /// Draw a screen-space quad (Overlay pass)
    fn draw_quad(&mut self, draw: &QuadDraw) -> BackendResult<()>;

    /// Finish and present the frame
    fn end_frame(&mut self) -> BackendResult<()>;

    /// The output surface changed size
    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Wait for the device to be idle
    fn wait_idle(&self) -> BackendResult<()>;

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_order_is_forward_only() {
        let mut tracker = PassTracker::default();
        tracker.enter(RenderPass::Opaque).unwrap();
        tracker.enter(RenderPass::Overlay).unwrap();
        let err = tracker.enter(RenderPass::Particles).unwrap_err();
        assert!(matches!(
            err,
            RenderError::PassOrder {
                current: RenderPass::Overlay,
                requested: RenderPass::Particles
            }
        ));

        tracker.reset();
        assert!(tracker.enter(RenderPass::Particles).is_ok());
    }

    #[test]
    fn test_require_checks_current_pass() {
        let mut tracker = PassTracker::default();
        assert!(tracker.require(RenderPass::Opaque).is_err());
        tracker.enter(RenderPass::Opaque).unwrap();
        assert!(tracker.require(RenderPass::Opaque).is_ok());
        assert!(tracker.require(RenderPass::Overlay).is_err());
    }

    #[test]
    fn test_pass_states() {
        let particles = RenderPass::Particles.state();
        assert!(particles.depth_test && !particles.depth_write && particles.blend);
        let overlay = RenderPass::Overlay.state();
        assert!(!overlay.depth_test && overlay.blend);
        assert!(!RenderPass::Opaque.state().blend);
    }

    #[test]
    fn test_null_handles() {
        assert!(TextureHandle::NULL.is_null());
        assert!(TextureHandle::default().is_null());
        assert!(!MeshHandle(7).is_null());
    }
}
