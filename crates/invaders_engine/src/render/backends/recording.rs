//! GPU-less backend that records what it is asked to do
//!
//! Used by tests and by headless runs. It enforces the same frame rules as
//! the Vulkan backend (pass order, draws inside the matching pass) and keeps
//! buffer contents so uploaded particle positions can be inspected.

use std::collections::HashMap;

use crate::assets::ImageData;
use crate::render::api::{
    BackendResult, BufferHandle, BufferUsage, MeshDraw, MeshHandle, PassTracker, PointsDraw, QuadDraw,
    RenderBackend, RenderPass, TextureHandle,
};
use crate::render::primitives::Mesh;
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// `begin_frame`
    BeginFrame {
        /// Clear colour requested
        clear_color: [f32; 4],
    },
    /// `begin_pass`
    Pass(RenderPass),
    /// `draw_mesh`
    Mesh(MeshDraw),
    /// `draw_points`, with the buffer contents at draw time
    Points {
        /// The draw
        draw: PointsDraw,
        /// Snapshot of the position buffer
        positions: Vec<f32>,
    },
    /// `draw_quad`
    Quad(QuadDraw),
    /// `end_frame`
    EndFrame,
}

impl Recorded {
    /// Short name of the call
    pub fn kind(&self) -> &'static str {
        match self {
            Recorded::BeginFrame { .. } => "begin_frame",
            Recorded::Pass(_) => "pass",
            Recorded::Mesh(_) => "mesh",
            Recorded::Points { .. } => "points",
            Recorded::Quad(_) => "quad",
            Recorded::EndFrame => "end_frame",
        }
    }
}

/// Backend that stores resources in memory and logs draw calls
#[derive(Debug, Default)]
pub struct RecordingBackend {
    size: (u32, u32),
    next_id: u64,
    textures: HashMap<u64, (u32, u32)>,
    meshes: HashMap<u64, u32>,
    buffers: HashMap<u64, Vec<f32>>,
    log: Vec<Recorded>,
    in_frame: bool,
    passes: PassTracker,
    frames_completed: u64,
    resizes: Vec<(u32, u32)>,
}

impl RecordingBackend {
    /// Create a backend reporting a surface of `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            next_id: 1,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_draw(&mut self, pass: RenderPass, entry: Recorded) -> BackendResult<()> {
        if !self.in_frame {
            return Err(RenderError::NoActiveFrame);
        }
        self.passes.require(pass)?;
        self.log.push(entry);
        Ok(())
    }

    /// Calls recorded since the last `begin_frame`
    pub fn frame_log(&self) -> &[Recorded] {
        &self.log
    }

    /// Mesh handles drawn this frame, in order
    pub fn meshes_drawn(&self) -> Vec<MeshHandle> {
        self.log
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Mesh(draw) => Some(draw.mesh),
                _ => None,
            })
            .collect()
    }

    /// Point-cloud draws this frame with their uploaded positions
    pub fn points_drawn(&self) -> Vec<(&PointsDraw, &[f32])> {
        self.log
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Points { draw, positions } => Some((draw, positions.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Overlay quads drawn this frame
    pub fn quads_drawn(&self) -> Vec<&QuadDraw> {
        self.log
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Quad(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    /// Current contents of a vertex buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[f32]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    /// Number of live textures, meshes and buffers
    pub fn live_resources(&self) -> (usize, usize, usize) {
        (self.textures.len(), self.meshes.len(), self.buffers.len())
    }

    /// Frames that reached `end_frame`
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Sizes passed to `resize`, oldest first
    pub fn resizes(&self) -> &[(u32, u32)] {
        &self.resizes
    }
}

impl RenderBackend for RecordingBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        let id = self.allocate_id();
        self.textures.insert(id, (image.width, image.height));
        Ok(TextureHandle(id))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle> {
        if mesh.vertices.is_empty() {
            return Err(RenderError::BackendError("mesh has no vertices".to_string()));
        }
        let id = self.allocate_id();
        self.meshes.insert(id, mesh.index_count());
        Ok(MeshHandle(id))
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.remove(&mesh.0);
    }

    fn create_vertex_buffer(&mut self, data: &[f32], _usage: BufferUsage) -> BackendResult<BufferHandle> {
        let id = self.allocate_id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferHandle(id))
    }

    fn update_vertex_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> BackendResult<()> {
        let stored = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))?;
        if data.len() > stored.len() {
            return Err(RenderError::BackendError(format!(
                "update of {} floats into buffer of {}",
                data.len(),
                stored.len()
            )));
        }
        stored[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> BackendResult<bool> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return Ok(false);
        }
        self.log.clear();
        self.passes.reset();
        self.in_frame = true;
        self.log.push(Recorded::BeginFrame { clear_color });
        Ok(true)
    }

    fn begin_pass(&mut self, pass: RenderPass) -> BackendResult<()> {
        if !self.in_frame {
            return Err(RenderError::NoActiveFrame);
        }
        self.passes.enter(pass)?;
        self.log.push(Recorded::Pass(pass));
        Ok(())
    }

    fn draw_mesh(&mut self, draw: &MeshDraw) -> BackendResult<()> {
        self.record_draw(RenderPass::Opaque, Recorded::Mesh(draw.clone()))
    }

    fn draw_points(&mut self, draw: &PointsDraw) -> BackendResult<()> {
        let positions = self.buffers.get(&draw.buffer.0).cloned().unwrap_or_default();
        self.record_draw(
            RenderPass::Particles,
            Recorded::Points {
                draw: draw.clone(),
                positions,
            },
        )
    }

    fn draw_quad(&mut self, draw: &QuadDraw) -> BackendResult<()> {
        self.record_draw(RenderPass::Overlay, Recorded::Quad(draw.clone()))
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if !self.in_frame {
            return Err(RenderError::NoActiveFrame);
        }
        self.in_frame = false;
        self.frames_completed += 1;
        self.log.push(Recorded::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.size = (width, height);
        self.resizes.push((width, height));
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_outside_pass_is_rejected() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.begin_frame([0.0; 4]).unwrap();
        backend.begin_pass(RenderPass::Overlay).unwrap();
        let draw = MeshDraw {
            mesh: MeshHandle(1),
            texture: TextureHandle::NULL,
            mvp: crate::foundation::math::Mat4::identity(),
            model_view: crate::foundation::math::Mat4::identity(),
            light_dir: crate::foundation::math::Vec3::y(),
            view_dir: crate::foundation::math::Vec3::z(),
        };
        assert!(matches!(backend.draw_mesh(&draw), Err(RenderError::WrongPass { .. })));
    }

    #[test]
    fn test_buffer_update_bounds() {
        let mut backend = RecordingBackend::new(64, 64);
        let buffer = backend.create_vertex_buffer(&[0.0; 6], BufferUsage::Dynamic).unwrap();
        backend.update_vertex_buffer(buffer, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(backend.buffer_data(buffer).unwrap(), &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        assert!(backend.update_vertex_buffer(buffer, &[0.0; 7]).is_err());
        assert!(backend.update_vertex_buffer(BufferHandle::NULL, &[0.0]).is_err());
    }

    #[test]
    fn test_zero_surface_skips_frame() {
        let mut backend = RecordingBackend::new(64, 64);
        backend.resize(0, 0).unwrap();
        assert!(!backend.begin_frame([0.0; 4]).unwrap());
    }
}
