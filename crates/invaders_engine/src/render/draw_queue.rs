//! Per-frame draw lists
//!
//! Game code queues draws in whatever order its update produces them; the
//! queue replays them grouped by [`RenderPass`] so blending always happens
//! on top of finished solid geometry.

use crate::render::api::{BackendResult, MeshDraw, PointsDraw, QuadDraw, RenderBackend, RenderPass};

/// Draws collected for one frame, one list per pass
#[derive(Debug, Default)]
pub struct DrawQueue {
    opaque: Vec<MeshDraw>,
    particles: Vec<PointsDraw>,
    overlay: Vec<QuadDraw>,
}

impl DrawQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every queued draw, keeping capacity
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.particles.clear();
        self.overlay.clear();
    }

    /// Queue a solid mesh
    pub fn submit_opaque(&mut self, draw: MeshDraw) {
        self.opaque.push(draw);
    }

    /// Queue a point cloud
    pub fn submit_particles(&mut self, draw: PointsDraw) {
        self.particles.push(draw);
    }

    /// Queue a screen-space quad
    pub fn submit_overlay(&mut self, draw: QuadDraw) {
        self.overlay.push(draw);
    }

    /// Queued solid meshes
    pub fn opaque(&self) -> &[MeshDraw] {
        &self.opaque
    }

    /// Queued point clouds
    pub fn particles(&self) -> &[PointsDraw] {
        &self.particles
    }

    /// Queued overlay quads
    pub fn overlay(&self) -> &[QuadDraw] {
        &self.overlay
    }

    /// Total number of queued draws
    pub fn len(&self) -> usize {
        self.opaque.len() + self.particles.len() + self.overlay.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay every draw into `backend`, pass by pass, in submission order within a pass
    pub fn execute(&self, backend: &mut dyn RenderBackend) -> BackendResult<()> {
        for pass in RenderPass::ORDER {
            backend.begin_pass(pass)?;
            match pass {
                RenderPass::Opaque => self.opaque.iter().try_for_each(|draw| backend.draw_mesh(draw))?,
                RenderPass::Particles => self.particles.iter().try_for_each(|draw| backend.draw_points(draw))?,
                RenderPass::Overlay => self.overlay.iter().try_for_each(|draw| backend.draw_quad(draw))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::api::{BufferHandle, MeshHandle, TextureHandle};
    use crate::render::backends::recording::{Recorded, RecordingBackend};

    fn mesh_draw(id: u64) -> MeshDraw {
        MeshDraw {
            mesh: MeshHandle(id),
            texture: TextureHandle(1),
            mvp: Mat4::identity(),
            model_view: Mat4::identity(),
            light_dir: Vec3::y(),
            view_dir: Vec3::z(),
        }
    }

    fn quad_draw() -> QuadDraw {
        QuadDraw {
            vertices: BufferHandle(1),
            uvs: BufferHandle(2),
            texture: TextureHandle(1),
            transform: Mat4::identity(),
            uv_offset: [0.0, 0.0],
            size: [1.0, 1.0],
        }
    }

    #[test]
    fn test_execute_groups_by_pass() {
        let mut queue = DrawQueue::new();
        // Submitted interleaved, the way a game update produces them.
        queue.submit_overlay(quad_draw());
        queue.submit_opaque(mesh_draw(1));
        queue.submit_particles(PointsDraw {
            buffer: BufferHandle(3),
            count: 40,
            texture: TextureHandle(1),
            mvp: Mat4::identity(),
            point_size: 10.0,
        });
        queue.submit_opaque(mesh_draw(2));
        assert_eq!(queue.len(), 4);

        let mut backend = RecordingBackend::new(640, 480);
        backend.begin_frame([0.0; 4]).unwrap();
        queue.execute(&mut backend).unwrap();
        backend.end_frame().unwrap();

        let kinds: Vec<&str> = backend.frame_log().iter().map(Recorded::kind).collect();
        assert_eq!(
            kinds,
            ["begin_frame", "pass", "mesh", "mesh", "pass", "points", "pass", "quad", "end_frame"]
        );
        assert_eq!(backend.meshes_drawn(), vec![MeshHandle(1), MeshHandle(2)]);
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut queue = DrawQueue::new();
        queue.submit_opaque(mesh_draw(1));
        queue.clear();
        assert!(queue.is_empty());
    }
}
