//! Point-cloud particle effects
//!
//! Each effect is a fixed set of particles flying out from the origin in
//! straight lines. Positions are evaluated analytically as
//! `velocity * age`, so an effect restarts exactly from `reset` without any
//! accumulated drift. The second half of the particles (by index) ages at half
//! speed to give a two-layer burst.

use std::ops::Range;

use rand::Rng;

use crate::foundation::math::{safe_normalize, Mat4, Vec3};
use crate::render::api::{BackendResult, BufferHandle, BufferUsage, PointsDraw, RenderBackend, TextureHandle};
use crate::render::draw_queue::DrawQueue;

/// Age added by every [`PointCloud::advance`] call
pub const TICK_STEP: f32 = 0.05;

/// An effect whose age exceeds this is finished
pub const LIFETIME: f32 = 1.25;

/// Particle point size is the viewport width divided by this
pub const POINT_SIZE_DIVISOR: f32 = 24.0;

/// One explosion: positions, velocities, age and the GPU buffer they upload to
#[derive(Debug)]
pub struct PointCloud {
    positions: Vec<[f32; 3]>,
    velocities: Vec<Vec3>,
    steps: u32,
    buffer: BufferHandle,
}

impl PointCloud {
    /// Allocate storage for `capacity` particles at the origin and a GPU buffer to match
    pub fn create(backend: &mut dyn RenderBackend, capacity: usize) -> BackendResult<Self> {
        let positions = vec![[0.0; 3]; capacity];
        let buffer = backend.create_vertex_buffer(bytemuck::cast_slice(&positions), BufferUsage::Dynamic)?;
        log::debug!("Created point cloud with {} particles ({:?})", capacity, buffer);

        Ok(Self {
            positions,
            velocities: vec![Vec3::zeros(); capacity],
            steps: 0,
            buffer,
        })
    }

    /// Restart the effect with fresh unit-length random directions.
    ///
    /// Each velocity component is drawn uniformly from `range` before
    /// normalizing; a (vanishingly unlikely) zero sample falls back to +Y.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R, range: Range<f32>) {
        for (position, velocity) in self.positions.iter_mut().zip(&mut self.velocities) {
            let sample = Vec3::new(
                rng.gen_range(range.clone()),
                rng.gen_range(range.clone()),
                rng.gen_range(range.clone()),
            );
            *velocity = safe_normalize(sample, Vec3::y());
            *position = [0.0; 3];
        }
        self.steps = 0;
    }

    /// Age the effect by one fixed step and re-evaluate every position
    pub fn advance(&mut self) {
        self.steps += 1;
        let tick = self.tick();
        let half = self.positions.len() / 2;
        for (index, (position, velocity)) in self.positions.iter_mut().zip(&self.velocities).enumerate() {
            let age = if index < half { tick } else { tick / 2.0 };
            *position = (velocity * age).into();
        }
    }

    /// Whether the age has passed [`LIFETIME`]
    pub fn is_finished(&self) -> bool {
        self.tick() > LIFETIME
    }

    /// Current age: completed steps times [`TICK_STEP`]
    pub fn tick(&self) -> f32 {
        self.steps as f32 * TICK_STEP
    }

    /// Number of particles, fixed at creation
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the effect has no particles
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of particle `index`
    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from(self.positions[index])
    }

    /// Velocity of particle `index`
    pub fn velocity(&self, index: usize) -> Vec3 {
        self.velocities[index]
    }

    /// GPU buffer the positions upload to
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Release the GPU buffer; the effect is consumed
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.destroy_buffer(self.buffer);
    }
}

/// Shared point-cloud drawing state (point size follows the viewport)
#[derive(Debug)]
pub struct PointCloudRenderer {
    point_size: f32,
}

impl PointCloudRenderer {
    /// Create for a viewport `width` pixels wide
    pub fn new(width: u32) -> Self {
        let mut renderer = Self { point_size: 0.0 };
        renderer.resize(width);
        renderer
    }

    /// Recompute point size for a new viewport width
    pub fn resize(&mut self, width: u32) {
        self.point_size = width as f32 / POINT_SIZE_DIVISOR;
    }

    /// Current point size in pixels
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Upload the effect's positions and queue a point draw in the particle pass
    pub fn draw(
        &self,
        backend: &mut dyn RenderBackend,
        queue: &mut DrawQueue,
        effect: &PointCloud,
        mvp: Mat4,
        texture: TextureHandle,
    ) -> BackendResult<()> {
        backend.update_vertex_buffer(effect.buffer, bytemuck::cast_slice(&effect.positions))?;
        queue.submit_particles(PointsDraw {
            buffer: effect.buffer,
            count: effect.len() as u32,
            texture,
            mvp,
            point_size: self.point_size,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingBackend;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPSILON: f32 = 1e-5;

    fn effect(backend: &mut RecordingBackend, capacity: usize) -> PointCloud {
        let mut cloud = PointCloud::create(backend, capacity).unwrap();
        cloud.reset(&mut StdRng::seed_from_u64(7), -1.0..1.0);
        cloud
    }

    #[test]
    fn test_reset_then_advance_positions() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut cloud = effect(&mut backend, 40);
        cloud.advance();

        for i in 0..40 {
            let velocity = cloud.velocity(i);
            assert_relative_eq!(velocity.norm(), 1.0, epsilon = EPSILON);
            let expected = if i < 20 { velocity * 0.05 } else { velocity * 0.025 };
            assert_relative_eq!(cloud.position(i), expected, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_finished_after_26_steps_not_25() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut cloud = effect(&mut backend, 40);
        for _ in 0..25 {
            cloud.advance();
        }
        assert!(!cloud.is_finished());
        cloud.advance();
        assert!(cloud.is_finished());
    }

    #[test]
    fn test_tick_increases_by_step() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut cloud = effect(&mut backend, 4);
        let mut last = cloud.tick();
        for _ in 0..10 {
            cloud.advance();
            assert_relative_eq!(cloud.tick() - last, TICK_STEP, epsilon = EPSILON);
            last = cloud.tick();
        }
    }

    #[test]
    fn test_reset_restarts_from_origin() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut cloud = effect(&mut backend, 8);
        for _ in 0..30 {
            cloud.advance();
        }
        cloud.reset(&mut StdRng::seed_from_u64(1), -1.0..1.0);
        assert_eq!(cloud.tick(), 0.0);
        assert!(!cloud.is_finished());
        assert!((0..8).all(|i| cloud.position(i) == Vec3::zeros()));
        assert_eq!(cloud.len(), 8);
    }

    #[test]
    fn test_draw_uploads_positions() {
        let mut backend = RecordingBackend::new(480, 480);
        let mut cloud = effect(&mut backend, 4);
        cloud.advance();

        let renderer = PointCloudRenderer::new(480);
        let mut queue = DrawQueue::new();
        renderer
            .draw(&mut backend, &mut queue, &cloud, Mat4::identity(), TextureHandle(9))
            .unwrap();

        let uploaded = backend.buffer_data(cloud.buffer()).unwrap();
        assert_relative_eq!(uploaded[0], cloud.position(0).x, epsilon = EPSILON);
        assert_relative_eq!(uploaded[11], cloud.position(3).z, epsilon = EPSILON);

        let draw = &queue.particles()[0];
        assert_eq!(draw.count, 4);
        assert_relative_eq!(draw.point_size, 20.0);
    }

    #[test]
    fn test_point_size_follows_width() {
        let mut renderer = PointCloudRenderer::new(640);
        assert_relative_eq!(renderer.point_size(), 640.0 / 24.0);
        renderer.resize(1200);
        assert_relative_eq!(renderer.point_size(), 50.0);
    }

    #[test]
    fn test_destroy_releases_buffer() {
        let mut backend = RecordingBackend::new(640, 480);
        let cloud = effect(&mut backend, 4);
        assert_eq!(backend.live_resources().2, 1);
        cloud.destroy(&mut backend);
        assert_eq!(backend.live_resources().2, 0);
    }
}
