//! Rotated textured quads in pixel space

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::api::{BackendResult, BufferHandle, BufferUsage, QuadDraw, RenderBackend, TextureHandle};
use crate::render::draw_queue::DrawQueue;

use super::{overlay_projection, OVERLAY_DEPTH};

/// Unit quad centred on the origin, two triangles
const UNIT_QUAD: [f32; 18] = [
    -0.5, -0.5, 0.0, //
    0.5, 0.5, 0.0, //
    -0.5, 0.5, 0.0, //
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.5, 0.5, 0.0,
];

const UNIT_UVS: [f32; 12] = [
    0.0, 0.0, //
    1.0, 1.0, //
    0.0, 1.0, //
    0.0, 0.0, //
    1.0, 0.0, //
    1.0, 1.0,
];

/// Draws sprites from one shared unit quad scaled per draw
#[derive(Debug)]
pub struct SpriteRenderer {
    projection: Mat4,
    vertices: BufferHandle,
    uvs: BufferHandle,
}

impl SpriteRenderer {
    /// Upload the unit quad and set up for a `width` x `height` surface
    pub fn new(backend: &mut dyn RenderBackend, width: u32, height: u32) -> BackendResult<Self> {
        let vertices = backend.create_vertex_buffer(&UNIT_QUAD, BufferUsage::Static)?;
        let uvs = backend.create_vertex_buffer(&UNIT_UVS, BufferUsage::Static)?;
        Ok(Self {
            projection: overlay_projection(width, height),
            vertices,
            uvs,
        })
    }

    /// Recompute the projection for a new surface size
    pub fn reproject(&mut self, width: u32, height: u32) {
        self.projection = overlay_projection(width, height);
    }

    /// Queue a `width` x `height` sprite centred at pixel `(x, y)`, rotated by
    /// `rotation` radians about its centre
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        queue: &mut DrawQueue,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rotation: f32,
        texture: TextureHandle,
    ) {
        let placement = Mat4::new_translation(&Vec3::new(x, y, OVERLAY_DEPTH)) * Mat4::rotation_z(rotation);
        queue.submit_overlay(QuadDraw {
            vertices: self.vertices,
            uvs: self.uvs,
            texture,
            transform: self.projection * placement,
            uv_offset: [0.0, 0.0],
            size: [width, height],
        });
    }

    /// Release the quad buffers
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.destroy_buffer(self.vertices);
        backend.destroy_buffer(self.uvs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants::PI, Vec4};
    use crate::render::backends::RecordingBackend;
    use approx::assert_relative_eq;

    /// Pixel position of a unit-quad corner after the sprite transform
    fn corner(renderer: &SpriteRenderer, draw: &QuadDraw, x: f32, y: f32) -> Vec4 {
        let inverse = renderer.projection.try_inverse().unwrap();
        let scaled = Vec4::new(x * draw.size[0], y * draw.size[1], 0.0, 1.0);
        inverse * draw.transform * scaled
    }

    #[test]
    fn test_sprite_centred_and_sized() {
        let mut backend = RecordingBackend::new(640, 480);
        let renderer = SpriteRenderer::new(&mut backend, 640, 480).unwrap();
        let mut queue = DrawQueue::new();

        renderer.draw(&mut queue, 320.0, 240.0, 64.0, 32.0, 0.0, TextureHandle(9));
        let draw = &queue.overlay()[0];

        let top_left = corner(&renderer, draw, -0.5, -0.5);
        assert_relative_eq!(top_left.x, 288.0, epsilon = 1e-3);
        assert_relative_eq!(top_left.y, 224.0, epsilon = 1e-3);
        assert_eq!(draw.texture, TextureHandle(9));
    }

    #[test]
    fn test_rotation_about_centre() {
        let mut backend = RecordingBackend::new(640, 480);
        let renderer = SpriteRenderer::new(&mut backend, 640, 480).unwrap();
        let mut queue = DrawQueue::new();

        renderer.draw(&mut queue, 100.0, 100.0, 20.0, 20.0, PI / 2.0, TextureHandle::NULL);
        let draw = &queue.overlay()[0];

        // Quarter turn sends the right edge midpoint to below/above the centre
        let right = corner(&renderer, draw, 0.5, 0.0);
        assert_relative_eq!(right.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!((right.y - 100.0).abs(), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_destroy_releases_buffers() {
        let mut backend = RecordingBackend::new(640, 480);
        let renderer = SpriteRenderer::new(&mut backend, 640, 480).unwrap();
        assert_eq!(backend.live_resources().2, 2);
        renderer.destroy(&mut backend);
        assert_eq!(backend.live_resources().2, 0);
    }
}
