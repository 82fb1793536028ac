//! Object render pipeline
//!
//! Builds the per-instance matrices for a textured model and queues the draw.
//! Matrices are never stored: every draw recomputes model, model-view and
//! model-view-projection from the frame's view and view-projection.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::api::{MeshDraw, MeshHandle, TextureHandle};
use crate::render::draw_queue::DrawQueue;

/// A loaded model paired with the texture it is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderObject {
    /// Uploaded mesh
    pub mesh: MeshHandle,
    /// Texture bound while drawing
    pub texture: TextureHandle,
}

impl RenderObject {
    /// Pair a mesh with a texture
    pub fn new(mesh: MeshHandle, texture: TextureHandle) -> Self {
        Self { mesh, texture }
    }
}

/// Euler rotation applied yaw, then pitch, then roll
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    /// About X
    pub pitch: f32,
    /// About Y
    pub yaw: f32,
    /// About Z
    pub roll: f32,
}

impl Rotation {
    /// No rotation
    pub const IDENTITY: Self = Self {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    /// Build from pitch, yaw and roll in radians
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Rotation matrix
    pub fn to_matrix(self) -> Mat4 {
        Mat4::yaw_pitch_roll(self.pitch, self.yaw, self.roll)
    }
}

/// Model matrix: translation composed with a yaw-pitch-roll rotation. No scale.
pub fn compose(position: Vec3, rotation: Rotation) -> Mat4 {
    Mat4::new_translation(&position) * rotation.to_matrix()
}

/// Per-frame inputs shared by every object draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    /// World-to-view
    pub view: Mat4,
    /// Projection times view
    pub view_projection: Mat4,
    /// Unit direction towards the light
    pub light_dir: Vec3,
    /// Unit direction towards the viewer
    pub view_dir: Vec3,
}

/// Turns models into queued mesh draws
#[derive(Debug, Default)]
pub struct ObjectPipeline;

impl ObjectPipeline {
    /// Create the pipeline
    pub fn new() -> Self {
        Self
    }

    /// Queue `object` with explicit matrices and lighting directions
    pub fn draw(
        &self,
        queue: &mut DrawQueue,
        object: &RenderObject,
        mvp: Mat4,
        model_view: Mat4,
        light_dir: Vec3,
        view_dir: Vec3,
    ) {
        queue.submit_opaque(MeshDraw {
            mesh: object.mesh,
            texture: object.texture,
            mvp,
            model_view,
            light_dir,
            view_dir,
        });
    }

    /// Queue `object` placed by `model` under this frame's camera
    pub fn draw_model(&self, queue: &mut DrawQueue, object: &RenderObject, model: &Mat4, frame: &FrameMatrices) {
        let mvp = frame.view_projection * model;
        let model_view = frame.view * model;
        self.draw(queue, object, mvp, model_view, frame.light_dir, frame.view_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_compose_translates_after_rotating() {
        let model = compose(Vec3::new(1.0, 2.0, 3.0), Rotation::new(0.0, std::f32::consts::PI, 0.0));
        let p = model * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(p.xyz(), Vec3::new(1.0, 2.0, 4.0), epsilon = EPSILON);
    }

    #[test]
    fn test_compose_identity_is_translation() {
        let model = compose(Vec3::new(-5.0, 0.0, -6.0), Rotation::IDENTITY);
        assert_relative_eq!(model, Mat4::new_translation(&Vec3::new(-5.0, 0.0, -6.0)), epsilon = EPSILON);
    }

    #[test]
    fn test_draw_model_composes_matrices() {
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -4.0));
        let projection = Mat4::new_scaling(2.0);
        let frame = FrameMatrices {
            view,
            view_projection: projection * view,
            light_dir: Vec3::y(),
            view_dir: Vec3::z(),
        };
        let model = compose(Vec3::new(1.0, 0.0, 0.0), Rotation::IDENTITY);
        let object = RenderObject::new(MeshHandle(3), TextureHandle(4));

        let mut queue = DrawQueue::new();
        ObjectPipeline::new().draw_model(&mut queue, &object, &model, &frame);

        let draw = &queue.opaque()[0];
        assert_eq!(draw.mesh, MeshHandle(3));
        assert_eq!(draw.texture, TextureHandle(4));
        assert_relative_eq!(draw.model_view, view * model, epsilon = EPSILON);
        assert_relative_eq!(draw.mvp, projection * view * model, epsilon = EPSILON);
    }
}
