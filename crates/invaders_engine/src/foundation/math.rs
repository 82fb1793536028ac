//! Math utilities and types
//!
//! Thin layer over `nalgebra` with the matrix builders the renderer needs.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Vectors shorter than this are treated as zero-length by [`safe_normalize`].
pub const NORMALIZE_EPSILON: f32 = 1e-6;

/// Normalize `v`, or return `fallback` when `v` is (near) zero-length.
///
/// Never produces NaN. `fallback` is returned as given, so callers should pass
/// a unit axis.
pub fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    let length = v.norm();
    if length < NORMALIZE_EPSILON || !length.is_finite() {
        fallback
    } else {
        v / length
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with the transforms used by the render pipeline
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Rotation composed as yaw (Y), then pitch (X), then roll (Z):
    /// `Ry(yaw) * Rx(pitch) * Rz(roll)`.
    fn yaw_pitch_roll(pitch: f32, yaw: f32, roll: f32) -> Mat4;

    /// Create a perspective projection matrix (Vulkan depth range 0..1)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create the intermediate coordinate system transformation for Vulkan
    fn vulkan_coordinate_transform() -> Mat4;

    /// Orthographic projection in pixel units with the origin at the top left
    /// corner and Y growing downwards, ready for Vulkan clip space.
    fn orthographic_top_left(width: f32, height: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn yaw_pitch_roll(pitch: f32, yaw: f32, roll: f32) -> Mat4 {
        Mat4::rotation_y(yaw) * Mat4::rotation_x(pitch) * Mat4::rotation_z(roll)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P matrix from https://johannesugb.github.io/gpu-programming/setting-up-a-proper-vulkan-projection-matrix/
        // Expects view space already passed through `vulkan_coordinate_transform`.
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = safe_normalize(target - eye, -Vec3::z());
        let right = safe_normalize(forward.cross(&up), Vec3::x());
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn vulkan_coordinate_transform() -> Mat4 {
        // Flips Y and Z: right-handed Y-up view space to Vulkan's Y-down, Z-forward.
        Mat4::new(
            1.0,  0.0,  0.0, 0.0,
            0.0, -1.0,  0.0, 0.0,
            0.0,  0.0, -1.0, 0.0,
            0.0,  0.0,  0.0, 1.0,
        )
    }

    fn orthographic_top_left(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let depth = far - near;

        // x: [0, w] -> [-1, 1], y: [0, h] -> [-1, 1] (Vulkan clip Y points down),
        // z: [near, far] -> [0, 1]
        Mat4::new(
            2.0 / width, 0.0, 0.0, -1.0,
            0.0, 2.0 / height, 0.0, -1.0,
            0.0, 0.0, 1.0 / depth, -near / depth,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}
