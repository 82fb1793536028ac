//! # 3D Camera
//!
//! Look-at camera with a perspective projection. View space is right-handed
//! and Y-up; the Vulkan coordinate transform is applied between view and
//! projection, so the full chain is `P * X * V`.

use crate::foundation::math::{safe_normalize, utils, Mat4, Mat4Ext, Vec3};

/// Default vertical field of view in degrees
pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
/// Default near clipping plane
pub const DEFAULT_NEAR: f32 = 0.1;
/// Default far clipping plane
pub const DEFAULT_FAR: f32 = 1000.0;

/// 3D camera for perspective projection
///
/// `position` is the eye, `target` the look-at centre. Matrices are computed on
/// demand; the game recomputes them once per tick.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position (eye) in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Camera for a viewport of the given pixel size with the default 45 degree lens
    pub fn for_viewport(position: Vec3, width: u32, height: u32) -> Self {
        let mut camera = Self::perspective(position, DEFAULT_FOV_DEGREES, 1.0, DEFAULT_NEAR, DEFAULT_FAR);
        camera.set_aspect_from_size(width, height);
        camera
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Recompute the aspect ratio for a new viewport; zero sizes are ignored
    pub fn set_aspect_from_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring degenerate viewport {}x{}", width, height);
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Projection including the Vulkan coordinate transform (`P * X`)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far) * Mat4::vulkan_coordinate_transform()
    }

    /// Combined view-projection matrix (`P * X * V`)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector from the target towards the eye
    pub fn view_direction(&self) -> Vec3 {
        safe_normalize(self.position - self.target, Vec3::z())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 5.0), DEFAULT_FOV_DEGREES, 4.0 / 3.0, DEFAULT_NEAR, DEFAULT_FAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_viewport_aspect() {
        let camera = Camera::for_viewport(Vec3::zeros(), 640, 480);
        assert_relative_eq!(camera.aspect, 640.0 / 480.0, epsilon = EPSILON);
        assert_relative_eq!(camera.fov, utils::deg_to_rad(45.0), epsilon = EPSILON);
        assert_relative_eq!(camera.near, 0.1);
        assert_relative_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_zero_height_keeps_aspect() {
        let mut camera = Camera::for_viewport(Vec3::zeros(), 800, 400);
        camera.set_aspect_from_size(800, 0);
        assert_relative_eq!(camera.aspect, 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_target_projects_to_centre() {
        let mut camera = Camera::for_viewport(Vec3::new(0.0, 2.0, 4.0), 640, 480);
        camera.set_target(Vec3::new(0.0, 0.0, -5.0));

        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, -5.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = EPSILON);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = EPSILON);
        assert!(clip.z / clip.w > 0.0 && clip.z / clip.w < 1.0);
    }

    #[test]
    fn test_point_above_target_is_up_on_screen() {
        let mut camera = Camera::for_viewport(Vec3::new(0.0, 0.0, 5.0), 640, 480);
        camera.set_target(Vec3::zeros());
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 1.0, 0.0, 1.0);
        // Vulkan clip space has Y pointing down.
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn test_view_direction_degenerate() {
        let mut camera = Camera::default();
        camera.set_target(camera.position);
        assert_eq!(camera.view_direction(), Vec3::z());
    }
}
