//! Screen-space overlay: bitmap text and sprites
//!
//! Both renderers work in pixel coordinates with the origin at the top left
//! corner. Their projection follows the surface size through `reproject` and
//! never depends on the 3D camera.

pub mod font;
pub mod sprite;
pub mod text;

pub use font::{Font, FontMetrics};
pub use sprite::SpriteRenderer;
pub use text::{TextRenderer, MAX_TEXT_LEN};

use crate::foundation::math::{Mat4, Mat4Ext};

/// Depth of the overlay plane in overlay space
pub const OVERLAY_DEPTH: f32 = -1.0;

/// Overlay-space depth range
const OVERLAY_NEAR: f32 = -10.0;
const OVERLAY_FAR: f32 = 10.0;

/// Pixel-space projection shared by the overlay renderers
pub fn overlay_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_top_left(width as f32, height as f32, OVERLAY_NEAR, OVERLAY_FAR)
}
