//! Formatted bitmap text

use std::fmt::{self, Write};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::QuadDraw;
use crate::render::draw_queue::DrawQueue;

use super::{overlay_projection, Font, OVERLAY_DEPTH};

/// Longest string drawn in one call; longer output is cut here
pub const MAX_TEXT_LEN: usize = 255;

/// Draws strings one glyph quad per character
#[derive(Debug)]
pub struct TextRenderer {
    projection: Mat4,
    scratch: String,
}

impl TextRenderer {
    /// Create for a surface of `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            projection: overlay_projection(width, height),
            scratch: String::with_capacity(MAX_TEXT_LEN),
        }
    }

    /// Recompute the projection for a new surface size
    pub fn reproject(&mut self, width: u32, height: u32) {
        self.projection = overlay_projection(width, height);
    }

    /// Current pixel-space projection
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Format `args` and queue one quad per character, pen starting at `(x, y)`.
    ///
    /// The pen advances by the glyph width after every character. Characters
    /// the font has no cell for (including newlines) draw nothing but still
    /// advance the pen. Output past [`MAX_TEXT_LEN`] characters is dropped.
    pub fn draw(&mut self, queue: &mut DrawQueue, font: &Font, x: f32, y: f32, args: fmt::Arguments<'_>) {
        self.scratch.clear();
        if self.scratch.write_fmt(args).is_err() {
            log::warn!("Text formatting failed; nothing drawn");
            return;
        }

        let char_count = self.scratch.chars().count();
        if char_count > MAX_TEXT_LEN {
            log::warn!("Text of {} characters truncated to {}", char_count, MAX_TEXT_LEN);
        }

        let metrics = font.metrics();
        for (index, ch) in self.scratch.chars().take(MAX_TEXT_LEN).enumerate() {
            let Some(uv_offset) = metrics.glyph_offset(ch) else {
                continue;
            };
            let pen = Vec3::new(x + index as f32 * metrics.glyph_width, y, OVERLAY_DEPTH);
            queue.submit_overlay(QuadDraw {
                vertices: font.vertices(),
                uvs: font.uvs(),
                texture: font.texture(),
                transform: self.projection * Mat4::new_translation(&pen),
                uv_offset,
                size: [1.0, 1.0],
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::render::api::TextureHandle;
    use crate::render::backends::RecordingBackend;
    use crate::render::overlay::FontMetrics;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn small_font(backend: &mut RecordingBackend) -> Font {
        let metrics = FontMetrics {
            base: 0,
            texture_height: 256.0,
            lines: 16.0,
            glyph_width: 16.0,
            glyph_height: 16.0,
        };
        Font::new(backend, TextureHandle(3), metrics).unwrap()
    }

    fn origin_of(renderer: &TextRenderer, draw: &QuadDraw) -> Vec4 {
        // Undo the projection to get the pixel-space pen position
        let inverse = renderer.projection().try_inverse().unwrap();
        inverse * draw.transform * Vec4::new(0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_pen_advances_by_glyph_width() {
        let mut backend = RecordingBackend::new(640, 480);
        let font = small_font(&mut backend);
        let mut renderer = TextRenderer::new(640, 480);
        let mut queue = DrawQueue::new();

        renderer.draw(&mut queue, &font, 100.0, 280.0, format_args!("ab{}", 7));

        assert_eq!(queue.overlay().len(), 3);
        for (index, draw) in queue.overlay().iter().enumerate() {
            let origin = origin_of(&renderer, draw);
            assert_relative_eq!(origin.x, 100.0 + 16.0 * index as f32, epsilon = 1e-3);
            assert_relative_eq!(origin.y, 280.0, epsilon = 1e-3);
            assert_relative_eq!(origin.z, OVERLAY_DEPTH, epsilon = EPSILON);
        }
        let [u, v] = queue.overlay()[0].uv_offset;
        assert_relative_eq!(u, ('a' as u32 % 16) as f32 / 16.0);
        assert_relative_eq!(v, ('a' as u32 / 16) as f32 / 16.0);
    }

    #[test]
    fn test_unmapped_characters_skip_but_advance() {
        let mut backend = RecordingBackend::new(640, 480);
        let font = small_font(&mut backend);
        let mut renderer = TextRenderer::new(640, 480);
        let mut queue = DrawQueue::new();

        renderer.draw(&mut queue, &font, 0.0, 0.0, format_args!("a\u{3a9}b"));

        assert_eq!(queue.overlay().len(), 2);
        let second = origin_of(&renderer, &queue.overlay()[1]);
        assert_relative_eq!(second.x, 32.0, epsilon = 1e-3);
    }

    #[test]
    fn test_long_text_truncated() {
        let mut backend = RecordingBackend::new(640, 480);
        let font = small_font(&mut backend);
        let mut renderer = TextRenderer::new(640, 480);
        let mut queue = DrawQueue::new();

        let long = "x".repeat(400);
        renderer.draw(&mut queue, &font, 0.0, 0.0, format_args!("{}", long));
        assert_eq!(queue.overlay().len(), MAX_TEXT_LEN);
    }

    #[test]
    fn test_reproject_is_idempotent() {
        let mut renderer = TextRenderer::new(640, 480);
        renderer.reproject(800, 600);
        let once = *renderer.projection();
        renderer.reproject(800, 600);
        assert_eq!(once, *renderer.projection());
        assert_eq!(once, overlay_projection(800, 600));
    }
}
