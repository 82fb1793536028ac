//! Bitmap fonts laid out as a 16-column glyph grid

use crate::render::api::{BackendResult, BufferHandle, BufferUsage, RenderBackend, TextureHandle};
use crate::render::RenderError;

/// Glyphs per row in every font sheet
pub const GRID_COLUMNS: u32 = 16;

/// Layout of a font sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Character code of the first glyph in the sheet
    pub base: u32,
    /// Height of the (padded) sheet in pixels; the glyph rows must fit inside it
    pub texture_height: f32,
    /// Number of glyph rows the (padded) sheet height divides into; may be fractional
    pub lines: f32,
    /// Glyph cell width in pixels, also the pen advance
    pub glyph_width: f32,
    /// Glyph cell height in pixels
    pub glyph_height: f32,
}

impl FontMetrics {
    /// Reject empty cells and glyph grids taller than the sheet
    pub fn validate(&self) -> BackendResult<()> {
        if self.lines <= 0.0 || self.glyph_width <= 0.0 || self.glyph_height <= 0.0 {
            return Err(RenderError::BackendError(format!("font has an empty glyph grid: {self:?}")));
        }
        if self.glyph_height * self.lines > self.texture_height {
            return Err(RenderError::BackendError(format!(
                "{} rows of {}px glyphs do not fit a {}px sheet",
                self.lines, self.glyph_height, self.texture_height
            )));
        }
        Ok(())
    }

    /// Number of addressable glyph cells
    pub fn glyph_count(&self) -> u32 {
        GRID_COLUMNS * self.lines.ceil().max(0.0) as u32
    }

    /// UV offset of the cell for `ch`, or `None` when the character has no cell
    pub fn glyph_offset(&self, ch: char) -> Option<[f32; 2]> {
        let index = (ch as u32).checked_sub(self.base)?;
        if index >= self.glyph_count() {
            return None;
        }
        let column = (index % GRID_COLUMNS) as f32;
        let row = (index / GRID_COLUMNS) as f32;
        Some([column / GRID_COLUMNS as f32, row / self.lines])
    }

    /// Six corners of one glyph quad, `xyz`, origin top left
    fn quad_vertices(&self) -> [f32; 18] {
        let (w, h) = (self.glyph_width, self.glyph_height);
        [
            0.0, 0.0, 0.0, //
            w, h, 0.0, //
            0.0, h, 0.0, //
            0.0, 0.0, 0.0, //
            w, 0.0, 0.0, //
            w, h, 0.0,
        ]
    }

    /// UVs of the first cell for the six corners
    fn quad_uvs(&self) -> [f32; 12] {
        let (u, v) = (1.0 / GRID_COLUMNS as f32, 1.0 / self.lines);
        [
            0.0, 0.0, //
            u, v, //
            0.0, v, //
            0.0, 0.0, //
            u, 0.0, //
            u, v,
        ]
    }
}

/// Texture and static quad buffers for one font. Immutable once created.
#[derive(Debug)]
pub struct Font {
    texture: TextureHandle,
    metrics: FontMetrics,
    vertices: BufferHandle,
    uvs: BufferHandle,
}

impl Font {
    /// Build the glyph quad buffers for `texture` laid out as `metrics`
    pub fn new(backend: &mut dyn RenderBackend, texture: TextureHandle, metrics: FontMetrics) -> BackendResult<Self> {
        metrics.validate()?;
        let vertices = backend.create_vertex_buffer(&metrics.quad_vertices(), BufferUsage::Static)?;
        let uvs = backend.create_vertex_buffer(&metrics.quad_uvs(), BufferUsage::Static)?;
        if texture.is_null() {
            log::warn!("Font created without a texture; text will render blank");
        }
        Ok(Self {
            texture,
            metrics,
            vertices,
            uvs,
        })
    }

    /// Sheet texture
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Sheet layout
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Glyph corner buffer
    pub fn vertices(&self) -> BufferHandle {
        self.vertices
    }

    /// Glyph UV buffer
    pub fn uvs(&self) -> BufferHandle {
        self.uvs
    }

    /// Release the quad buffers; the texture belongs to whoever loaded it
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.destroy_buffer(self.vertices);
        backend.destroy_buffer(self.uvs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingBackend;
    use approx::assert_relative_eq;

    fn small() -> FontMetrics {
        FontMetrics {
            base: 0,
            texture_height: 256.0,
            lines: 16.0,
            glyph_width: 16.0,
            glyph_height: 16.0,
        }
    }

    fn big() -> FontMetrics {
        FontMetrics {
            base: 32,
            texture_height: 512.0,
            lines: 9.5,
            glyph_width: 32.0,
            glyph_height: 48.0,
        }
    }

    #[test]
    fn test_glyph_offset_grid() {
        // 'A' = 65 = row 4, column 1
        let [u, v] = small().glyph_offset('A').unwrap();
        assert_relative_eq!(u, 1.0 / 16.0);
        assert_relative_eq!(v, 4.0 / 16.0);
    }

    #[test]
    fn test_glyph_offset_with_base() {
        // 'A' - 32 = 33 = row 2, column 1; rows are 1/9.5 tall
        let [u, v] = big().glyph_offset('A').unwrap();
        assert_relative_eq!(u, 1.0 / 16.0);
        assert_relative_eq!(v, 2.0 / 9.5);
    }

    #[test]
    fn test_out_of_range_glyphs() {
        // Below base
        assert!(big().glyph_offset('\n').is_none());
        // Past the last row (16 * 10 cells for 9.5 lines)
        assert!(big().glyph_offset(char::from_u32(32 + 160).unwrap()).is_none());
        assert!(big().glyph_offset(char::from_u32(32 + 159).unwrap()).is_some());
        assert!(small().glyph_offset('\u{100}').is_none());
    }

    #[test]
    fn test_quad_covers_glyph_cell() {
        let metrics = big();
        let vertices = metrics.quad_vertices();
        let max_x = vertices.iter().step_by(3).cloned().fold(0.0, f32::max);
        let max_y = vertices.iter().skip(1).step_by(3).cloned().fold(0.0, f32::max);
        assert_relative_eq!(max_x, 32.0);
        assert_relative_eq!(max_y, 48.0);
    }

    #[test]
    fn test_glyph_grid_must_fit_sheet() {
        assert!(small().validate().is_ok());
        // 9.5 rows of 48px = 456px inside a 512px sheet
        assert!(big().validate().is_ok());

        let too_tall = FontMetrics {
            texture_height: 400.0,
            ..big()
        };
        assert!(matches!(too_tall.validate(), Err(RenderError::BackendError(_))));

        let empty = FontMetrics { lines: 0.0, ..small() };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_font_rejects_oversized_grid_without_allocating() {
        let mut backend = RecordingBackend::new(640, 480);
        let metrics = FontMetrics {
            texture_height: 128.0,
            ..small()
        };
        assert!(Font::new(&mut backend, TextureHandle::NULL, metrics).is_err());
        assert_eq!(backend.live_resources(), (0, 0, 0));

        let font = Font::new(&mut backend, TextureHandle::NULL, small()).unwrap();
        assert_eq!(backend.live_resources().2, 2);
        font.destroy(&mut backend);
    }
}
