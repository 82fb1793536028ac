//! Image loading utilities for texture data

use std::path::Path;

use crate::assets::AssetError;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load a PNG, convert it to RGBA8 and pad it to power-of-two dimensions
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref)?;
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let image = Self {
            data: rgba_img.into_raw(),
            width,
            height,
        }
        .padded_to_power_of_two();

        log::info!(
            "Loaded image {}x{} (padded to {}x{}) from {:?}",
            width,
            height,
            image.width,
            image.height,
            path_ref
        );
        Ok(image)
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Check if image dimensions are power of two
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Grow the canvas to the next power of two in each direction.
    ///
    /// Pixels keep their coordinates (content stays in the top left corner)
    /// and the new area is transparent black, so UV math written against
    /// padded sheets (font grids) stays valid.
    pub fn padded_to_power_of_two(self) -> Self {
        if self.is_power_of_two() {
            return self;
        }

        let new_width = self.width.next_power_of_two();
        let new_height = self.height.next_power_of_two();
        let src_stride = self.width as usize * 4;
        let dst_stride = new_width as usize * 4;

        let mut data = vec![0u8; dst_stride * new_height as usize];
        for (row, src) in self.data.chunks_exact(src_stride).enumerate() {
            let start = row * dst_stride;
            data[start..start + src_stride].copy_from_slice(src);
        }

        Self {
            data,
            width: new_width,
            height: new_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.data.len(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_padding_keeps_pixels_top_left() {
        let img = ImageData::solid_color(3, 5, [10, 20, 30, 255]).padded_to_power_of_two();
        assert_eq!((img.width, img.height), (4, 8));
        assert!(img.is_power_of_two());

        // Row 0: three copied pixels, then one transparent pixel.
        assert_eq!(&img.data[0..4], &[10, 20, 30, 255]);
        assert_eq!(&img.data[12..16], &[0, 0, 0, 0]);
        // Row 5 lies in the padding.
        let row5 = 5 * 4 * 4;
        assert!(img.data[row5..row5 + 16].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_power_of_two_untouched() {
        let img = ImageData::solid_color(16, 8, [1, 2, 3, 4]);
        let padded = img.clone().padded_to_power_of_two();
        assert_eq!(padded.data, img.data);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ImageData::from_file("does/not/exist.png").is_err());
    }
}
