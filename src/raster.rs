//! Borrowed RGBA raster and grayscale sampling

use image::RgbaImage;

use crate::error::{Result, ScanError};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// Read-only view of a decoded RGBA image, row-major, 4 bytes per pixel
#[derive(Debug, Clone, Copy)]
pub struct RasterImage<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> RasterImage<'a> {
    /// Wrap a pixel buffer, rejecting empty or inconsistently sized input
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ScanError::EmptyImage { width, height });
        }

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ScanError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { width, height, data })
    }

    pub fn from_rgba(image: &'a RgbaImage) -> Result<Self> {
        Self::new(image.width(), image.height(), image.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma (BT.601 weights) of the pixel at `(x, y)`.
    ///
    /// Coordinates are truncated towards zero and clamped to the image, so
    /// any finite or infinite input yields an edge pixel rather than a panic.
    #[inline]
    pub fn gray_at(&self, x: f64, y: f64) -> f64 {
        let xx = (x as i64).clamp(0, self.width as i64 - 1) as usize;
        let yy = (y as i64).clamp(0, self.height as i64 - 1) as usize;
        let offset = (yy * self.width as usize + xx) * CHANNELS;

        let r = self.data[offset] as f64;
        let g = self.data[offset + 1] as f64;
        let b = self.data[offset + 2] as f64;
        0.299 * r + 0.587 * g + 0.114 * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rejects_empty_image() {
        let err = RasterImage::new(0, 10, &[]).unwrap_err();
        assert!(matches!(err, ScanError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn test_rejects_short_buffer() {
        let data = vec![0u8; 4 * 4 * 3];
        let err = RasterImage::new(4, 4, &data).unwrap_err();
        assert!(matches!(
            err,
            ScanError::BufferSizeMismatch {
                expected: 64,
                actual: 48
            }
        ));
    }

    #[test]
    fn test_gray_weights() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        img.put_pixel(1, 0, Rgba([100, 50, 200, 255]));
        let raster = RasterImage::from_rgba(&img).unwrap();

        assert!((raster.gray_at(0.0, 0.0) - 255.0).abs() < 1e-9);
        let expected = 0.299 * 100.0 + 0.587 * 50.0 + 0.114 * 200.0;
        assert!((raster.gray_at(1.0, 0.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds_clamps_to_edge() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        img.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([10, 10, 10, 255]));
        let raster = RasterImage::from_rgba(&img).unwrap();

        assert_eq!(raster.gray_at(50.0, 99.0), 0.0);
        assert!((raster.gray_at(-4.7, -0.2) - 10.0).abs() < 1e-9);
        // Truncation, not rounding
        assert!((raster.gray_at(1.9, 1.9) - 255.0).abs() < 1e-9);
    }
}
