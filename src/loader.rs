//! Image decoding for scans
//!
//! Photos arrive at whatever resolution the camera produced. They are
//! decoded to RGBA and resized to a fixed working width before analysis so
//! the pixel-based constants (probe radius, window sizes) see a consistent
//! scale.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Decode an encoded image (JPEG, PNG) from memory
pub fn decode_bytes(bytes: &[u8], working_width: Option<u32>) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(normalize(image, working_width))
}

/// Decode an image file
pub fn load_path(path: &Path, working_width: Option<u32>) -> Result<RgbaImage> {
    let image = image::open(path)?;
    debug!("Loaded {:?} ({}x{})", path, image.width(), image.height());
    Ok(normalize(image, working_width))
}

/// Convert to RGBA and resize to `working_width`, keeping the aspect ratio
pub fn normalize(image: DynamicImage, working_width: Option<u32>) -> RgbaImage {
    let (width, height) = (image.width(), image.height());

    match working_width {
        Some(target) if target > 0 && target != width && width > 0 => {
            let target_height =
                ((height as f64 * target as f64 / width as f64).round() as u32).max(1);
            debug!(
                "Resizing {}x{} -> {}x{}",
                width, height, target, target_height
            );
            image
                .resize_exact(target, target_height, FilterType::Triangle)
                .to_rgba8()
        }
        _ => image.to_rgba8(),
    }
}
