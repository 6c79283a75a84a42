//! Corner marker search
//!
//! Each sheet carries four solid dark squares, one near each corner. The
//! search works on a downsampled grid (point sampling, no averaging) inside
//! the region of interest nearest the requested corner, estimates a local
//! "dark" threshold from that region, and slides a square window looking for
//! the densest patch of dark pixels.

use tracing::{debug, warn};

use crate::error::{Result, ScanError};
use crate::geometry::{CornerId, Corners, Point};
use crate::raster::RasterImage;
use crate::template::CornerSearch;

/// Inclusive search bounds in downsampled pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Roi {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

impl Roi {
    fn for_corner(corner: CornerId, width: u32, height: u32, fraction: f64) -> Self {
        let near = |size: u32| (size as f64 * fraction).floor() as u32;
        let far = |size: u32| (size as f64 * (1.0 - fraction)).floor() as u32;

        let (x0, x1) = if corner.is_right() {
            (far(width), width - 1)
        } else {
            (0, near(width))
        };
        let (y0, y1) = if corner.is_bottom() {
            (far(height), height - 1)
        } else {
            (0, near(height))
        };

        Self { x0, x1, y0, y1 }
    }

    /// Window origins along one axis such that `origin + win <= end`
    fn origins(start: u32, end: u32, win: u32, step: u32) -> impl Iterator<Item = u32> {
        let last = end.checked_sub(win);
        let range = match last {
            Some(last) if last >= start => start..=last,
            // Empty: the window does not fit
            _ => 1..=0,
        };
        range.step_by(step.max(1) as usize)
    }
}

/// Find the center of the marker nearest `corner`, in full-resolution pixels.
///
/// Returns `None` when the densest window holds fewer than
/// `params.min_dark_count` dark samples.
pub fn locate_corner(image: &RasterImage, corner: CornerId, params: &CornerSearch) -> Option<Point> {
    let ds = params.downsample.max(1);
    let width = image.width() / ds;
    let height = image.height() / ds;
    if width == 0 || height == 0 {
        return None;
    }

    let roi = Roi::for_corner(corner, width, height, params.roi_fraction);
    let threshold = local_threshold(image, &roi, ds, params);

    let win = ((width.min(height) as f64 * params.window_fraction).floor() as u32)
        .max(params.min_window);

    let mut best: Option<(u32, u32, u32)> = None;
    for y in Roi::origins(roi.y0, roi.y1, win, params.window_step) {
        for x in Roi::origins(roi.x0, roi.x1, win, params.window_step) {
            let count = dark_count(image, x, y, win, ds, threshold);
            if best.map_or(true, |(c, _, _)| count > c) {
                best = Some((count, x, y));
            }
        }
    }

    let Some((count, x, y)) = best else {
        debug!("{}: search window does not fit the region", corner.label());
        return None;
    };

    if count < params.min_dark_count {
        debug!(
            "{}: best window has {} dark samples (need {}), threshold {:.1}",
            corner.label(),
            count,
            params.min_dark_count,
            threshold
        );
        return None;
    }

    let half = win as f64 / 2.0;
    let center = Point::new((x as f64 + half) * ds as f64, (y as f64 + half) * ds as f64);
    debug!(
        "{}: marker at ({:.1}, {:.1}), {} dark samples, threshold {:.1}",
        corner.label(),
        center.x,
        center.y,
        count,
        threshold
    );
    Some(center)
}

/// Locate all four markers. Fails if any one of them is missing.
pub fn locate_corners(image: &RasterImage, params: &CornerSearch) -> Result<Corners> {
    let mut found = [None; 4];
    let mut missing = Vec::new();

    for (slot, corner) in found.iter_mut().zip(CornerId::all()) {
        *slot = locate_corner(image, corner, params);
        if slot.is_none() {
            missing.push(corner);
        }
    }

    match found {
        [Some(tl), Some(tr), Some(bl), Some(br)] => {
            let corners = Corners::new(tl, tr, bl, br);
            if !corners.is_upright() {
                warn!("Corner markers form a mirrored quadrilateral: {:?}", corners);
            }
            Ok(corners)
        }
        _ => {
            warn!("Corner markers not found: {:?}", missing);
            Err(ScanError::MarkersNotFound { missing })
        }
    }
}

/// Dark threshold from the mean brightness of a coarse grid inside the ROI
fn local_threshold(image: &RasterImage, roi: &Roi, ds: u32, params: &CornerSearch) -> f64 {
    let step = params.threshold_sample_step.max(1) as usize;
    let mut sum = 0.0;
    let mut count = 0usize;

    for yy in (roi.y0..=roi.y1).step_by(step) {
        for xx in (roi.x0..=roi.x1).step_by(step) {
            sum += image.gray_at((xx * ds) as f64, (yy * ds) as f64);
            count += 1;
        }
    }

    let mean = if count > 0 { sum / count as f64 } else { 200.0 };
    (mean * params.threshold_factor).clamp(params.threshold_min, params.threshold_max)
}

/// Dark samples in a window, reading every second pixel in each axis
#[inline]
fn dark_count(image: &RasterImage, x: u32, y: u32, win: u32, ds: u32, threshold: f64) -> u32 {
    let mut blacks = 0;
    for yy in (0..win).step_by(2) {
        for xx in (0..win).step_by(2) {
            let g = image.gray_at(((x + xx) * ds) as f64, ((y + yy) * ds) as f64);
            if g < threshold {
                blacks += 1;
            }
        }
    }
    blacks
}
