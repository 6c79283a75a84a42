//! Debug overlay rendering
//!
//! Draws what the scanner saw on top of the analyzed image: the located
//! corner markers, a dot for every sampled bubble (green when dark, faint
//! magenta otherwise) and a ring around each option that was read as the
//! answer.

use image::{ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, Blend};
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::error::{Result, ScanError};
use crate::geometry::CornerId;
use crate::scanner::SheetScan;

/// Samples darker than this are drawn as inked
pub const DARK_SAMPLE: f64 = 175.0;

const CORNER_COLOR: Rgba<u8> = Rgba([0, 255, 255, 255]);
const DARK_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const LIGHT_COLOR: Rgba<u8> = Rgba([255, 0, 255, 90]);
const ANSWER_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);

/// Copy of `image` with the scan annotated on it
pub fn render_overlay(image: &RgbaImage, scan: &SheetScan) -> RgbaImage {
    let mut canvas = Blend(image.clone());

    let corner_half = (scan.radius / 2.0).max(6.0).round() as i32;
    for id in CornerId::all() {
        let c = scan.corners.get(id);
        let rect = Rect::at(c.x.round() as i32 - corner_half, c.y.round() as i32 - corner_half)
            .of_size(corner_half as u32 * 2, corner_half as u32 * 2);
        draw_filled_rect_mut(&mut canvas, rect, CORNER_COLOR);
    }

    let dot = (scan.radius / 4.0).max(3.0).round() as i32;
    let ring = scan.radius.round().max(1.0) as i32;
    for point in &scan.scan_points {
        let center = (point.position.x.round() as i32, point.position.y.round() as i32);
        let color = if point.gray < DARK_SAMPLE {
            DARK_COLOR
        } else {
            LIGHT_COLOR
        };
        draw_filled_circle_mut(&mut canvas, center, dot, color);

        if scan.answers.get(&point.question).copied().flatten() == Some(point.option) {
            draw_hollow_circle_mut(&mut canvas, center, ring, ANSWER_COLOR);
            draw_hollow_circle_mut(&mut canvas, center, ring + 1, ANSWER_COLOR);
        }
    }

    canvas.0
}

/// PNG-encode an RGBA image
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
        .map_err(ScanError::Encode)?;
    Ok(out)
}
