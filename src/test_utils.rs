//! Synthetic answer sheets for unit tests.
//!
//! The sheet is 700x990 with four solid 45px markers. Their positions line
//! up with the corner search grid (3x downsample, 3px stride, 13px window),
//! so the located centers coincide with the printed ones.

use image::{Rgba, RgbaImage};

use crate::geometry::{Corners, Point};
use crate::template::RowSearch;

pub(crate) const SHEET_W: u32 = 700;
pub(crate) const SHEET_H: u32 = 990;
pub(crate) const MARKER_SIZE: u32 = 45;

pub(crate) const PAPER: Rgba<u8> = Rgba([240, 240, 236, 255]);
pub(crate) const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Plain paper, no markers
pub(crate) fn blank_sheet() -> RgbaImage {
    RgbaImage::from_pixel(SHEET_W, SHEET_H, PAPER)
}

/// Paper with all four corner markers printed
pub(crate) fn marked_sheet() -> RgbaImage {
    let mut img = blank_sheet();
    for (x, y) in marker_origins() {
        fill_rect(&mut img, x, y, MARKER_SIZE, MARKER_SIZE, INK);
    }
    img
}

/// Top-left pixel of each marker, in TL, TR, BL, BR order
pub(crate) fn marker_origins() -> [(u32, u32); 4] {
    [(15, 15), (630, 15), (15, 912), (630, 912)]
}

/// Exact centers of the printed markers
pub(crate) fn true_corners() -> Corners {
    let half = MARKER_SIZE as f64 / 2.0;
    let [tl, tr, bl, br] = marker_origins()
        .map(|(x, y)| Point::new(x as f64 + half, y as f64 + half));
    Corners::new(tl, tr, bl, br)
}

pub(crate) fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Paint every pixel within `radius` of `center`
pub(crate) fn fill_disk(img: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    let x0 = (center.x - radius).floor().max(0.0) as u32;
    let y0 = (center.y - radius).floor().max(0.0) as u32;
    let x1 = ((center.x + radius).ceil() as u32).min(img.width() - 1);
    let y1 = ((center.y + radius).ceil() as u32).min(img.height() - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;
            if dx * dx + dy * dy <= radius * radius {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Evenly spaced row centers, first at v_start and last at v_end
pub(crate) fn expected_rows(count: usize, rows: &RowSearch) -> Vec<f64> {
    let step = (rows.v_end - rows.v_start) / (count.max(2) - 1) as f64;
    (0..count).map(|i| rows.v_start + i as f64 * step).collect()
}

/// Fill the bubble for `option` (0 = A) of every listed question
pub(crate) fn fill_answers(
    img: &mut RgbaImage,
    corners: &Corners,
    columns: &[f64; 4],
    rows_v: &[f64],
    marks: &[(usize, usize)],
    radius: f64,
) {
    for &(question, option) in marks {
        let center = corners.to_pixel(columns[option], rows_v[question]);
        fill_disk(img, center, radius, INK);
    }
}
