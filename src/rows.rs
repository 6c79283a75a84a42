//! Answer row search
//!
//! Printed sheets are rarely aligned perfectly, so each question's row is
//! located rather than assumed. A vertical ink projection is built across
//! the answer grid by probing a small ring around every option column, then
//! smoothed, and each question takes the strongest response inside a window
//! around its expected position. Windows are local so one strong row cannot
//! capture a neighbour's position.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::f64::consts::TAU;
use tracing::debug;

use crate::geometry::Corners;
use crate::raster::RasterImage;
use crate::template::RowSearch;

/// Locate the v-coordinate of each question row, in question order.
pub fn locate_rows(
    image: &RasterImage,
    corners: &Corners,
    question_count: usize,
    columns: &[f64],
    params: &RowSearch,
) -> Vec<f64> {
    if question_count == 0 {
        return Vec::new();
    }

    let axis = ProjectionAxis::new(params);
    let threshold = global_threshold(image, params);
    let projection = ink_projection(image, corners, columns, threshold, &axis, params);
    let smoothed = smooth(&projection, params.smoothing);

    let step = axis.span() / (question_count.max(2) - 1) as f64;
    let window = step * params.search_fraction;

    let rows: Vec<f64> = (0..question_count)
        .map(|qi| {
            let expected = params.v_start + qi as f64 * step;
            let from = axis.index_of((expected - window).max(params.v_start));
            let to = axis.index_of((expected + window).min(params.v_end));
            axis.v_at(argmax(&smoothed, from, to))
        })
        .collect();

    debug!(
        "Row search: threshold {:.1}, step {:.4}, rows {:?}",
        threshold, step, rows
    );
    rows
}

/// Sample positions along v
#[derive(Debug, Clone, Copy)]
struct ProjectionAxis {
    v_start: f64,
    v_end: f64,
    resolution: usize,
}

impl ProjectionAxis {
    fn new(params: &RowSearch) -> Self {
        Self {
            v_start: params.v_start,
            v_end: params.v_end,
            resolution: params.resolution.max(2),
        }
    }

    fn span(&self) -> f64 {
        self.v_end - self.v_start
    }

    fn v_at(&self, index: usize) -> f64 {
        self.v_start + (index as f64 / (self.resolution - 1) as f64) * self.span()
    }

    fn index_of(&self, v: f64) -> usize {
        let t = (v - self.v_start) / self.span();
        ((t * (self.resolution - 1) as f64).floor().max(0.0) as usize).min(self.resolution - 1)
    }
}

/// Global ink threshold from the mean of randomly placed samples.
///
/// The sampler is seeded from the template, so the same image always gets
/// the same threshold.
pub fn global_threshold(image: &RasterImage, params: &RowSearch) -> f64 {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let w = image.width() as f64;
    let h = image.height() as f64;

    let mut sum = 0.0;
    for _ in 0..params.threshold_samples {
        let x = rng.gen::<f64>() * w;
        let y = rng.gen::<f64>() * h;
        sum += image.gray_at(x, y);
    }

    let mean = if params.threshold_samples > 0 {
        sum / params.threshold_samples as f64
    } else {
        200.0
    };
    (mean * params.threshold_factor).clamp(params.threshold_min, params.threshold_max)
}

/// Dark probe count per v-sample, summed over all columns
fn ink_projection(
    image: &RasterImage,
    corners: &Corners,
    columns: &[f64],
    threshold: f64,
    axis: &ProjectionAxis,
    params: &RowSearch,
) -> Vec<f64> {
    let probes: Vec<(f64, f64)> = (0..params.probe_count)
        .map(|k| {
            let angle = k as f64 / params.probe_count as f64 * TAU;
            (angle.cos() * params.probe_radius, angle.sin() * params.probe_radius)
        })
        .collect();

    (0..axis.resolution)
        .into_par_iter()
        .map(|yi| {
            let v = axis.v_at(yi);
            let mut blacks = 0u32;
            for &u in columns {
                let center = corners.to_pixel(u, v);
                for &(dx, dy) in &probes {
                    if image.gray_at(center.x + dx, center.y + dy) < threshold {
                        blacks += 1;
                    }
                }
            }
            blacks as f64
        })
        .collect()
}

/// Centered moving average over `±half` samples, truncated at the ends
fn smooth(values: &[f64], half: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let window = &values[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Index of the first maximum in `values[from..=to]`
fn argmax(values: &[f64], from: usize, to: usize) -> usize {
    let mut best = from;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &value) in values.iter().enumerate().take(to + 1).skip(from) {
        if value > best_val {
            best_val = value;
            best = i;
        }
    }
    best
}
