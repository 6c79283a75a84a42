//! Answer sheet template
//!
//! Every constant the scanner relies on is tied to one printed sheet layout:
//! where the option columns sit, which vertical band holds the answer grid,
//! and how dark a mark or marker has to be. They live here as named,
//! serializable parameters so a different sheet can be described in the
//! config file instead of in code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized horizontal position of the A, B, C and D bubble columns
pub const DEFAULT_COLUMNS: [f64; 4] = [0.32, 0.50, 0.68, 0.86];

/// Corner marker search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerSearch {
    /// Integer downsample factor applied before searching
    #[serde(default = "default_downsample")]
    pub downsample: u32,

    /// Fraction of width/height nearest each corner that is searched
    #[serde(default = "default_roi_fraction")]
    pub roi_fraction: f64,

    /// Grid spacing (downsampled px) for the local brightness estimate
    #[serde(default = "default_threshold_sample_step")]
    pub threshold_sample_step: u32,

    /// Dark threshold = local mean * factor, clamped to [min, max]
    #[serde(default = "default_corner_threshold_factor")]
    pub threshold_factor: f64,
    #[serde(default = "default_corner_threshold_min")]
    pub threshold_min: f64,
    #[serde(default = "default_corner_threshold_max")]
    pub threshold_max: f64,

    /// Window side as a fraction of the shorter downsampled dimension
    #[serde(default = "default_window_fraction")]
    pub window_fraction: f64,
    #[serde(default = "default_min_window")]
    pub min_window: u32,

    /// Window stride in downsampled pixels
    #[serde(default = "default_window_step")]
    pub window_step: u32,

    /// Minimum dark sample count for a window to count as a marker
    #[serde(default = "default_min_dark_count")]
    pub min_dark_count: u32,
}

fn default_downsample() -> u32 { 3 }
fn default_roi_fraction() -> f64 { 0.22 }
fn default_threshold_sample_step() -> u32 { 8 }
fn default_corner_threshold_factor() -> f64 { 0.55 }
fn default_corner_threshold_min() -> f64 { 55.0 }
fn default_corner_threshold_max() -> f64 { 120.0 }
fn default_window_fraction() -> f64 { 0.06 }
fn default_min_window() -> u32 { 10 }
fn default_window_step() -> u32 { 3 }
fn default_min_dark_count() -> u32 { 15 }

impl Default for CornerSearch {
    fn default() -> Self {
        Self {
            downsample: default_downsample(),
            roi_fraction: default_roi_fraction(),
            threshold_sample_step: default_threshold_sample_step(),
            threshold_factor: default_corner_threshold_factor(),
            threshold_min: default_corner_threshold_min(),
            threshold_max: default_corner_threshold_max(),
            window_fraction: default_window_fraction(),
            min_window: default_min_window(),
            window_step: default_window_step(),
            min_dark_count: default_min_dark_count(),
        }
    }
}

/// Answer row search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSearch {
    /// Vertical extent of the printed answer grid, normalized
    #[serde(default = "default_v_start")]
    pub v_start: f64,
    #[serde(default = "default_v_end")]
    pub v_end: f64,

    /// Number of projection samples across [v_start, v_end]
    #[serde(default = "default_resolution")]
    pub resolution: usize,

    /// Random pixels sampled for the global ink threshold
    #[serde(default = "default_threshold_samples")]
    pub threshold_samples: usize,
    #[serde(default = "default_row_threshold_factor")]
    pub threshold_factor: f64,
    #[serde(default = "default_row_threshold_min")]
    pub threshold_min: f64,
    #[serde(default = "default_row_threshold_max")]
    pub threshold_max: f64,

    /// Seed for the threshold sampler; fixed so repeated scans agree
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ring of probes around each column position
    #[serde(default = "default_probe_radius")]
    pub probe_radius: f64,
    #[serde(default = "default_probe_count")]
    pub probe_count: usize,

    /// Moving average half-width, in projection samples
    #[serde(default = "default_smoothing")]
    pub smoothing: usize,

    /// Local search half-width as a fraction of the row step
    #[serde(default = "default_search_fraction")]
    pub search_fraction: f64,
}

fn default_v_start() -> f64 { 0.16 }
fn default_v_end() -> f64 { 0.92 }
fn default_resolution() -> usize { 900 }
fn default_threshold_samples() -> usize { 1200 }
fn default_row_threshold_factor() -> f64 { 0.62 }
fn default_row_threshold_min() -> f64 { 70.0 }
fn default_row_threshold_max() -> f64 { 140.0 }
fn default_seed() -> u64 { 0x6f6d_7273 }
fn default_probe_radius() -> f64 { 10.0 }
fn default_probe_count() -> usize { 6 }
fn default_smoothing() -> usize { 21 }
fn default_search_fraction() -> f64 { 0.30 }

impl Default for RowSearch {
    fn default() -> Self {
        Self {
            v_start: default_v_start(),
            v_end: default_v_end(),
            resolution: default_resolution(),
            threshold_samples: default_threshold_samples(),
            threshold_factor: default_row_threshold_factor(),
            threshold_min: default_row_threshold_min(),
            threshold_max: default_row_threshold_max(),
            seed: default_seed(),
            probe_radius: default_probe_radius(),
            probe_count: default_probe_count(),
            smoothing: default_smoothing(),
            search_fraction: default_search_fraction(),
        }
    }
}

/// Mark decision rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleRule {
    /// Sampling disk radius as a fraction of the average sheet width in px
    #[serde(default = "default_radius_fraction")]
    pub radius_fraction: f64,

    /// Darkest option must be below this gray value
    #[serde(default = "default_max_gray")]
    pub max_gray: f64,

    /// ...and darker than the runner-up by more than this
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
}

fn default_radius_fraction() -> f64 { 0.022 }
fn default_max_gray() -> f64 { 185.0 }
fn default_min_gap() -> f64 { 10.0 }

impl Default for BubbleRule {
    fn default() -> Self {
        Self {
            radius_fraction: default_radius_fraction(),
            max_gray: default_max_gray(),
            min_gap: default_min_gap(),
        }
    }
}

/// Full description of one answer sheet layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTemplate {
    /// u-coordinates of options A-D
    #[serde(default = "default_columns")]
    pub columns: [f64; 4],

    #[serde(default)]
    pub corners: CornerSearch,

    #[serde(default)]
    pub rows: RowSearch,

    #[serde(default)]
    pub bubbles: BubbleRule,
}

fn default_columns() -> [f64; 4] {
    DEFAULT_COLUMNS
}

/// Template values the scanner cannot work with
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("column {index} at u={value} is outside [0, 1]")]
    ColumnOutOfRange { index: usize, value: f64 },

    #[error("answer grid band [{start}, {end}] is empty or outside [0, 1]")]
    InvalidRowBand { start: f64, end: f64 },

    #[error("{0} is too small")]
    TooSmall(&'static str),

    #[error("{name} is too large (at most {max})")]
    TooLarge { name: &'static str, max: f64 },

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{name} range [{min}, {max}] is inverted")]
    InvertedRange { name: &'static str, min: f64, max: f64 },
}

/// Largest projection resolution the row search accepts
pub const MAX_RESOLUTION: usize = 10_000;
/// Largest random sample count for the global threshold
pub const MAX_THRESHOLD_SAMPLES: usize = 1_000_000;
/// Largest number of ring probes per column
pub const MAX_PROBE_COUNT: usize = 360;

fn finite(name: &'static str, value: f64) -> Result<f64, TemplateError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TemplateError::NotFinite(name))
    }
}

fn clamp_range(name: &'static str, min: f64, max: f64) -> Result<(), TemplateError> {
    finite(name, min)?;
    finite(name, max)?;
    if min > max {
        return Err(TemplateError::InvertedRange { name, min, max });
    }
    Ok(())
}

fn at_most(name: &'static str, value: f64, max: f64) -> Result<(), TemplateError> {
    if value > max {
        return Err(TemplateError::TooLarge { name, max });
    }
    Ok(())
}

impl SheetTemplate {
    /// Reject layouts that would make the row search or sampling degenerate
    pub fn validate(&self) -> Result<(), TemplateError> {
        for (index, &value) in self.columns.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(TemplateError::ColumnOutOfRange { index, value });
            }
        }

        let (start, end) = (self.rows.v_start, self.rows.v_end);
        if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) || start >= end {
            return Err(TemplateError::InvalidRowBand { start, end });
        }

        self.validate_corners()?;
        self.validate_rows()?;
        self.validate_bubbles()
    }

    fn validate_corners(&self) -> Result<(), TemplateError> {
        let c = &self.corners;
        if c.downsample == 0 {
            return Err(TemplateError::TooSmall("corners.downsample"));
        }
        if c.window_step == 0 {
            return Err(TemplateError::TooSmall("corners.window_step"));
        }
        if c.threshold_sample_step == 0 {
            return Err(TemplateError::TooSmall("corners.threshold_sample_step"));
        }

        if finite("corners.roi_fraction", c.roi_fraction)? <= 0.0 {
            return Err(TemplateError::TooSmall("corners.roi_fraction"));
        }
        at_most("corners.roi_fraction", c.roi_fraction, 0.5)?;
        if finite("corners.window_fraction", c.window_fraction)? < 0.0 {
            return Err(TemplateError::TooSmall("corners.window_fraction"));
        }
        at_most("corners.window_fraction", c.window_fraction, 1.0)?;

        finite("corners.threshold_factor", c.threshold_factor)?;
        clamp_range("corners.threshold", c.threshold_min, c.threshold_max)
    }

    fn validate_rows(&self) -> Result<(), TemplateError> {
        let r = &self.rows;
        if r.resolution < 2 {
            return Err(TemplateError::TooSmall("rows.resolution"));
        }
        at_most("rows.resolution", r.resolution as f64, MAX_RESOLUTION as f64)?;
        at_most("rows.smoothing", r.smoothing as f64, r.resolution as f64)?;
        at_most(
            "rows.threshold_samples",
            r.threshold_samples as f64,
            MAX_THRESHOLD_SAMPLES as f64,
        )?;

        if r.probe_count == 0 {
            return Err(TemplateError::TooSmall("rows.probe_count"));
        }
        at_most("rows.probe_count", r.probe_count as f64, MAX_PROBE_COUNT as f64)?;
        if finite("rows.probe_radius", r.probe_radius)? < 0.0 {
            return Err(TemplateError::TooSmall("rows.probe_radius"));
        }
        if finite("rows.search_fraction", r.search_fraction)? < 0.0 {
            return Err(TemplateError::TooSmall("rows.search_fraction"));
        }

        finite("rows.threshold_factor", r.threshold_factor)?;
        clamp_range("rows.threshold", r.threshold_min, r.threshold_max)
    }

    fn validate_bubbles(&self) -> Result<(), TemplateError> {
        let b = &self.bubbles;
        if finite("bubbles.radius_fraction", b.radius_fraction)? <= 0.0 {
            return Err(TemplateError::TooSmall("bubbles.radius_fraction"));
        }
        at_most("bubbles.radius_fraction", b.radius_fraction, 0.25)?;
        finite("bubbles.max_gray", b.max_gray)?;
        finite("bubbles.min_gap", b.min_gap)?;
        Ok(())
    }
}

impl Default for SheetTemplate {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            corners: CornerSearch::default(),
            rows: RowSearch::default(),
            bubbles: BubbleRule::default(),
        }
    }
}
