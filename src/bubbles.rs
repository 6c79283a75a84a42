//! Bubble classification
//!
//! Each option is measured as the mean gray level over a filled disk, which
//! tolerates pen texture and small registration errors better than a single
//! pixel. A question counts as answered only when its darkest option is both
//! dark in absolute terms and clearly darker than the runner-up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geometry::{Corners, Point};
use crate::raster::RasterImage;
use crate::template::BubbleRule;

/// Answer option printed on the sheet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn all() -> [AnswerOption; 4] {
        [AnswerOption::A, AnswerOption::B, AnswerOption::C, AnswerOption::D]
    }

    /// Option for a column index (0 = A)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            other => Err(format!("unknown answer option '{}'", other)),
        }
    }
}

/// One measured bubble, kept for debug overlays
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanPoint {
    pub position: Point,
    pub gray: f64,
    pub question: u32,
    pub option: AnswerOption,
}

/// Classification of one question row
#[derive(Debug, Clone, PartialEq)]
pub struct RowReading {
    pub answer: Option<AnswerOption>,
    /// One sample per option, in A-D order
    pub samples: Vec<ScanPoint>,
}

/// Sampling disk radius for a sheet of the given pixel size
pub fn bubble_radius(corners: &Corners, rule: &BubbleRule) -> f64 {
    corners.average_width() * rule.radius_fraction
}

/// Mean gray over all pixels within `radius` of `center`.
///
/// Pixels outside the image read as the nearest edge pixel. An empty disk
/// reads as white.
pub fn region_mean_gray(image: &RasterImage, center: Point, radius: f64) -> f64 {
    let x0 = (center.x - radius).floor() as i64;
    let x1 = (center.x + radius).floor() as i64;
    let y0 = (center.y - radius).floor() as i64;
    let y1 = (center.y + radius).floor() as i64;
    let rr = radius * radius;

    let mut sum = 0.0;
    let mut count = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;
            if dx * dx + dy * dy <= rr {
                sum += image.gray_at(x as f64, y as f64);
                count += 1;
            }
        }
    }

    if count > 0 {
        sum / count as f64
    } else {
        255.0
    }
}

/// Pick the marked option of one question, or none.
pub fn classify_row(
    image: &RasterImage,
    corners: &Corners,
    question: u32,
    row_v: f64,
    columns: &[f64; 4],
    radius: f64,
    rule: &BubbleRule,
) -> RowReading {
    let samples: Vec<ScanPoint> = columns
        .iter()
        .zip(AnswerOption::all())
        .map(|(&u, option)| {
            let position = corners.to_pixel(u, row_v);
            ScanPoint {
                position,
                gray: region_mean_gray(image, position, radius),
                question,
                option,
            }
        })
        .collect();

    RowReading {
        answer: decide(&samples, rule),
        samples,
    }
}

/// Darkest option wins if it is below `max_gray` and beats the
/// second-darkest by more than `min_gap`.
fn decide(samples: &[ScanPoint], rule: &BubbleRule) -> Option<AnswerOption> {
    let mut ranked: Vec<&ScanPoint> = samples.iter().collect();
    ranked.sort_by(|a, b| a.gray.total_cmp(&b.gray));

    let darkest = ranked.first()?;
    let runner_up = ranked.get(1)?;
    let gap = runner_up.gray - darkest.gray;

    (gap > rule.min_gap && darkest.gray < rule.max_gray).then_some(darkest.option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DEFAULT_COLUMNS;
    use crate::test_utils::*;

    fn sample(option: AnswerOption, gray: f64) -> ScanPoint {
        ScanPoint {
            position: Point::new(0.0, 0.0),
            gray,
            question: 1,
            option,
        }
    }

    fn readings(grays: [f64; 4]) -> Vec<ScanPoint> {
        AnswerOption::all()
            .into_iter()
            .zip(grays)
            .map(|(o, g)| sample(o, g))
            .collect()
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("c".parse::<AnswerOption>().unwrap(), AnswerOption::C);
        assert_eq!(" D ".parse::<AnswerOption>().unwrap(), AnswerOption::D);
        assert!("E".parse::<AnswerOption>().is_err());
        assert_eq!(AnswerOption::from_index(1), Some(AnswerOption::B));
        assert_eq!(AnswerOption::from_index(4), None);
    }

    #[test]
    fn test_decision_rule() {
        let rule = BubbleRule::default();

        assert_eq!(decide(&readings([230.0, 60.0, 228.0, 231.0]), &rule), Some(AnswerOption::B));
        // Too light
        assert_eq!(decide(&readings([230.0, 190.0, 228.0, 231.0]), &rule), None);
        // Ambiguous
        assert_eq!(decide(&readings([60.0, 230.0, 65.0, 231.0]), &rule), None);
        // Gap of exactly min_gap is not enough
        assert_eq!(decide(&readings([100.0, 110.0, 230.0, 230.0]), &rule), None);
        assert_eq!(decide(&readings([100.0, 110.5, 230.0, 230.0]), &rule), Some(AnswerOption::A));
    }

    #[test]
    fn test_region_mean() {
        let mut img = blank_sheet();
        let center = Point::new(100.0, 100.0);
        fill_disk(&mut img, center, 12.0, INK);
        let raster = RasterImage::from_rgba(&img).unwrap();

        assert_eq!(region_mean_gray(&raster, center, 10.0), 0.0);
        let paper = region_mean_gray(&raster, Point::new(300.0, 300.0), 10.0);
        assert!((paper - raster.gray_at(300.0, 300.0)).abs() < 1e-9);
        // Half-covered disk lands in between
        let edge = region_mean_gray(&raster, Point::new(112.0, 100.0), 10.0);
        assert!(edge > 50.0 && edge < 200.0, "edge mean {}", edge);
    }

    #[test]
    fn test_region_mean_at_image_border() {
        let img = blank_sheet();
        let raster = RasterImage::from_rgba(&img).unwrap();
        let g = region_mean_gray(&raster, Point::new(-3.0, -3.0), 8.0);
        assert!((g - raster.gray_at(0.0, 0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_classifies_one_mark_per_question() {
        let corners = true_corners();
        let rule = BubbleRule::default();
        let radius = bubble_radius(&corners, &rule);
        let rows = expected_rows(12, &crate::template::RowSearch::default());
        let marks: Vec<(usize, usize)> = (0..rows.len()).map(|q| (q, (q * 3) % 4)).collect();

        let mut img = marked_sheet();
        fill_answers(&mut img, &corners, &DEFAULT_COLUMNS, &rows, &marks, 20.0);
        let raster = RasterImage::from_rgba(&img).unwrap();

        for &(q, option) in &marks {
            let reading = classify_row(&raster, &corners, q as u32 + 1, rows[q], &DEFAULT_COLUMNS, radius, &rule);
            assert_eq!(reading.answer, AnswerOption::from_index(option), "question {}", q + 1);
            assert_eq!(reading.samples.len(), 4);
            assert!(reading.samples.iter().all(|s| s.question == q as u32 + 1));
        }
    }

    #[test]
    fn test_two_equal_marks_are_unanswered() {
        let corners = true_corners();
        let rule = BubbleRule::default();
        let radius = bubble_radius(&corners, &rule);
        let rows = expected_rows(5, &crate::template::RowSearch::default());

        let mut img = marked_sheet();
        fill_answers(&mut img, &corners, &DEFAULT_COLUMNS, &rows, &[(2, 0), (2, 1)], 20.0);
        let raster = RasterImage::from_rgba(&img).unwrap();

        let reading = classify_row(&raster, &corners, 3, rows[2], &DEFAULT_COLUMNS, radius, &rule);
        assert_eq!(reading.answer, None);
        assert!(reading.samples[0].gray < 185.0 && reading.samples[1].gray < 185.0);
    }

    #[test]
    fn test_radius_scales_with_sheet() {
        let corners = true_corners();
        let r = bubble_radius(&corners, &BubbleRule::default());
        assert!((r - 610.0 * 0.022).abs() < 1e-9);
    }
}
