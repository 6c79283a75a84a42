//! Sheet analysis pipeline
//!
//! image -> corners -> rows -> per-question classification. Nothing is
//! cached between calls: every analysis builds its own state from the image
//! and the template, so scanning the same photo twice gives the same result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::bubbles::{bubble_radius, classify_row, AnswerOption, ScanPoint};
use crate::corners::locate_corners;
use crate::error::{Result, ScanError};
use crate::geometry::Corners;
use crate::raster::RasterImage;
use crate::rows::locate_rows;
use crate::template::SheetTemplate;

/// Largest question count a single sheet may declare
pub const MAX_QUESTIONS: usize = 1000;

/// Question number (1-based) to marked option, `None` when unanswered
pub type AnswersMap = BTreeMap<u32, Option<AnswerOption>>;

/// Successful analysis of one sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetScan {
    pub answers: AnswersMap,
    pub corners: Corners,
    /// One sample per (question, option), question-major, options A-D
    pub scan_points: Vec<ScanPoint>,
    /// Located row positions (normalized v), in question order
    pub rows: Vec<f64>,
    /// Sampling disk radius used, in pixels
    pub radius: f64,
}

impl SheetScan {
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_some()).count()
    }
}

/// Runs the pipeline for one sheet template
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    template: SheetTemplate,
}

impl Scanner {
    pub fn new(template: SheetTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &SheetTemplate {
        &self.template
    }

    /// Read `question_count` answers from a decoded sheet photo.
    ///
    /// Fails with [`ScanError::MarkersNotFound`] if any corner marker is
    /// missing; no partial result is produced in that case.
    pub fn analyze(&self, image: &RasterImage, question_count: usize) -> Result<SheetScan> {
        if question_count == 0 {
            return Err(ScanError::NoQuestions);
        }
        if question_count > MAX_QUESTIONS {
            return Err(ScanError::TooManyQuestions {
                requested: question_count,
                max: MAX_QUESTIONS,
            });
        }
        self.template.validate()?;

        let started = Instant::now();
        let template = &self.template;

        let corners = locate_corners(image, &template.corners)?;
        let radius = bubble_radius(&corners, &template.bubbles);
        debug!("Corners {:?}, bubble radius {:.2}px", corners, radius);

        let rows = locate_rows(image, &corners, question_count, &template.columns, &template.rows);

        let mut answers = AnswersMap::new();
        let mut scan_points = Vec::with_capacity(question_count * template.columns.len());

        for (question, &row_v) in (1u32..).zip(rows.iter()) {
            let reading = classify_row(
                image,
                &corners,
                question,
                row_v,
                &template.columns,
                radius,
                &template.bubbles,
            );
            answers.insert(question, reading.answer);
            scan_points.extend(reading.samples);
        }

        let scan = SheetScan {
            answers,
            corners,
            scan_points,
            rows,
            radius,
        };

        info!(
            "Scanned {}x{} sheet: {}/{} answered in {:.1}ms",
            image.width(),
            image.height(),
            scan.answered_count(),
            question_count,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(scan)
    }
}

/// Analyze with the default sheet template
pub fn analyze(image: &RasterImage, question_count: usize) -> Result<SheetScan> {
    Scanner::default().analyze(image, question_count)
}
