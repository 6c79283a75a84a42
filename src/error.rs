//! Error types for sheet analysis

use thiserror::Error;

use crate::geometry::CornerId;
use crate::template::TemplateError;

/// Everything that can stop an analysis from producing a [`SheetScan`](crate::SheetScan)
#[derive(Debug, Error)]
pub enum ScanError {
    /// Zero-sized raster; there is no geometry to work with
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Pixel buffer does not hold width * height RGBA pixels
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("question count must be at least 1")]
    NoQuestions,

    #[error("question count {requested} exceeds the limit of {max}")]
    TooManyQuestions { requested: usize, max: usize },

    #[error("invalid sheet template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// One or more fiducial markers could not be found
    #[error("corner markers not found: {}", format_missing(.missing))]
    MarkersNotFound { missing: Vec<CornerId> },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

impl ScanError {
    /// Short machine-readable tag, used in API responses
    pub fn tag(&self) -> &'static str {
        match self {
            ScanError::EmptyImage { .. } => "empty-image",
            ScanError::BufferSizeMismatch { .. } => "buffer-size-mismatch",
            ScanError::NoQuestions => "no-questions",
            ScanError::TooManyQuestions { .. } => "too-many-questions",
            ScanError::InvalidTemplate(_) => "invalid-template",
            ScanError::MarkersNotFound { .. } => "marker-not-found",
            ScanError::Decode(_) => "decode-failed",
            ScanError::Encode(_) => "encode-failed",
        }
    }
}

fn format_missing(missing: &[CornerId]) -> String {
    missing
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_message_lists_corners() {
        let err = ScanError::MarkersNotFound {
            missing: vec![CornerId::TopRight, CornerId::BottomLeft],
        };
        assert_eq!(
            err.to_string(),
            "corner markers not found: Top Right, Bottom Left"
        );
        assert_eq!(err.tag(), "marker-not-found");
    }
}
