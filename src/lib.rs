//! omrscan - optical mark recognition for printed answer sheets
//!
//! A photo of a sheet with four dark corner markers and a grid of A-D
//! bubbles goes in; the marked option for each question comes out. The
//! pipeline is: locate the corner markers, map normalized sheet coordinates
//! onto the photo, find each answer row, then classify its four bubbles.

pub mod bubbles;
pub mod config;
pub mod corners;
pub mod error;
pub mod geometry;
pub mod grading;
pub mod loader;
pub mod overlay;
pub mod raster;
pub mod rows;
pub mod scanner;
pub mod server;
pub mod template;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bubbles::{AnswerOption, ScanPoint};
pub use error::ScanError;
pub use geometry::{CornerId, Corners, Point};
pub use raster::RasterImage;
pub use scanner::{analyze, AnswersMap, Scanner, SheetScan};
pub use template::SheetTemplate;
