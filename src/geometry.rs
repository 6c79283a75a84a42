//! Sheet geometry: pixel points, the four marker corners, and the
//! bilinear mapping from normalized sheet coordinates to pixels.
//!
//! The mapping interpolates along the top and bottom edges first and then
//! between them. It is not a true perspective transform, but four anchored
//! corners on a near fronto-parallel photo keep the error well below one
//! bubble radius.

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`, exact at `t = 0` and `t = 1`
    #[inline]
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x * (1.0 - t) + other.x * t,
            y: self.y * (1.0 - t) + other.y * t,
        }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Identifies one of the four fiducial markers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CornerId {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerId {
    pub fn all() -> [CornerId; 4] {
        [
            CornerId::TopLeft,
            CornerId::TopRight,
            CornerId::BottomLeft,
            CornerId::BottomRight,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CornerId::TopLeft => "Top Left",
            CornerId::TopRight => "Top Right",
            CornerId::BottomLeft => "Bottom Left",
            CornerId::BottomRight => "Bottom Right",
        }
    }

    pub fn is_right(&self) -> bool {
        matches!(self, CornerId::TopRight | CornerId::BottomRight)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, CornerId::BottomLeft | CornerId::BottomRight)
    }
}

/// Marker centers located in one photo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Corners {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Corners {
    pub fn new(top_left: Point, top_right: Point, bottom_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    pub fn get(&self, id: CornerId) -> Point {
        match id {
            CornerId::TopLeft => self.top_left,
            CornerId::TopRight => self.top_right,
            CornerId::BottomLeft => self.bottom_left,
            CornerId::BottomRight => self.bottom_right,
        }
    }

    /// Mean of the top and bottom edge widths along x
    pub fn average_width(&self) -> f64 {
        ((self.top_right.x - self.top_left.x) + (self.bottom_right.x - self.bottom_left.x)) / 2.0
    }

    /// True when the quadrilateral is not mirrored in either axis
    pub fn is_upright(&self) -> bool {
        self.top_left.x < self.top_right.x && self.top_left.y < self.bottom_left.y
    }

    /// Map normalized sheet coordinates to a pixel position.
    ///
    /// `u` runs left to right, `v` top to bottom. Values outside `[0, 1]`
    /// extrapolate and are not clamped.
    #[inline]
    pub fn to_pixel(&self, u: f64, v: f64) -> Point {
        let top = self.top_left.lerp(&self.top_right, u);
        let bottom = self.bottom_left.lerp(&self.bottom_right, u);
        top.lerp(&bottom, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> Corners {
        Corners::new(
            Point::new(41.3, 37.9),
            Point::new(655.1, 44.7),
            Point::new(33.3, 951.2),
            Point::new(662.8, 940.05),
        )
    }

    #[test]
    fn test_extremes_are_exact() {
        let c = skewed();
        assert_eq!(c.to_pixel(0.0, 0.0), c.top_left);
        assert_eq!(c.to_pixel(1.0, 0.0), c.top_right);
        assert_eq!(c.to_pixel(0.0, 1.0), c.bottom_left);
        assert_eq!(c.to_pixel(1.0, 1.0), c.bottom_right);
    }

    #[test]
    fn test_center_of_rectangle() {
        let c = Corners::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 200.0),
            Point::new(100.0, 200.0),
        );
        let p = c.to_pixel(0.5, 0.25);
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolates_outside_unit_square() {
        let c = Corners::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
        );
        let p = c.to_pixel(1.5, -0.5);
        assert!((p.x - 150.0).abs() < 1e-9);
        assert!((p.y + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_width_and_orientation() {
        let c = skewed();
        let expected = ((655.1 - 41.3) + (662.8 - 33.3)) / 2.0;
        assert!((c.average_width() - expected).abs() < 1e-9);
        assert!(c.is_upright());

        let flipped = Corners::new(c.top_right, c.top_left, c.bottom_right, c.bottom_left);
        assert!(!flipped.is_upright());
    }
}
