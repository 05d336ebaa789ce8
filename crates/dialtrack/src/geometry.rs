//! Angle arithmetic in image coordinates.
//!
//! Angles are in degrees, canonical range `[0, 360)`, measured
//! counter-clockwise from the image +x axis. Image y grows downward, so the
//! y-term is negated before `atan2` to keep the mathematical convention.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// Column coordinate (pixels).
    pub x: f64,
    /// Row coordinate (pixels).
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    pub fn distance_sq(&self, other: Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate by `(dx, dy)`.
    #[inline]
    pub fn offset(&self, dx: f64, dy: f64) -> Point2 {
        Point2::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// Reduce any finite angle into `[0, 360)`.
#[inline]
pub fn normalize_angle(deg: f64) -> f64 {
    let a = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Signed shortest angular delta from `a` to `b`, in `[-180, 180)`.
///
/// Positive means `b` lies counter-clockwise of `a` along the shorter arc.
#[inline]
pub fn signed_shortest_difference(a: f64, b: f64) -> f64 {
    normalize_angle(b - a + 540.0) - 180.0
}

/// Angle of the vector `center -> point`, in `[0, 360)`.
pub fn angle_from_center(center: Point2, point: Point2) -> f64 {
    let dx = point.x - center.x;
    let dy = -(point.y - center.y);
    normalize_angle(dy.atan2(dx).to_degrees())
}

/// Point at distance `length` from `center` in direction `angle_deg`.
///
/// Inverse of [`angle_from_center`]; renderers use it for direction lines
/// and calibration reference ticks.
pub fn direction_endpoint(center: Point2, angle_deg: f64, length: f64) -> Point2 {
    let rad = angle_deg.to_radians();
    Point2::new(center.x + length * rad.cos(), center.y - length * rad.sin())
}

/// Of the two segment endpoints, the one farther from `center`.
///
/// Ties keep `a`.
pub fn farther_endpoint(center: Point2, a: Point2, b: Point2) -> Point2 {
    if b.distance_sq(center) > a.distance_sq(center) {
        b
    } else {
        a
    }
}
