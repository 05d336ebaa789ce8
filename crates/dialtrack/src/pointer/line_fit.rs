//! Needle detection by edge detection and line fitting.
//!
//! Edges are restricted to an annulus around the dial center, straight
//! segments are extracted with a Hough transform, and the best segment is the
//! one that is long and starts close to the center.

use image::{GrayImage, Luma};
use imageproc::hough::{detect_lines, LineDetectionOptions};

use crate::center::DialModel;
use crate::error::DetectError;
use crate::geometry::{angle_from_center, farther_endpoint, Point2};
use crate::preprocess::Blur;

use super::segments::{walk_line, Segment};
use super::PointerObservation;

/// Configuration for line-based needle detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LineFitConfig {
    /// Noise reduction before edge detection.
    pub blur: Blur,
    /// Canny low hysteresis threshold.
    pub canny_low: f32,
    /// Canny high hysteresis threshold.
    pub canny_high: f32,
    /// Inner annulus radius as a fraction of the dial radius.
    pub annulus_inner: f64,
    /// Outer annulus radius as a fraction of the dial radius.
    pub annulus_outer: f64,
    /// Dial radius override (pixels); takes precedence over the dial model.
    pub radius: Option<f64>,
    /// Radius guess as a fraction of the shorter image side, used when
    /// neither an override nor a fitted radius is available.
    pub fallback_radius_frac: f64,
    /// Minimum Hough votes for a line.
    pub vote_threshold: u32,
    /// Hough non-maximum suppression radius (accumulator cells).
    pub suppression_radius: u32,
    /// Minimum segment length (pixels).
    pub min_line_length: f64,
    /// Maximum gap bridged within one segment (pixels).
    pub max_line_gap: f64,
    /// Penalty per pixel of distance between the segment and the center.
    pub center_weight: f64,
}

impl Default for LineFitConfig {
    fn default() -> Self {
        Self {
            blur: Blur::Gaussian { sigma: 1.1 },
            canny_low: 60.0,
            canny_high: 140.0,
            annulus_inner: 0.30,
            annulus_outer: 1.10,
            radius: None,
            fallback_radius_frac: 0.45,
            vote_threshold: 50,
            suppression_radius: 8,
            min_line_length: 25.0,
            max_line_gap: 10.0,
            center_weight: 0.6,
        }
    }
}

impl LineFitConfig {
    /// Radius used for the annulus mask.
    pub fn effective_radius(&self, dial: &DialModel, width: u32, height: u32) -> f64 {
        self.radius
            .or(dial.radius)
            .unwrap_or(self.fallback_radius_frac * width.min(height) as f64)
    }
}

/// Zero every edge pixel outside `(inner, outer)` radii around `center`.
pub(crate) fn mask_annulus(edges: &mut GrayImage, center: Point2, inner: f64, outer: f64) {
    let (inner_sq, outer_sq) = (inner * inner, outer * outer);
    for (x, y, p) in edges.enumerate_pixels_mut() {
        let d_sq = Point2::new(x as f64, y as f64).distance_sq(center);
        if d_sq <= inner_sq || d_sq >= outer_sq {
            *p = Luma([0]);
        }
    }
}

/// Annulus-masked Canny edges.
pub fn pointer_edges(gray: &GrayImage, dial: &DialModel, config: &LineFitConfig) -> GrayImage {
    let blurred = config.blur.apply(gray);
    let mut edges = imageproc::edges::canny(&blurred, config.canny_low, config.canny_high);
    let (w, h) = gray.dimensions();
    let r = config.effective_radius(dial, w, h);
    mask_annulus(
        &mut edges,
        dial.center,
        config.annulus_inner * r,
        config.annulus_outer * r,
    );
    edges
}

/// Candidate segments from the edge mask.
pub fn detect_segments(edges: &GrayImage, config: &LineFitConfig) -> Vec<Segment> {
    let options = LineDetectionOptions {
        vote_threshold: config.vote_threshold,
        suppression_radius: config.suppression_radius,
    };
    let lines = detect_lines(edges, options);
    tracing::trace!("{} hough lines", lines.len());
    lines
        .iter()
        .flat_map(|line| walk_line(edges, line, config.min_line_length, config.max_line_gap))
        .collect()
}

/// `length - weight * distance`, where distance is the nearer endpoint's
/// distance to the center.
pub fn score_segment(segment: &Segment, center: Point2, center_weight: f64) -> f64 {
    let d_center = segment.a.distance(center).min(segment.b.distance(center));
    segment.length() - center_weight * d_center
}

/// Best-scoring segment, if any.
pub fn best_segment(segments: &[Segment], center: Point2, center_weight: f64) -> Option<Segment> {
    segments.iter().copied().max_by(|s, t| {
        score_segment(s, center, center_weight).total_cmp(&score_segment(t, center, center_weight))
    })
}

/// Needle angle from the best segment's far endpoint.
pub fn detect_line_angle(
    gray: &GrayImage,
    dial: &DialModel,
    config: &LineFitConfig,
) -> Result<PointerObservation, DetectError> {
    let edges = pointer_edges(gray, dial, config);
    let segments = detect_segments(&edges, config);
    let best = best_segment(&segments, dial.center, config.center_weight)
        .ok_or(DetectError::PointerNotFound)?;
    tracing::trace!(
        "{} segments, best ({:.1},{:.1})-({:.1},{:.1})",
        segments.len(),
        best.a.x,
        best.a.y,
        best.b.x,
        best.b.y
    );

    let tip = farther_endpoint(dial.center, best.a, best.b);
    Ok(PointerObservation {
        angle: angle_from_center(dial.center, tip),
        feature: tip,
        segment: Some([best.a, best.b]),
    })
}
