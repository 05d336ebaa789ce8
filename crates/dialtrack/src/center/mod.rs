//! Dial center detection.
//!
//! The dial face is located with a gradient Hough search over candidate
//! centers and radii, optionally refined by a least-squares circle fit over
//! the rim edge pixels. A manual center in the configuration bypasses the
//! search entirely.

mod hough;
mod refine;

use image::GrayImage;

use crate::error::DetectError;
use crate::geometry::Point2;
use crate::preprocess::Blur;

use hough::GradientField;

/// Rule for picking one circle among the surviving candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleSelection {
    /// Highest rim support per unit of circumference.
    #[default]
    Strongest,
    /// Largest radius; suits reference images where the shaft collar is the
    /// biggest circle in view.
    LargestRadius,
}

/// Configuration for dial center detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Noise reduction before gradient computation.
    pub blur: Blur,
    /// Minimum circle radius (pixels).
    pub r_min: f32,
    /// Maximum circle radius (pixels). `None` uses half the shorter image side.
    pub r_max: Option<f32>,
    /// Gradient magnitude threshold (fraction of max gradient).
    pub grad_threshold: f32,
    /// Gaussian sigma for accumulator smoothing.
    pub accum_sigma: f32,
    /// Minimum distance between candidate centers (pixels).
    pub min_dist: f32,
    /// Minimum accumulator value for a candidate (fraction of max).
    pub min_vote_frac: f32,
    /// Minimum rim support as a fraction of the circumference `2πr`.
    pub min_support_frac: f32,
    /// Maximum number of accumulator peaks examined.
    pub max_candidates: usize,
    /// Tie-break between surviving circles.
    pub selection: CircleSelection,
    /// Refine the winner with a least-squares circle fit.
    pub refine: bool,
    /// Half-width of the rim band used by refinement (pixels).
    pub refine_band_px: f32,
    /// Fixed center that bypasses detection.
    pub manual_center: Option<Point2>,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            blur: Blur::Gaussian { sigma: 1.5 },
            r_min: 20.0,
            r_max: None,
            grad_threshold: 0.2,
            accum_sigma: 2.0,
            min_dist: 40.0,
            min_vote_frac: 0.3,
            min_support_frac: 0.25,
            max_candidates: 8,
            selection: CircleSelection::Strongest,
            refine: true,
            refine_band_px: 2.0,
            manual_center: None,
        }
    }
}

/// Where a dial center came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterOrigin {
    /// Found by the circle search.
    Detected,
    /// Supplied by configuration or an interactive picker.
    Manual,
}

/// Rotation center of the tracked dial, with the rim radius when known.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DialModel {
    /// Rotation center in ROI pixels.
    pub center: Point2,
    /// Rim radius in pixels, if a circle was fitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Detected or manual.
    pub origin: CenterOrigin,
}

impl DialModel {
    /// A dial with a manually supplied center and unknown radius.
    pub fn manual(center: Point2) -> Self {
        Self {
            center,
            radius: None,
            origin: CenterOrigin::Manual,
        }
    }
}

/// A circle candidate from the search.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Circle {
    /// Center in image pixels.
    pub center: Point2,
    /// Radius (pixels).
    pub radius: f64,
    /// Rim support: radially aligned edge pixels near the circle.
    pub support: usize,
}

impl Circle {
    /// Support normalized by the circumference `2πr`.
    ///
    /// Comparable across radii; a large circle partly out of view scores
    /// below a small complete one.
    pub fn support_fraction(&self) -> f64 {
        self.support as f64 / (std::f64::consts::TAU * self.radius.max(1.0))
    }
}

/// Find dial-like circles, highest [`Circle::support_fraction`] first.
pub fn detect_circles(gray: &GrayImage, config: &CenterConfig) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    let r_max = config
        .r_max
        .unwrap_or(0.5 * w.min(h) as f32)
        .min(0.5 * w.max(h) as f32);
    if r_max < config.r_min || w < 4 || h < 4 {
        return Vec::new();
    }

    let blurred = config.blur.apply(gray);
    let Some(field) = GradientField::compute(&blurred, config.grad_threshold) else {
        return Vec::new();
    };

    let peaks = hough::vote_centers(
        &field,
        config.r_min,
        r_max,
        config.accum_sigma,
        config.min_dist,
        config.min_vote_frac,
    );
    tracing::debug!("{} center peaks above vote threshold", peaks.len());

    let mut circles = Vec::new();
    for peak in peaks.into_iter().take(config.max_candidates) {
        let Some((radius, support)) =
            hough::estimate_radius(&field, peak.x, peak.y, config.r_min, r_max)
        else {
            continue;
        };
        let circumference = std::f32::consts::TAU * radius;
        let support_frac = support as f32 / circumference;
        tracing::trace!(
            "center candidate ({:.1}, {:.1}) r={:.1} votes={:.1} support={:.2}",
            peak.x,
            peak.y,
            radius,
            peak.votes,
            support_frac
        );
        if support_frac < config.min_support_frac {
            continue;
        }

        let mut circle = Circle {
            center: Point2::new(peak.x as f64, peak.y as f64),
            radius: radius as f64,
            support,
        };
        if config.refine {
            if let Some(refined) = refine_circle(&field, &circle, config.refine_band_px as f64) {
                circle = refined;
            }
        }
        circles.push(circle);
    }

    circles.sort_by(|a, b| b.support_fraction().total_cmp(&a.support_fraction()));
    circles
}

/// Detect the dial center, honoring `manual_center` and the selection rule.
pub fn detect_center(
    gray: &GrayImage,
    config: &CenterConfig,
) -> Result<DialModel, DetectError> {
    if let Some(center) = config.manual_center {
        return Ok(DialModel::manual(center));
    }

    let circles = detect_circles(gray, config);
    let best = match config.selection {
        CircleSelection::Strongest => circles.first().copied(),
        CircleSelection::LargestRadius => circles
            .iter()
            .copied()
            .max_by(|a, b| a.radius.total_cmp(&b.radius)),
    };
    let Some(best) = best else {
        tracing::debug!("no dial circle among {} candidates", circles.len());
        return Err(DetectError::CenterNotFound);
    };

    tracing::info!(
        "dial center detected at ({:.1}, {:.1}), r={:.1}",
        best.center.x,
        best.center.y,
        best.radius
    );
    Ok(DialModel {
        center: best.center,
        radius: Some(best.radius),
        origin: CenterOrigin::Detected,
    })
}

/// Least-squares refit over edge pixels in the rim band.
///
/// The refit is rejected if it drifts more than a quarter radius.
fn refine_circle(field: &GradientField, circle: &Circle, band: f64) -> Option<Circle> {
    let pts: Vec<[f64; 2]> = field
        .strong_pixels()
        .filter_map(|(x, y, _, _, _)| {
            let p = Point2::new(x as f64, y as f64);
            ((p.distance(circle.center) - circle.radius).abs() <= band).then_some([p.x, p.y])
        })
        .collect();
    let (cx, cy, r) = refine::fit_circle_kasa(&pts)?;
    let center = Point2::new(cx, cy);
    let max_shift = 0.25 * circle.radius;
    if center.distance(circle.center) > max_shift || (r - circle.radius).abs() > max_shift {
        return None;
    }
    Some(Circle {
        center,
        radius: r,
        support: circle.support,
    })
}
