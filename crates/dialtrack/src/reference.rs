//! Two-image calibration from "closed" and "open" reference pictures, and
//! single-image measurement against it.

use image::RgbImage;

use crate::calibration::CalibrationState;
use crate::center::{detect_center, CenterConfig, CircleSelection, DialModel};
use crate::error::{ProgressError, TrackError};
use crate::geometry::{angle_from_center, Point2};
use crate::pointer::{detect_marker, ColorMarkerConfig};
use crate::preprocess::{to_gray, Blur};
use crate::session::FrameStatus;

impl CenterConfig {
    /// Search tuned for reference photos: the shaft collar is the largest
    /// circle of moderate size in view.
    pub fn for_reference_images() -> Self {
        Self {
            blur: Blur::Median { radius: 2 },
            r_min: 18.0,
            r_max: Some(80.0),
            min_dist: 60.0,
            selection: CircleSelection::LargestRadius,
            ..Self::default()
        }
    }
}

/// Center and reference angles derived from two reference images.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceCalibration {
    /// Shared dial center (pixels).
    pub center: Point2,
    /// Marker angle in the closed image (degrees).
    pub angle_closed: f64,
    /// Marker angle in the open image (degrees).
    pub angle_open: f64,
}

impl ReferenceCalibration {
    pub fn calibration(&self) -> CalibrationState {
        CalibrationState::with_extremes(self.angle_closed, self.angle_open)
    }

    pub fn dial(&self) -> DialModel {
        DialModel::manual(self.center)
    }
}

/// Calibrate from an open and a closed reference image.
///
/// The center is the mean of the centers found in both images, else the one
/// that was found, else the midpoint of the open image. A marker missing from
/// either image is fatal.
pub fn calibrate_with_images(
    open: &RgbImage,
    closed: &RgbImage,
    center_config: &CenterConfig,
    marker_config: &ColorMarkerConfig,
) -> Result<ReferenceCalibration, TrackError> {
    let c_open = detect_center(&to_gray(open), center_config).ok();
    let c_closed = detect_center(&to_gray(closed), center_config).ok();
    let center = match (c_open, c_closed) {
        (Some(a), Some(b)) => Point2::new(
            0.5 * (a.center.x + b.center.x),
            0.5 * (a.center.y + b.center.y),
        ),
        (Some(d), None) | (None, Some(d)) => d.center,
        (None, None) => {
            let (w, h) = open.dimensions();
            let mid = Point2::new(w as f64 / 2.0, h as f64 / 2.0);
            tracing::warn!(
                "no dial circle in either reference; using image midpoint ({}, {})",
                mid.x,
                mid.y
            );
            mid
        }
    };

    let marker_open = detect_marker(open, marker_config)
        .map_err(|_| TrackError::MarkerMissing { reference: "open" })?;
    let marker_closed = detect_marker(closed, marker_config)
        .map_err(|_| TrackError::MarkerMissing { reference: "closed" })?;

    let calib = ReferenceCalibration {
        center,
        angle_closed: angle_from_center(center, marker_closed.centroid),
        angle_open: angle_from_center(center, marker_open.centroid),
    };
    tracing::info!(
        "reference calibration: center ({:.1}, {:.1}), closed {:.2}°, open {:.2}°",
        calib.center.x,
        calib.center.y,
        calib.angle_closed,
        calib.angle_open
    );
    Ok(calib)
}

/// Result of measuring one still image.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Measurement {
    /// Outcome; calibration failures are reported here too.
    pub status: FrameStatus,
    /// Dial center the angle is measured from (pixels).
    pub center: Point2,
    /// Marker centroid (pixels).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Point2>,
    /// Marker angle (degrees).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// Percent open in `[0, 100]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_open: Option<f64>,
}

/// Measure the marker angle and percent open of one image.
pub fn measure_image(
    image: &RgbImage,
    calibration: &ReferenceCalibration,
    marker_config: &ColorMarkerConfig,
) -> Measurement {
    let mut m = Measurement {
        status: FrameStatus::PointerNotFound,
        center: calibration.center,
        marker: None,
        angle: None,
        percent_open: None,
    };
    let Ok(blob) = detect_marker(image, marker_config) else {
        return m;
    };
    let angle = angle_from_center(calibration.center, blob.centroid);
    m.marker = Some(blob.centroid);
    m.angle = Some(angle);
    match calibration.calibration().percent(angle) {
        Ok(p) => {
            m.percent_open = Some(p);
            m.status = FrameStatus::Ok;
        }
        Err(ProgressError::Degenerate) => m.status = FrameStatus::CalibrationDegenerate,
        Err(ProgressError::Uncalibrated) => m.status = FrameStatus::Uncalibrated,
    }
    m
}
