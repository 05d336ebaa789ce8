//! Closed/open calibration and percent-open mapping.
//!
//! Progress is measured along the shorter arc from the closed reference to the
//! open reference. An actuator whose travel exceeds 180° cannot be mapped
//! this way; such a range reads as the complementary short arc.

use crate::error::ProgressError;
use crate::geometry::{normalize_angle, signed_shortest_difference};

/// Spans smaller than this (degrees) are degenerate.
pub const SPAN_EPSILON_DEG: f64 = 1e-6;

/// Progress of `angle_now` from `angle_closed` to `angle_open`, clamped to `[0, 1]`.
///
/// Returns [`ProgressError::Degenerate`] when the two references coincide.
pub fn compute_progress(
    angle_closed: f64,
    angle_open: f64,
    angle_now: f64,
) -> Result<f64, ProgressError> {
    let closed = normalize_angle(angle_closed);
    let open = normalize_angle(angle_open);
    let now = normalize_angle(angle_now);

    let total = signed_shortest_difference(closed, open);
    if total.abs() < SPAN_EPSILON_DEG {
        return Err(ProgressError::Degenerate);
    }
    let mut travelled = signed_shortest_difference(closed, now);
    // The antipode of `closed` has no shorter arc; count it in the travel direction.
    if travelled == -180.0 && total > 0.0 {
        travelled = 180.0;
    }
    Ok((travelled / total).clamp(0.0, 1.0))
}

/// Calibration progress, derived from which extremes are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    Uncalibrated,
    OneExtremeSet,
    Calibrated,
}

/// Reference angles for the closed and open extremes.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct CalibrationState {
    /// Pointer angle at the fully closed position (degrees).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_closed: Option<f64>,
    /// Pointer angle at the fully open position (degrees).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_open: Option<f64>,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both extremes from known angles.
    pub fn with_extremes(angle_closed: f64, angle_open: f64) -> Self {
        Self {
            angle_closed: Some(normalize_angle(angle_closed)),
            angle_open: Some(normalize_angle(angle_open)),
        }
    }

    pub fn set_closed(&mut self, angle: f64) {
        self.angle_closed = Some(normalize_angle(angle));
        tracing::info!("closed reference set to {:.2}°", angle);
    }

    pub fn set_open(&mut self, angle: f64) {
        self.angle_open = Some(normalize_angle(angle));
        tracing::info!("open reference set to {:.2}°", angle);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Both extremes set and distinct.
    pub fn is_calibrated(&self) -> bool {
        self.stage() == CalibrationStage::Calibrated
    }

    pub fn stage(&self) -> CalibrationStage {
        match (self.angle_closed, self.angle_open) {
            (None, None) => CalibrationStage::Uncalibrated,
            (Some(c), Some(o)) if signed_shortest_difference(c, o).abs() >= SPAN_EPSILON_DEG => {
                CalibrationStage::Calibrated
            }
            _ => CalibrationStage::OneExtremeSet,
        }
    }

    /// Progress fraction in `[0, 1]` for `angle_now`.
    pub fn progress(&self, angle_now: f64) -> Result<f64, ProgressError> {
        let (Some(closed), Some(open)) = (self.angle_closed, self.angle_open) else {
            return Err(ProgressError::Uncalibrated);
        };
        compute_progress(closed, open, angle_now)
    }

    /// Percent open in `[0, 100]` for `angle_now`.
    pub fn percent(&self, angle_now: f64) -> Result<f64, ProgressError> {
        self.progress(angle_now).map(|p| p * 100.0)
    }
}
