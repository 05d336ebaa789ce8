//! Per-frame results handed to renderers and loggers.

use image::RgbImage;

use crate::error::TrackError;
use crate::geometry::{direction_endpoint, Point2};

/// Rectangular region of a frame, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Roi {
    /// Left edge (pixels).
    pub x: u32,
    /// Top edge (pixels).
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole frame.
    pub fn full(frame: &RgbImage) -> Self {
        let (width, height) = frame.dimensions();
        Self::new(0, 0, width, height)
    }

    /// Zero-area selections mean "declined".
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Fail unless the region lies inside a `width x height` frame.
    pub fn check_within(&self, width: u32, height: u32) -> Result<(), TrackError> {
        let fits = !self.is_empty()
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height);
        if fits {
            Ok(())
        } else {
            Err(TrackError::RoiOutOfBounds {
                roi: [self.x, self.y, self.width, self.height],
                frame: [width, height],
            })
        }
    }

    /// Map an ROI-relative point to frame pixels.
    pub fn to_frame(&self, p: Point2) -> Point2 {
        p.offset(self.x as f64, self.y as f64)
    }
}

/// Outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Pointer measured and percent-open available.
    Ok,
    /// No center detected and none supplied; the region must be reselected.
    CenterNotFound,
    /// Pointer not found; previous smoothed angle retained.
    PointerNotFound,
    /// Pointer measured but calibration is incomplete.
    Uncalibrated,
    /// Closed and open references coincide.
    CalibrationDegenerate,
}

/// Overlay annotations for one frame, in frame pixels.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameReport {
    /// Zero-based position in the stream.
    pub frame_index: u64,
    pub status: FrameStatus,
    /// Region the frame was processed in.
    pub roi: Roi,
    /// Dial center in frame pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Point2>,
    /// Dial rim radius (pixels), when fitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Marker centroid or needle tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<Point2>,
    /// Selected needle segment (line strategy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<[Point2; 2]>,
    /// This frame's unsmoothed angle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_angle: Option<f64>,
    /// Session angle after smoothing; carried over on failed frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_angle: Option<f64>,
    /// Percent open in `[0, 100]`, once both references are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_open: Option<f64>,
    /// Closed reference angle (degrees).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_angle: Option<f64>,
    /// Open reference angle (degrees).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_angle: Option<f64>,
}

impl FrameReport {
    pub(crate) fn empty(frame_index: u64, roi: Roi, status: FrameStatus) -> Self {
        Self {
            frame_index,
            status,
            roi,
            center: None,
            radius: None,
            feature: None,
            segment: None,
            raw_angle: None,
            smoothed_angle: None,
            percent_open: None,
            closed_angle: None,
            open_angle: None,
        }
    }

    /// Line from the center along the smoothed angle.
    pub fn direction_line(&self, length: f64) -> Option<[Point2; 2]> {
        let c = self.center?;
        Some([c, direction_endpoint(c, self.smoothed_angle?, length)])
    }

    /// Reference ticks for the calibrated extremes as `(label, from, to)`.
    pub fn reference_ticks(&self, length: f64) -> Vec<(&'static str, Point2, Point2)> {
        let Some(c) = self.center else {
            return Vec::new();
        };
        [("closed", self.closed_angle), ("open", self.open_angle)]
            .into_iter()
            .filter_map(|(label, a)| a.map(|a| (label, c, direction_endpoint(c, a, length))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn roi_bounds() {
        assert!(Roi::new(10, 10, 50, 40).check_within(60, 50).is_ok());
        assert!(Roi::new(10, 10, 51, 40).check_within(60, 50).is_err());
        assert!(Roi::new(0, 0, 0, 10).check_within(60, 50).is_err());
        assert!(Roi::new(u32::MAX, 0, 2, 2).check_within(60, 50).is_err());
        assert_eq!(
            Roi::new(5, 7, 1, 1).to_frame(Point2::new(1.0, 2.0)),
            Point2::new(6.0, 9.0)
        );
    }

    #[test]
    fn ticks_follow_reference_angles() {
        let mut r = FrameReport::empty(0, Roi::new(0, 0, 100, 100), FrameStatus::Ok);
        assert!(r.reference_ticks(10.0).is_empty());
        assert!(r.direction_line(10.0).is_none());
        r.center = Some(Point2::new(50.0, 50.0));
        r.closed_angle = Some(0.0);
        r.open_angle = Some(90.0);
        r.smoothed_angle = Some(180.0);
        let ticks = r.reference_ticks(10.0);
        assert_eq!(ticks.len(), 2);
        assert_abs_diff_eq!(ticks[0].2.x, 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ticks[1].2.y, 40.0, epsilon = 1e-9);
        let line = r.direction_line(20.0).expect("line");
        assert_abs_diff_eq!(line[1].x, 30.0, epsilon = 1e-9);
    }
}
