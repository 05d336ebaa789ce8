//! Pointer angle detection.
//!
//! Two interchangeable strategies reduce a frame to one angle:
//! - [`PointerStrategy::ColorMarker`]: centroid of a colored marker region.
//! - [`PointerStrategy::LineFit`]: far tip of the best needle-like segment.

mod color_marker;
mod line_fit;
mod segments;

use image::RgbImage;

use crate::center::DialModel;
use crate::error::DetectError;
use crate::geometry::Point2;
use crate::preprocess::to_gray;

pub use color_marker::{
    color_mask, detect_marker, detect_marker_angle, ColorMarkerConfig, MarkerBlob,
};
pub use line_fit::{
    best_segment, detect_line_angle, detect_segments, pointer_edges, score_segment, LineFitConfig,
};
pub use segments::Segment;

/// One pointer measurement.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointerObservation {
    /// Pointer angle in degrees, `[0, 360)`.
    pub angle: f64,
    /// Image feature the angle was measured to (marker centroid or needle tip).
    pub feature: Point2,
    /// Selected segment endpoints for the line strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<[Point2; 2]>,
}

/// Detection strategy, selected by configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerStrategy {
    ColorMarker(ColorMarkerConfig),
    LineFit(LineFitConfig),
}

impl Default for PointerStrategy {
    fn default() -> Self {
        PointerStrategy::ColorMarker(ColorMarkerConfig::default())
    }
}

impl PointerStrategy {
    /// Measure the pointer angle in `frame` relative to `dial`.
    pub fn detect_angle(
        &self,
        frame: &RgbImage,
        dial: &DialModel,
    ) -> Result<PointerObservation, DetectError> {
        match self {
            PointerStrategy::ColorMarker(cfg) => detect_marker_angle(frame, dial.center, cfg),
            PointerStrategy::LineFit(cfg) => detect_line_angle(&to_gray(frame), dial, cfg),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PointerStrategy::ColorMarker(_) => "color_marker",
            PointerStrategy::LineFit(_) => "line_fit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_blob, draw_dial_image, gray_rgb, DialSpec};

    #[test]
    fn dispatch_reaches_both_strategies() {
        let mut img = gray_rgb(120, 120, 110);
        draw_blob(&mut img, [90.0, 60.0], 8.0, [40, 200, 60]);
        let dial = DialModel::manual(Point2::new(60.0, 60.0));
        let obs = PointerStrategy::default()
            .detect_angle(&img, &dial)
            .expect("marker");
        assert!(obs.angle < 1.0 || obs.angle > 359.0, "{}", obs.angle);

        let spec = DialSpec {
            size: [200, 200],
            center: [100.0, 100.0],
            face_radius: 90.0,
            needle_angle_deg: 90.0,
            needle_length: 85.0,
            needle_half_width: 2.0,
        };
        let dial = DialModel {
            radius: Some(90.0),
            ..DialModel::manual(Point2::new(100.0, 100.0))
        };
        let line = PointerStrategy::LineFit(LineFitConfig {
            vote_threshold: 30,
            annulus_outer: 0.97,
            ..LineFitConfig::default()
        });
        let obs = line.detect_angle(&draw_dial_image(&spec), &dial).expect("needle");
        assert!((obs.angle - 90.0).abs() < 3.0, "{}", obs.angle);
        assert!(obs.segment.is_some());
    }

    #[test]
    fn strategy_deserializes_from_tagged_json() {
        let s: PointerStrategy =
            serde_json::from_str(r#"{"kind":"line_fit","min_line_length":30.0}"#).expect("json");
        match s {
            PointerStrategy::LineFit(cfg) => {
                assert_eq!(cfg.min_line_length, 30.0);
                assert_eq!(cfg.max_line_gap, 10.0);
            }
            other => panic!("unexpected {}", other.name()),
        }
    }
}
