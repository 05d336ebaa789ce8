//! dialtrack — rotational position of a dial pointer from images, mapped to
//! a calibrated percent-open value.
//!
//! Built for damper actuators filmed from the front. The pipeline stages are:
//!
//! 1. **Center** – gradient Hough search for the dial rim, least-squares
//!    refinement, manual override.
//! 2. **Pointer** – one angle per frame from either a colored marker
//!    centroid or the far tip of the best needle segment.
//! 3. **Smoothing** – exponential averaging on the circle.
//! 4. **Calibration** – closed/open references and percent-open mapping
//!    along the shorter arc.
//!
//! # Public API
//! - [`Tracker`] runs a session over injected collaborators
//!   ([`FrameSource`], [`RegionSelector`], [`CenterPicker`]).
//! - [`calibrate_with_images`] and [`measure_image`] cover the two-image
//!   reference workflow.
//! - [`TrackerConfig`] aggregates every tunable and loads from JSON.
//!
//! All angles are degrees in `[0, 360)`, counter-clockwise from image +x
//! with y pointing up.

pub mod calibration;
pub mod center;
mod config;
mod error;
pub mod geometry;
pub mod pointer;
mod preprocess;
mod reference;
pub mod session;
mod smoothing;

#[cfg(test)]
pub(crate) mod test_utils;

pub use calibration::{compute_progress, CalibrationStage, CalibrationState};
pub use center::{detect_center, CenterConfig, CenterOrigin, CircleSelection, DialModel};
pub use config::TrackerConfig;
pub use error::{DetectError, ProgressError, TrackError};
pub use geometry::{angle_from_center, normalize_angle, signed_shortest_difference, Point2};
pub use pointer::{ColorMarkerConfig, LineFitConfig, PointerObservation, PointerStrategy};
pub use preprocess::{to_gray, Blur, Hsv};
pub use reference::{calibrate_with_images, measure_image, Measurement, ReferenceCalibration};
pub use session::{
    CenterPicker, FixedCenter, FrameQueue, FrameReport, FrameSource, FrameStatus, FullFrame,
    LoopControl, NoPicker, RegionSelector, Roi, RunSummary, Tracker, TrackingState,
};
pub use smoothing::{smooth, SmoothingConfig, SmoothingMode};
