//! Frame-by-frame tracking session.
//!
//! [`Tracker`] owns the [`TrackingState`] and runs one frame at a time:
//! center lookup (once per region), pointer detection, smoothing and
//! percent-open mapping. The state is only mutated between frames.

mod collab;
mod report;

use image::{GrayImage, RgbImage};

use crate::calibration::CalibrationState;
use crate::center::{detect_center, DialModel};
use crate::config::TrackerConfig;
use crate::error::{ProgressError, TrackError};
use crate::preprocess::to_gray;
use crate::smoothing::smooth;

pub use collab::{
    CenterPicker, FixedCenter, FrameQueue, FrameSource, FullFrame, NoPicker, RegionSelector,
};
pub use report::{FrameReport, FrameStatus, Roi};

/// Mutable state carried across frames.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackingState {
    /// Tracked region; `None` until selected.
    pub roi: Option<Roi>,
    /// Dial model in ROI pixels; kept until the region is reselected.
    pub dial: Option<DialModel>,
    /// Smoothed pointer angle; only updated by successful detections.
    pub smoothed_angle: Option<f64>,
    /// Closed/open references; survives region changes.
    pub calibration: CalibrationState,
}

/// Command returned by the per-frame sink, applied before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopControl {
    #[default]
    Continue,
    /// Stop at this frame boundary.
    Stop,
    /// User-requested restart: drop the region, dial, smoothing and
    /// calibration, then select again.
    Reselect,
    /// Record the current smoothed angle as the closed reference.
    SetClosed,
    /// Record the current smoothed angle as the open reference.
    SetOpen,
}

/// Counters from [`Tracker::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    /// Frames read from the source.
    pub frames: u64,
    /// Frames with a pointer measurement.
    pub measured: u64,
    /// The loop ended by a `Stop` command or a declined selection rather
    /// than source exhaustion.
    pub stopped: bool,
}

/// Tracking session over a stream of frames.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    state: TrackingState,
    frame_index: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: TrackingState::default(),
            frame_index: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    /// Mutable calibration access, e.g. to preload known references.
    pub fn calibration_mut(&mut self) -> &mut CalibrationState {
        &mut self.state.calibration
    }

    /// Select a region.
    ///
    /// Replacing a different region drops the dial and smoothed angle, which
    /// are tied to it. Calibration is kept, as is a dial preloaded with
    /// [`Tracker::set_dial`] before the first selection.
    pub fn select_region(&mut self, roi: Roi) {
        if self.state.roi.is_some_and(|prev| prev != roi) {
            self.state.dial = None;
            self.state.smoothed_angle = None;
        }
        self.state.roi = Some(roi);
    }

    /// Use a known dial instead of detecting one.
    pub fn set_dial(&mut self, dial: DialModel) {
        self.state.dial = Some(dial);
    }

    /// Return to the empty session state, calibration included.
    pub fn reset(&mut self) {
        self.state = TrackingState::default();
    }

    /// Record the current smoothed angle as closed. Returns it, if any.
    pub fn set_closed_from_current(&mut self) -> Option<f64> {
        let angle = self.state.smoothed_angle?;
        self.state.calibration.set_closed(angle);
        Some(angle)
    }

    /// Record the current smoothed angle as open. Returns it, if any.
    pub fn set_open_from_current(&mut self) -> Option<f64> {
        let angle = self.state.smoothed_angle?;
        self.state.calibration.set_open(angle);
        Some(angle)
    }

    /// Process one frame. A region must have been selected; without one the
    /// whole frame is used.
    ///
    /// Detection failures are reported in [`FrameReport::status`]; only an
    /// out-of-bounds region is an error.
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        picker: &mut dyn CenterPicker,
    ) -> Result<FrameReport, TrackError> {
        let index = self.frame_index;
        self.frame_index += 1;

        let roi = *self.state.roi.get_or_insert_with(|| Roi::full(frame));
        let (fw, fh) = frame.dimensions();
        roi.check_within(fw, fh)?;
        let roi_rgb =
            image::imageops::crop_imm(frame, roi.x, roi.y, roi.width, roi.height).to_image();

        let Some(dial) = self.ensure_dial(&roi_rgb, picker) else {
            return Ok(self.state_report(index, roi, FrameStatus::CenterNotFound));
        };

        let observation = match self.config.pointer.detect_angle(&roi_rgb, &dial) {
            Ok(obs) => {
                let s = &self.config.smoothing;
                self.state.smoothed_angle =
                    Some(smooth(self.state.smoothed_angle, obs.angle, s.alpha, s.mode));
                Some(obs)
            }
            Err(e) => {
                tracing::debug!("frame {}: {}", index, e);
                None
            }
        };

        let calibration = self.state.calibration;
        let progress = self
            .state
            .smoothed_angle
            .map(|angle| calibration.percent(angle));
        let status = match (&observation, progress) {
            (None, _) => FrameStatus::PointerNotFound,
            (Some(_), Some(Ok(_))) => FrameStatus::Ok,
            (Some(_), Some(Err(ProgressError::Degenerate))) => {
                FrameStatus::CalibrationDegenerate
            }
            (Some(_), _) => FrameStatus::Uncalibrated,
        };

        let mut report = self.state_report(index, roi, status);
        report.center = Some(roi.to_frame(dial.center));
        report.radius = dial.radius;
        report.percent_open = progress.and_then(Result::ok);
        if let Some(obs) = observation {
            report.raw_angle = Some(obs.angle);
            report.feature = Some(roi.to_frame(obs.feature));
            report.segment = obs.segment.map(|[a, b]| [roi.to_frame(a), roi.to_frame(b)]);
        }
        Ok(report)
    }

    /// Report carrying the state that outlives a single frame.
    fn state_report(&self, index: u64, roi: Roi, status: FrameStatus) -> FrameReport {
        let mut report = FrameReport::empty(index, roi, status);
        report.smoothed_angle = self.state.smoothed_angle;
        report.closed_angle = self.state.calibration.angle_closed;
        report.open_angle = self.state.calibration.angle_open;
        report
    }

    /// Existing dial, else detect one, else ask the picker.
    fn ensure_dial(
        &mut self,
        roi_rgb: &RgbImage,
        picker: &mut dyn CenterPicker,
    ) -> Option<DialModel> {
        if let Some(dial) = self.state.dial {
            return Some(dial);
        }
        let gray: GrayImage = to_gray(roi_rgb);
        let dial = match detect_center(&gray, &self.config.center) {
            Ok(dial) => dial,
            Err(e) => {
                tracing::warn!("{}; asking for a manual center", e);
                DialModel::manual(picker.pick(&gray)?)
            }
        };
        self.state.dial = Some(dial);
        Some(dial)
    }

    /// Drive the loop until the source ends, the selector declines, or the
    /// sink returns [`LoopControl::Stop`].
    ///
    /// A frame whose center cannot be established drops the region so the
    /// next frame triggers a new selection; smoothing and calibration carry
    /// over.
    pub fn run<S, R, P, F>(
        &mut self,
        source: &mut S,
        selector: &mut R,
        picker: &mut P,
        mut sink: F,
    ) -> Result<RunSummary, TrackError>
    where
        S: FrameSource + ?Sized,
        R: RegionSelector + ?Sized,
        P: CenterPicker,
        F: FnMut(&FrameReport) -> LoopControl,
    {
        let mut summary = RunSummary::default();
        while let Some(frame) = source.next_frame()? {
            summary.frames += 1;

            if self.state.roi.is_none() {
                match selector.select(&frame).filter(|r| !r.is_empty()) {
                    Some(roi) => self.select_region(roi),
                    None => {
                        tracing::info!("no region selected; stopping");
                        summary.stopped = true;
                        break;
                    }
                }
            }

            let report = self.process_frame(&frame, picker)?;
            if report.raw_angle.is_some() {
                summary.measured += 1;
            }
            if report.status == FrameStatus::CenterNotFound {
                self.state.roi = None;
            }

            match sink(&report) {
                LoopControl::Continue => {}
                LoopControl::Stop => {
                    summary.stopped = true;
                    break;
                }
                LoopControl::Reselect => self.reset(),
                LoopControl::SetClosed => {
                    if self.set_closed_from_current().is_none() {
                        tracing::warn!("no angle yet; closed reference not set");
                    }
                }
                LoopControl::SetOpen => {
                    if self.set_open_from_current().is_none() {
                        tracing::warn!("no angle yet; open reference not set");
                    }
                }
            }
        }
        tracing::info!(
            "session ended after {} frames ({} measured)",
            summary.frames,
            summary.measured
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;
    use crate::smoothing::SmoothingMode;
    use crate::test_utils::{draw_blob, gray_rgb};
    use approx::assert_abs_diff_eq;

    const GREEN: [u8; 3] = [40, 200, 60];

    fn marker_frame(angle_deg: f64) -> RgbImage {
        let mut img = gray_rgb(160, 160, 110);
        let p = crate::geometry::direction_endpoint(Point2::new(80.0, 80.0), angle_deg, 50.0);
        draw_blob(&mut img, [p.x, p.y], 8.0, GREEN);
        img
    }

    fn fixed_center_tracker() -> Tracker {
        let mut t = Tracker::new(TrackerConfig::default());
        t.select_region(Roi::new(0, 0, 160, 160));
        t.set_dial(DialModel::manual(Point2::new(80.0, 80.0)));
        t
    }

    #[test]
    fn failed_frame_keeps_previous_angle() {
        let mut t = fixed_center_tracker();
        let r = t.process_frame(&marker_frame(45.0), &mut NoPicker).expect("frame");
        assert_eq!(r.status, FrameStatus::Uncalibrated);
        let before = t.state().smoothed_angle.expect("angle");
        assert_abs_diff_eq!(before, 45.0, epsilon = 1.0);

        let r = t.process_frame(&gray_rgb(160, 160, 110), &mut NoPicker).expect("frame");
        assert_eq!(r.status, FrameStatus::PointerNotFound);
        assert_eq!(r.raw_angle, None);
        assert_eq!(r.smoothed_angle, Some(before));
        assert_eq!(t.state().smoothed_angle, Some(before));
        assert_eq!(r.frame_index, 1);
    }

    #[test]
    fn missing_center_uses_picker_then_reports() {
        let mut t = Tracker::new(TrackerConfig::default());
        let blank = gray_rgb(100, 100, 110);
        let r = t.process_frame(&blank, &mut NoPicker).expect("frame");
        assert_eq!(r.status, FrameStatus::CenterNotFound);
        assert_eq!(t.state().dial, None);

        let mut picked = 0;
        let mut picker = |_: &GrayImage| {
            picked += 1;
            Some(Point2::new(50.0, 50.0))
        };
        let r = t.process_frame(&blank, &mut picker).expect("frame");
        assert_eq!(r.status, FrameStatus::PointerNotFound);
        assert_eq!(r.center, Some(Point2::new(50.0, 50.0)));
        // the dial persists; the picker is not consulted again
        t.process_frame(&blank, &mut picker).expect("frame");
        assert_eq!(picked, 1);
    }

    #[test]
    fn roi_offsets_reported_coordinates() {
        let mut t = Tracker::new(TrackerConfig::default());
        let mut frame = gray_rgb(220, 200, 110);
        draw_blob(&mut frame, [150.0, 60.0], 8.0, GREEN);
        t.select_region(Roi::new(40, 20, 160, 160));
        t.set_dial(DialModel::manual(Point2::new(80.0, 80.0)));
        let r = t.process_frame(&frame, &mut NoPicker).expect("frame");
        let feature = r.feature.expect("feature");
        assert_abs_diff_eq!(feature.x, 150.0, epsilon = 0.5);
        assert_abs_diff_eq!(feature.y, 60.0, epsilon = 0.5);
        assert_eq!(r.center, Some(Point2::new(120.0, 100.0)));
        // ROI-relative: (110, 40) from center (80, 80) is up and to the right
        assert_abs_diff_eq!(r.raw_angle.unwrap(), 53.13, epsilon = 0.5);
    }

    #[test]
    fn roi_outside_frame_is_fatal() {
        let mut t = Tracker::new(TrackerConfig::default());
        t.select_region(Roi::new(100, 100, 100, 100));
        let err = t.process_frame(&gray_rgb(120, 120, 0), &mut NoPicker);
        assert!(matches!(err, Err(TrackError::RoiOutOfBounds { .. })));
    }

    #[test]
    fn run_loop_calibrates_and_maps_percent() {
        let mut config = TrackerConfig::default();
        config.smoothing.alpha = 1.0;
        config.center.manual_center = Some(Point2::new(80.0, 80.0));
        let mut t = Tracker::new(config);

        let angles = [200.0, 200.0, 260.0, 230.0, 250.0];
        let mut source = FrameQueue::new(angles.iter().map(|&a| marker_frame(a)));
        let mut reports = Vec::new();
        let summary = t
            .run(&mut source, &mut FullFrame, &mut NoPicker, |r| {
                reports.push(r.clone());
                match r.frame_index {
                    0 => LoopControl::SetClosed,
                    2 => LoopControl::SetOpen,
                    _ => LoopControl::Continue,
                }
            })
            .expect("run");

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.measured, 5);
        assert!(!summary.stopped);
        assert_eq!(reports[1].status, FrameStatus::Uncalibrated);
        assert_eq!(reports[3].status, FrameStatus::Ok);
        assert_abs_diff_eq!(reports[3].percent_open.unwrap(), 50.0, epsilon = 2.0);
        assert_abs_diff_eq!(reports[4].percent_open.unwrap(), 83.3, epsilon = 2.0);
    }

    #[test]
    fn degenerate_calibration_is_reported() {
        let mut t = fixed_center_tracker();
        t.calibration_mut().set_closed(45.0);
        t.calibration_mut().set_open(45.0);
        let r = t.process_frame(&marker_frame(45.0), &mut NoPicker).expect("frame");
        assert_eq!(r.status, FrameStatus::CalibrationDegenerate);
        assert_eq!(r.percent_open, None);
    }

    #[test]
    fn stop_and_reselect_commands() {
        let mut config = TrackerConfig::default();
        config.center.manual_center = Some(Point2::new(80.0, 80.0));
        config.smoothing.mode = SmoothingMode::Linear;
        let mut t = Tracker::new(config);
        let mut source = FrameQueue::new((0..4).map(|_| marker_frame(90.0)));

        let mut selections = 0;
        let mut selector = |f: &RgbImage| {
            selections += 1;
            Some(Roi::full(f))
        };
        let summary = t
            .run(&mut source, &mut selector, &mut NoPicker, |r| match r.frame_index {
                0 => LoopControl::Reselect,
                2 => LoopControl::Stop,
                _ => LoopControl::Continue,
            })
            .expect("run");
        assert!(summary.stopped);
        assert_eq!(summary.frames, 3);
        assert_eq!(selections, 2);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn preset_references_survive_first_selection() {
        let mut config = TrackerConfig::default();
        config.center.manual_center = Some(Point2::new(80.0, 80.0));
        let mut t = Tracker::new(config);
        t.calibration_mut().set_closed(0.0);
        t.calibration_mut().set_open(90.0);

        let mut source = FrameQueue::new([marker_frame(45.0), marker_frame(45.0)]);
        let mut reports = Vec::new();
        t.run(&mut source, &mut FullFrame, &mut NoPicker, |r| {
            reports.push(r.clone());
            LoopControl::Continue
        })
        .expect("run");

        assert_eq!(reports.len(), 2);
        for r in &reports {
            assert_eq!(r.status, FrameStatus::Ok);
            assert_abs_diff_eq!(r.percent_open.unwrap(), 50.0, epsilon = 2.0);
            assert_eq!(r.closed_angle, Some(0.0));
            assert_eq!(r.open_angle, Some(90.0));
        }
    }

    #[test]
    fn center_miss_keeps_references() {
        let mut config = TrackerConfig::default();
        // no circle this large fits, so every center comes from the picker
        config.center.r_min = 200.0;
        let mut t = Tracker::new(config);
        t.calibration_mut().set_closed(0.0);
        t.calibration_mut().set_open(90.0);

        let mut picks = 0;
        let mut picker = |_: &GrayImage| {
            picks += 1;
            (picks > 1).then_some(Point2::new(80.0, 80.0))
        };
        let mut selections = 0;
        let mut selector = |f: &RgbImage| {
            selections += 1;
            Some(Roi::full(f))
        };
        let mut source = FrameQueue::new([gray_rgb(160, 160, 110), marker_frame(45.0)]);
        let mut reports = Vec::new();
        t.run(&mut source, &mut selector, &mut picker, |r| {
            reports.push(r.clone());
            LoopControl::Continue
        })
        .expect("run");

        assert_eq!(selections, 2);
        assert_eq!(reports[0].status, FrameStatus::CenterNotFound);
        assert_eq!(reports[0].closed_angle, Some(0.0));
        assert_eq!(reports[0].open_angle, Some(90.0));
        assert_eq!(reports[1].status, FrameStatus::Ok);
        assert_abs_diff_eq!(reports[1].percent_open.unwrap(), 50.0, epsilon = 2.0);
    }

    #[test]
    fn preloaded_dial_is_kept_until_reselect() {
        let mut config = TrackerConfig::default();
        config.center.r_min = 200.0;
        let mut t = Tracker::new(config);
        t.set_dial(DialModel::manual(Point2::new(80.0, 80.0)));

        let mut picker = FixedCenter(Point2::new(0.0, 0.0));
        let mut source = FrameQueue::new([marker_frame(45.0), marker_frame(45.0)]);
        let mut reports = Vec::new();
        t.run(&mut source, &mut FullFrame, &mut picker, |r| {
            reports.push(r.clone());
            LoopControl::Reselect
        })
        .expect("run");

        assert_eq!(reports[0].center, Some(Point2::new(80.0, 80.0)));
        assert_abs_diff_eq!(reports[0].raw_angle.unwrap(), 45.0, epsilon = 1.0);
        // after a full reset the picker supplies the center
        assert_eq!(reports[1].center, Some(Point2::new(0.0, 0.0)));
    }

    #[test]
    fn changing_region_drops_dial_but_keeps_calibration() {
        let mut t = fixed_center_tracker();
        t.calibration_mut().set_closed(10.0);
        t.process_frame(&marker_frame(45.0), &mut NoPicker).expect("frame");
        assert!(t.state().smoothed_angle.is_some());

        t.select_region(Roi::new(0, 0, 160, 160));
        assert!(t.state().dial.is_some());

        t.select_region(Roi::new(10, 10, 120, 120));
        assert_eq!(t.state().dial, None);
        assert_eq!(t.state().smoothed_angle, None);
        assert_eq!(t.state().calibration.angle_closed, Some(10.0));
    }

    #[test]
    fn declined_selection_ends_session() {
        let mut t = Tracker::new(TrackerConfig::default());
        let mut source = FrameQueue::new([gray_rgb(10, 10, 0)]);
        let mut decline = |_: &RgbImage| None::<Roi>;
        let summary = t
            .run(&mut source, &mut decline, &mut NoPicker, |_| LoopControl::Continue)
            .expect("run");
        assert!(summary.stopped);
        assert_eq!(summary.measured, 0);
    }
}
