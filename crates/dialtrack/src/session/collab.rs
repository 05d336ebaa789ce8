//! Collaborators injected into the tracking loop.
//!
//! Frame acquisition, region selection and manual center picking live outside
//! the core. Closures implement the selector and picker traits directly.

use std::collections::VecDeque;

use image::{GrayImage, RgbImage};

use crate::error::TrackError;
use crate::geometry::Point2;

use super::report::Roi;

/// Source of frames. `Ok(None)` is normal end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, TrackError>;
}

/// Supplies the region to track. `None` means the user declined.
pub trait RegionSelector {
    fn select(&mut self, frame: &RgbImage) -> Option<Roi>;
}

/// Supplies a center when automatic detection fails. `None` skips.
pub trait CenterPicker {
    fn pick(&mut self, roi: &GrayImage) -> Option<Point2>;
}

impl<F> RegionSelector for F
where
    F: FnMut(&RgbImage) -> Option<Roi>,
{
    fn select(&mut self, frame: &RgbImage) -> Option<Roi> {
        self(frame)
    }
}

impl<F> CenterPicker for F
where
    F: FnMut(&GrayImage) -> Option<Point2>,
{
    fn pick(&mut self, roi: &GrayImage) -> Option<Point2> {
        self(roi)
    }
}

/// Tracks the whole frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrame;

impl RegionSelector for FullFrame {
    fn select(&mut self, frame: &RgbImage) -> Option<Roi> {
        Some(Roi::full(frame))
    }
}

/// Always declines to pick a center.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPicker;

impl CenterPicker for NoPicker {
    fn pick(&mut self, _roi: &GrayImage) -> Option<Point2> {
        None
    }
}

/// Always answers with the same ROI-relative center.
#[derive(Debug, Clone, Copy)]
pub struct FixedCenter(pub Point2);

impl CenterPicker for FixedCenter {
    fn pick(&mut self, _roi: &GrayImage) -> Option<Point2> {
        Some(self.0)
    }
}

/// In-memory frame queue.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    frames: VecDeque<RgbImage>,
}

impl FrameQueue {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, TrackError> {
        Ok(self.frames.pop_front())
    }
}
