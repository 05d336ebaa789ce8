//! Error types.
//!
//! Per-frame failures ([`DetectError`], [`ProgressError`]) are recoverable and
//! never abort a session. [`TrackError`] covers resource acquisition and
//! configuration problems, which are fatal.

use std::fmt;

/// A detector could not produce a result for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectError {
    /// No dial circle passed the search thresholds.
    CenterNotFound,
    /// No marker region or pointer line passed the detector's filters.
    PointerNotFound,
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CenterNotFound => write!(f, "dial center not found"),
            Self::PointerNotFound => write!(f, "pointer not found"),
        }
    }
}

impl std::error::Error for DetectError {}

/// A progress value cannot be produced from the current calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressError {
    /// One or both reference angles are unset.
    Uncalibrated,
    /// Closed and open reference angles coincide.
    Degenerate,
}

impl fmt::Display for ProgressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncalibrated => write!(f, "calibration incomplete"),
            Self::Degenerate => write!(f, "closed and open reference angles coincide"),
        }
    }
}

impl std::error::Error for ProgressError {}

/// Fatal errors: unreadable inputs, bad configuration, unusable references.
#[derive(Debug)]
pub enum TrackError {
    /// Image decoding or encoding failed.
    Image(image::ImageError),
    /// Filesystem access failed.
    Io(std::io::Error),
    /// Configuration is malformed or out of range.
    Config(String),
    /// A reference image did not contain a detectable marker.
    MarkerMissing {
        /// Which reference ("open" or "closed").
        reference: &'static str,
    },
    /// A region of interest does not fit inside the frame.
    RoiOutOfBounds {
        /// Requested region `[x, y, width, height]`.
        roi: [u32; 4],
        /// Frame size `[width, height]`.
        frame: [u32; 2],
    },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(e) => write!(f, "image error: {}", e),
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
            Self::MarkerMissing { reference } => {
                write!(f, "marker not detected in {} reference image", reference)
            }
            Self::RoiOutOfBounds { roi, frame } => write!(
                f,
                "region {}x{}+{}+{} exceeds frame {}x{}",
                roi[2], roi[3], roi[0], roi[1], frame[0], frame[1]
            ),
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for TrackError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<std::io::Error> for TrackError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
