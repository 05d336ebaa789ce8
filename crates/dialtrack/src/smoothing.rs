//! Exponential smoothing of the per-frame angle.

use crate::geometry::{normalize_angle, signed_shortest_difference};

/// How successive angles are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Blend along the shorter arc; correct across the 0°/360° seam.
    #[default]
    Circular,
    /// Legacy linear blend `(1 - α)·prev + α·cur`.
    ///
    /// Wrong near the seam: 359° then 1° blends to ≈287°, not ≈0°.
    Linear,
}

/// Smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the newest sample, in `(0, 1]`.
    pub alpha: f64,
    /// Blend rule.
    pub mode: SmoothingMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            mode: SmoothingMode::Circular,
        }
    }
}

/// One smoothing step. Returns `current` unchanged when `previous` is unset.
pub fn smooth(previous: Option<f64>, current: f64, alpha: f64, mode: SmoothingMode) -> f64 {
    let Some(prev) = previous else {
        return current;
    };
    match mode {
        SmoothingMode::Circular => {
            normalize_angle(prev + alpha * signed_shortest_difference(prev, current))
        }
        SmoothingMode::Linear => (1.0 - alpha) * prev + alpha * current,
    }
}
