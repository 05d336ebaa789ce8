//! Top-level tracker configuration.

use std::path::Path;

use crate::center::CenterConfig;
use crate::error::TrackError;
use crate::pointer::PointerStrategy;
use crate::preprocess::Blur;
use crate::smoothing::SmoothingConfig;

/// Every tunable of the tracking pipeline, with documented defaults.
///
/// Missing JSON fields fall back to [`Default`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Dial center search.
    pub center: CenterConfig,
    /// Pointer detection strategy and its parameters.
    pub pointer: PointerStrategy,
    /// Temporal smoothing of the pointer angle.
    pub smoothing: SmoothingConfig,
}

impl TrackerConfig {
    /// Load from a JSON file and validate.
    pub fn from_json_file(path: &Path) -> Result<Self, TrackError> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range parameters.
    pub fn validate(&self) -> Result<(), TrackError> {
        let bad = |msg: String| Err(TrackError::Config(msg));

        let alpha = self.smoothing.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return bad(format!("smoothing.alpha must be in (0, 1], got {}", alpha));
        }

        let c = &self.center;
        if !(c.r_min > 0.0) {
            return bad(format!("center.r_min must be positive, got {}", c.r_min));
        }
        if let Some(r_max) = c.r_max {
            if r_max < c.r_min {
                return bad(format!(
                    "center.r_max ({}) is below center.r_min ({})",
                    r_max, c.r_min
                ));
            }
        }
        if !(c.grad_threshold > 0.0 && c.grad_threshold <= 1.0) {
            return bad(format!(
                "center.grad_threshold must be in (0, 1], got {}",
                c.grad_threshold
            ));
        }
        validate_blur("center.blur", &c.blur)?;

        match &self.pointer {
            PointerStrategy::ColorMarker(m) => {
                if m.hsv_lower.s > m.hsv_upper.s || m.hsv_lower.v > m.hsv_upper.v {
                    return bad("pointer hsv_lower exceeds hsv_upper in S or V".to_string());
                }
                if m.hsv_lower.h >= 180 || m.hsv_upper.h >= 180 {
                    return bad("pointer hue bounds must be below 180".to_string());
                }
            }
            PointerStrategy::LineFit(l) => {
                if !(l.annulus_inner >= 0.0 && l.annulus_inner < l.annulus_outer) {
                    return bad(format!(
                        "pointer annulus must satisfy 0 <= inner < outer, got {}..{}",
                        l.annulus_inner, l.annulus_outer
                    ));
                }
                if l.canny_low > l.canny_high {
                    return bad(format!(
                        "pointer canny_low ({}) exceeds canny_high ({})",
                        l.canny_low, l.canny_high
                    ));
                }
                if l.min_line_length <= 0.0 || l.max_line_gap < 0.0 {
                    return bad("pointer line length/gap must be positive".to_string());
                }
                validate_blur("pointer.blur", &l.blur)?;
            }
        }
        Ok(())
    }
}

fn validate_blur(field: &str, blur: &Blur) -> Result<(), TrackError> {
    match *blur {
        Blur::Gaussian { sigma } if !(sigma >= 0.0 && sigma.is_finite()) => Err(
            TrackError::Config(format!("{} sigma must be finite and >= 0, got {}", field, sigma)),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::LineFitConfig;
    use crate::smoothing::SmoothingMode;

    #[test]
    fn defaults_validate() {
        TrackerConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "smoothing": { "mode": "linear" },
            "pointer": { "kind": "line_fit", "vote_threshold": 40 },
            "center": { "blur": { "kind": "median", "radius": 2 }, "r_max": 80.0 }
        }"#;
        let cfg: TrackerConfig = serde_json::from_str(json).expect("json");
        assert_eq!(cfg.smoothing.mode, SmoothingMode::Linear);
        assert_eq!(cfg.smoothing.alpha, 0.2);
        assert_eq!(cfg.center.blur, Blur::Median { radius: 2 });
        assert_eq!(cfg.center.r_max, Some(80.0));
        assert_eq!(cfg.center.r_min, 20.0);
        match &cfg.pointer {
            PointerStrategy::LineFit(l) => {
                assert_eq!(l.vote_threshold, 40);
                assert_eq!(l.annulus_inner, 0.30);
            }
            other => panic!("unexpected {}", other.name()),
        }
        cfg.validate().expect("valid");
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut cfg = TrackerConfig::default();
        cfg.smoothing.alpha = 0.35;
        cfg.pointer = PointerStrategy::LineFit(LineFitConfig {
            radius: Some(64.0),
            ..LineFitConfig::default()
        });
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: TrackerConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.smoothing.alpha, 0.35);
        match back.pointer {
            PointerStrategy::LineFit(l) => assert_eq!(l.radius, Some(64.0)),
            other => panic!("unexpected {}", other.name()),
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = TrackerConfig::default();
        cfg.smoothing.alpha = 0.0;
        assert!(matches!(cfg.validate(), Err(TrackError::Config(_))));

        let mut cfg = TrackerConfig::default();
        cfg.center.r_max = Some(5.0);
        assert!(cfg.validate().is_err());

        let cfg = TrackerConfig {
            pointer: PointerStrategy::LineFit(LineFitConfig {
                annulus_inner: 1.2,
                ..LineFitConfig::default()
            }),
            ..TrackerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
