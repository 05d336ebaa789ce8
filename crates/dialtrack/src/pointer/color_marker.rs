//! Colored-marker detection by HSV segmentation.
//!
//! The marker (e.g. a painted label on the actuator clamp) is segmented by an
//! HSV range, cleaned with a morphological open/close, and the largest
//! connected region's centroid gives the pointer direction.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::error::DetectError;
use crate::geometry::{angle_from_center, Point2};
use crate::preprocess::Hsv;

use super::PointerObservation;

/// Configuration for colored-marker detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorMarkerConfig {
    /// Inclusive lower HSV bound. A hue bound above `hsv_upper.h` wraps
    /// through 0 (useful for reds).
    pub hsv_lower: Hsv,
    /// Inclusive upper HSV bound.
    pub hsv_upper: Hsv,
    /// Half-size of the square structuring element (2 gives 5x5).
    pub kernel_radius: u8,
    /// Opening iterations (speckle removal).
    pub open_iterations: u8,
    /// Closing iterations (gap filling).
    pub close_iterations: u8,
    /// Minimum region area in pixels.
    pub min_area: u32,
}

impl Default for ColorMarkerConfig {
    fn default() -> Self {
        Self {
            hsv_lower: Hsv::new(35, 40, 40),
            hsv_upper: Hsv::new(90, 255, 255),
            kernel_radius: 2,
            open_iterations: 1,
            close_iterations: 2,
            min_area: 80,
        }
    }
}

impl ColorMarkerConfig {
    fn contains(&self, hsv: Hsv) -> bool {
        let (lo, hi) = (self.hsv_lower, self.hsv_upper);
        let hue_ok = if lo.h <= hi.h {
            (lo.h..=hi.h).contains(&hsv.h)
        } else {
            hsv.h >= lo.h || hsv.h <= hi.h
        };
        hue_ok && (lo.s..=hi.s).contains(&hsv.s) && (lo.v..=hi.v).contains(&hsv.v)
    }
}

/// The selected marker region.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkerBlob {
    /// Region centroid (first-order moments over area).
    pub centroid: Point2,
    /// Region area in pixels.
    pub area: u32,
}

/// Binary mask (255 = in range) of pixels inside the HSV range.
pub fn color_mask(rgb: &RgbImage, config: &ColorMarkerConfig) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        if config.contains(Hsv::from_rgb(p.0)) {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Open then close the mask. `k` iterations of a radius-`r` square element
/// equal one pass with radius `k * r` under the L∞ norm.
fn clean_mask(mask: &GrayImage, config: &ColorMarkerConfig) -> GrayImage {
    let open_k = config.kernel_radius.saturating_mul(config.open_iterations);
    let close_k = config.kernel_radius.saturating_mul(config.close_iterations);
    let opened = if open_k > 0 {
        imageproc::morphology::open(mask, Norm::LInf, open_k)
    } else {
        mask.clone()
    };
    if close_k > 0 {
        imageproc::morphology::close(&opened, Norm::LInf, close_k)
    } else {
        opened
    }
}

/// Find the largest marker-colored region.
pub fn detect_marker(
    rgb: &RgbImage,
    config: &ColorMarkerConfig,
) -> Result<MarkerBlob, DetectError> {
    let mask = color_mask(rgb, config);
    if mask.as_raw().iter().all(|&v| v == 0) {
        tracing::trace!("marker mask empty");
        return Err(DetectError::PointerNotFound);
    }
    let mask = clean_mask(&mask, config);

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
    let n_labels = labels.as_raw().iter().copied().max().unwrap_or(0) as usize;
    if n_labels == 0 {
        return Err(DetectError::PointerNotFound);
    }

    // per-label [area, sum_x, sum_y]
    let mut moments = vec![[0.0f64; 3]; n_labels + 1];
    for (x, y, l) in labels.enumerate_pixels() {
        let l = l[0] as usize;
        if l == 0 {
            continue;
        }
        moments[l][0] += 1.0;
        moments[l][1] += x as f64;
        moments[l][2] += y as f64;
    }

    let Some(&[m00, m10, m01]) = moments[1..]
        .iter()
        .max_by(|a, b| a[0].total_cmp(&b[0]))
    else {
        return Err(DetectError::PointerNotFound);
    };
    tracing::trace!("{} marker regions, largest area {}", n_labels, m00);
    if m00 < config.min_area as f64 || m00 <= 0.0 {
        return Err(DetectError::PointerNotFound);
    }

    Ok(MarkerBlob {
        centroid: Point2::new(m10 / m00, m01 / m00),
        area: m00 as u32,
    })
}

/// Pointer angle from the marker centroid as seen from `center`.
pub fn detect_marker_angle(
    rgb: &RgbImage,
    center: Point2,
    config: &ColorMarkerConfig,
) -> Result<PointerObservation, DetectError> {
    let blob = detect_marker(rgb, config)?;
    Ok(PointerObservation {
        angle: angle_from_center(center, blob.centroid),
        feature: blob.centroid,
        segment: None,
    })
}
