//! Noise reduction and color-space helpers shared by the detectors.

use image::{GrayImage, RgbImage};

/// Noise-reduction filter applied before edge or gradient analysis.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blur {
    /// Pass the image through unchanged.
    None,
    /// Gaussian blur with standard deviation `sigma` (pixels).
    Gaussian { sigma: f32 },
    /// Median filter over a `(2 * radius + 1)²` window.
    Median { radius: u32 },
}

impl Blur {
    /// Apply the filter to a grayscale image.
    pub fn apply(&self, gray: &GrayImage) -> GrayImage {
        match *self {
            Blur::None => gray.clone(),
            Blur::Gaussian { sigma } if sigma > 0.0 => {
                imageproc::filter::gaussian_blur_f32(gray, sigma)
            }
            Blur::Gaussian { .. } => gray.clone(),
            Blur::Median { radius } => imageproc::filter::median_filter(gray, radius, radius),
        }
    }
}

/// Luma conversion used for every grayscale path in the crate.
pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    image::imageops::grayscale(rgb)
}

/// HSV triple on the 8-bit scale: H in `[0, 180)`, S and V in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hsv {
    /// Hue, `[0, 180)`.
    pub h: u8,
    /// Saturation.
    pub s: u8,
    /// Value.
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Convert an 8-bit RGB pixel.
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb.map(f32::from);
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = v - min;
        let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };
        let h_deg = if delta <= 0.0 {
            0.0
        } else if v == r {
            60.0 * (g - b) / delta
        } else if v == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };
        // Half-degree hue units; 359.x° rounds to 180 which aliases 0.
        let h = (h_deg / 2.0).round() as u32 % 180;
        Self {
            h: h as u8,
            s: s.round().clamp(0.0, 255.0) as u8,
            v: v as u8,
        }
    }
}
