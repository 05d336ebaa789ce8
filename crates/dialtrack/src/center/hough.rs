//! Gradient Hough transform for circle centers.
//!
//! Every pixel with a strong gradient votes along both directions of its
//! gradient at each radius in `[r_min, r_max]`. Gradients on a circular rim
//! are radial, so votes pile up at the circle center. Peaks of the smoothed
//! accumulator become center candidates; the radius of each candidate is read
//! from a histogram of distances to the supporting edge pixels.

use image::{GrayImage, ImageBuffer, Luma};

/// Scharr gradients of an image plus the strong-edge threshold.
pub(crate) struct GradientField {
    pub width: u32,
    pub height: u32,
    /// Row-major horizontal gradient.
    pub gx: Vec<f32>,
    /// Row-major vertical gradient.
    pub gy: Vec<f32>,
    /// Squared magnitude threshold for a pixel to count as an edge.
    pub threshold_sq: f32,
}

impl GradientField {
    /// Compute Scharr gradients; `grad_threshold` is a fraction of the max magnitude.
    ///
    /// Returns `None` for flat images.
    pub fn compute(gray: &GrayImage, grad_threshold: f32) -> Option<Self> {
        let (width, height) = gray.dimensions();
        let gx: Vec<f32> = imageproc::gradients::horizontal_scharr(gray)
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect();
        let gy: Vec<f32> = imageproc::gradients::vertical_scharr(gray)
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect();

        let max_mag_sq = gx
            .iter()
            .zip(gy.iter())
            .map(|(&x, &y)| x * x + y * y)
            .fold(0.0f32, f32::max);
        if max_mag_sq < 1e-6 {
            return None;
        }
        let threshold = grad_threshold * max_mag_sq.sqrt();
        Some(Self {
            width,
            height,
            gx,
            gy,
            threshold_sq: threshold * threshold,
        })
    }

    /// Iterate strong-edge pixels as `(x, y, gx, gy, magnitude)`.
    pub fn strong_pixels(&self) -> impl Iterator<Item = (u32, u32, f32, f32, f32)> + '_ {
        let w = self.width as usize;
        self.gx
            .iter()
            .zip(self.gy.iter())
            .enumerate()
            .filter_map(move |(idx, (&gx, &gy))| {
                let mag_sq = gx * gx + gy * gy;
                if mag_sq < self.threshold_sq {
                    return None;
                }
                Some((
                    (idx % w) as u32,
                    (idx / w) as u32,
                    gx,
                    gy,
                    mag_sq.sqrt(),
                ))
            })
    }
}

/// An accumulator peak.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CenterPeak {
    /// X coordinate (pixels).
    pub x: f32,
    /// Y coordinate (pixels).
    pub y: f32,
    /// Smoothed accumulator value at the peak.
    pub votes: f32,
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Vote for circle centers and return accumulator peaks, strongest first.
///
/// Peaks closer than `min_dist` to a stronger peak are suppressed. Peaks
/// below `min_vote_frac` of the global maximum are dropped.
pub(crate) fn vote_centers(
    field: &GradientField,
    r_min: f32,
    r_max: f32,
    accum_sigma: f32,
    min_dist: f32,
    min_vote_frac: f32,
) -> Vec<CenterPeak> {
    let (w, h) = (field.width, field.height);
    if w < 4 || h < 4 || r_max < r_min {
        return Vec::new();
    }

    let stride = w as usize;
    let mut accum = vec![0.0f32; stride * h as usize];
    let radii: Vec<f32> = (0..)
        .map(|i| r_min + i as f32)
        .take_while(|&r| r <= r_max)
        .collect();
    let x_limit = (w - 1) as f32;
    let y_limit = (h - 1) as f32;

    for (x, y, gx, gy, mag) in field.strong_pixels() {
        let dx = gx / mag;
        let dy = gy / mag;
        let xf = x as f32;
        let yf = y as f32;
        for &r in &radii {
            for sign in [1.0f32, -1.0] {
                let vx = xf + sign * dx * r;
                let vy = yf + sign * dy * r;
                if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                    bilinear_add_in_bounds(&mut accum, stride, vx, vy, 1.0);
                }
            }
        }
    }

    let Some(accum_img) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum) else {
        return Vec::new();
    };
    let smoothed = if accum_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&accum_img, accum_sigma)
    } else {
        accum_img
    };
    let data = smoothed.as_raw();

    let max_val = data.iter().copied().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = min_vote_frac * max_val;

    // Local maxima in a 3x3 window, then greedy distance suppression.
    let mut peaks = Vec::new();
    for y in 0..h as usize {
        for x in 0..stride {
            let val = data[y * stride + x];
            if val < vote_threshold {
                continue;
            }
            let mut is_max = true;
            'nbr: for ny in y.saturating_sub(1)..=(y + 1).min(h as usize - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(stride - 1) {
                    let nidx = ny * stride + nx;
                    let n = data[nidx];
                    if n > val || (n == val && nidx < y * stride + x) {
                        is_max = false;
                        break 'nbr;
                    }
                }
            }
            if is_max {
                peaks.push(CenterPeak {
                    x: x as f32,
                    y: y as f32,
                    votes: val,
                });
            }
        }
    }

    peaks.sort_by(|a, b| b.votes.total_cmp(&a.votes));
    let min_dist_sq = min_dist * min_dist;
    let mut kept: Vec<CenterPeak> = Vec::new();
    for p in peaks {
        let crowded = kept.iter().any(|k| {
            let dx = k.x - p.x;
            let dy = k.y - p.y;
            dx * dx + dy * dy < min_dist_sq
        });
        if !crowded {
            kept.push(p);
        }
    }
    kept
}

/// Radius with the most radially-aligned edge support around `(cx, cy)`.
///
/// Returns `(radius, support)` where `support` counts edge pixels within one
/// bin of the radius whose gradient is roughly parallel to the radial
/// direction.
pub(crate) fn estimate_radius(
    field: &GradientField,
    cx: f32,
    cy: f32,
    r_min: f32,
    r_max: f32,
) -> Option<(f32, usize)> {
    let max_bin = r_max.ceil() as usize + 2;
    let mut hist = vec![0usize; max_bin + 1];
    for (x, y, gx, gy, mag) in field.strong_pixels() {
        let rx = x as f32 - cx;
        let ry = y as f32 - cy;
        let d = (rx * rx + ry * ry).sqrt();
        if d < 1.0 || d > r_max + 1.5 {
            continue;
        }
        let cos = (rx * gx + ry * gy) / (d * mag);
        if cos.abs() < 0.8 {
            continue;
        }
        let bin = d.round() as usize;
        if bin <= max_bin {
            hist[bin] += 1;
        }
    }

    let lo = r_min.max(1.0).round() as usize;
    let hi = (r_max.round() as usize).min(max_bin - 1);
    (lo..=hi)
        .map(|r| (r, hist[r - 1] + hist[r] + hist[r + 1]))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .filter(|&(_, support)| support > 0)
        .map(|(r, support)| (r as f32, support))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disc_image;

    #[test]
    fn votes_peak_at_disc_center() {
        let img = draw_disc_image(120, 120, [58.0, 63.0], 30.0, 200, 40);
        let field = GradientField::compute(&img, 0.2).expect("non-flat image");
        let peaks = vote_centers(&field, 10.0, 50.0, 2.0, 20.0, 0.2);
        assert!(!peaks.is_empty());
        let best = peaks[0];
        let err = ((best.x - 58.0).powi(2) + (best.y - 63.0).powi(2)).sqrt();
        assert!(err < 2.0, "peak ({}, {}) err {}", best.x, best.y, err);
    }

    #[test]
    fn radius_histogram_finds_rim() {
        let img = draw_disc_image(120, 120, [60.0, 60.0], 34.0, 220, 30);
        let field = GradientField::compute(&img, 0.2).expect("non-flat image");
        let (r, support) = estimate_radius(&field, 60.0, 60.0, 10.0, 55.0).expect("rim");
        assert!((r - 34.0).abs() <= 1.5, "radius {r}");
        assert!(support > 100, "support {support}");
    }

    #[test]
    fn flat_image_has_no_field() {
        let img = GrayImage::from_pixel(32, 32, Luma([128]));
        assert!(GradientField::compute(&img, 0.1).is_none());
    }
}
