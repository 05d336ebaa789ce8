//! Synthetic images shared by the unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::geometry::{direction_endpoint, Point2};

/// Render a filled disc.
///
/// Pixels at distance `d <= radius` from `center` get `disc_pix`, the rest
/// `bg_pix`.
pub(crate) fn draw_disc_image(
    w: u32,
    h: u32,
    center: [f32; 2],
    radius: f32,
    disc_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            let pix = if (dx * dx + dy * dy).sqrt() <= radius {
                disc_pix
            } else {
                bg_pix
            };
            img.put_pixel(x, y, Luma([pix]));
        }
    }
    img
}

/// A light dial face with a dark needle from the center.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DialSpec {
    pub size: [u32; 2],
    pub center: [f64; 2],
    pub face_radius: f64,
    pub needle_angle_deg: f64,
    pub needle_length: f64,
    pub needle_half_width: f64,
}

const FACE_PIX: u8 = 210;
const BG_PIX: u8 = 40;
const NEEDLE_PIX: u8 = 30;

pub(crate) fn draw_dial_image(spec: &DialSpec) -> RgbImage {
    let c = Point2::from(spec.center);
    let tip = direction_endpoint(c, spec.needle_angle_deg, spec.needle_length);
    let (dx, dy) = (tip.x - c.x, tip.y - c.y);
    let len_sq = dx * dx + dy * dy;

    RgbImage::from_fn(spec.size[0], spec.size[1], |x, y| {
        let p = Point2::new(x as f64, y as f64);
        // distance from p to the needle segment
        let t = if len_sq > 0.0 {
            (((p.x - c.x) * dx + (p.y - c.y) * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let on_needle = p.distance(c.offset(t * dx, t * dy)) <= spec.needle_half_width;
        let v = if on_needle {
            NEEDLE_PIX
        } else if p.distance(c) <= spec.face_radius {
            FACE_PIX
        } else {
            BG_PIX
        };
        Rgb([v, v, v])
    })
}

/// Uniform gray RGB image.
pub(crate) fn gray_rgb(w: u32, h: u32, v: u8) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([v, v, v]))
}

/// Paint a filled disc of `color`, clipped to the image.
pub(crate) fn draw_blob(img: &mut RgbImage, center: [f64; 2], radius: f64, color: [u8; 3]) {
    let (w, h) = img.dimensions();
    let x0 = (center[0] - radius).floor().max(0.0) as u32;
    let y0 = (center[1] - radius).floor().max(0.0) as u32;
    let x1 = ((center[0] + radius).ceil().max(0.0) as u32).min(w.saturating_sub(1));
    let y1 = ((center[1] + radius).ceil().max(0.0) as u32).min(h.saturating_sub(1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            if dx * dx + dy * dy <= radius * radius {
                img.put_pixel(x, y, Rgb(color));
            }
        }
    }
}
