//! Line segments from Hough polar lines.
//!
//! `imageproc` reports infinite lines. Segments are recovered by walking each
//! line across the edge mask and splitting edge runs at gaps wider than
//! `max_gap`, which together with `min_length` gives probabilistic-Hough
//! style output.

use image::GrayImage;
use imageproc::hough::PolarLine;

use crate::geometry::Point2;

/// A finite edge segment.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// First endpoint (pixels).
    pub a: Point2,
    /// Second endpoint (pixels).
    pub b: Point2,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }
}

/// Whether any pixel within `tol` of `(x, y)` across the line is an edge.
#[inline]
fn edge_near(edges: &GrayImage, x: f64, y: f64, nx: f64, ny: f64, tol: i32) -> bool {
    let (w, h) = edges.dimensions();
    (-tol..=tol).any(|k| {
        let px = (x + k as f64 * nx).round();
        let py = (y + k as f64 * ny).round();
        px >= 0.0
            && py >= 0.0
            && (px as u32) < w
            && (py as u32) < h
            && edges.get_pixel(px as u32, py as u32)[0] > 0
    })
}

/// Split one polar line into edge-supported segments.
pub(crate) fn walk_line(
    edges: &GrayImage,
    line: &PolarLine,
    min_length: f64,
    max_gap: f64,
) -> Vec<Segment> {
    let (w, h) = edges.dimensions();
    let theta = (line.angle_in_degrees as f64).to_radians();
    let (nx, ny) = (theta.cos(), theta.sin());
    let (ox, oy) = (line.r as f64 * nx, line.r as f64 * ny);
    // direction along the line
    let (dx, dy) = (-ny, nx);
    let extent = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt().ceil() as i64;

    let at = |t: f64| Point2::new(ox + t * dx, oy + t * dy);
    let mut out = Vec::new();
    let mut run: Option<(f64, f64)> = None;
    let close = |run: (f64, f64), out: &mut Vec<Segment>| {
        if run.1 - run.0 >= min_length {
            out.push(Segment {
                a: at(run.0),
                b: at(run.1),
            });
        }
    };

    for step in -extent..=extent {
        let t = step as f64;
        let p = at(t);
        if !edge_near(edges, p.x, p.y, nx, ny, 1) {
            continue;
        }
        run = match run {
            Some((start, last)) if t - last <= max_gap => Some((start, t)),
            Some(prev) => {
                close(prev, &mut out);
                Some((t, t))
            }
            None => Some((t, t)),
        };
    }
    if let Some(prev) = run {
        close(prev, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn splits_runs_at_gaps() {
        let mut edges = GrayImage::new(100, 20);
        for x in 5..40 {
            edges.put_pixel(x, 10, Luma([255]));
        }
        for x in 60..95 {
            edges.put_pixel(x, 10, Luma([255]));
        }
        // horizontal line y = 10 has its normal at 90 degrees
        let line = PolarLine {
            r: 10.0,
            angle_in_degrees: 90,
        };
        let segs = walk_line(&edges, &line, 20.0, 5.0);
        assert_eq!(segs.len(), 2, "{segs:?}");
        for s in &segs {
            assert!((s.length() - 34.0).abs() < 1.5, "{s:?}");
        }

        let merged = walk_line(&edges, &line, 20.0, 25.0);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].length() - 89.0).abs() < 1.5);
    }

    #[test]
    fn short_runs_are_dropped() {
        let mut edges = GrayImage::new(50, 50);
        for y in 10..18 {
            edges.put_pixel(25, y, Luma([255]));
        }
        let line = PolarLine {
            r: 25.0,
            angle_in_degrees: 0,
        };
        assert!(walk_line(&edges, &line, 20.0, 3.0).is_empty());
    }
}
