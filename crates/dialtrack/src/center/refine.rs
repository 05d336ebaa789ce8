//! Algebraic least-squares circle fit (Kåsa).

use nalgebra::{Matrix3, Vector3};

/// Fit a circle to `points`, returning `(cx, cy, r)`.
///
/// Solves `x² + y² + D x + E y + F = 0` in least squares. Points are shifted
/// to their centroid first for conditioning. Requires at least 3 points that
/// are not collinear.
pub(crate) fn fit_circle_kasa(points: &[[f64; 2]]) -> Option<(f64, f64, f64)> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n as f64;

    // Reject (near-)collinear sets: smallest eigenvalue of the 2x2 scatter.
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let x = p[0] - mean_x;
        let y = p[1] - mean_y;
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
    }
    let half_tr = 0.5 * (sxx + syy);
    let lambda_min = half_tr - (0.25 * (sxx - syy).powi(2) + sxy * sxy).sqrt();
    if lambda_min <= 1e-9 * half_tr.max(1e-12) {
        return None;
    }

    // Normal equations AᵀA p = Aᵀb with rows [x, y, 1] and b = -(x² + y²).
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for p in points {
        let x = p[0] - mean_x;
        let y = p[1] - mean_y;
        let row = Vector3::new(x, y, 1.0);
        let b = -(x * x + y * y);
        ata += row * row.transpose();
        atb += row * b;
    }

    let sol = ata.lu().solve(&atb)?;
    let cx = -sol[0] / 2.0;
    let cy = -sol[1] / 2.0;
    let r_sq = cx * cx + cy * cy - sol[2];
    if !r_sq.is_finite() || r_sq <= 0.0 {
        return None;
    }
    Some((cx + mean_x, cy + mean_y, r_sq.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn recovers_noisy_circle() {
        let mut rng = StdRng::seed_from_u64(3);
        let pts: Vec<[f64; 2]> = (0..200)
            .map(|i| {
                let t = i as f64 * std::f64::consts::TAU / 200.0;
                let r = 25.0 + rng.gen_range(-0.3..0.3);
                [140.0 + r * t.cos(), 75.0 + r * t.sin()]
            })
            .collect();
        let (cx, cy, r) = fit_circle_kasa(&pts).expect("fit");
        assert_relative_eq!(cx, 140.0, epsilon = 0.1);
        assert_relative_eq!(cy, 75.0, epsilon = 0.1);
        assert_relative_eq!(r, 25.0, epsilon = 0.1);
    }

    #[test]
    fn collinear_points_fail() {
        let pts: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 2.0 * i as f64]).collect();
        assert!(fit_circle_kasa(&pts).is_none());
    }
}
