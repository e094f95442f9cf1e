//! Motor-induced magnetic interference fit (`magmot`).
//!
//! For one motor and one magnetometer axis, fits `y = a*t^2 + b*t + c`
//! against sampled `(throttle, field_delta)` pairs via the normal equations,
//! the same closed-form approach as the quadratic least-squares throttle fit
//! this module generalizes.

use crate::error::Result;
use crate::linalg::{Matrix, RunningStats};
use log::debug;

/// Returns `(a, b, c)` minimizing the squared residual of
/// `a*t^2 + b*t + c - y` over the given samples.
pub fn fit_quadratic(throttle: &[f32], field_delta: &[f32]) -> Result<(f32, f32, f32)> {
    assert_eq!(throttle.len(), field_delta.len());

    let mut sx4 = 0.0f64;
    let mut sx3 = 0.0f64;
    let mut sx2 = 0.0f64;
    let mut sx = 0.0f64;
    let n = throttle.len() as f64;
    let mut sx2y = 0.0f64;
    let mut sxy = 0.0f64;
    let mut sy = 0.0f64;

    for (&t, &y) in throttle.iter().zip(field_delta.iter()) {
        let t = t as f64;
        let y = y as f64;
        sx4 += t.powi(4);
        sx3 += t.powi(3);
        sx2 += t.powi(2);
        sx += t;
        sx2y += t.powi(2) * y;
        sxy += t * y;
        sy += y;
    }

    let a_matrix = Matrix::from_row_major(
        3,
        3,
        vec![
            sx4 as f32, sx3 as f32, sx2 as f32, sx3 as f32, sx2 as f32, sx as f32, sx2 as f32,
            sx as f32, n as f32,
        ],
    )?;
    let b_vector = Matrix::from_row_major(3, 1, vec![sx2y as f32, sxy as f32, sy as f32])?;

    let inv = a_matrix.inverse()?;
    let solved = inv.prod(&b_vector)?;
    let (a, b, c) = (solved.get(0, 0), solved.get(1, 0), solved.get(2, 0));

    let mut residuals = RunningStats::new();
    for (&t, &y) in throttle.iter().zip(field_delta.iter()) {
        let fit = a * t * t + b * t + c;
        residuals.update((y - fit) as f64);
    }
    debug!(
        "motor interference fit: residual mean={:.4} std_dev={:.4} over {} samples",
        residuals.mean(),
        residuals.std_dev(),
        residuals.count()
    );

    Ok((a, b, c))
}

/// Per-motor sweep: baseline-subtracted magnetometer axis samples at a
/// sequence of throttle levels, fit to a quadratic per axis.
pub fn fit_motor_axis_sweep(
    throttle_levels: &[f32],
    axis_samples: &[[f32; 3]],
) -> Result<[(f32, f32, f32); 3]> {
    let mut out = [(0.0, 0.0, 0.0); 3];
    for axis in 0..3 {
        let values: Vec<f32> = axis_samples.iter().map(|s| s[axis]).collect();
        out[axis] = fit_quadratic(throttle_levels, &values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_quadratic() {
        let throttle: Vec<f32> = (0..10).map(|i| i as f32 * 0.1).collect();
        let y: Vec<f32> = throttle.iter().map(|t| 2.0 * t * t - 1.5 * t + 0.3).collect();
        let (a, b, c) = fit_quadratic(&throttle, &y).unwrap();
        assert_relative_eq!(a, 2.0, epsilon = 1e-3);
        assert_relative_eq!(b, -1.5, epsilon = 1e-3);
        assert_relative_eq!(c, 0.3, epsilon = 1e-3);
    }
}
