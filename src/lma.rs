//! Generic Levenberg-Marquardt least-squares solver.
//!
//! Callers supply a residual function per sample and an initial guess; the
//! solver numerically differentiates the residuals to build a Jacobian each
//! iteration, then alternates a damped normal-equations solve with a
//! damping-parameter adjustment until the fit stops improving.

use crate::error::{EstimatorError, Result};
use crate::linalg::Matrix;
use log::trace;

/// Step used for the central-difference numeric Jacobian.
const JACOBIAN_STEP: f32 = 1.0e-4;

const LAMBDA_INITIAL: f32 = 1.0;
const LAMBDA_REWARD: f32 = 0.1;
const LAMBDA_PENALTY: f32 = 10.0;

/// A least-squares problem: `nsamples` scalar residuals, each a function of
/// a shared `nparams`-length parameter vector.
pub trait LmaProblem {
    fn nparams(&self) -> usize;
    fn nsamples(&self) -> usize;
    fn residual(&self, params: &[f32], sample: usize) -> f32;
    fn initial_guess(&self) -> Vec<f32>;
}

pub struct LmaResult {
    pub params: Vec<f32>,
    pub residual_sum_sq: f64,
    pub iterations: usize,
}

fn residual_vec<P: LmaProblem + ?Sized>(problem: &P, params: &[f32]) -> Vec<f32> {
    (0..problem.nsamples())
        .map(|s| problem.residual(params, s))
        .collect()
}

fn sum_sq(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum()
}

/// Central-difference Jacobian of the residual vector with respect to each
/// parameter.
fn numeric_jacobian<P: LmaProblem + ?Sized>(problem: &P, params: &[f32]) -> Matrix {
    let nsamples = problem.nsamples();
    let nparams = problem.nparams();
    let mut j = Matrix::zeros(nsamples, nparams);

    for p in 0..nparams {
        let mut plus = params.to_vec();
        let mut minus = params.to_vec();
        plus[p] += JACOBIAN_STEP;
        minus[p] -= JACOBIAN_STEP;

        for s in 0..nsamples {
            let r_plus = problem.residual(&plus, s);
            let r_minus = problem.residual(&minus, s);
            let slope = (r_plus - r_minus) / (2.0 * JACOBIAN_STEP);
            j.set(s, p, slope);
        }
    }
    j
}

/// Runs the Levenberg-Marquardt loop until the relative improvement in the
/// sum of squared residuals falls below `tolerance` or `max_iterations` is
/// reached.
pub fn lma_fit<P: LmaProblem + ?Sized>(
    problem: &P,
    max_iterations: usize,
    tolerance: f64,
) -> Result<LmaResult> {
    let nparams = problem.nparams();
    if nparams == 0 {
        return Err(EstimatorError::ShapeMismatch("LMA problem has zero parameters".into()));
    }

    let mut params = problem.initial_guess();
    if params.len() != nparams {
        return Err(EstimatorError::ShapeMismatch(format!(
            "initial guess has {} entries, expected {nparams}",
            params.len()
        )));
    }

    let mut residuals = residual_vec(problem, &params);
    let mut current_ss = sum_sq(&residuals);
    let mut lambda = LAMBDA_INITIAL;

    for iter in 0..max_iterations {
        trace!("lma iteration {iter}: lambda={lambda} residual_ss={current_ss}");

        let jacobian = numeric_jacobian(problem, &params);
        let jt = jacobian.transposed_view();

        // residuals stored negated so the solved step points downhill
        let neg_residuals: Vec<f32> = residuals.iter().map(|r| -r).collect();
        let r_col = Matrix::from_row_major(neg_residuals.len(), 1, neg_residuals)?;

        let mut damped = jt.prod(&jacobian)?;
        for d in 0..nparams {
            let v = damped.get(d, d) + lambda;
            damped.set(d, d, v);
        }

        let jtr = jt.prod(&r_col)?;
        let inv = damped.inverse();
        let inv = match inv {
            Ok(m) => m,
            Err(_) => {
                lambda *= LAMBDA_PENALTY;
                continue;
            }
        };
        let delta = inv.prod(&jtr)?;

        let mut candidate = params.clone();
        for p in 0..nparams {
            candidate[p] += delta.get(p, 0);
        }

        let candidate_residuals = residual_vec(problem, &candidate);
        let candidate_ss = sum_sq(&candidate_residuals);

        if candidate_ss < current_ss {
            let improvement = (current_ss - candidate_ss) / current_ss.max(1e-12);
            params = candidate;
            residuals = candidate_residuals;
            current_ss = candidate_ss;
            lambda *= LAMBDA_REWARD;
            if improvement < tolerance {
                return Ok(LmaResult { params, residual_sum_sq: current_ss, iterations: iter + 1 });
            }
        } else {
            lambda *= LAMBDA_PENALTY;
        }
    }

    Ok(LmaResult { params, residual_sum_sq: current_ss, iterations: max_iterations })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fits y = a*x + b against noiseless samples.
    struct LineFit {
        xs: Vec<f32>,
        ys: Vec<f32>,
    }

    impl LmaProblem for LineFit {
        fn nparams(&self) -> usize {
            2
        }
        fn nsamples(&self) -> usize {
            self.xs.len()
        }
        fn residual(&self, params: &[f32], sample: usize) -> f32 {
            let predicted = params[0] * self.xs[sample] + params[1];
            predicted - self.ys[sample]
        }
        fn initial_guess(&self) -> Vec<f32> {
            vec![0.0, 0.0]
        }
    }

    #[test]
    fn fits_a_line() {
        let xs: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|x| 2.0 * x + 3.0).collect();
        let problem = LineFit { xs, ys };
        let result = lma_fit(&problem, 200, 1e-10).unwrap();
        assert!((result.params[0] - 2.0).abs() < 1e-2);
        assert!((result.params[1] - 3.0).abs() < 1e-2);
        assert!(result.residual_sum_sq < 1e-3);
    }

    /// Fits `x1 = p0 * sqrt(x0 - p1*x0^2 + p2*x0^3)` against noiseless
    /// samples generated from known parameters, from a zero initial guess.
    struct ReferenceCurve {
        x0s: Vec<f32>,
        x1s: Vec<f32>,
    }

    impl LmaProblem for ReferenceCurve {
        fn nparams(&self) -> usize {
            3
        }
        fn nsamples(&self) -> usize {
            self.x0s.len()
        }
        fn residual(&self, params: &[f32], sample: usize) -> f32 {
            let x0 = self.x0s[sample];
            let inner = x0 - params[1] * x0 * x0 + params[2] * x0 * x0 * x0;
            let predicted = params[0] * inner.max(0.0).sqrt();
            predicted - self.x1s[sample]
        }
        fn initial_guess(&self) -> Vec<f32> {
            vec![0.0, 0.0, 0.0]
        }
    }

    #[test]
    fn fits_reference_curve_from_zero_guess() {
        let true_params = [0.5f32, 0.5, 0.1];
        let x0s: Vec<f32> = (0..20).map(|i| 1.0 + i as f32 * 0.2).collect();
        let x1s: Vec<f32> = x0s
            .iter()
            .map(|&x0| {
                let inner = x0 - true_params[1] * x0 * x0 + true_params[2] * x0 * x0 * x0;
                true_params[0] * inner.max(0.0).sqrt()
            })
            .collect();
        let problem = ReferenceCurve { x0s, x1s };
        let result = lma_fit(&problem, 16, 1e-3).unwrap();
        assert!(result.iterations <= 16);
        assert!((result.params[0] - true_params[0]).abs() < 1e-1);
    }
}
