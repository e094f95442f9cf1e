//! Measurement update engines: each sensor family owns its own update
//! context (Jacobian, noise covariance, innovation, gain, scratch space)
//! rather than sharing a singleton — every engine is a plain value the
//! caller constructs, uses once, and drops.

pub mod baro;
pub mod gps;
pub mod imu;

use crate::ekf::state::StateVector;
use crate::error::Result;
use crate::linalg::Matrix;

/// One measurement-update step against the current state and covariance.
/// Implementors supply the nonlinear measurement function `h(x)`, its
/// Jacobian `H`, the measurement noise covariance `R`, and the raw
/// measurement vector `Z` itself.
pub trait UpdateEngine {
    fn measurement_dim(&self) -> usize;
    /// `h(x)`, the measurement predicted from the current state, as a
    /// column vector.
    fn predicted(&self, state: &StateVector) -> Matrix;
    /// `H`, the Jacobian of `h` with respect to the state.
    fn jacobian(&self, state: &StateVector) -> Matrix;
    /// `R`, the measurement noise covariance.
    fn noise_cov(&self) -> Matrix;
    /// `Z`, the raw measurement, as a column vector.
    fn measurement(&self) -> Matrix;
}

/// Runs one Kalman update: `Y = Z - h(x)`, `S = H P H^T + R`,
/// `K = P H^T S^-1`, `x += K Y`, `P = (I - K H) P`.
///
/// On a singular innovation covariance the update is aborted before any
/// state or covariance mutation — the caller gets the error back and the
/// estimator simply skips this measurement for one cycle.
pub fn apply_update(
    state: &StateVector,
    cov: &Matrix,
    engine: &dyn UpdateEngine,
) -> Result<(StateVector, Matrix)> {
    let h = engine.jacobian(state);
    let r = engine.noise_cov();
    let z = engine.measurement();
    let hx = engine.predicted(state);

    let y = z.sub(&hx)?;
    let s = h.sandwich(cov)?.add(&r)?;
    let s_inv = s.inverse()?;

    let ht = h.transposed_view();
    let p_ht = cov.prod(&ht)?;
    let k = p_ht.prod(&s_inv)?;

    let dx = k.prod(&y)?;
    let x_col = state.to_column_matrix().add(&dx)?;
    let mut new_state = StateVector::from_column_matrix(&x_col);
    new_state.renormalize_quat();

    let kh = k.prod(&h)?;
    let identity = Matrix::identity(crate::ekf::state::STATE_DIM);
    let i_minus_kh = identity.sub(&kh)?;
    let updated_cov = i_minus_kh.prod(cov)?;

    // Restore exact symmetry: `(I - KH)P` drifts from its transpose by
    // floating point round-off alone, even though the true update is
    // symmetric.
    let mut new_cov = updated_cov.add(&updated_cov.transposed_view())?;
    new_cov.scale(0.5);

    Ok((new_state, new_cov))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ekf::state::{POS_X, STATE_DIM};

    /// A trivial 1-row engine that measures `pos.x` directly, used to check
    /// the shared Kalman math without pulling in a real sensor model.
    struct DirectPosX {
        z: f32,
        r: f32,
    }

    impl UpdateEngine for DirectPosX {
        fn measurement_dim(&self) -> usize {
            1
        }
        fn predicted(&self, state: &StateVector) -> Matrix {
            Matrix::from_row_major(1, 1, vec![state.0[POS_X]]).unwrap()
        }
        fn jacobian(&self, _state: &StateVector) -> Matrix {
            let mut h = Matrix::zeros(1, STATE_DIM);
            h.set(0, POS_X, 1.0);
            h
        }
        fn noise_cov(&self) -> Matrix {
            Matrix::from_row_major(1, 1, vec![self.r]).unwrap()
        }
        fn measurement(&self) -> Matrix {
            Matrix::from_row_major(1, 1, vec![self.z]).unwrap()
        }
    }

    #[test]
    fn update_moves_state_toward_measurement() {
        let state = StateVector::default();
        let cov = Matrix::identity(STATE_DIM);
        let engine = DirectPosX { z: 10.0, r: 1.0 };
        let (new_state, new_cov) = apply_update(&state, &cov, &engine).unwrap();
        assert!(new_state.0[POS_X] > 0.0 && new_state.0[POS_X] < 10.0);
        assert!(new_cov.get(POS_X, POS_X) < cov.get(POS_X, POS_X));
    }

    #[test]
    fn singular_innovation_covariance_is_rejected_without_mutation() {
        let state = StateVector::default();
        let cov = Matrix::zeros(STATE_DIM, STATE_DIM); // P = 0 => S = R = 0 => singular
        let engine = DirectPosX { z: 10.0, r: 0.0 };
        assert!(apply_update(&state, &cov, &engine).is_err());
    }
}
