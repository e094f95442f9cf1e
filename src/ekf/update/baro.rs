//! Barometric altitude update: a single row selecting `pos.z` directly.

use super::UpdateEngine;
use crate::ekf::state::{StateVector, POS_Z, STATE_DIM};
use crate::linalg::Matrix;

pub struct BaroUpdate {
    pub altitude: f32,
    pub noise_var: f32,
}

impl UpdateEngine for BaroUpdate {
    fn measurement_dim(&self) -> usize {
        1
    }

    fn predicted(&self, state: &StateVector) -> Matrix {
        Matrix::from_row_major(1, 1, vec![state.position().z]).expect("1x1 literal")
    }

    fn jacobian(&self, _state: &StateVector) -> Matrix {
        let mut h = Matrix::zeros(1, STATE_DIM);
        h.set(0, POS_Z, 1.0);
        h
    }

    fn noise_cov(&self) -> Matrix {
        Matrix::from_row_major(1, 1, vec![self.noise_var]).expect("1x1 literal")
    }

    fn measurement(&self) -> Matrix {
        Matrix::from_row_major(1, 1, vec![self.altitude]).expect("1x1 literal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ekf::update::apply_update;

    #[test]
    fn baro_update_pulls_altitude_toward_measurement() {
        let state = StateVector::default();
        let cov = Matrix::identity(STATE_DIM);
        let engine = BaroUpdate { altitude: -2.0, noise_var: 0.25 };
        let (new_state, _) = apply_update(&state, &cov, &engine).unwrap();
        assert!(new_state.position().z < 0.0 && new_state.position().z > -2.0);
    }
}
