//! GPS update: selects position, and optionally velocity, straight out of
//! the state vector.

use super::UpdateEngine;
use crate::ekf::state::{StateVector, POS_X, STATE_DIM, VEL_X};
use crate::linalg::{Matrix, Vec3};

pub struct GpsUpdate {
    pub position: Vec3,
    pub velocity: Option<Vec3>,
    pub pos_noise_var: f32,
    pub vel_noise_var: f32,
}

impl GpsUpdate {
    fn rows(&self) -> usize {
        if self.velocity.is_some() {
            6
        } else {
            3
        }
    }
}

impl UpdateEngine for GpsUpdate {
    fn measurement_dim(&self) -> usize {
        self.rows()
    }

    fn predicted(&self, state: &StateVector) -> Matrix {
        let pos = state.position();
        let mut rows = vec![pos.x, pos.y, pos.z];
        if self.velocity.is_some() {
            let v = state.velocity();
            rows.extend_from_slice(&[v.x, v.y, v.z]);
        }
        Matrix::from_row_major(self.rows(), 1, rows).expect("row count matches measurement_dim")
    }

    fn jacobian(&self, _state: &StateVector) -> Matrix {
        let n = self.rows();
        let mut h = Matrix::zeros(n, STATE_DIM);
        for axis in 0..3 {
            h.set(axis, POS_X + axis, 1.0);
        }
        if self.velocity.is_some() {
            for axis in 0..3 {
                h.set(3 + axis, VEL_X + axis, 1.0);
            }
        }
        h
    }

    fn noise_cov(&self) -> Matrix {
        let n = self.rows();
        let mut r = Matrix::zeros(n, n);
        for axis in 0..3 {
            r.set(axis, axis, self.pos_noise_var);
        }
        if self.velocity.is_some() {
            for axis in 0..3 {
                r.set(3 + axis, 3 + axis, self.vel_noise_var);
            }
        }
        r
    }

    fn measurement(&self) -> Matrix {
        let mut rows = vec![self.position.x, self.position.y, self.position.z];
        if let Some(v) = self.velocity {
            rows.extend_from_slice(&[v.x, v.y, v.z]);
        }
        Matrix::from_row_major(self.rows(), 1, rows).expect("row count matches measurement_dim")
    }
}
