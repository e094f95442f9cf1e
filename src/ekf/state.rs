//! The 19-element EKF state vector and its named indices.
//!
//! Indices are named constants rather than magic numbers so a transcription
//! error (swapping two axes, reusing an index) shows up as a compile-time
//! typo instead of a silent runtime bug.

use crate::linalg::{Matrix, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub const STATE_DIM: usize = 19;

pub const POS_X: usize = 0;
pub const POS_Y: usize = 1;
pub const POS_Z: usize = 2;
pub const VEL_X: usize = 3;
pub const VEL_Y: usize = 4;
pub const VEL_Z: usize = 5;
pub const QUAT_A: usize = 6;
pub const QUAT_I: usize = 7;
pub const QUAT_J: usize = 8;
pub const QUAT_K: usize = 9;
pub const ACC_X: usize = 10;
pub const ACC_Y: usize = 11;
pub const ACC_Z: usize = 12;
pub const GYRO_X: usize = 13;
pub const GYRO_Y: usize = 14;
pub const GYRO_Z: usize = 15;
pub const MAG_X: usize = 16;
pub const MAG_Y: usize = 17;
pub const MAG_Z: usize = 18;

/// The 19-lane EKF state, stored as a plain array but always read and
/// written through the named accessors below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector(pub [f32; STATE_DIM]);

impl Default for StateVector {
    fn default() -> Self {
        let mut s = StateVector([0.0; STATE_DIM]);
        s.set_quat(Quat::IDENTITY);
        s
    }
}

impl StateVector {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.0[POS_X], self.0[POS_Y], self.0[POS_Z])
    }
    pub fn set_position(&mut self, v: Vec3) {
        self.0[POS_X] = v.x;
        self.0[POS_Y] = v.y;
        self.0[POS_Z] = v.z;
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.0[VEL_X], self.0[VEL_Y], self.0[VEL_Z])
    }
    pub fn set_velocity(&mut self, v: Vec3) {
        self.0[VEL_X] = v.x;
        self.0[VEL_Y] = v.y;
        self.0[VEL_Z] = v.z;
    }

    /// Quaternion stored state-vector-order `(a, i, j, k)`.
    pub fn quat(&self) -> Quat {
        Quat::new(self.0[QUAT_I], self.0[QUAT_J], self.0[QUAT_K], self.0[QUAT_A])
    }
    pub fn set_quat(&mut self, q: Quat) {
        self.0[QUAT_A] = q.a;
        self.0[QUAT_I] = q.i;
        self.0[QUAT_J] = q.j;
        self.0[QUAT_K] = q.k;
    }

    pub fn acceleration(&self) -> Vec3 {
        Vec3::new(self.0[ACC_X], self.0[ACC_Y], self.0[ACC_Z])
    }
    pub fn set_acceleration(&mut self, v: Vec3) {
        self.0[ACC_X] = v.x;
        self.0[ACC_Y] = v.y;
        self.0[ACC_Z] = v.z;
    }

    pub fn angular_rate(&self) -> Vec3 {
        Vec3::new(self.0[GYRO_X], self.0[GYRO_Y], self.0[GYRO_Z])
    }
    pub fn set_angular_rate(&mut self, v: Vec3) {
        self.0[GYRO_X] = v.x;
        self.0[GYRO_Y] = v.y;
        self.0[GYRO_Z] = v.z;
    }

    pub fn magnetic_field(&self) -> Vec3 {
        Vec3::new(self.0[MAG_X], self.0[MAG_Y], self.0[MAG_Z])
    }
    pub fn set_magnetic_field(&mut self, v: Vec3) {
        self.0[MAG_X] = v.x;
        self.0[MAG_Y] = v.y;
        self.0[MAG_Z] = v.z;
    }

    /// Renormalizes the quaternion slice in place; a no-op everywhere else.
    pub fn renormalize_quat(&mut self) {
        let q = self.quat().normalize();
        self.set_quat(q);
    }

    pub fn to_column_matrix(&self) -> Matrix {
        Matrix::from_row_major(STATE_DIM, 1, self.0.to_vec())
            .expect("STATE_DIM matches the fixed-size array length")
    }

    pub fn from_column_matrix(m: &Matrix) -> Self {
        let mut out = [0.0f32; STATE_DIM];
        for i in 0..STATE_DIM {
            out[i] = m.get(i, 0);
        }
        StateVector(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_identity_quaternion() {
        let s = StateVector::default();
        assert_eq!(s.quat(), Quat::IDENTITY);
    }

    #[test]
    fn position_roundtrips() {
        let mut s = StateVector::default();
        let v = Vec3::new(1.0, 2.0, 3.0);
        s.set_position(v);
        assert_eq!(s.position(), v);
    }

    #[test]
    fn column_matrix_roundtrips() {
        let mut s = StateVector::default();
        s.set_velocity(Vec3::new(4.0, 5.0, 6.0));
        let m = s.to_column_matrix();
        let back = StateVector::from_column_matrix(&m);
        assert_eq!(s, back);
    }
}
