//! IMU update: folds raw accelerometer, gyroscope, and magnetometer
//! readings into a 13-row measurement together with a measurement-derived
//! attitude quaternion, and reads all thirteen straight back out of the
//! corresponding state slots.

use super::UpdateEngine;
use crate::ekf::state::{
    StateVector, ACC_X, GYRO_X, MAG_X, QUAT_A, QUAT_I, QUAT_J, QUAT_K, STATE_DIM,
};
use crate::linalg::{Matrix, Quat, Vec3};

/// Standard gravity, used both to remove the steady-state +1g reading from
/// the vertical accelerometer axis and as the reference "down" direction
/// for the measurement-derived attitude.
pub const EARTH_G: f32 = 9.80665;

/// Soft-core suppression of small accelerometer noise: `x * x^2 / (x^2 + 0.01)`.
/// Leaves large readings close to unchanged while damping values near zero.
fn soft_core(x: f32) -> f32 {
    x * x * x / (x * x + 0.01)
}

pub struct ImuUpdate {
    pub accel_raw: Vec3,
    pub gyro_raw: Vec3,
    pub mag_raw: Vec3,
    pub r_acc: f32,
    pub r_gyro: f32,
    pub r_mag: f32,
    /// The state's attitude estimate going into this update, used only to
    /// pick the hemisphere-consistent sign of the measurement-derived
    /// quaternion.
    pub prior: Quat,
}

impl ImuUpdate {
    /// Body-frame accelerometer reading rotated into the world frame using
    /// the prior attitude estimate, matching `state.acceleration()`'s own
    /// frame.
    fn rotated_accel(&self) -> Vec3 {
        self.prior.rotate_vec(self.accel_raw)
    }

    /// Body-frame gyro reading rotated into the world frame, matching
    /// `state.angular_rate()`'s own frame.
    fn rotated_gyro(&self) -> Vec3 {
        self.prior.rotate_vec(self.gyro_raw)
    }

    /// World-frame accelerometer reading scaled to m/s^2, soft-core
    /// filtered, and with the at-rest +1g bias removed from the vertical
    /// axis.
    fn filtered_accel(&self) -> Vec3 {
        let a = self.rotated_accel();
        let fx = soft_core(a.x * EARTH_G);
        let fy = soft_core(a.y * EARTH_G);
        let fz = soft_core(a.z * EARTH_G) - EARTH_G;
        Vec3::new(fx, fy, fz)
    }

    /// Attitude implied directly by the raw (body-frame) accel/mag
    /// readings, via the gravity and magnetic-field reference directions.
    fn measured_attitude(&self, prior: &Quat) -> Quat {
        let down = self.accel_raw.normalize();
        let east = self.accel_raw.cross(&self.mag_raw).normalize();
        Quat::frame_rot(&down, &east, &Vec3::UNIT_Z, &Vec3::UNIT_X, Some(prior))
    }

    /// Inflates the attitude measurement's noise when the vehicle is
    /// accelerating or rotating quickly, since the gravity/mag reference
    /// assumption degrades under those conditions.
    fn attitude_noise(&self) -> f32 {
        let g_ref = Vec3::new(0.0, 0.0, EARTH_G);
        8.0 + 50.0 * self.rotated_accel().sub(&g_ref).len() + 10.0 * self.rotated_gyro().len()
    }
}

impl UpdateEngine for ImuUpdate {
    fn measurement_dim(&self) -> usize {
        13
    }

    fn predicted(&self, state: &StateVector) -> Matrix {
        let a = state.acceleration();
        let w = state.angular_rate();
        let m = state.magnetic_field();
        let q = state.quat();
        Matrix::from_row_major(
            13,
            1,
            vec![a.x, a.y, a.z, w.x, w.y, w.z, m.x, m.y, m.z, q.a, q.i, q.j, q.k],
        )
        .expect("13 rows")
    }

    fn jacobian(&self, _state: &StateVector) -> Matrix {
        let mut h = Matrix::zeros(13, STATE_DIM);
        for (row, col) in [
            (0, ACC_X),
            (1, ACC_X + 1),
            (2, ACC_X + 2),
            (3, GYRO_X),
            (4, GYRO_X + 1),
            (5, GYRO_X + 2),
            (6, MAG_X),
            (7, MAG_X + 1),
            (8, MAG_X + 2),
            (9, QUAT_A),
            (10, QUAT_I),
            (11, QUAT_J),
            (12, QUAT_K),
        ] {
            h.set(row, col, 1.0);
        }
        h
    }

    fn noise_cov(&self) -> Matrix {
        let mut r = Matrix::zeros(13, 13);
        for i in 0..3 {
            r.set(i, i, self.r_acc);
        }
        for i in 3..6 {
            r.set(i, i, self.r_gyro);
        }
        for i in 6..9 {
            r.set(i, i, self.r_mag);
        }
        let err_q = self.attitude_noise();
        for i in 9..13 {
            r.set(i, i, err_q);
        }
        r
    }

    fn measurement(&self) -> Matrix {
        let a = self.filtered_accel();
        let w = self.rotated_gyro();
        let m = self.mag_raw;
        let q = self.measured_attitude(&self.prior);
        Matrix::from_row_major(
            13,
            1,
            vec![a.x, a.y, a.z, w.x, w.y, w.z, m.x, m.y, m.z, q.a, q.i, q.j, q.k],
        )
        .expect("13 rows")
    }
}
