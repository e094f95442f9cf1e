//! The estimator's public face: owns the state and covariance, drives
//! prediction and measurement updates, and publishes a read-only snapshot.
//!
//! The EKF thread is the sole writer of `state`/`cov`; any number of reader
//! threads (telemetry, logging) may call [`EkfFacade::snapshot`] at their
//! own cadence without coordinating with the writer beyond the mutex.

use super::predict;
use super::state::{StateVector, STATE_DIM};
use super::update::baro::BaroUpdate;
use super::update::gps::GpsUpdate;
use super::update::imu::ImuUpdate;
use super::update::apply_update;
use crate::error::Result;
use crate::linalg::{Matrix, Vec3};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

/// Noise parameters, named after the initialization struct they generalize:
/// per-block initial covariance (`p_*`), per-second process noise (`q_*`),
/// and measurement noise (`r_*`) for each sensor family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EkfConfig {
    pub p_pos_var: f32,
    pub p_vel_var: f32,
    pub p_acc_var: f32,
    pub p_gyro_var: f32,
    pub p_mag_var: f32,
    pub p_quat_var: f32,

    pub q_pos: f32,
    pub q_vel: f32,
    pub q_acc: f32,
    pub q_gyro: f32,
    pub q_mag: f32,
    pub q_quat: f32,

    /// The loop cadence `F` is evaluated at when building the one-time
    /// process noise matrix `Q = F Q_meas F^T` at startup.
    pub nominal_dt_s: f32,

    pub r_acc: f32,
    pub r_gyro: f32,
    pub r_mag: f32,
    pub r_baro: f32,
    pub r_gps_pos: f32,
    pub r_gps_vel: f32,
}

impl Default for EkfConfig {
    fn default() -> Self {
        EkfConfig {
            p_pos_var: 1.0,
            p_vel_var: 1.0,
            p_acc_var: 1.0,
            p_gyro_var: 1.0,
            p_mag_var: 1.0,
            p_quat_var: 0.1,

            q_pos: 0.001,
            q_vel: 0.01,
            q_acc: 0.5,
            q_gyro: 0.1,
            q_mag: 0.01,
            q_quat: 0.001,
            nominal_dt_s: 0.01,

            r_acc: 0.5,
            r_gyro: 0.05,
            r_mag: 0.2,
            r_baro: 0.25,
            r_gps_pos: 4.0,
            r_gps_vel: 0.25,
        }
    }
}

/// A point-in-time readout of the estimator, safe to hand to a telemetry
/// or logging thread without it ever touching the live state/covariance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub quaternion: (f32, f32, f32, f32), // (a, i, j, k)
    pub euler_rpy: (f32, f32, f32),
    pub body_rate: Vec3,
    pub body_accel: Vec3,
}

pub struct EkfFacade {
    state: Mutex<StateVector>,
    cov: Mutex<Matrix>,
    config: EkfConfig,
    last_predict: Mutex<Instant>,
    /// `Q = F Q_meas F^T`, built once at startup from the nominal-cadence
    /// Jacobian and held fixed for the life of the facade.
    process_noise: Matrix,
}

fn diag_process_noise(c: &EkfConfig) -> Matrix {
    let mut q = Matrix::zeros(STATE_DIM, STATE_DIM);
    for i in 0..3 {
        q.set(i, i, c.q_pos);
        q.set(3 + i, 3 + i, c.q_vel);
        q.set(10 + i, 10 + i, c.q_acc);
        q.set(13 + i, 13 + i, c.q_gyro);
        q.set(16 + i, 16 + i, c.q_mag);
    }
    for i in 6..10 {
        q.set(i, i, c.q_quat);
    }
    q
}

impl EkfFacade {
    pub fn new(config: EkfConfig, initial_mag: Vec3) -> Self {
        let mut state = StateVector::default();
        state.set_magnetic_field(initial_mag);

        let mut cov = Matrix::zeros(STATE_DIM, STATE_DIM);
        for i in 0..3 {
            cov.set(i, i, config.p_pos_var);
            cov.set(3 + i, 3 + i, config.p_vel_var);
            cov.set(10 + i, 10 + i, config.p_acc_var);
            cov.set(13 + i, 13 + i, config.p_gyro_var);
            cov.set(16 + i, 16 + i, config.p_mag_var);
        }
        for i in 6..10 {
            cov.set(i, i, config.p_quat_var);
        }

        let f_init = predict::jacobian(&state, config.nominal_dt_s);
        let q_meas = diag_process_noise(&config);
        let process_noise = f_init
            .sandwich(&q_meas)
            .expect("F and Q_meas shapes are fixed at STATE_DIM x STATE_DIM");

        EkfFacade {
            state: Mutex::new(state),
            cov: Mutex::new(cov),
            config,
            last_predict: Mutex::new(Instant::now()),
            process_noise,
        }
    }

    /// Advances the state and covariance to `now`. `dt` is clamped to be
    /// non-negative so an out-of-order timestamp cannot run the model
    /// backwards.
    pub fn predict(&self, now: Instant) -> Result<()> {
        let mut last = self.last_predict.lock().unwrap();
        let dt = now.saturating_duration_since(*last).as_secs_f32();
        *last = now;
        if dt <= 0.0 {
            return Ok(());
        }

        let mut state = self.state.lock().unwrap();
        let mut cov = self.cov.lock().unwrap();

        let f = predict::jacobian(&state, dt);
        let mut next_cov = f.sparse_sandwich(&cov)?;
        next_cov.add_in_place(&self.process_noise)?;

        *state = predict::propagate(&state, dt);
        *cov = next_cov;
        Ok(())
    }

    fn run_update(&self, engine_build: impl FnOnce(&StateVector) -> Box<dyn super::update::UpdateEngine>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut cov = self.cov.lock().unwrap();
        let engine = engine_build(&state);
        match apply_update(&state, &cov, engine.as_ref()) {
            Ok((new_state, new_cov)) => {
                *state = new_state;
                *cov = new_cov;
                Ok(())
            }
            Err(e) => {
                warn!("measurement update rejected: {e}");
                Err(e)
            }
        }
    }

    pub fn update_imu(&self, accel_raw: Vec3, gyro_raw: Vec3, mag_raw: Vec3) -> Result<()> {
        let c = self.config;
        self.run_update(move |state| {
            Box::new(ImuUpdate {
                accel_raw,
                gyro_raw,
                mag_raw,
                r_acc: c.r_acc,
                r_gyro: c.r_gyro,
                r_mag: c.r_mag,
                prior: state.quat(),
            })
        })
    }

    pub fn update_baro(&self, altitude: f32) -> Result<()> {
        let noise_var = self.config.r_baro;
        self.run_update(move |_| Box::new(BaroUpdate { altitude, noise_var }))
    }

    pub fn update_gps(&self, position: Vec3, velocity: Option<Vec3>) -> Result<()> {
        let pos_noise_var = self.config.r_gps_pos;
        let vel_noise_var = self.config.r_gps_vel;
        self.run_update(move |_| {
            Box::new(GpsUpdate { position, velocity, pos_noise_var, vel_noise_var })
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap();
        let q = state.quat();
        let euler_rpy = q.to_euler();
        Snapshot {
            taken_at: Utc::now(),
            position: state.position(),
            velocity: state.velocity(),
            quaternion: (q.a, q.i, q.j, q.k),
            euler_rpy,
            body_rate: state.angular_rate(),
            body_accel: state.acceleration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[test]
    fn stationary_imu_updates_keep_position_near_zero() {
        let ekf = EkfFacade::new(EkfConfig::default(), Vec3::new(1.0, 0.0, 0.0));
        let mut t = Instant::now();
        for _ in 0..50 {
            t += Duration::from_millis(10);
            ekf.predict(t).unwrap();
            ekf.update_imu(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        }
        let snap = ekf.snapshot();
        assert_relative_eq!(snap.position.x, 0.0, epsilon = 0.5);
        assert_relative_eq!(snap.position.y, 0.0, epsilon = 0.5);
        assert_relative_eq!(snap.position.z, 0.0, epsilon = 0.5);
    }

    #[test]
    fn gps_fix_pulls_position_estimate_toward_it() {
        let ekf = EkfFacade::new(EkfConfig::default(), Vec3::new(1.0, 0.0, 0.0));
        ekf.update_gps(Vec3::new(100.0, 0.0, 0.0), None).unwrap();
        let snap = ekf.snapshot();
        assert!(snap.position.x > 0.0);
    }
}
