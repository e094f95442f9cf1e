//! Properties that must hold of the estimator as a whole rather than of
//! any single kernel function in isolation.

use std::time::{Duration, Instant};

use uav_ekf::ekf::{EkfConfig, EkfFacade};
use uav_ekf::linalg::{Matrix, Quat, Vec3};

/// The state's attitude quaternion stays unit-norm across interleaved
/// predict/update cycles, not just immediately after a single update.
#[test]
fn quaternion_stays_unit_norm_across_many_cycles() {
    let ekf = EkfFacade::new(EkfConfig::default(), Vec3::UNIT_X);
    let mut t = Instant::now();
    for i in 0..2000 {
        t += Duration::from_millis(1);
        ekf.predict(t).unwrap();
        if i % 5 == 0 {
            ekf.update_imu(Vec3::new(0.1, -0.05, 1.0), Vec3::new(0.2, 0.0, -0.1), Vec3::UNIT_X)
                .unwrap();
        }
        if i % 37 == 0 {
            ekf.update_baro(-1.0).unwrap();
        }
        let q = ekf.snapshot();
        let norm_sq = q.quaternion.0 * q.quaternion.0
            + q.quaternion.1 * q.quaternion.1
            + q.quaternion.2 * q.quaternion.2
            + q.quaternion.3 * q.quaternion.3;
        assert!((norm_sq.sqrt() - 1.0).abs() < 1e-4, "iteration {i}: |q| = {}", norm_sq.sqrt());
    }
}

/// The covariance stays symmetric through a long run of stationary
/// predict/update cycles; asymmetry would mean the update `P = (I-KH)P`
/// has accumulated floating point drift past a reasonable tolerance. Driven
/// directly against the shared kernel, since the façade doesn't expose the
/// raw covariance for inspection.
#[test]
fn covariance_stays_symmetric_through_many_updates() {
    use uav_ekf::ekf::predict;
    use uav_ekf::ekf::state::{StateVector, STATE_DIM};
    use uav_ekf::ekf::update::{apply_update, imu::ImuUpdate};

    let mut state = StateVector::default();
    let mut cov = Matrix::identity(STATE_DIM);

    for i in 0..1000 {
        let f = predict::jacobian(&state, 0.001);
        cov = f.sparse_sandwich(&cov).unwrap();
        state = predict::propagate(&state, 0.001);

        let engine = ImuUpdate {
            accel_raw: Vec3::new(0.0, 0.0, 1.0),
            gyro_raw: Vec3::ZERO,
            mag_raw: Vec3::UNIT_X,
            r_acc: 0.5,
            r_gyro: 0.05,
            r_mag: 0.2,
            prior: state.quat(),
        };
        let (new_state, new_cov) = apply_update(&state, &cov, &engine).unwrap();
        state = new_state;
        cov = new_cov;

        let mut max_asym: f32 = 0.0;
        let mut max_abs: f32 = 0.0;
        for r in 0..STATE_DIM {
            for c in 0..STATE_DIM {
                let v = cov.get(r, c);
                max_abs = max_abs.max(v.abs());
                max_asym = max_asym.max((v - cov.get(c, r)).abs());
            }
        }
        assert!(
            max_asym < 1e-3 * max_abs.max(1.0),
            "iteration {i}: max asymmetry {max_asym}, max abs {max_abs}"
        );
    }
}

/// Rotating a vector by a unit quaternion and then by its conjugate
/// recovers the original vector.
#[test]
fn quaternion_rotation_round_trips_through_its_conjugate() {
    let q = Quat::from_axis_angle(&Vec3::new(1.0, 2.0, 3.0), 0.9);
    let v = Vec3::new(4.0, -1.0, 2.5);
    let rotated = q.rotate_vec(v);
    let back = q.conjugate().rotate_vec(rotated);
    assert!((back.x - v.x).abs() < 1e-5);
    assert!((back.y - v.y).abs() < 1e-5);
    assert!((back.z - v.z).abs() < 1e-5);
}

/// `sandwich(I, B) == B`: conjugating a matrix by the identity is a no-op.
#[test]
fn sandwich_by_identity_is_a_no_op() {
    let b = Matrix::from_row_major(3, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
    let identity = Matrix::identity(3);
    let out = identity.sandwich(&b).unwrap();
    assert!(out.approx_eq(&b, 1e-5));
}

/// The covariance stays positive (diagonal entries non-negative) through a
/// long run of stationary predict/update cycles, driven directly against
/// the shared kernel so the raw covariance is available to inspect.
#[test]
fn covariance_diagonal_stays_non_negative_through_a_long_stationary_run() {
    use uav_ekf::ekf::predict;
    use uav_ekf::ekf::state::{StateVector, STATE_DIM};
    use uav_ekf::ekf::update::{apply_update, imu::ImuUpdate};

    let mut state = StateVector::default();
    let mut cov = Matrix::identity(STATE_DIM);
    let dt = 0.001;

    for i in 0..100_000 {
        let f = predict::jacobian(&state, dt);
        cov = f.sparse_sandwich(&cov).unwrap();
        state = predict::propagate(&state, dt);

        if i % 10 == 0 {
            let engine = ImuUpdate {
                accel_raw: Vec3::new(0.0, 0.0, 1.0),
                gyro_raw: Vec3::ZERO,
                mag_raw: Vec3::UNIT_X,
                r_acc: 0.5,
                r_gyro: 0.05,
                r_mag: 0.2,
                prior: state.quat(),
            };
            let (new_state, new_cov) = apply_update(&state, &cov, &engine).unwrap();
            state = new_state;
            cov = new_cov;
        }

        for d in 0..STATE_DIM {
            assert!(cov.get(d, d) >= -1e-6, "iteration {i}: P[{d},{d}] = {}", cov.get(d, d));
        }
    }
}
