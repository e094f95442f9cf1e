//! Nonlinear state propagation and its Jacobian, used to advance both the
//! state estimate and the covariance between measurement updates.

use super::state::{
    StateVector, ACC_X, GYRO_X, POS_X, QUAT_A, QUAT_I, QUAT_J, QUAT_K, STATE_DIM, VEL_X,
};
use crate::linalg::{Matrix, Quat};

/// Advances the state by `dt` seconds using a constant-acceleration,
/// constant-angular-rate model. Acceleration, angular rate, and the
/// magnetic field estimate are treated as held constant across the step;
/// only position, velocity, and attitude actually change.
pub fn propagate(state: &StateVector, dt: f32) -> StateVector {
    let mut next = *state;

    let v = state.velocity();
    let a = state.acceleration();
    let pos = state.position();
    next.set_position(pos.add(&v.scale(dt)).add(&a.scale(0.5 * dt * dt)));
    next.set_velocity(v.add(&a.scale(dt)));

    let w = state.angular_rate();
    let q = state.quat();
    let omega_quat = Quat::new(w.x, w.y, w.z, 0.0);
    let q_dot = omega_quat.mul(&q);
    let q_unnorm = Quat::new(
        q.i + 0.5 * dt * q_dot.i,
        q.j + 0.5 * dt * q_dot.j,
        q.k + 0.5 * dt * q_dot.k,
        q.a + 0.5 * dt * q_dot.a,
    );
    next.set_quat(q_unnorm.normalize());

    next
}

/// Builds the 19x19 state-transition Jacobian `F` at the current state,
/// linearizing the attitude propagation about the current quaternion and
/// angular rate.
pub fn jacobian(state: &StateVector, dt: f32) -> Matrix {
    let mut f = Matrix::identity(STATE_DIM);

    let pos_vel = Matrix::from_row_major(3, 3, vec![dt, 0.0, 0.0, 0.0, dt, 0.0, 0.0, 0.0, dt])
        .expect("3x3 literal");
    f.write_submatrix(POS_X, VEL_X, &pos_vel).expect("in bounds");

    let half_dt2 = 0.5 * dt * dt;
    let pos_acc = Matrix::from_row_major(
        3,
        3,
        vec![half_dt2, 0.0, 0.0, 0.0, half_dt2, 0.0, 0.0, 0.0, half_dt2],
    )
    .expect("3x3 literal");
    f.write_submatrix(POS_X, ACC_X, &pos_acc).expect("in bounds");

    let vel_acc = Matrix::from_row_major(3, 3, vec![dt, 0.0, 0.0, 0.0, dt, 0.0, 0.0, 0.0, dt])
        .expect("3x3 literal");
    f.write_submatrix(VEL_X, ACC_X, &vel_acc).expect("in bounds");

    let q = state.quat();
    let w = state.angular_rate();

    // d(quat)/d(quat): I + 0.5*dt*M(w), M the left-multiplication matrix of
    // the pure-vector quaternion (0, wx, wy, wz), in (a, i, j, k) order.
    #[rustfmt::skip]
    let m = Matrix::from_row_major(4, 4, vec![
        0.0,  -w.x, -w.y, -w.z,
        w.x,   0.0, -w.z,  w.y,
        w.y,   w.z,  0.0, -w.x,
        w.z,  -w.y,  w.x,  0.0,
    ]).expect("4x4 literal");
    let mut m_scaled = m;
    m_scaled.scale(0.5 * dt);
    let mut quat_quat = Matrix::identity(4);
    quat_quat.add_in_place(&m_scaled).expect("shapes match");
    f.write_submatrix(QUAT_A, QUAT_A, &quat_quat).expect("in bounds");

    // d(quat)/d(omega), evaluated at the current quaternion.
    #[rustfmt::skip]
    let mut quat_omega = Matrix::from_row_major(4, 3, vec![
        -q.i, -q.j, -q.k,
         q.a,  q.k, -q.j,
        -q.k,  q.a,  q.i,
         q.j, -q.i,  q.a,
    ]).expect("4x3 literal");
    quat_omega.scale(0.5 * dt);
    f.write_submatrix(QUAT_A, GYRO_X, &quat_omega).expect("in bounds");

    f
}
