//! Unit-quaternion algebra for attitude representation.

use super::vec3::Vec3;
use serde::{Deserialize, Serialize};

/// Cosine threshold below which two unit vectors are no longer treated as
/// (anti)parallel by [`Quat::uvec2uvec`]. Standardized at a single value for
/// both the parallel and antiparallel branches.
pub const UVEC_PARALLEL_EPS: f32 = 1.0 - 1.0e-6;

/// A unit quaternion `a + i*bi + j*bj + k*bk`, real part last to match the
/// field order the rest of the estimator's state layout assumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub i: f32,
    pub j: f32,
    pub k: f32,
    pub a: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat { i: 0.0, j: 0.0, k: 0.0, a: 1.0 };

    pub fn new(i: f32, j: f32, k: f32, a: f32) -> Self {
        Quat { i, j, k, a }
    }

    /// A pure quaternion (zero real part) wrapping a vector, used to rotate
    /// vectors via the sandwich product.
    pub fn from_vec(v: Vec3) -> Self {
        Quat::new(v.x, v.y, v.z, 0.0)
    }

    pub fn to_vec(&self) -> Vec3 {
        Vec3::new(self.i, self.j, self.k)
    }

    /// Hamilton product, `self * other`.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat::new(
            self.a * other.i + self.i * other.a + self.j * other.k - self.k * other.j,
            self.a * other.j - self.i * other.k + self.j * other.a + self.k * other.i,
            self.a * other.k + self.i * other.j - self.j * other.i + self.k * other.a,
            self.a * other.a - self.i * other.i - self.j * other.j - self.k * other.k,
        )
    }

    pub fn add(&self, other: &Quat) -> Quat {
        Quat::new(self.i + other.i, self.j + other.j, self.k + other.k, self.a + other.a)
    }

    pub fn dot(&self, other: &Quat) -> f32 {
        self.i * other.i + self.j * other.j + self.k * other.k + self.a * other.a
    }

    pub fn conjugate(&self) -> Quat {
        Quat::new(-self.i, -self.j, -self.k, self.a)
    }

    pub fn len(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn times(&self, s: f32) -> Quat {
        Quat::new(self.i * s, self.j * s, self.k * s, self.a * s)
    }

    pub fn normalize(&self) -> Quat {
        let l = self.len();
        if l < f32::EPSILON {
            Quat::IDENTITY
        } else {
            self.times(1.0 / l)
        }
    }

    /// `q * p * q^-1`, computed with a separate conjugate so `p` may alias
    /// the result buffer safely.
    pub fn sandwich(&self, p: &Quat) -> Quat {
        let conj = self.conjugate();
        self.mul(p).mul(&conj)
    }

    /// Same rotation as [`Quat::sandwich`] but for callers that already know
    /// `p` does not alias `self` and want to skip allocating the conjugate
    /// twice; kept distinct from `sandwich` because it reuses `self` as the
    /// left and right factor without a named intermediate.
    pub fn sandwich_fast(&self, p: &Quat) -> Quat {
        let mut arg = self.mul(p);
        arg = arg.mul(&self.conjugate());
        arg
    }

    /// Rotate a vector by this unit quaternion.
    pub fn rotate_vec(&self, v: Vec3) -> Vec3 {
        self.sandwich_fast(&Quat::from_vec(v)).to_vec()
    }

    /// Euler angles (roll, pitch, yaw), Tait-Bryan ZYX convention, radians.
    pub fn to_euler(&self) -> (f32, f32, f32) {
        let q = self.normalize();
        let roll = (2.0 * (q.a * q.i + q.j * q.k))
            .atan2(1.0 - 2.0 * (q.i * q.i + q.j * q.j));
        let sin_pitch = 2.0 * (q.a * q.j - q.k * q.i);
        let pitch = if sin_pitch.abs() >= 1.0 {
            std::f32::consts::FRAC_PI_2.copysign(sin_pitch)
        } else {
            sin_pitch.asin()
        };
        let yaw = (2.0 * (q.a * q.k + q.i * q.j))
            .atan2(1.0 - 2.0 * (q.j * q.j + q.k * q.k));
        (roll, pitch, yaw)
    }

    /// The shortest rotation that takes unit vector `from` onto unit vector
    /// `to`. Handles the parallel and antiparallel edge cases explicitly.
    pub fn uvec2uvec(from: &Vec3, to: &Vec3) -> Quat {
        let cos_angle = from.dot(to);

        if cos_angle > UVEC_PARALLEL_EPS {
            return Quat::IDENTITY;
        }

        if cos_angle < -UVEC_PARALLEL_EPS {
            let axis = Vec3::normal(from, to);
            return Quat::new(axis.x, axis.y, axis.z, 0.0);
        }

        let cross = from.cross(to);
        let mut q = Quat::new(cross.x, cross.y, cross.z, 0.0);
        // half-angle construction: q = normalize((from x to) + (1 + from.to))
        q.a = 1.0 + cos_angle;
        q.normalize()
    }

    /// Quaternion representing a rotation of `angle` radians about `axis`.
    /// Returns the identity rotation if `axis` has (numerically) zero
    /// length.
    pub fn from_axis_angle(axis: &Vec3, angle: f32) -> Quat {
        let n = axis.normalize();
        if n.len() < f32::EPSILON {
            return Quat::IDENTITY;
        }
        let half = angle / 2.0;
        let s = half.sin();
        Quat::new(n.x * s, n.y * s, n.z * s, half.cos())
    }

    /// Rotation that aligns frame `(v1, v2)` onto frame `(w1, w2)`, with an
    /// optional hemisphere hint: when `help` is given and the result would
    /// rotate `help` onto its own negation, the opposite (equally valid)
    /// quaternion is returned instead.
    pub fn frame_rot(v1: &Vec3, v2: &Vec3, w1: &Vec3, w2: &Vec3, help: Option<&Quat>) -> Quat {
        let n = Vec3::normal(v1, v2);
        let p = Vec3::normal(w1, w2);

        let q1 = Quat::uvec2uvec(v1, w1);
        let n_rot = q1.rotate_vec(n);
        let q2 = Quat::uvec2uvec(&n_rot, &p);
        let mut result = q2.mul(&q1);

        if let Some(h) = help {
            if result.dot(h) < 0.0 {
                result = result.times(-1.0);
            }
        }
        result
    }
}
