//! 3D vector arithmetic used throughout the estimator.

use serde::{Deserialize, Serialize};

/// A column vector in R^3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UNIT_X: Vec3 = Vec3 { x: 1.0, y: 0.0, z: 0.0 };
    pub const UNIT_Z: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn len(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns `self` scaled to unit length, or the zero vector if `self` is
    /// (numerically) zero.
    pub fn normalize(&self) -> Vec3 {
        let l = self.len();
        if l < f32::EPSILON {
            Vec3::ZERO
        } else {
            self.scale(1.0 / l)
        }
    }

    /// A vector perpendicular to both `a` and `b`, with a deterministic
    /// fallback when `a` and `b` are (anti)parallel: try `a x (1,0,0)`, then
    /// `a x (0,0,1)`, giving up and returning zero only if `a` itself is
    /// zero.
    pub fn normal(a: &Vec3, b: &Vec3) -> Vec3 {
        let n = a.cross(b);
        if n.len() > f32::EPSILON {
            return n.normalize();
        }

        let longer = if a.len() >= b.len() { a } else { b };
        let n = longer.cross(&Vec3::UNIT_X);
        if n.len() > f32::EPSILON {
            return n.normalize();
        }

        let n = longer.cross(&Vec3::UNIT_Z);
        if n.len() > f32::EPSILON {
            n.normalize()
        } else {
            Vec3::ZERO
        }
    }
}
