//! Sensor-correction pipeline: static corrections applied inline, dynamic
//! (throttle-dependent) corrections recalculated by a background scheduler.

pub mod scheduler;

use crate::calib::store::{MagIronCalib, MagMotorCalib, NUM_MOTORS};
use crate::linalg::Vec3;
use std::sync::{Mutex, RwLock};

/// `magiron`: `m' = S(m - h)`. Purely static — no runtime state to recalc.
pub struct MagIronCorrection {
    cal: RwLock<MagIronCalib>,
}

impl MagIronCorrection {
    pub fn new(cal: MagIronCalib) -> Self {
        MagIronCorrection { cal: RwLock::new(cal) }
    }

    pub fn apply(&self, mag: Vec3) -> Vec3 {
        let cal = self.cal.read().unwrap();
        let d = [mag.x - cal.hard[0], mag.y - cal.hard[1], mag.z - cal.hard[2]];
        Vec3::new(
            cal.soft[0][0] * d[0] + cal.soft[0][1] * d[1] + cal.soft[0][2] * d[2],
            cal.soft[1][0] * d[0] + cal.soft[1][1] * d[1] + cal.soft[1][2] * d[2],
            cal.soft[2][0] * d[0] + cal.soft[2][1] * d[1] + cal.soft[2][2] * d[2],
        )
    }
}

/// `magmot`: subtracts the motors' modeled magnetic interference from a
/// magnetometer reading. The interference vector is recomputed by
/// [`MagMotorCorrection::recalc`] from the latest throttle snapshot and
/// cached under a mutex so `apply` stays a short, allocation-free critical
/// section.
pub struct MagMotorCorrection {
    cal: MagMotorCalib,
    throttles: Mutex<[f32; NUM_MOTORS]>,
    interference: Mutex<Vec3>,
}

impl MagMotorCorrection {
    pub fn new(cal: MagMotorCalib) -> Self {
        MagMotorCorrection {
            cal,
            throttles: Mutex::new([0.0; NUM_MOTORS]),
            interference: Mutex::new(Vec3::ZERO),
        }
    }

    pub fn set_throttles(&self, throttles: [f32; NUM_MOTORS]) {
        *self.throttles.lock().unwrap() = throttles;
    }

    /// Recomputes the cached interference vector from the current throttle
    /// snapshot. Called by the scheduler at this entry's `delay` cadence.
    pub fn recalc(&self) {
        let throttles = *self.throttles.lock().unwrap();
        let mut total = [0.0f32; 3];
        for motor in 0..NUM_MOTORS {
            let t = throttles[motor];
            for axis in 0..3 {
                let (a, b, c) = self.cal.coeffs[motor][axis];
                total[axis] += a * t * t + b * t + c;
            }
        }
        *self.interference.lock().unwrap() = Vec3::new(total[0], total[1], total[2]);
    }

    pub fn apply(&self, mag: Vec3) -> Vec3 {
        let interference = *self.interference.lock().unwrap();
        mag.sub(&interference)
    }
}

/// Applies the magnetometer static-correction chain in its fixed order:
/// `magiron` first, then `magmot`.
pub struct MagCorrectionPipeline {
    pub mag_iron: MagIronCorrection,
    pub mag_motor: MagMotorCorrection,
}

impl MagCorrectionPipeline {
    pub fn new(mag_iron: MagIronCalib, mag_motor: MagMotorCalib) -> Self {
        MagCorrectionPipeline {
            mag_iron: MagIronCorrection::new(mag_iron),
            mag_motor: MagMotorCorrection::new(mag_motor),
        }
    }

    pub fn apply(&self, mag: Vec3) -> Vec3 {
        let corrected = self.mag_iron.apply(mag);
        self.mag_motor.apply(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magiron_identity_calibration_is_noop() {
        let corr = MagIronCorrection::new(MagIronCalib {
            soft: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            hard: [0.0, 0.0, 0.0],
        });
        let m = Vec3::new(1.0, 2.0, 3.0);
        let out = corr.apply(m);
        assert_eq!(out, m);
    }

    #[test]
    fn magmot_recalc_then_apply_subtracts_interference() {
        let mut cal = MagMotorCalib::default();
        cal.coeffs[0][0] = (0.0, 2.0, 1.0); // axis x: interference = 2*t + 1
        let corr = MagMotorCorrection::new(cal);
        corr.set_throttles([1.0, 0.0, 0.0, 0.0]);
        corr.recalc();
        let out = corr.apply(Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(out.x, 7.0); // 10 - (2*1+1)
        assert_eq!(out.y, 10.0);
    }

    #[test]
    fn pipeline_applies_magiron_before_magmot() {
        let mag_iron = MagIronCalib { soft: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], hard: [1.0, 0.0, 0.0] };
        let mut mag_motor = MagMotorCalib::default();
        mag_motor.coeffs[0][0] = (0.0, 0.0, 1.0); // constant interference of 1 on x
        let pipeline = MagCorrectionPipeline::new(mag_iron, mag_motor);
        pipeline.mag_motor.set_throttles([1.0, 0.0, 0.0, 0.0]);
        pipeline.mag_motor.recalc();
        // raw x=5: magiron -> 5-1=4; magmot -> 4-1=3
        let out = pipeline.apply(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(out.x, 3.0);
    }
}
