//! Typed calibration entities and their section-decoding rules.

use super::parser::{parse_sections, write_sections, Section};
use crate::linalg::Quat;
use log::warn;

pub const NUM_MOTORS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct MagIronCalib {
    pub soft: [[f32; 3]; 3],
    pub hard: [f32; 3],
}

impl Default for MagIronCalib {
    fn default() -> Self {
        MagIronCalib {
            soft: [
                [0.9409439, 0.09766692, -0.01307758],
                [0.09766692, 1.01364504, -0.01144832],
                [-0.01307758, -0.01144832, 1.0593312],
            ],
            hard: [42.475, 1084.2, -111.58],
        }
    }
}

/// `(a, b, c)` quadratic coefficients per motor, per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MagMotorCalib {
    pub coeffs: [[(f32, f32, f32); 3]; NUM_MOTORS],
}

impl Default for MagMotorCalib {
    fn default() -> Self {
        MagMotorCalib { coeffs: [[(0.0, 0.0, 0.0); 3]; NUM_MOTORS] }
    }
}

/// Affine throttle-command -> PWM mapping, `(slope, offset)` per motor.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorLinCalib {
    pub coeffs: [(f32, f32); NUM_MOTORS],
}

impl Default for MotorLinCalib {
    fn default() -> Self {
        MotorLinCalib {
            coeffs: [(0.9686, 0.034796), (1.0314, 0.085204), (1.003427, 0.142546), (0.996573, 0.137454)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccOrthoCalib {
    pub ortho: [[f32; 3]; 3],
    pub offset: [f32; 3],
    pub quat: Quat,
    /// Axis the output slot reads from, 0-indexed (default identity `[0,1,2]`).
    pub swap_order: [usize; 3],
    pub invert: [bool; 3],
}

impl Default for AccOrthoCalib {
    fn default() -> Self {
        AccOrthoCalib {
            ortho: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0, 0.0, 0.0],
            quat: Quat::IDENTITY,
            swap_order: [0, 1, 2],
            invert: [false, false, false],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationStore {
    pub mag_iron: MagIronCalib,
    pub mag_motor: MagMotorCalib,
    pub motor_lin: MotorLinCalib,
    pub acc_ortho: AccOrthoCalib,
}

const AXES: [char; 3] = ['x', 'y', 'z'];
const PARAMS: [char; 3] = ['a', 'b', 'c'];

fn digit(c: char) -> Option<usize> {
    c.to_digit(10).map(|d| d as usize)
}

fn decode_magiron(section: &Section) -> Option<MagIronCalib> {
    let mut cal = MagIronCalib::default();
    for (name, value) in section {
        let mut chars = name.chars();
        match chars.next()? {
            's' => {
                let r = digit(chars.next()?)?;
                let c = digit(chars.next()?)?;
                if r >= 3 || c >= 3 {
                    return None;
                }
                cal.soft[r][c] = *value;
            }
            'h' => {
                let r = digit(chars.next()?)?;
                let c = digit(chars.next()?)?;
                if r >= 3 || c != 0 {
                    return None;
                }
                cal.hard[r] = *value;
            }
            _ => return None,
        }
    }
    Some(cal)
}

fn decode_magmot(section: &Section) -> Option<MagMotorCalib> {
    let mut cal = MagMotorCalib::default();
    for (name, value) in section {
        let mut chars = name.chars();
        if chars.next()? != 'm' {
            return None;
        }
        let motor = digit(chars.next()?)?;
        if motor >= NUM_MOTORS {
            return None;
        }
        let axis_ch = chars.next()?;
        let axis = AXES.iter().position(|&a| a == axis_ch)?;
        let param_ch = chars.next()?;
        let param = PARAMS.iter().position(|&p| p == param_ch)?;
        let slot = &mut cal.coeffs[motor][axis];
        match param {
            0 => slot.0 = *value,
            1 => slot.1 = *value,
            _ => slot.2 = *value,
        }
    }
    Some(cal)
}

fn decode_motlin(section: &Section) -> Option<MotorLinCalib> {
    let mut cal = MotorLinCalib::default();
    for (name, value) in section {
        let mut chars = name.chars();
        if chars.next()? != 'm' {
            return None;
        }
        let motor = digit(chars.next()?)?;
        if motor >= NUM_MOTORS {
            return None;
        }
        match chars.next()? {
            'a' => cal.coeffs[motor].0 = *value,
            'b' => cal.coeffs[motor].1 = *value,
            _ => return None,
        }
    }
    Some(cal)
}

fn decode_accorth(section: &Section) -> Option<AccOrthoCalib> {
    let mut cal = AccOrthoCalib::default();
    let mut quat = [0.0f32; 4];
    for (name, value) in section {
        let mut chars = name.chars();
        match chars.next()? {
            'o' => {
                let r = digit(chars.next()?)?;
                let c = digit(chars.next()?)?;
                if r >= 3 || c >= 3 {
                    return None;
                }
                cal.ortho[r][c] = *value;
            }
            'h' => {
                let r = digit(chars.next()?)?;
                let c = digit(chars.next()?)?;
                if r >= 3 || c != 0 {
                    return None;
                }
                cal.offset[r] = *value;
            }
            'q' => {
                let idx = digit(chars.next()?)?;
                if idx >= 4 {
                    return None;
                }
                quat[idx] = *value;
            }
            's' => {
                // "ss<axis>" swap-sign, "so" swap-order
                if chars.next()? != 's' {
                    return None;
                }
                match chars.next() {
                    Some(axis_ch) => {
                        let axis = digit(axis_ch)?;
                        if axis >= 3 {
                            return None;
                        }
                        cal.invert[axis] = *value != 0.0;
                    }
                    None => {
                        // "so": three-digit base-1 permutation, e.g. 123 = identity
                        let encoded = *value as i32;
                        if !(1..=9).contains(&(encoded % 10))
                            || encoded < 100
                            || encoded > 999
                        {
                            return None;
                        }
                        let digits = [encoded / 100, (encoded / 10) % 10, encoded % 10];
                        for (slot, d) in cal.swap_order.iter_mut().zip(digits.iter()) {
                            if !(1..=3).contains(d) {
                                return None;
                            }
                            *slot = (*d - 1) as usize;
                        }
                    }
                }
            }
            _ => return None,
        }
    }
    cal.quat = Quat::new(quat[0], quat[1], quat[2], quat[3]).normalize();

    let quat_len_err = (1.0 - Quat::new(quat[0], quat[1], quat[2], quat[3]).len()).abs();
    if quat_len_err > 1.0e-3 {
        return None;
    }
    if cal.ortho[0][0] < 0.0 || cal.ortho[1][1] < 0.0 || cal.ortho[2][2] < 0.0 {
        return None;
    }
    Some(cal)
}

impl CalibrationStore {
    /// Parses `text` into a store, falling back section-by-section to
    /// built-in defaults (with a `log::warn!`) whenever a tag is missing,
    /// unrecognized, or its parameters fail validation.
    pub fn parse(text: &str) -> CalibrationStore {
        let sections = parse_sections(text);
        let mut store = CalibrationStore::default();

        let mut found_magiron = false;
        let mut found_magmot = false;
        let mut found_motlin = false;
        let mut found_accorth = false;

        for (tag, section) in &sections {
            match tag.as_str() {
                "magiron" => {
                    found_magiron = true;
                    match decode_magiron(section) {
                        Some(cal) => store.mag_iron = cal,
                        None => warn!("magiron calibration malformed, using defaults"),
                    }
                }
                "magmot" => {
                    found_magmot = true;
                    match decode_magmot(section) {
                        Some(cal) => store.mag_motor = cal,
                        None => warn!("magmot calibration malformed, using defaults"),
                    }
                }
                "motlin" => {
                    found_motlin = true;
                    match decode_motlin(section) {
                        Some(cal) => store.motor_lin = cal,
                        None => warn!("motlin calibration malformed, using defaults"),
                    }
                }
                "accorth" => {
                    found_accorth = true;
                    match decode_accorth(section) {
                        Some(cal) => store.acc_ortho = cal,
                        None => warn!("accorth calibration malformed or failed post-conditions, using defaults"),
                    }
                }
                other => warn!("unknown calibration tag '{other}', skipping"),
            }
        }

        if !found_magiron {
            warn!("no magiron calibration section, going default");
        }
        if !found_magmot {
            warn!("no magmot calibration section, going default");
        }
        if !found_motlin {
            warn!("no motlin calibration section, going default");
        }
        if !found_accorth {
            warn!("no accorth calibration section, going default");
        }

        store
    }

    pub fn write_to_string(&self) -> String {
        let mut magiron = Section::new();
        for r in 0..3 {
            for c in 0..3 {
                magiron.insert(format!("s{r}{c}"), self.mag_iron.soft[r][c]);
            }
            magiron.insert(format!("h{r}0"), self.mag_iron.hard[r]);
        }

        let mut magmot = Section::new();
        for motor in 0..NUM_MOTORS {
            for (axis_idx, axis_ch) in AXES.iter().enumerate() {
                let (a, b, c) = self.mag_motor.coeffs[motor][axis_idx];
                magmot.insert(format!("m{motor}{axis_ch}a"), a);
                magmot.insert(format!("m{motor}{axis_ch}b"), b);
                magmot.insert(format!("m{motor}{axis_ch}c"), c);
            }
        }

        let mut motlin = Section::new();
        for motor in 0..NUM_MOTORS {
            let (a, b) = self.motor_lin.coeffs[motor];
            motlin.insert(format!("m{motor}a"), a);
            motlin.insert(format!("m{motor}b"), b);
        }

        let mut accorth = Section::new();
        for r in 0..3 {
            for c in 0..3 {
                accorth.insert(format!("o{r}{c}"), self.acc_ortho.ortho[r][c]);
            }
            accorth.insert(format!("h{r}0"), self.acc_ortho.offset[r]);
            accorth.insert(format!("ss{r}"), if self.acc_ortho.invert[r] { 1.0 } else { 0.0 });
        }
        accorth.insert("q0".into(), self.acc_ortho.quat.i);
        accorth.insert("q1".into(), self.acc_ortho.quat.j);
        accorth.insert("q2".into(), self.acc_ortho.quat.k);
        accorth.insert("q3".into(), self.acc_ortho.quat.a);
        let so_value = 100 * (self.acc_ortho.swap_order[0] + 1)
            + 10 * (self.acc_ortho.swap_order[1] + 1)
            + (self.acc_ortho.swap_order[2] + 1);
        accorth.insert("so".into(), so_value as f32);

        write_sections(&[
            ("magiron".to_string(), magiron),
            ("magmot".to_string(), magmot),
            ("motlin".to_string(), motlin),
            ("accorth".to_string(), accorth),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_empty() {
        let store = CalibrationStore::parse("");
        assert_eq!(store, CalibrationStore::default());
    }

    #[test]
    fn parses_magiron_section() {
        let text = "@magiron\ns00 2.0\nh00 1.5\n";
        let store = CalibrationStore::parse(text);
        assert_eq!(store.mag_iron.soft[0][0], 2.0);
        assert_eq!(store.mag_iron.hard[0], 1.5);
    }

    #[test]
    fn parses_magmot_section() {
        let text = "@magmot\nm2ya 1.0\nm2yb 2.0\nm2yc 3.0\n";
        let store = CalibrationStore::parse(text);
        assert_eq!(store.mag_motor.coeffs[2][1], (1.0, 2.0, 3.0));
    }

    #[test]
    fn accorth_rejects_non_unit_quaternion() {
        let text = "@accorth\nq0 5.0\nq1 0.0\nq2 0.0\nq3 0.0\n";
        let store = CalibrationStore::parse(text);
        // falls back to identity default since ||q|| far from 1
        assert_eq!(store.acc_ortho.quat, Quat::IDENTITY);
    }

    #[test]
    fn accorth_rejects_negative_diagonal() {
        let text = "@accorth\no00 -1.0\nq0 0.0\nq1 0.0\nq2 0.0\nq3 1.0\n";
        let store = CalibrationStore::parse(text);
        assert_eq!(store.acc_ortho, AccOrthoCalib::default());
    }

    #[test]
    fn truncated_magiron_falls_back_while_magmot_still_reads() {
        let text = "@magiron\ns0\n@magmot\nm1xa 4.0\n";
        let store = CalibrationStore::parse(text);
        assert_eq!(store.mag_iron, MagIronCalib::default());
        assert_eq!(store.mag_motor.coeffs[1][0].0, 4.0);
    }

    #[test]
    fn write_then_parse_roundtrips() {
        let mut store = CalibrationStore::default();
        store.mag_iron.hard[1] = 7.0;
        store.mag_motor.coeffs[0][0] = (1.0, 2.0, 3.0);
        let text = store.write_to_string();
        let reparsed = CalibrationStore::parse(&text);
        assert_eq!(reparsed.mag_iron.hard[1], 7.0);
        assert_eq!(reparsed.mag_motor.coeffs[0][0], (1.0, 2.0, 3.0));
    }
}
