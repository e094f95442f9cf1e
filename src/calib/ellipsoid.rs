//! Magnetometer hard/soft-iron ellipsoid fit (`magiron`).
//!
//! Fits `||S(x - h)|| = 1` over a set of magnetometer samples taken while
//! rotating through many orientations, using the generic LM solver.

use crate::lma::{lma_fit, LmaProblem, LmaResult};
use crate::linalg::Vec3;

pub struct EllipsoidFit {
    samples: Vec<Vec3>,
}

impl EllipsoidFit {
    pub fn new(samples: Vec<Vec3>) -> Self {
        EllipsoidFit { samples }
    }
}

/// Unpacks a 12-parameter vector into `(S, h)`: `S` row-major, 9 entries,
/// followed by the 3 components of `h`.
fn unpack(params: &[f32]) -> ([[f32; 3]; 3], [f32; 3]) {
    let mut s = [[0.0f32; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            s[r][c] = params[r * 3 + c];
        }
    }
    let h = [params[9], params[10], params[11]];
    (s, h)
}

fn apply(s: &[[f32; 3]; 3], h: &[f32; 3], x: &Vec3) -> Vec3 {
    let d = [x.x - h[0], x.y - h[1], x.z - h[2]];
    Vec3::new(
        s[0][0] * d[0] + s[0][1] * d[1] + s[0][2] * d[2],
        s[1][0] * d[0] + s[1][1] * d[1] + s[1][2] * d[2],
        s[2][0] * d[0] + s[2][1] * d[1] + s[2][2] * d[2],
    )
}

impl LmaProblem for EllipsoidFit {
    fn nparams(&self) -> usize {
        12
    }

    fn nsamples(&self) -> usize {
        self.samples.len()
    }

    fn residual(&self, params: &[f32], sample: usize) -> f32 {
        let (s, h) = unpack(params);
        apply(&s, &h, &self.samples[sample]).len() - 1.0
    }

    fn initial_guess(&self) -> Vec<f32> {
        let mut guess = vec![0.0f32; 12];
        guess[0] = 1.0;
        guess[4] = 1.0;
        guess[8] = 1.0;
        guess
    }
}

/// Runs the fit and returns `(soft, hard)` matrices suitable for
/// [`crate::calib::store::MagIronCalib`].
pub fn fit_mag_iron(samples: Vec<Vec3>) -> Option<([[f32; 3]; 3], [f32; 3])> {
    let problem = EllipsoidFit::new(samples);
    let LmaResult { params, .. } = lma_fit(&problem, 200, 1.0e-8).ok()?;
    Some(unpack(&params))
}
