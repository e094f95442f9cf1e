//! Motor PWM output boundary. The real device is one file per motor where
//! writing `"<int>\n"` sets PWM counts — out of scope here, so this module
//! only defines the trait contract and a logging stand-in, the same role
//! `SensorSource`'s mock plays for input.

use crate::error::{EstimatorError, Result};
use log::{info, warn};

const DISARM_RETRIES: u32 = 10;

/// Maps a throttle fraction in `[0, 1]` to raw PWM counts.
pub fn throttle_to_counts(throttle: f32) -> f32 {
    (throttle + 1.0) * 100_000.0
}

pub trait PwmSink: Send + Sync {
    fn write_throttle(&self, motor: usize, throttle: f32) -> Result<()>;

    /// Writes zero throttle to every motor, retrying up to
    /// [`DISARM_RETRIES`] times before giving up.
    fn disarm(&self, num_motors: usize) -> Result<()> {
        for motor in 0..num_motors {
            let mut last_err = None;
            for _ in 0..DISARM_RETRIES {
                match self.write_throttle(motor, 0.0) {
                    Ok(()) => {
                        last_err = None;
                        break;
                    }
                    Err(e) => last_err = Some(e),
                }
            }
            if let Some(e) = last_err {
                return Err(EstimatorError::ActuatorWrite(format!(
                    "motor {motor} failed to disarm after {DISARM_RETRIES} retries: {e}"
                )));
            }
        }
        Ok(())
    }
}

/// Logs what it would have written instead of touching real hardware.
pub struct LoggingPwmSink;

impl PwmSink for LoggingPwmSink {
    fn write_throttle(&self, motor: usize, throttle: f32) -> Result<()> {
        let counts = throttle_to_counts(throttle);
        info!("motor {motor}: throttle {throttle:.3} -> {counts:.0} counts");
        if !(0.0..=1.0).contains(&throttle) {
            warn!("motor {motor}: throttle {throttle} outside [0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn throttle_to_counts_matches_formula() {
        assert_relative_eq!(throttle_to_counts(0.0), 100_000.0, epsilon = 1e-3);
        assert_relative_eq!(throttle_to_counts(1.0), 200_000.0, epsilon = 1e-3);
        assert_relative_eq!(throttle_to_counts(0.5), 150_000.0, epsilon = 1e-3);
    }

    #[test]
    fn disarm_writes_zero_to_every_motor() {
        let sink = LoggingPwmSink;
        assert!(sink.disarm(4).is_ok());
    }
}
