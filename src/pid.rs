//! Proportional-integral-derivative controller.
//!
//! [`PidController`] is the per-axis feedback law. It is deliberately simple:
//!
//! ```text
//! error      = setpoint - measured
//! error_sum += error * dt
//! rate       = (measured - last_measured) / dt
//! output     = kp * error + ki * error_sum - kd * rate
//! ```
//!
//! The derivative acts on the measurement rather than on the error, so a
//! setpoint jump produces no derivative kick. The integral is unbounded unless
//! an integral limit is configured. The output is not bounded here; the
//! [`OutputMapper`](crate::OutputMapper) owns actuator limits.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{PidController, PidGains};
//!
//! let mut pid = PidController::new(PidGains::new(0.14, 0.0, 0.0022), 0.01).unwrap();
//! pid.setpoint = 90.0;
//!
//! let velocity = pid.calculate(0.0);
//! assert!(velocity > 0.0);
//! ```

use crate::error::{positive, ConfigError};

/// Proportional, integral and derivative gains.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain.
    pub kd: f32,
}

impl PidGains {
    /// Create a gain set.
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Rejects NaN and infinite gains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteGain { name, value });
            }
        }
        Ok(())
    }
}

/// Stateful PID controller with a fixed sample period.
///
/// One instance per controlled axis. The owner writes [`setpoint`](Self::setpoint)
/// every tick (usually from a [`Trajectory`](crate::Trajectory)) and then calls
/// [`calculate`](Self::calculate) with the fresh measurement.
///
/// `calculate` is not idempotent: every call advances the integral and the
/// derivative history.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    /// Target value for the controlled quantity.
    pub setpoint: f32,
    error_sum: f32,
    last_value: f32,
    sample_period: f32,
    integral_limit: Option<f32>,
}

impl PidController {
    /// Creates a controller with an unbounded integral.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a gain is not finite or the sample period is
    /// not finite and positive.
    pub fn new(gains: PidGains, sample_period: f32) -> Result<Self, ConfigError> {
        gains.validate()?;
        let sample_period = positive(sample_period, ConfigError::InvalidSamplePeriod)?;
        Ok(Self {
            gains,
            setpoint: 0.0,
            error_sum: 0.0,
            last_value: 0.0,
            sample_period,
            integral_limit: None,
        })
    }

    /// Clamp the integrated error to `±limit` (anti-windup).
    ///
    /// `None` keeps the integral unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIntegralLimit`] unless the limit is finite
    /// and positive.
    pub fn with_integral_limit(mut self, limit: Option<f32>) -> Result<Self, ConfigError> {
        self.integral_limit = match limit {
            Some(l) => Some(positive(l, ConfigError::InvalidIntegralLimit)?),
            None => None,
        };
        Ok(self)
    }

    /// Run one control step against a new measurement.
    pub fn calculate(&mut self, value: f32) -> f32 {
        let error = self.setpoint - value;
        self.error_sum += error * self.sample_period;
        if let Some(limit) = self.integral_limit {
            self.error_sum = self.error_sum.clamp(-limit, limit);
        }
        let rate_error = (value - self.last_value) / self.sample_period;
        self.last_value = value;

        (error * self.gains.kp) + (self.error_sum * self.gains.ki) - (rate_error * self.gains.kd)
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.error_sum = 0.0;
        self.last_value = 0.0;
    }

    /// Seed the derivative history with a known measurement.
    ///
    /// Without priming, the first `calculate` sees the jump from `0.0` to the
    /// first measurement as a rate.
    pub fn prime(&mut self, value: f32) {
        self.last_value = value;
    }

    /// The configured gains.
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// The accumulated integral of error.
    pub fn error_sum(&self) -> f32 {
        self.error_sum
    }

    /// The measurement seen by the previous `calculate`.
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    /// Fixed sample period in seconds.
    pub fn sample_period(&self) -> f32 {
        self.sample_period
    }

    /// The anti-windup clamp, if any.
    pub fn integral_limit(&self) -> Option<f32> {
        self.integral_limit
    }
}
