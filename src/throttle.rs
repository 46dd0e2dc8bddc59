//! Throttle values and the PID-output-to-throttle mapping.
//!
//! An H-bridge has three distinct states, and [`Throttle`] names each one
//! explicitly instead of overloading `0.0` or a null:
//!
//! | Variant | Bridge | Motor |
//! |---------|--------|-------|
//! | [`Throttle::Drive`] | PWM on one leg | driven forward (+) or reverse (-) |
//! | [`Throttle::Brake`] | both legs high | shorted, actively braked |
//! | [`Throttle::Coast`] | both legs released | free spinning |
//!
//! [`OutputMapper`] turns a controller output into a bounded throttle:
//!
//! - [`ControlMode::Position`]: the PID output is a velocity command,
//!   `throttle = clamp(output / speed_scale, -1, 1)`
//! - [`ControlMode::Velocity`]: the PID output is an acceleration and the
//!   throttle integrates it,
//!   `throttle = clamp(previous + output * dt / speed_scale, -1, 1)`
//!
//! The velocity-mode integrator stacks on top of the controller's own
//! integral term. Throttle is the integral of commanded acceleration.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{ControlMode, OutputMapper, Throttle};
//!
//! let mapper = OutputMapper::new(ControlMode::Velocity, 5.4, 0.01).unwrap();
//! let next = mapper.map(5.4, Throttle::Brake);
//! assert!((next.value().unwrap() - 0.01).abs() < 1e-6);
//! ```

use crate::error::{positive, ConfigError};

/// Tri-state actuator command.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Throttle {
    /// Signed drive magnitude in `[-1.0, 1.0]`, never zero.
    Drive(f32),
    /// Active brake (zero throttle).
    #[default]
    Brake,
    /// Both bridge legs released; the motor spins freely.
    Coast,
}

impl Throttle {
    /// Build a drive command, clamping to `[-1, 1]`.
    ///
    /// Zero (and NaN) become [`Throttle::Brake`].
    ///
    /// ```
    /// use rs_motorctl::Throttle;
    ///
    /// assert_eq!(Throttle::drive(0.5), Throttle::Drive(0.5));
    /// assert_eq!(Throttle::drive(3.0), Throttle::Drive(1.0));
    /// assert_eq!(Throttle::drive(-3.0), Throttle::Drive(-1.0));
    /// assert_eq!(Throttle::drive(0.0), Throttle::Brake);
    /// ```
    pub fn drive(value: f32) -> Self {
        let clamped = value.clamp(-1.0, 1.0);
        if clamped == 0.0 || clamped.is_nan() {
            Throttle::Brake
        } else {
            Throttle::Drive(clamped)
        }
    }

    /// Signed magnitude, `Some(0.0)` for brake, `None` for coast.
    #[inline]
    pub fn value(&self) -> Option<f32> {
        match self {
            Throttle::Drive(v) => Some(*v),
            Throttle::Brake => Some(0.0),
            Throttle::Coast => None,
        }
    }

    /// Magnitude used as the integrator start in velocity mode.
    ///
    /// A coasting motor integrates from zero.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.value().unwrap_or(0.0)
    }

    /// The same command with direction flipped, for reversed wiring.
    #[inline]
    pub fn inverted(self) -> Self {
        match self {
            Throttle::Drive(v) => Throttle::Drive(-v),
            other => other,
        }
    }

    /// Scale a drive magnitude, keeping brake and coast untouched.
    #[inline]
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Throttle::Drive(v) => Throttle::drive(v * factor),
            other => other,
        }
    }

    /// Returns true for [`Throttle::Coast`].
    #[inline]
    pub fn is_coast(&self) -> bool {
        matches!(self, Throttle::Coast)
    }
}

/// How the bridge recirculates current during the PWM off-phase.
///
/// Slow decay gives a lower spin threshold and better speed-to-throttle
/// linearity. Fast decay is what most drivers do when unconfigured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DecayMode {
    /// Off-phase releases the bridge (coast between pulses).
    Fast,
    /// Off-phase shorts the motor (brake between pulses).
    #[default]
    Slow,
}

impl DecayMode {
    /// Returns the mode as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DecayMode::Fast => "fast",
            DecayMode::Slow => "slow",
        }
    }
}

/// What the PID output means to the actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ControlMode {
    /// Position loop: output is a velocity, mapped directly.
    Position,
    /// Velocity loop: output is an acceleration, integrated into throttle.
    Velocity,
}

/// Maps controller output to a bounded [`Throttle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputMapper {
    mode: ControlMode,
    speed_scale: f32,
    sample_period: f32,
}

impl OutputMapper {
    /// Create a mapper.
    ///
    /// `speed_scale` is the motor's real-world speed at full throttle, in the
    /// same units as the PID output (e.g. revolutions per second).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] unless `speed_scale` and `sample_period` are
    /// finite and positive.
    pub fn new(
        mode: ControlMode,
        speed_scale: f32,
        sample_period: f32,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            mode,
            speed_scale: positive(speed_scale, ConfigError::InvalidSpeedScale)?,
            sample_period: positive(sample_period, ConfigError::InvalidSamplePeriod)?,
        })
    }

    /// Map a PID output to the next throttle.
    ///
    /// `previous` is only consulted in velocity mode. The result always lies
    /// in `[-1, 1]` or is [`Throttle::Brake`].
    pub fn map(&self, pid_output: f32, previous: Throttle) -> Throttle {
        let raw = match self.mode {
            ControlMode::Position => pid_output / self.speed_scale,
            ControlMode::Velocity => {
                previous.as_f32() + (pid_output * self.sample_period) / self.speed_scale
            }
        };
        Throttle::drive(raw)
    }

    /// The configured control mode.
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// The configured speed scale.
    pub fn speed_scale(&self) -> f32 {
        self.speed_scale
    }

    /// The configured sample period in seconds.
    pub fn sample_period(&self) -> f32 {
        self.sample_period
    }
}
