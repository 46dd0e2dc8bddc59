//! Configuration errors.
//!
//! Everything that can be wrong with a controller is caught at construction.
//! Nothing in the per-tick path returns a [`ConfigError`]; values are never
//! silently clamped into range.

use thiserror::Error;

/// A rejected configuration value.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Sample period must be finite and strictly positive.
    #[error("sample period must be finite and > 0, got {0}")]
    InvalidSamplePeriod(f32),

    /// A PID gain was NaN or infinite.
    #[error("gain {name} must be finite, got {value}")]
    NonFiniteGain {
        /// Which gain (`"kp"`, `"ki"` or `"kd"`).
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Integral clamp must be finite and strictly positive.
    #[error("integral limit must be finite and > 0, got {0}")]
    InvalidIntegralLimit(f32),

    /// Counts per revolution must be finite and strictly positive.
    #[error("counts per revolution must be finite and > 0, got {0}")]
    InvalidCountsPerRev(f32),

    /// Speed scale must be finite and strictly positive.
    #[error("speed scale must be finite and > 0, got {0}")]
    InvalidSpeedScale(f32),

    /// Update rate must be at least 1 Hz.
    #[error("update rate must be at least 1 Hz, got {0}")]
    InvalidUpdateRate(u32),

    /// Segment duration must be finite and non-negative.
    #[error("time per move must be finite and >= 0, got {0}")]
    InvalidMoveTime(f32),

    /// Trajectory extent or drive speed must be finite and non-negative.
    #[error("extent must be finite and >= 0, got {0}")]
    InvalidExtent(f32),

    /// A maneuver or throttle script has no steps.
    #[error("sequence must contain at least one step")]
    EmptySequence,

    /// A wheel layout names an axis that does not exist or names one twice.
    #[error("wheel layout index {0} is out of range or duplicated")]
    InvalidWheelIndex(usize),
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn positive(value: f32, err: fn(f32) -> ConfigError) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(err(value))
    }
}
