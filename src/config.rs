//! Shared configuration for desktop and embedded builds.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Defaults match a 50:1 geared motor
//! with a 12 count magnetic encoder, updated at 100 Hz.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::config::{Config, LoopConfig, MotorConfig, PidConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.motor.counts_per_rev(), 600.0);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_loop(LoopConfig::default().with_updates_per_second(200))
//!     .with_motor(MotorConfig::default().with_gear_ratio(110.0))
//!     .with_position_pid(PidConfig::position().with_integral_limit(Some(50.0)));
//! config.validate().unwrap();
//! ```

use heapless::String as HString;

use crate::axis::Axis;
use crate::drive::{DriveSequence, WheelLayout};
use crate::encoder::{counts_per_rev, EncoderReader, COUNTS_PER_MOTOR_REV};
use crate::error::{positive, ConfigError};
use crate::pid::{PidController, PidGains};
use crate::throttle::{ControlMode, DecayMode, OutputMapper};
use crate::trajectory::{Interpolation, Segment};
use crate::traits::{EncoderSource, MotorSink};

/// Maximum length for short config strings (device and axis names)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating at a character boundary if too long
pub fn short_string(s: &str) -> ShortString {
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut hs = ShortString::new();
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete controller configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Update rate and segment timing
    pub control: LoopConfig,
    /// Motor, gearbox and encoder
    pub motor: MotorConfig,
    /// Gains for position loops
    pub position_pid: PidConfig,
    /// Gains for velocity loops
    pub velocity_pid: PidConfig,
    /// Setpoint generation for position loops (degrees)
    pub position: TrajectoryConfig,
    /// Setpoint generation for velocity loops (revolutions per second)
    pub velocity: TrajectoryConfig,
    /// Four-wheel drive sequence
    pub drive: DriveConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control: LoopConfig::default(),
            motor: MotorConfig::default(),
            position_pid: PidConfig::position(),
            velocity_pid: PidConfig::velocity(),
            position: TrajectoryConfig::position(),
            velocity: TrajectoryConfig::velocity(),
            drive: DriveConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Set loop configuration
    pub fn with_loop(mut self, control: LoopConfig) -> Self {
        self.control = control;
        self
    }

    /// Set motor configuration
    pub fn with_motor(mut self, motor: MotorConfig) -> Self {
        self.motor = motor;
        self
    }

    /// Set position loop gains
    pub fn with_position_pid(mut self, pid: PidConfig) -> Self {
        self.position_pid = pid;
        self
    }

    /// Set velocity loop gains
    pub fn with_velocity_pid(mut self, pid: PidConfig) -> Self {
        self.velocity_pid = pid;
        self
    }

    /// Set position trajectory configuration
    pub fn with_position(mut self, position: TrajectoryConfig) -> Self {
        self.position = position;
        self
    }

    /// Set velocity trajectory configuration
    pub fn with_velocity(mut self, velocity: TrajectoryConfig) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set drive configuration
    pub fn with_drive(mut self, drive: DriveConfig) -> Self {
        self.drive = drive;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Check every value, failing on the first bad one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;
        self.motor.validate()?;
        self.position_pid.validate()?;
        self.velocity_pid.validate()?;
        self.position.validate()?;
        self.velocity.validate()?;
        self.drive.validate()
    }

    /// Gains for the given loop type.
    pub fn pid(&self, mode: ControlMode) -> &PidConfig {
        match mode {
            ControlMode::Position => &self.position_pid,
            ControlMode::Velocity => &self.velocity_pid,
        }
    }

    /// Trajectory settings for the given loop type.
    pub fn trajectory(&self, mode: ControlMode) -> &TrajectoryConfig {
        match mode {
            ControlMode::Position => &self.position,
            ControlMode::Velocity => &self.velocity,
        }
    }

    /// Assemble a fully configured [`Axis`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the loop, motor or gain settings are invalid.
    pub fn axis<E: EncoderSource, M: MotorSink>(
        &self,
        name: &str,
        mode: ControlMode,
        encoder: E,
        motor: M,
    ) -> Result<Axis<E, M>, ConfigError> {
        self.control.validate()?;
        let dt = self.control.sample_period();
        let reader = EncoderReader::new(encoder, self.motor.counts_per_rev())?
            .reversed(self.motor.encoder_reversed);
        let pid = self.pid(mode).build(dt)?;
        let mapper = OutputMapper::new(mode, self.motor.speed_scale, dt)?;
        Ok(Axis::new(name, reader, pid, mapper, motor)
            .with_motor_reversed(self.motor.reversed)
            .with_decay(self.motor.decay_mode))
    }

    /// Parse a JSON tuning file. Missing fields keep their defaults.
    ///
    /// ```rust
    /// use rs_motorctl::config::Config;
    ///
    /// let json = br#"{"control": {"updates_per_second": 50}, "velocity_pid": {"kp": 25.0}}"#;
    /// let config = Config::from_json(json).unwrap();
    /// assert_eq!(config.control.updates_per_second, 50);
    /// assert_eq!(config.velocity_pid.kp, 25.0);
    /// assert_eq!(config.motor.speed_scale, 5.4);
    /// ```
    #[cfg(feature = "serde-json-core")]
    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        let (config, _) =
            serde_json_core::from_slice::<Config>(bytes).map_err(LoadError::Parse)?;
        config.validate().map_err(LoadError::Invalid)?;
        Ok(config)
    }
}

/// Failure to load a JSON configuration.
#[cfg(feature = "serde-json-core")]
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document is not valid JSON for [`Config`].
    #[error("config parse error: {0}")]
    Parse(serde_json_core::de::Error),
    /// The document parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(ConfigError),
}

// ============================================================================
// Loop Config
// ============================================================================

/// Control loop timing
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopConfig {
    /// Control updates per second
    pub updates_per_second: u32,
    /// Seconds per trajectory segment or drive maneuver
    pub time_per_move_s: f32,
    /// Emit per-axis telemetry every this many ticks
    pub telemetry_divider: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            updates_per_second: 100,
            time_per_move_s: 1.0,
            telemetry_divider: 4,
        }
    }
}

impl LoopConfig {
    /// Set the update rate
    pub fn with_updates_per_second(mut self, rate: u32) -> Self {
        self.updates_per_second = rate;
        self
    }

    /// Set the segment duration
    pub fn with_time_per_move_s(mut self, seconds: f32) -> Self {
        self.time_per_move_s = seconds;
        self
    }

    /// Set the telemetry divider
    pub fn with_telemetry_divider(mut self, divider: u32) -> Self {
        self.telemetry_divider = divider;
        self
    }

    /// Seconds between updates.
    pub fn sample_period(&self) -> f32 {
        1.0 / self.updates_per_second as f32
    }

    /// Updates in one segment, rounded to the nearest whole update.
    pub fn updates_per_move(&self) -> u32 {
        (self.time_per_move_s * self.updates_per_second as f32 + 0.5) as u32
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.updates_per_second == 0 {
            return Err(ConfigError::InvalidUpdateRate(self.updates_per_second));
        }
        if !self.time_per_move_s.is_finite() || self.time_per_move_s < 0.0 {
            return Err(ConfigError::InvalidMoveTime(self.time_per_move_s));
        }
        Ok(())
    }
}

// ============================================================================
// Motor Config
// ============================================================================

/// Motor, gearbox and encoder description
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotorConfig {
    /// Gearbox reduction between motor and output shaft
    pub gear_ratio: f32,
    /// Encoder counts per motor shaft revolution
    pub counts_per_motor_rev: f32,
    /// Output shaft speed at full throttle (revolutions per second)
    pub speed_scale: f32,
    /// Bridge decay mode
    pub decay_mode: DecayMode,
    /// PWM frequency; above the audible range by default
    pub pwm_frequency_hz: u32,
    /// Motor wired with its legs swapped
    pub reversed: bool,
    /// Encoder wired with its channels swapped
    pub encoder_reversed: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            gear_ratio: 50.0,
            counts_per_motor_rev: COUNTS_PER_MOTOR_REV,
            speed_scale: 5.4,
            decay_mode: DecayMode::Slow,
            pwm_frequency_hz: 25_000,
            reversed: false,
            encoder_reversed: false,
        }
    }
}

impl MotorConfig {
    /// Set the gear ratio
    pub fn with_gear_ratio(mut self, ratio: f32) -> Self {
        self.gear_ratio = ratio;
        self
    }

    /// Set the speed scale
    pub fn with_speed_scale(mut self, scale: f32) -> Self {
        self.speed_scale = scale;
        self
    }

    /// Set the decay mode
    pub fn with_decay_mode(mut self, mode: DecayMode) -> Self {
        self.decay_mode = mode;
        self
    }

    /// Set motor and encoder polarity
    pub fn with_reversed(mut self, motor: bool, encoder: bool) -> Self {
        self.reversed = motor;
        self.encoder_reversed = encoder;
        self
    }

    /// Encoder counts per output shaft revolution.
    pub fn counts_per_rev(&self) -> f32 {
        counts_per_rev(self.counts_per_motor_rev, self.gear_ratio)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.counts_per_rev(), ConfigError::InvalidCountsPerRev)?;
        positive(self.speed_scale, ConfigError::InvalidSpeedScale)?;
        Ok(())
    }
}

// ============================================================================
// PID Config
// ============================================================================

/// Controller gains and anti-windup
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Derivative gain
    pub kd: f32,
    /// Integral clamp; `None` leaves the integral unbounded
    pub integral_limit: Option<f32>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self::position()
    }
}

impl PidConfig {
    /// Tuned for position control in degrees.
    pub const fn position() -> Self {
        Self {
            kp: 0.14,
            ki: 0.0,
            kd: 0.0022,
            integral_limit: None,
        }
    }

    /// Tuned for velocity control in revolutions per second.
    pub const fn velocity() -> Self {
        Self {
            kp: 30.0,
            ki: 0.0,
            kd: 0.4,
            integral_limit: None,
        }
    }

    /// Set all three gains
    pub fn with_gains(mut self, kp: f32, ki: f32, kd: f32) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// Set the integral clamp
    pub fn with_integral_limit(mut self, limit: Option<f32>) -> Self {
        self.integral_limit = limit;
        self
    }

    /// The gains as a [`PidGains`].
    pub fn gains(&self) -> PidGains {
        PidGains::new(self.kp, self.ki, self.kd)
    }

    /// Build a controller for the given sample period.
    pub fn build(&self, sample_period: f32) -> Result<PidController, ConfigError> {
        PidController::new(self.gains(), sample_period)?.with_integral_limit(self.integral_limit)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.gains().validate()?;
        if let Some(limit) = self.integral_limit {
            positive(limit, ConfigError::InvalidIntegralLimit)?;
        }
        Ok(())
    }
}

// ============================================================================
// Trajectory Config
// ============================================================================

/// Setpoint generation
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrajectoryConfig {
    /// Random targets are drawn from `[-extent, extent]`; waves swing `0..extent`
    pub extent: f32,
    /// Curve between targets
    pub interpolation: Interpolation,
    /// Seed for random targets
    pub seed: u64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self::position()
    }
}

impl TrajectoryConfig {
    /// 180 degrees either side of zero.
    pub const fn position() -> Self {
        Self {
            extent: 180.0,
            interpolation: Interpolation::Cosine,
            seed: 0,
        }
    }

    /// 3 revolutions per second either way.
    pub const fn velocity() -> Self {
        Self {
            extent: 3.0,
            interpolation: Interpolation::Cosine,
            seed: 0,
        }
    }

    /// Set the extent
    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    /// Set the interpolation
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// A random walk over `[-extent, extent]`.
    pub fn random_walk(&self) -> Result<Segment, ConfigError> {
        Segment::random_walk(self.extent, self.interpolation, self.seed)
    }

    /// A wave swinging between zero and `extent`.
    pub fn wave(&self) -> Segment {
        Segment::oscillate(0.0, self.extent, self.interpolation)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.extent.is_finite() || self.extent < 0.0 {
            return Err(ConfigError::InvalidExtent(self.extent));
        }
        Ok(())
    }
}

// ============================================================================
// Drive Config
// ============================================================================

/// Four-wheel drive sequence settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriveConfig {
    /// Wheel speed during maneuvers, revolutions per second
    pub driving_speed: f32,
    /// Which axis drives which wheel
    pub layout: WheelLayout,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            driving_speed: 1.0,
            layout: WheelLayout::default(),
        }
    }
}

impl DriveConfig {
    /// Set the driving speed
    pub fn with_driving_speed(mut self, speed: f32) -> Self {
        self.driving_speed = speed;
        self
    }

    /// Set the wheel layout
    pub fn with_layout(mut self, layout: WheelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// The full maneuver cycle.
    pub fn sequence(&self) -> Result<DriveSequence, ConfigError> {
        DriveSequence::new(self.driving_speed, self.layout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.driving_speed.is_finite() || self.driving_speed < 0.0 {
            return Err(ConfigError::InvalidExtent(self.driving_speed));
        }
        Ok(())
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("motorctl"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
