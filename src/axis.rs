//! One closed control loop: encoder, PID, output mapper and motor.
//!
//! An [`Axis`] owns everything that belongs to one motor. Each tick runs in two
//! halves so a [`Sequencer`](crate::Sequencer) can sample every encoder before
//! it drives any motor:
//!
//! 1. [`sample`](Axis::sample) reads the encoder and updates position and
//!    velocity
//! 2. [`drive`](Axis::drive) sets the PID setpoint, runs the controller, maps
//!    the output to a throttle and writes the motor
//!
//! A failed encoder read marks the axis stale. [`drive`](Axis::drive) then
//! leaves the controller untouched and keeps the previous throttle; the next
//! successful read computes velocity over the whole gap.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{
//!     Axis, ControlMode, EncoderReader, OutputMapper, PidController, PidGains,
//!     hal::{MockEncoder, MockMotor},
//! };
//!
//! let reader = EncoderReader::new(MockEncoder::new(), 600.0).unwrap();
//! let pid = PidController::new(PidGains::new(0.14, 0.0, 0.0022), 0.01).unwrap();
//! let mapper = OutputMapper::new(ControlMode::Position, 5.4, 0.01).unwrap();
//! let mut axis = Axis::new("A", reader, pid, mapper, MockMotor::new());
//!
//! axis.update(90.0).unwrap();
//! assert!(axis.throttle().as_f32() > 0.0);
//! ```

use crate::config::{short_string, ShortString};
use crate::encoder::EncoderReader;
use crate::pid::PidController;
use crate::throttle::{ControlMode, DecayMode, OutputMapper, Throttle};
use crate::traits::{EncoderSource, MotorSink};

/// A single motor under closed-loop control.
pub struct Axis<E: EncoderSource, M: MotorSink> {
    name: ShortString,
    encoder: EncoderReader<E>,
    pid: PidController,
    mapper: OutputMapper,
    motor: M,
    motor_reversed: bool,
    decay: DecayMode,
    throttle: Throttle,
    last_output: f32,
    revolutions: f32,
    velocity: f32,
    primed: bool,
    fresh: bool,
    stale_ticks: u32,
}

impl<E: EncoderSource, M: MotorSink> Axis<E, M> {
    /// Assemble an axis. The motor starts braked (zero throttle).
    pub fn new(
        name: &str,
        encoder: EncoderReader<E>,
        pid: PidController,
        mapper: OutputMapper,
        motor: M,
    ) -> Self {
        Self {
            name: short_string(name),
            encoder,
            pid,
            mapper,
            motor,
            motor_reversed: false,
            decay: DecayMode::default(),
            throttle: Throttle::Brake,
            last_output: 0.0,
            revolutions: 0.0,
            velocity: 0.0,
            primed: false,
            fresh: false,
            stale_ticks: 0,
        }
    }

    /// Invert the motor output direction (swapped bridge legs).
    pub fn with_motor_reversed(mut self, reversed: bool) -> Self {
        self.motor_reversed = reversed;
        self
    }

    /// Record the bridge decay mode used by this axis's driver.
    pub fn with_decay(mut self, decay: DecayMode) -> Self {
        self.decay = decay;
        self
    }

    /// Read the encoder. Returns `true` if the sample is fresh.
    pub fn sample(&mut self) -> bool {
        if self.encoder.sample().is_err() {
            self.fresh = false;
            self.stale_ticks = self.stale_ticks.saturating_add(1);
            tracing::warn!(
                axis = %self.name,
                stale_ticks = self.stale_ticks,
                "encoder read failed, holding throttle"
            );
            return false;
        }

        let revs = self.encoder.revolutions();
        if self.primed {
            let span = self.pid.sample_period() * (self.stale_ticks + 1) as f32;
            self.velocity = (revs - self.revolutions) / span;
        } else {
            self.velocity = 0.0;
            self.primed = true;
            let first = match self.mapper.mode() {
                ControlMode::Position => self.encoder.degrees(),
                ControlMode::Velocity => 0.0,
            };
            self.pid.prime(first);
        }
        self.revolutions = revs;
        self.stale_ticks = 0;
        self.fresh = true;
        true
    }

    /// The controlled quantity: degrees in position mode, revolutions per
    /// second in velocity mode.
    pub fn measurement(&self) -> f32 {
        match self.mapper.mode() {
            ControlMode::Position => self.encoder.degrees(),
            ControlMode::Velocity => self.velocity,
        }
    }

    /// Run the controller toward `setpoint` and write the motor.
    ///
    /// Returns `Ok(None)` without touching the controller or motor when the
    /// last sample was stale.
    pub fn drive(&mut self, setpoint: f32) -> Result<Option<Throttle>, M::Error> {
        self.pid.setpoint = setpoint;
        if !self.fresh {
            return Ok(None);
        }
        let output = self.pid.calculate(self.measurement());
        self.last_output = output;
        let throttle = self.mapper.map(output, self.throttle);
        self.apply(throttle)?;
        Ok(Some(throttle))
    }

    /// [`sample`](Self::sample) then [`drive`](Self::drive).
    pub fn update(&mut self, setpoint: f32) -> Result<Option<Throttle>, M::Error> {
        self.sample();
        self.drive(setpoint)
    }

    /// Write a throttle directly, bypassing the controller.
    ///
    /// The stored throttle only changes once the motor accepts the write.
    pub fn apply(&mut self, throttle: Throttle) -> Result<(), M::Error> {
        let out = if self.motor_reversed {
            throttle.inverted()
        } else {
            throttle
        };
        self.motor.set_throttle(out)?;
        self.throttle = throttle;
        Ok(())
    }

    /// Release the motor and clear controller history.
    pub fn release(&mut self) -> Result<(), M::Error> {
        self.pid.reset();
        self.primed = false;
        self.apply(Throttle::Coast)
    }

    /// Snapshot for telemetry.
    pub fn state(&self) -> AxisState {
        AxisState {
            name: self.name.clone(),
            mode: self.mapper.mode(),
            degrees: self.encoder.degrees(),
            revolutions: self.revolutions,
            velocity: self.velocity,
            setpoint: self.pid.setpoint,
            output: self.last_output,
            throttle: self.throttle,
            fresh: self.fresh,
        }
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Last commanded throttle, before motor polarity.
    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    /// Whether the last encoder sample succeeded.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Measured velocity in revolutions per second.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Configured decay mode.
    pub fn decay(&self) -> DecayMode {
        self.decay
    }

    /// The axis controller.
    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// The axis encoder reader.
    pub fn encoder(&self) -> &EncoderReader<E> {
        &self.encoder
    }

    /// Mutable access to the encoder reader (e.g. to zero it).
    pub fn encoder_mut(&mut self) -> &mut EncoderReader<E> {
        &mut self.encoder
    }

    /// The motor sink.
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Mutable access to the motor sink.
    pub fn motor_mut(&mut self) -> &mut M {
        &mut self.motor
    }
}

/// Per-axis telemetry snapshot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisState {
    /// Axis name.
    pub name: ShortString,
    /// Position or velocity loop.
    pub mode: ControlMode,
    /// Output shaft angle in degrees.
    pub degrees: f32,
    /// Output shaft position in revolutions.
    pub revolutions: f32,
    /// Output shaft speed in revolutions per second.
    pub velocity: f32,
    /// Current controller setpoint.
    pub setpoint: f32,
    /// Last controller output.
    pub output: f32,
    /// Last commanded throttle.
    pub throttle: Throttle,
    /// Whether the last encoder read succeeded.
    pub fresh: bool,
}
