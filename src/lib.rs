//! # rs-motorctl
//!
//! Closed-loop DC motor control: PID loops over quadrature encoders, driving
//! H-bridge outputs along time-interpolated setpoints.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for encoder input, motor output, stop button and timing
//! - **PID control**: Derivative on measurement, optional anti-windup clamp
//! - **Trajectories**: Step, linear and cosine interpolation with random walk,
//!   oscillating and waypoint segment policies
//! - **Multi-axis coordination**: N loops on one shared tick, including a
//!   four-wheel forward/turn/strafe drive sequence
//! - **Fixed-rate scheduling**: Absolute deadlines, overruns logged and dropped
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions
//! - `pid` - The controller
//! - `encoder` - Raw ticks to degrees and revolutions
//! - `trajectory` - Setpoint generation
//! - `throttle` - Tri-state motor command and PID output mapping
//! - `axis` - One encoder, one controller, one motor
//! - `drive` - Four-wheel maneuvers and open-loop throttle scripts
//! - `sequencer` - Ties axes and a program to the shared tick
//! - `scheduler` - Fixed-rate loop timing
//! - `hal` - Concrete implementations (mock, simulated plant, embedded-hal drivers)
//!
//! ## Example
//!
//! ```rust
//! use rs_motorctl::{
//!     config::Config,
//!     hal::{MockEncoder, MockMotor},
//!     ControlMode, Program, Segment, Interpolation, Sequencer,
//! };
//!
//! let config = Config::default();
//! let axis = config
//!     .axis("shaft", ControlMode::Position, MockEncoder::new(), MockMotor::new())
//!     .unwrap();
//!
//! let program = Program::shared(Segment::oscillate(0.0, 90.0, Interpolation::Cosine));
//! let mut seq = Sequencer::new([axis], program, config.control.updates_per_move()).unwrap();
//!
//! // Call once per control period
//! let report = seq.tick().unwrap();
//! assert_eq!(report.setpoints[0], 0.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// One closed control loop: encoder, PID, output mapper and motor.
pub mod axis;
/// Controller configuration with presets, builders and validation.
pub mod config;
/// Four-wheel drive maneuvers and open-loop throttle scripts.
pub mod drive;
/// Raw tick counts to physical units.
pub mod encoder;
/// Configuration errors.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Proportional-integral-derivative controller.
pub mod pid;
/// Fixed-rate tick scheduling and the outer control loop.
pub mod scheduler;
/// Multi-axis coordination under a shared tick.
pub mod sequencer;
/// Motor commands and PID output mapping.
pub mod throttle;
/// Core traits for hardware abstraction.
pub mod traits;
/// Setpoint interpolation and segment sequencing.
pub mod trajectory;

// Re-exports for convenience
pub use axis::{Axis, AxisState};
pub use config::Config;
pub use drive::{
    DriveSequence, Maneuver, ScriptOutcome, ThrottleScript, ThrottleStep, WheelLayout, WheelSpeeds,
};
pub use encoder::EncoderReader;
pub use error::ConfigError;
pub use pid::{PidController, PidGains};
pub use scheduler::{run_until_stopped, FixedRateScheduler, RunSummary, TickTiming};
pub use sequencer::{Program, Sequencer, TickReport};
pub use throttle::{ControlMode, DecayMode, OutputMapper, Throttle};
pub use trajectory::{Interpolation, Segment, SegmentCounter, SegmentPolicy, Trajectory};
pub use traits::{Clock, Delay, EncoderSource, MotorSink, NeverStop, StopSignal};
