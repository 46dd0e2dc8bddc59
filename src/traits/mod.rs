//! Trait definitions for hardware abstraction.
//!
//! This module defines the collaborator boundary of the control core so it can:
//! - Run on different hardware (any `embedded-hal` board, desktop simulation)
//! - Be tested without hardware using the mocks in [`crate::hal`]
//!
//! # Hardware Abstraction
//!
//! - [`EncoderSource`]: Raw quadrature tick counts
//! - [`MotorSink`]: H-bridge throttle output
//! - [`StopSignal`]: External stop button
//! - [`Clock`] and [`Delay`]: Timing for the fixed-rate scheduler

pub mod hardware;

pub use hardware::*;
