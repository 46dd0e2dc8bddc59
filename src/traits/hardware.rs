//! Hardware abstraction traits for encoders, motor outputs, stop inputs and timing.
//!
//! This module defines the collaborator interfaces the control core consumes.
//! Everything on the far side of these traits (pin wiring, PWM peripherals,
//! quadrature counters) is platform glue.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`EncoderSource`] | Raw signed tick count from a quadrature decoder |
//! | [`MotorSink`] | H-bridge output accepting a [`Throttle`] |
//! | [`StopSignal`] | External stop input, polled once per tick |
//! | [`Clock`] | Monotonic microsecond time source |
//! | [`Delay`] | Blocking delay used by the fixed-rate scheduler |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. Generic drivers over `embedded-hal` 1.0 live in
//! `hal::embedded` (requires the `embedded-hal` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::traits::{EncoderSource, MotorSink};
//! use rs_motorctl::hal::{MockEncoder, MockMotor};
//! use rs_motorctl::Throttle;
//!
//! let mut encoder = MockEncoder::new();
//! encoder.set_count(150);
//! assert_eq!(encoder.read(), Ok(150));
//!
//! let mut motor = MockMotor::new();
//! motor.set_throttle(Throttle::drive(0.5)).unwrap();
//! assert_eq!(motor.throttle, Throttle::Drive(0.5));
//! ```

use crate::throttle::Throttle;

/// Source of raw encoder counts.
///
/// Abstracts an incremental quadrature decoder. The count is monotonic within
/// one direction of rotation and wraps at the `i32` boundary; the
/// [`EncoderReader`](crate::EncoderReader) accumulates wrapping deltas so a
/// counter wrap never shows up as a jump.
///
/// # Implementation Notes
///
/// - Return the absolute count, not a delta
/// - Direction polarity is handled by the reader, not the source
/// - Return `Err` when the count cannot be trusted (bus error, stale latch);
///   the sequencer skips that axis for the tick and retries on the next one
pub trait EncoderSource {
    /// Error type for encoder reads.
    type Error;

    /// Returns the current absolute tick count.
    fn read(&mut self) -> Result<i32, Self::Error>;
}

/// Motor output sink.
///
/// Implement this for your H-bridge driver. The value applies at the next PWM
/// cycle boundary.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_motorctl::traits::MotorSink;
/// use rs_motorctl::Throttle;
///
/// struct MyBridge { /* PWM handles */ }
///
/// impl MotorSink for MyBridge {
///     type Error = ();
///
///     fn set_throttle(&mut self, throttle: Throttle) -> Result<(), ()> {
///         match throttle {
///             Throttle::Drive(v) => { /* set duty on one leg */ }
///             Throttle::Brake => { /* both legs high */ }
///             Throttle::Coast => { /* both legs low */ }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait MotorSink {
    /// Error type for motor operations.
    type Error;

    /// Apply a throttle command.
    fn set_throttle(&mut self, throttle: Throttle) -> Result<(), Self::Error>;

    /// Convenience method to release both H-bridge legs.
    fn coast(&mut self) -> Result<(), Self::Error> {
        self.set_throttle(Throttle::Coast)
    }

    /// Convenience method to actively brake the motor.
    fn brake(&mut self) -> Result<(), Self::Error> {
        self.set_throttle(Throttle::Brake)
    }
}

/// External stop input.
///
/// Typically the board's user switch. Polled once per control tick, so the
/// stop latency is bounded by one tick period.
pub trait StopSignal {
    /// Returns true while the stop input is asserted.
    fn is_pressed(&mut self) -> bool;
}

/// Monotonic time source.
///
/// On desktop this wraps `std::time::Instant`. On embedded, use a hardware
/// timer.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::traits::Clock;
/// use rs_motorctl::hal::MockClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_us(), 0);
///
/// clock.advance(10_000);
/// assert_eq!(clock.now_us(), 10_000);
/// ```
pub trait Clock {
    /// Returns current time in microseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_us(&self) -> u64;
}

/// Blocking delay.
pub trait Delay {
    /// Block for the given number of microseconds.
    fn delay_us(&mut self, us: u64);
}

impl<T: EncoderSource + ?Sized> EncoderSource for &mut T {
    type Error = T::Error;

    fn read(&mut self) -> Result<i32, Self::Error> {
        (**self).read()
    }
}

impl<T: MotorSink + ?Sized> MotorSink for &mut T {
    type Error = T::Error;

    fn set_throttle(&mut self, throttle: Throttle) -> Result<(), Self::Error> {
        (**self).set_throttle(throttle)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

impl<T: StopSignal + ?Sized> StopSignal for &mut T {
    fn is_pressed(&mut self) -> bool {
        (**self).is_pressed()
    }
}

/// A stop signal that never fires. Useful for bounded runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverStop;

impl StopSignal for NeverStop {
    fn is_pressed(&mut self) -> bool {
        false
    }
}
