//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the collaborator traits, enabling
//! development and testing on desktop without a motor board.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockEncoder`] | [`EncoderSource`] | Settable count, injectable read failures |
//! | [`MockMotor`] | [`MotorSink`] | Records every throttle written |
//! | [`MockStop`] | [`StopSignal`] | Asserts after a set number of polls |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockDelay`] | [`Delay`] | Advances a [`MockClock`] instead of sleeping |
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::hal::{MockEncoder, MockMotor};
//! use rs_motorctl::{Axis, ControlMode, EncoderReader, OutputMapper, PidController, PidGains, Throttle};
//!
//! let reader = EncoderReader::new(MockEncoder::new(), 600.0).unwrap();
//! let pid = PidController::new(PidGains::new(1.0, 0.0, 0.0), 0.01).unwrap();
//! let mapper = OutputMapper::new(ControlMode::Position, 5.4, 0.01).unwrap();
//! let mut axis = Axis::new("A", reader, pid, mapper, MockMotor::new());
//!
//! axis.update(2.7).unwrap();
//!
//! // Verify via the recorded motor output
//! assert_eq!(axis.motor().throttle, Throttle::Drive(0.5));
//! assert_eq!(axis.motor().call_count, 1);
//! ```
//!
//! [`EncoderSource`]: crate::traits::EncoderSource
//! [`MotorSink`]: crate::traits::MotorSink
//! [`StopSignal`]: crate::traits::StopSignal
//! [`Clock`]: crate::traits::Clock
//! [`Delay`]: crate::traits::Delay

extern crate alloc;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::throttle::Throttle;
use crate::traits::{Clock, Delay, EncoderSource, MotorSink, StopSignal};

// ============================================================================
// Encoder
// ============================================================================

/// Error returned by [`MockEncoder`] when a failure was injected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockReadError;

/// Mock encoder for testing.
///
/// Holds an absolute count that tests set directly. Failures can be queued to
/// exercise the stale-sample path.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::hal::{MockEncoder, MockReadError};
/// use rs_motorctl::traits::EncoderSource;
///
/// let mut encoder = MockEncoder::new();
/// encoder.set_count(42);
/// assert_eq!(encoder.read(), Ok(42));
///
/// encoder.fail_next();
/// assert_eq!(encoder.read(), Err(MockReadError));
/// assert_eq!(encoder.read(), Ok(42));
/// ```
#[derive(Debug, Default)]
pub struct MockEncoder {
    /// Current absolute count.
    pub count: i32,
    /// Number of upcoming reads that will fail.
    pub pending_failures: u32,
    /// Number of times `read` was called.
    pub read_count: usize,
}

impl MockEncoder {
    /// Creates a new mock encoder at count zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute count.
    pub fn set_count(&mut self, count: i32) {
        self.count = count;
    }

    /// Move the count by `delta`, wrapping like a hardware counter.
    pub fn step(&mut self, delta: i32) {
        self.count = self.count.wrapping_add(delta);
    }

    /// Make the next read fail.
    pub fn fail_next(&mut self) {
        self.pending_failures += 1;
    }

    /// Make the next `n` reads fail.
    pub fn fail_for(&mut self, n: u32) {
        self.pending_failures += n;
    }
}

impl EncoderSource for MockEncoder {
    type Error = MockReadError;

    fn read(&mut self) -> Result<i32, MockReadError> {
        self.read_count += 1;
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(MockReadError);
        }
        Ok(self.count)
    }
}

// ============================================================================
// Motor
// ============================================================================

/// Mock motor sink for testing.
///
/// Records every throttle write for verification. Use the public fields to
/// inspect state after test operations.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::hal::MockMotor;
/// use rs_motorctl::traits::MotorSink;
/// use rs_motorctl::Throttle;
///
/// let mut motor = MockMotor::new();
/// motor.set_throttle(Throttle::Drive(0.75)).unwrap();
/// motor.coast().unwrap();
///
/// assert_eq!(motor.throttle, Throttle::Coast);
/// assert_eq!(motor.history, vec![Throttle::Drive(0.75), Throttle::Coast]);
/// assert_eq!(motor.call_count, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockMotor {
    /// Last throttle written.
    pub throttle: Throttle,
    /// Every throttle written, in order.
    pub history: Vec<Throttle>,
    /// Number of times `set_throttle` was called.
    pub call_count: usize,
    /// When set, writes fail and leave the state untouched.
    pub fail: bool,
}

impl MockMotor {
    /// Creates a new mock motor, braked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock motor whose writes fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl MotorSink for MockMotor {
    type Error = ();

    fn set_throttle(&mut self, throttle: Throttle) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.throttle = throttle;
        self.history.push(throttle);
        self.call_count += 1;
        Ok(())
    }
}

// ============================================================================
// Stop button
// ============================================================================

/// Mock stop input.
///
/// Reports pressed once it has been polled `press_after` times, or
/// immediately after [`press`](Self::press).
///
/// ```rust
/// use rs_motorctl::hal::MockStop;
/// use rs_motorctl::traits::StopSignal;
///
/// let mut stop = MockStop::after(2);
/// assert!(!stop.is_pressed());
/// assert!(!stop.is_pressed());
/// assert!(stop.is_pressed());
/// ```
#[derive(Debug, Default)]
pub struct MockStop {
    /// Polls that report released before the press.
    pub press_after: Option<u32>,
    /// Whether the input is held.
    pub pressed: bool,
    /// Number of times `is_pressed` was called.
    pub polls: u32,
}

impl MockStop {
    /// A stop input that is never pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stop input that asserts on poll number `polls + 1`.
    pub fn after(polls: u32) -> Self {
        Self {
            press_after: Some(polls),
            ..Self::default()
        }
    }

    /// Hold the input down.
    pub fn press(&mut self) {
        self.pressed = true;
    }
}

impl StopSignal for MockStop {
    fn is_pressed(&mut self) -> bool {
        let due = matches!(self.press_after, Some(n) if self.polls >= n);
        self.polls += 1;
        if due {
            self.pressed = true;
        }
        self.pressed
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source. Time lives in a [`Cell`] so a
/// [`MockDelay`] can advance a clock that the scheduler is also reading.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::hal::MockClock;
/// use rs_motorctl::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_us(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_us(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_us(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_us: Cell<u64>,
}

impl MockClock {
    /// Creates a new mock clock starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in microseconds.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}

/// Mock delay that advances a [`MockClock`] instead of sleeping.
#[derive(Debug)]
pub struct MockDelay<'a> {
    clock: &'a MockClock,
    /// Every requested delay, in order.
    pub delays: Vec<u64>,
}

impl<'a> MockDelay<'a> {
    /// Creates a delay bound to `clock`.
    pub fn new(clock: &'a MockClock) -> Self {
        Self {
            clock,
            delays: Vec::new(),
        }
    }

    /// Total time slept in microseconds.
    pub fn total_us(&self) -> u64 {
        self.delays.iter().sum()
    }
}

impl Delay for MockDelay<'_> {
    fn delay_us(&mut self, us: u64) {
        self.delays.push(us);
        self.clock.advance(us);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockEncoder Tests
    // =========================================================================

    #[test]
    fn mock_encoder_default() {
        let mut encoder = MockEncoder::new();
        assert_eq!(encoder.read(), Ok(0));
        assert_eq!(encoder.read_count, 1);
    }

    #[test]
    fn mock_encoder_step_wraps() {
        let mut encoder = MockEncoder::new();
        encoder.set_count(i32::MAX);
        encoder.step(1);
        assert_eq!(encoder.read(), Ok(i32::MIN));
    }

    #[test]
    fn mock_encoder_fail_for() {
        let mut encoder = MockEncoder::new();
        encoder.fail_for(2);
        assert!(encoder.read().is_err());
        assert!(encoder.read().is_err());
        assert_eq!(encoder.read(), Ok(0));
        assert_eq!(encoder.read_count, 3);
    }

    // =========================================================================
    // MockMotor Tests
    // =========================================================================

    #[test]
    fn mock_motor_default() {
        let motor = MockMotor::new();
        assert_eq!(motor.throttle, Throttle::Brake);
        assert!(motor.history.is_empty());
        assert_eq!(motor.call_count, 0);
    }

    #[test]
    fn mock_motor_records_history() {
        let mut motor = MockMotor::new();
        motor.set_throttle(Throttle::Drive(0.75)).unwrap();
        motor.brake().unwrap();
        assert_eq!(motor.throttle, Throttle::Brake);
        assert_eq!(motor.history, [Throttle::Drive(0.75), Throttle::Brake]);
        assert_eq!(motor.call_count, 2);
    }

    #[test]
    fn mock_motor_failing() {
        let mut motor = MockMotor::failing();
        assert_eq!(motor.set_throttle(Throttle::Drive(0.5)), Err(()));
        assert_eq!(motor.throttle, Throttle::Brake);
        assert_eq!(motor.call_count, 0);
    }

    // =========================================================================
    // MockStop Tests
    // =========================================================================

    #[test]
    fn mock_stop_never_pressed() {
        let mut stop = MockStop::new();
        for _ in 0..5 {
            assert!(!stop.is_pressed());
        }
        assert_eq!(stop.polls, 5);
    }

    #[test]
    fn mock_stop_after_zero_fires_immediately() {
        let mut stop = MockStop::after(0);
        assert!(stop.is_pressed());
    }

    #[test]
    fn mock_stop_press_latches() {
        let mut stop = MockStop::new();
        stop.press();
        assert!(stop.is_pressed());
        assert!(stop.is_pressed());
    }

    // =========================================================================
    // MockClock / MockDelay Tests
    // =========================================================================

    #[test]
    fn mock_clock_advance() {
        let clock = MockClock::new();
        clock.advance(500);
        assert_eq!(clock.now_us(), 500);
        clock.advance(250);
        assert_eq!(clock.now_us(), 750);
    }

    #[test]
    fn mock_delay_advances_clock() {
        let clock = MockClock::new();
        let mut delay = MockDelay::new(&clock);
        delay.delay_us(10_000);
        delay.delay_us(2_500);
        assert_eq!(clock.now_us(), 12_500);
        assert_eq!(delay.total_us(), 12_500);
        assert_eq!(delay.delays, [10_000, 2_500]);
    }
}
