//! Fixed-rate tick scheduling.
//!
//! [`FixedRateScheduler`] keeps an absolute deadline and sleeps until it, so
//! time spent doing work inside a tick does not accumulate as drift. If a tick
//! runs past its deadline the scheduler logs a warning, drops the missed
//! periods and resynchronises from the current time rather than bursting to
//! catch up.
//!
//! [`run_until_stopped`] is the outer loop: poll the stop signal, tick the
//! sequencer, wait for the next deadline, and release every motor on exit.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::hal::{MockClock, MockDelay};
//! use rs_motorctl::traits::Clock;
//! use rs_motorctl::FixedRateScheduler;
//!
//! let clock = MockClock::new();
//! let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
//!
//! sched.wait_next();
//! sched.wait_next();
//! assert_eq!(clock.now_us(), 20_000);
//! ```

use crate::error::ConfigError;
use crate::sequencer::Sequencer;
use crate::traits::{Clock, Delay, EncoderSource, MotorSink, StopSignal};

/// Timing of one [`FixedRateScheduler::wait_next`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickTiming {
    /// Deadline the next tick starts at, in clock microseconds.
    pub deadline_us: u64,
    /// Time slept to reach the deadline.
    pub slept_us: u64,
    /// How far past the deadline the caller arrived (0 when on time).
    pub late_us: u64,
    /// Whole periods dropped because of the overrun.
    pub missed: u64,
}

impl TickTiming {
    /// Returns true if the tick overran its deadline.
    pub fn overran(&self) -> bool {
        self.late_us > 0
    }
}

/// Sleeps to a fixed-period deadline.
pub struct FixedRateScheduler<C: Clock, D: Delay> {
    clock: C,
    delay: D,
    period_us: u64,
    deadline: Option<u64>,
    overruns: u64,
}

impl<C: Clock, D: Delay> FixedRateScheduler<C, D> {
    /// Create a scheduler ticking `updates_per_second` times per second.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUpdateRate`] for zero or for rates
    /// faster than one tick per microsecond.
    pub fn new(clock: C, delay: D, updates_per_second: u32) -> Result<Self, ConfigError> {
        if updates_per_second == 0 || updates_per_second > 1_000_000 {
            return Err(ConfigError::InvalidUpdateRate(updates_per_second));
        }
        if updates_per_second > 10_000 {
            tracing::warn!(
                rate = updates_per_second,
                "very high update rate, expect overruns"
            );
        }
        Ok(Self {
            clock,
            delay,
            period_us: 1_000_000 / u64::from(updates_per_second),
            deadline: None,
            overruns: 0,
        })
    }

    /// Anchor the first deadline one period from now.
    pub fn start(&mut self) {
        self.deadline = Some(self.clock.now_us() + self.period_us);
    }

    /// Block until the next deadline.
    ///
    /// The first call without [`start`](Self::start) anchors at the current
    /// time and sleeps a full period.
    pub fn wait_next(&mut self) -> TickTiming {
        let now = self.clock.now_us();
        let deadline = match self.deadline {
            Some(d) => d,
            None => now + self.period_us,
        };

        if now <= deadline {
            let slept_us = deadline - now;
            if slept_us > 0 {
                self.delay.delay_us(slept_us);
            }
            self.deadline = Some(deadline + self.period_us);
            return TickTiming {
                deadline_us: deadline,
                slept_us,
                late_us: 0,
                missed: 0,
            };
        }

        let late_us = now - deadline;
        let missed = late_us / self.period_us;
        self.overruns += 1;
        tracing::warn!(late_us, missed, overruns = self.overruns, "tick overran its period");
        self.deadline = Some(now + self.period_us);
        TickTiming {
            deadline_us: now,
            slept_us: 0,
            late_us,
            missed,
        }
    }

    /// Tick period in microseconds.
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Tick period in seconds.
    pub fn period_s(&self) -> f32 {
        self.period_us as f32 / 1_000_000.0
    }

    /// Number of overruns so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// The clock in use.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Summary of a [`run_until_stopped`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks that overran their period.
    pub overruns: u64,
    /// Axis updates skipped because an encoder read failed.
    pub stale_samples: u64,
    /// Whether the stop signal ended the run.
    pub stopped: bool,
}

/// Tick `sequencer` at the scheduler's rate until `stop` fires or `max_ticks`
/// have run, then release every motor.
///
/// The stop signal is polled once before each tick.
///
/// # Errors
///
/// Returns the first motor error. Motors are released (best effort) before
/// the error is returned.
pub fn run_until_stopped<E, M, C, D, S, const N: usize>(
    sequencer: &mut Sequencer<E, M, N>,
    scheduler: &mut FixedRateScheduler<C, D>,
    stop: &mut S,
    max_ticks: Option<u64>,
) -> Result<RunSummary, M::Error>
where
    E: EncoderSource,
    M: MotorSink,
    C: Clock,
    D: Delay,
    S: StopSignal,
{
    let mut summary = RunSummary::default();
    scheduler.start();
    loop {
        if stop.is_pressed() {
            summary.stopped = true;
            break;
        }
        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        let report = match sequencer.tick() {
            Ok(report) => report,
            Err(e) => {
                if sequencer.release_all().is_err() {
                    tracing::warn!(
                        ticks = summary.ticks,
                        "could not release motors after a motor error"
                    );
                }
                return Err(e);
            }
        };
        summary.ticks += 1;
        summary.stale_samples += report.stale_axes() as u64;

        if scheduler.wait_next().overran() {
            summary.overruns += 1;
        }
    }
    sequencer.release_all()?;
    tracing::info!(
        ticks = summary.ticks,
        overruns = summary.overruns,
        stale = summary.stale_samples,
        stopped = summary.stopped,
        "control loop finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockClock, MockDelay};

    // =========================================================================
    // FixedRateScheduler Tests
    // =========================================================================

    #[test]
    fn rejects_bad_rate() {
        let clock = MockClock::new();
        assert!(matches!(
            FixedRateScheduler::new(&clock, MockDelay::new(&clock), 0),
            Err(ConfigError::InvalidUpdateRate(0))
        ));
    }

    #[test]
    fn period_from_rate() {
        let clock = MockClock::new();
        let sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
        assert_eq!(sched.period_us(), 10_000);
        assert!((sched.period_s() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn sleeps_only_the_remainder() {
        let clock = MockClock::new();
        let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
        sched.start();

        clock.advance(3_000); // work
        let t = sched.wait_next();
        assert_eq!(t.slept_us, 7_000);
        assert_eq!(t.deadline_us, 10_000);
        assert!(!t.overran());

        clock.advance(9_000);
        let t = sched.wait_next();
        assert_eq!(t.slept_us, 1_000);
        assert_eq!(clock.now_us(), 20_000);
    }

    #[test]
    fn overrun_resyncs_without_burst() {
        let clock = MockClock::new();
        let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
        sched.start();

        clock.advance(35_000);
        let t = sched.wait_next();
        assert!(t.overran());
        assert_eq!(t.late_us, 25_000);
        assert_eq!(t.missed, 2);
        assert_eq!(t.slept_us, 0);
        assert_eq!(sched.overruns(), 1);

        // Next deadline is one period from the late arrival
        let t = sched.wait_next();
        assert_eq!(t.slept_us, 10_000);
        assert_eq!(clock.now_us(), 45_000);
    }

    #[test]
    fn exactly_on_deadline_is_not_an_overrun() {
        let clock = MockClock::new();
        let mut sched = FixedRateScheduler::new(&clock, MockDelay::new(&clock), 100).unwrap();
        sched.start();
        clock.advance(10_000);
        let t = sched.wait_next();
        assert!(!t.overran());
        assert_eq!(t.slept_us, 0);
    }
}
