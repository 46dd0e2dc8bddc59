//! Desktop time sources backed by `std::time`.

use std::time::{Duration, Instant};

use crate::traits::{Clock, Delay};

/// Monotonic clock measuring from its own creation.
///
/// ```rust
/// use rs_motorctl::hal::StdClock;
/// use rs_motorctl::traits::Clock;
///
/// let clock = StdClock::new();
/// let a = clock.now_us();
/// let b = clock.now_us();
/// assert!(b >= a);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    /// Creates a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    #[inline]
    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

/// Delay implemented with `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u64) {
        std::thread::sleep(Duration::from_micros(us));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_advances_clock() {
        let clock = StdClock::new();
        let before = clock.now_us();
        StdDelay.delay_us(2_000);
        assert!(clock.now_us() - before >= 2_000);
    }
}
