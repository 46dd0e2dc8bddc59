//! Setpoint trajectories between pairs of target values.
//!
//! A trajectory moves a setpoint from `start` to `end` over a fixed number of
//! control updates, then picks a new pair and does it again. Three pieces fit
//! together:
//!
//! - [`Interpolation`]: the curve between the two values
//! - [`SegmentPolicy`]: how the next `(start, end)` pair is chosen
//! - [`SegmentCounter`]: the update count that drives the curve
//!
//! A [`Segment`] is a pair plus its curve and policy, with no notion of time.
//! A [`Trajectory`] is a segment with its own counter. The multi-axis
//! [`Sequencer`](crate::Sequencer) keeps one shared counter and drives several
//! bare segments from it so every axis moves in lockstep.
//!
//! # Interpolation Curves
//!
//! With `p = min(elapsed / total, 1)`:
//!
//! | Mode | Setpoint |
//! |------|----------|
//! | [`Interpolation::Step`] | `end` |
//! | [`Interpolation::Linear`] | `start + p * (end - start)` |
//! | [`Interpolation::Cosine`] | `start + (1 - cos(p * pi)) / 2 * (end - start)` |
//!
//! Cosine easing has zero slope at both ends of the segment, so the axis
//! starts and stops smoothly.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{Interpolation, Trajectory};
//!
//! // Swing between 0 and 270 degrees, one second per move at 100 Hz.
//! let mut wave = Trajectory::oscillate(0.0, 270.0, Interpolation::Cosine, 100);
//!
//! assert_eq!(wave.setpoint(), 0.0);
//! for _ in 0..100 {
//!     wave.advance();
//! }
//! // Segment finished; the pair has been swapped.
//! assert_eq!(wave.start(), 270.0);
//! assert_eq!(wave.end(), 0.0);
//! ```

use core::f32::consts::PI;

use heapless::Vec as HVec;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;

/// Maximum number of waypoints in a [`SegmentPolicy::Waypoints`] cycle.
pub const MAX_WAYPOINTS: usize = 16;

#[cfg(feature = "std")]
#[inline]
fn cos(x: f32) -> f32 {
    x.cos()
}

#[cfg(not(feature = "std"))]
#[inline]
fn cos(x: f32) -> f32 {
    micromath::F32Ext::cos(x)
}

// ============================================================================
// Interpolation
// ============================================================================

/// Curve used between the two ends of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Interpolation {
    /// Jump straight to the end value.
    Step,
    /// Constant rate.
    Linear,
    /// Raised-cosine easing with zero slope at both ends.
    #[default]
    Cosine,
}

impl Interpolation {
    /// Value at `percent` of the way from `start` to `end`.
    ///
    /// `percent` is clamped to `[0, 1]`.
    pub fn apply(&self, start: f32, end: f32, percent: f32) -> f32 {
        let p = percent.clamp(0.0, 1.0);
        match self {
            Interpolation::Step => end,
            Interpolation::Linear => (p * (end - start)) + start,
            Interpolation::Cosine => (((1.0 - cos(p * PI)) / 2.0) * (end - start)) + start,
        }
    }

    /// Look up a mode by its numeric index.
    ///
    /// `0` is step and `2` is cosine. Anything else is linear.
    ///
    /// ```
    /// use rs_motorctl::Interpolation;
    ///
    /// assert_eq!(Interpolation::from_index(0), Interpolation::Step);
    /// assert_eq!(Interpolation::from_index(1), Interpolation::Linear);
    /// assert_eq!(Interpolation::from_index(2), Interpolation::Cosine);
    /// assert_eq!(Interpolation::from_index(7), Interpolation::Linear);
    /// ```
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Interpolation::Step,
            2 => Interpolation::Cosine,
            _ => Interpolation::Linear,
        }
    }

    /// Parse a mode name (`"step"`, `"linear"`, `"cosine"`), case-insensitive.
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("step") {
            Some(Interpolation::Step)
        } else if s.eq_ignore_ascii_case("linear") {
            Some(Interpolation::Linear)
        } else if s.eq_ignore_ascii_case("cosine") || s.eq_ignore_ascii_case("cos") {
            Some(Interpolation::Cosine)
        } else {
            None
        }
    }
}

// ============================================================================
// Segment counter
// ============================================================================

/// Counts control updates through one segment.
///
/// Invariant: `elapsed` stays in `[0, total]`; reaching `total` completes the
/// segment and resets the count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentCounter {
    elapsed: u32,
    total: u32,
}

impl SegmentCounter {
    /// A counter for segments of `total` updates.
    pub const fn new(total: u32) -> Self {
        Self { elapsed: 0, total }
    }

    /// Fraction of the segment already covered, in `[0, 1]`.
    ///
    /// A zero-length segment is always complete (`1.0`).
    pub fn percent_along(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.elapsed as f32 / self.total as f32).min(1.0)
    }

    /// Count one update. Returns `true` when this completes the segment.
    pub fn advance(&mut self) -> bool {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= self.total {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }

    /// Restart the current segment.
    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    /// Updates already counted in this segment.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Updates per segment.
    pub fn total(&self) -> u32 {
        self.total
    }
}

// ============================================================================
// Segment policy
// ============================================================================

fn draw(rng: &mut SmallRng, extent: f32) -> f32 {
    if extent == 0.0 {
        return 0.0;
    }
    rng.gen_range(-extent..=extent)
}

/// How a completed segment picks its successor.
#[derive(Clone, Debug)]
pub enum SegmentPolicy {
    /// Keep the same pair forever.
    Hold,
    /// Swap `start` and `end`; two segments return to the original pair.
    Oscillate,
    /// `start` becomes the old `end`; `end` is drawn uniformly from
    /// `[-extent, extent]`.
    RandomWalk {
        /// Half-width of the range new ends are drawn from.
        extent: f32,
        /// Generator for new ends.
        rng: SmallRng,
    },
    /// `start` becomes the old `end`; `end` cycles through a fixed list.
    Waypoints {
        /// Ends visited in order, wrapping after the last.
        points: HVec<f32, MAX_WAYPOINTS>,
        /// Index of the current end in `points`.
        index: usize,
    },
}

/// Two target values, the curve between them, and the rule for what follows.
#[derive(Clone, Debug)]
pub struct Segment {
    start: f32,
    end: f32,
    interpolation: Interpolation,
    policy: SegmentPolicy,
}

impl Segment {
    /// A fixed segment that repeats the same pair.
    pub fn hold(start: f32, end: f32, interpolation: Interpolation) -> Self {
        Self {
            start,
            end,
            interpolation,
            policy: SegmentPolicy::Hold,
        }
    }

    /// A segment that swaps its ends on completion.
    pub fn oscillate(start: f32, end: f32, interpolation: Interpolation) -> Self {
        Self {
            start,
            end,
            interpolation,
            policy: SegmentPolicy::Oscillate,
        }
    }

    /// A random walk starting at `0.0` with a random first end.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidExtent`] unless `extent` is finite and
    /// non-negative.
    pub fn random_walk(
        extent: f32,
        interpolation: Interpolation,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if !extent.is_finite() || extent < 0.0 {
            return Err(ConfigError::InvalidExtent(extent));
        }
        let mut rng = SmallRng::seed_from_u64(seed);
        let end = draw(&mut rng, extent);
        Ok(Self {
            start: 0.0,
            end,
            interpolation,
            policy: SegmentPolicy::RandomWalk { extent, rng },
        })
    }

    /// Visit `points` in order, starting from `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySequence`] for an empty list and
    /// [`ConfigError::InvalidExtent`] if a point is not finite. Points beyond
    /// [`MAX_WAYPOINTS`] are ignored.
    pub fn waypoints(
        start: f32,
        points: &[f32],
        interpolation: Interpolation,
    ) -> Result<Self, ConfigError> {
        let mut stored = HVec::new();
        for &p in points.iter().take(MAX_WAYPOINTS) {
            if !p.is_finite() {
                return Err(ConfigError::InvalidExtent(p));
            }
            let _ = stored.push(p);
        }
        let end = *stored.first().ok_or(ConfigError::EmptySequence)?;
        Ok(Self {
            start,
            end,
            interpolation,
            policy: SegmentPolicy::Waypoints {
                points: stored,
                index: 0,
            },
        })
    }

    /// Setpoint at `percent` of the way through this segment.
    #[inline]
    pub fn value_at(&self, percent: f32) -> f32 {
        self.interpolation.apply(self.start, self.end, percent)
    }

    /// Replace the pair with its successor according to the policy.
    pub fn rotate(&mut self) {
        match &mut self.policy {
            SegmentPolicy::Hold => {}
            SegmentPolicy::Oscillate => core::mem::swap(&mut self.start, &mut self.end),
            SegmentPolicy::RandomWalk { extent, rng } => {
                self.start = self.end;
                self.end = draw(rng, *extent);
            }
            SegmentPolicy::Waypoints { points, index } => {
                *index = (*index + 1) % points.len();
                self.start = self.end;
                self.end = points[*index];
            }
        }
    }

    /// Value the segment starts from.
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Value the segment ends at.
    pub fn end(&self) -> f32 {
        self.end
    }

    /// The curve in use.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Change the curve; takes effect immediately.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// The successor policy.
    pub fn policy(&self) -> &SegmentPolicy {
        &self.policy
    }
}

// ============================================================================
// Trajectory
// ============================================================================

/// A [`Segment`] driven by its own [`SegmentCounter`].
///
/// Call [`setpoint`](Self::setpoint) to read the current target and
/// [`advance`](Self::advance) once per control update.
#[derive(Clone, Debug)]
pub struct Trajectory {
    segment: Segment,
    counter: SegmentCounter,
}

impl Trajectory {
    /// Wrap a segment with a counter of `updates_per_segment`.
    pub fn new(segment: Segment, updates_per_segment: u32) -> Self {
        Self {
            segment,
            counter: SegmentCounter::new(updates_per_segment),
        }
    }

    /// Shorthand for an oscillating trajectory.
    pub fn oscillate(
        start: f32,
        end: f32,
        interpolation: Interpolation,
        updates_per_segment: u32,
    ) -> Self {
        Self::new(
            Segment::oscillate(start, end, interpolation),
            updates_per_segment,
        )
    }

    /// Shorthand for a random-walk trajectory.
    ///
    /// # Errors
    ///
    /// See [`Segment::random_walk`].
    pub fn random_walk(
        extent: f32,
        interpolation: Interpolation,
        updates_per_segment: u32,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Segment::random_walk(extent, interpolation, seed)?,
            updates_per_segment,
        ))
    }

    /// Setpoint for the current update.
    #[inline]
    pub fn setpoint(&self) -> f32 {
        self.segment.value_at(self.counter.percent_along())
    }

    /// Count one update; on segment completion rotate to the next pair.
    ///
    /// Returns `true` when a new segment began.
    pub fn advance(&mut self) -> bool {
        let done = self.counter.advance();
        if done {
            self.segment.rotate();
        }
        done
    }

    /// Fraction of the current segment covered.
    pub fn percent_along(&self) -> f32 {
        self.counter.percent_along()
    }

    /// Value the current segment starts from.
    pub fn start(&self) -> f32 {
        self.segment.start()
    }

    /// Value the current segment ends at.
    pub fn end(&self) -> f32 {
        self.segment.end()
    }

    /// The underlying segment.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// The update counter.
    pub fn counter(&self) -> &SegmentCounter {
        &self.counter
    }
}
