//! Encoder reading and unit conversion.
//!
//! [`EncoderReader`] wraps an [`EncoderSource`] and turns raw quadrature counts
//! into output-shaft degrees or revolutions. It owns two pieces of state:
//!
//! - the accumulated 64-bit position, built from wrapping deltas of the raw
//!   `i32` count so that a hardware counter wrap is not seen as a jump
//! - the polarity flag, fixed at construction to match the wiring
//!
//! The conversions themselves are pure:
//!
//! ```text
//! degrees     = ticks * 360 / counts_per_rev
//! revolutions = ticks / counts_per_rev
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{EncoderReader, hal::MockEncoder};
//!
//! let mut encoder = MockEncoder::new();
//! let mut reader = EncoderReader::new(&mut encoder, 600.0).unwrap();
//!
//! reader.source_mut().set_count(150);
//! reader.sample().unwrap();
//! assert_eq!(reader.degrees(), 90.0);
//! assert_eq!(reader.revolutions(), 0.25);
//! ```

use crate::error::{positive, ConfigError};
use crate::traits::EncoderSource;

/// Counts per revolution of a bare motor shaft for the common magnetic encoder.
pub const COUNTS_PER_MOTOR_REV: f32 = 12.0;

/// Counts per revolution of a geared output shaft.
///
/// ```rust
/// use rs_motorctl::encoder::counts_per_rev;
///
/// assert_eq!(counts_per_rev(12.0, 50.0), 600.0);
/// ```
#[inline]
pub fn counts_per_rev(counts_per_motor_rev: f32, gear_ratio: f32) -> f32 {
    counts_per_motor_rev * gear_ratio
}

/// Convert ticks to output-shaft degrees.
#[inline]
pub fn ticks_to_degrees(ticks: i64, counts_per_rev: f32) -> f32 {
    (ticks as f32 * 360.0) / counts_per_rev
}

/// Convert ticks to output-shaft revolutions.
#[inline]
pub fn ticks_to_revs(ticks: i64, counts_per_rev: f32) -> f32 {
    ticks as f32 / counts_per_rev
}

/// Converts a raw count source into physical units.
#[derive(Debug)]
pub struct EncoderReader<E: EncoderSource> {
    source: E,
    counts_per_rev: f32,
    reversed: bool,
    last_raw: Option<i32>,
    position: i64,
}

impl<E: EncoderSource> EncoderReader<E> {
    /// Create a reader with normal polarity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCountsPerRev`] unless `counts_per_rev` is
    /// finite and positive.
    pub fn new(source: E, counts_per_rev: f32) -> Result<Self, ConfigError> {
        let counts_per_rev = positive(counts_per_rev, ConfigError::InvalidCountsPerRev)?;
        Ok(Self {
            source,
            counts_per_rev,
            reversed: false,
            last_raw: None,
            position: 0,
        })
    }

    /// Invert the counting direction.
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Read the source and fold the change into the accumulated position.
    ///
    /// The first successful read establishes the baseline, so the position
    /// starts at the source's count. On error the position is left untouched.
    pub fn sample(&mut self) -> Result<i64, E::Error> {
        let raw = self.source.read()?;
        let delta = match self.last_raw {
            Some(last) => raw.wrapping_sub(last) as i64,
            None => raw as i64,
        };
        self.last_raw = Some(raw);
        self.position += if self.reversed { -delta } else { delta };
        Ok(self.position)
    }

    /// Sample and return the count only if it moved since the last sample.
    pub fn poll_change(&mut self) -> Result<Option<i64>, E::Error> {
        let before = self.position;
        let first = self.last_raw.is_none();
        let now = self.sample()?;
        Ok(if first || now != before { Some(now) } else { None })
    }

    /// Accumulated position in ticks, polarity applied.
    #[inline]
    pub fn ticks(&self) -> i64 {
        self.position
    }

    /// Accumulated position in output-shaft degrees.
    #[inline]
    pub fn degrees(&self) -> f32 {
        ticks_to_degrees(self.position, self.counts_per_rev)
    }

    /// Accumulated position in output-shaft revolutions.
    #[inline]
    pub fn revolutions(&self) -> f32 {
        ticks_to_revs(self.position, self.counts_per_rev)
    }

    /// Configured counts per output revolution.
    #[inline]
    pub fn counts_per_rev(&self) -> f32 {
        self.counts_per_rev
    }

    /// Whether the counting direction is inverted.
    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Zero the accumulated position at the current count.
    pub fn zero(&mut self) {
        self.position = 0;
    }

    /// Access the underlying source.
    pub fn source(&self) -> &E {
        &self.source
    }

    /// Mutable access to the underlying source.
    pub fn source_mut(&mut self) -> &mut E {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockEncoder;

    const CPR: f32 = 600.0;

    // =========================================================================
    // Pure conversions
    // =========================================================================

    #[test]
    fn counts_per_rev_from_gear_ratio() {
        assert_eq!(counts_per_rev(COUNTS_PER_MOTOR_REV, 50.0), 600.0);
    }

    #[test]
    fn degrees_conversion() {
        assert_eq!(ticks_to_degrees(600, CPR), 360.0);
        assert_eq!(ticks_to_degrees(-150, CPR), -90.0);
        assert_eq!(ticks_to_degrees(0, CPR), 0.0);
    }

    #[test]
    fn revolutions_conversion() {
        assert_eq!(ticks_to_revs(1200, CPR), 2.0);
        assert_eq!(ticks_to_revs(-300, CPR), -0.5);
    }

    // =========================================================================
    // Reader
    // =========================================================================

    #[test]
    fn rejects_invalid_counts_per_rev() {
        assert!(EncoderReader::new(MockEncoder::new(), 0.0).is_err());
        assert!(EncoderReader::new(MockEncoder::new(), -600.0).is_err());
        assert!(EncoderReader::new(MockEncoder::new(), f32::NAN).is_err());
    }

    #[test]
    fn first_sample_takes_absolute_count() {
        let mut enc = MockEncoder::new();
        enc.set_count(300);
        let mut reader = EncoderReader::new(enc, CPR).unwrap();
        assert_eq!(reader.sample(), Ok(300));
        assert_eq!(reader.revolutions(), 0.5);
    }

    #[test]
    fn reversed_negates() {
        let mut enc = MockEncoder::new();
        enc.set_count(150);
        let mut reader = EncoderReader::new(enc, CPR).unwrap().reversed(true);
        reader.sample().unwrap();
        assert_eq!(reader.degrees(), -90.0);
        assert!(reader.is_reversed());
    }

    #[test]
    fn survives_i32_wrap() {
        let mut enc = MockEncoder::new();
        enc.set_count(i32::MAX - 5);
        let mut reader = EncoderReader::new(enc, CPR).unwrap();
        reader.sample().unwrap();

        reader.source_mut().set_count(i32::MAX.wrapping_add(5));
        let pos = reader.sample().unwrap();
        assert_eq!(pos, i32::MAX as i64 + 5);
    }

    #[test]
    fn failed_read_keeps_position() {
        let mut enc = MockEncoder::new();
        enc.set_count(100);
        let mut reader = EncoderReader::new(enc, CPR).unwrap();
        reader.sample().unwrap();

        reader.source_mut().fail_next();
        assert!(reader.sample().is_err());
        assert_eq!(reader.ticks(), 100);

        reader.source_mut().set_count(130);
        assert_eq!(reader.sample(), Ok(130));
    }

    #[test]
    fn poll_change_reports_only_movement() {
        let mut reader = EncoderReader::new(MockEncoder::new(), CPR).unwrap();
        assert_eq!(reader.poll_change(), Ok(Some(0)));
        assert_eq!(reader.poll_change(), Ok(None));

        reader.source_mut().set_count(7);
        assert_eq!(reader.poll_change(), Ok(Some(7)));
        assert_eq!(reader.poll_change(), Ok(None));
    }

    #[test]
    fn zero_rebases_position() {
        let mut enc = MockEncoder::new();
        enc.set_count(500);
        let mut reader = EncoderReader::new(enc, CPR).unwrap();
        reader.sample().unwrap();
        reader.zero();
        assert_eq!(reader.ticks(), 0);

        reader.source_mut().set_count(560);
        assert_eq!(reader.sample(), Ok(60));
    }
}
