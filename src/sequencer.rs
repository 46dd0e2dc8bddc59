//! Multi-axis coordination under one shared update tick.
//!
//! A [`Sequencer`] owns `N` [`Axis`] loops and a [`Program`] that decides
//! their setpoints. Every call to [`tick`](Sequencer::tick) runs one control
//! period:
//!
//! 1. sample every encoder
//! 2. compute the shared `percent_along` of the current segment
//! 3. derive each axis setpoint from the program
//! 4. run each axis controller and write its motor
//! 5. count the update; on segment completion rotate the program
//!
//! All encoders are sampled before any motor is written, so every axis in a
//! tick sees measurements from the same instant.
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::{
//!     Axis, ControlMode, EncoderReader, Interpolation, OutputMapper, PidController,
//!     PidGains, Program, Segment, Sequencer,
//!     hal::{MockEncoder, MockMotor},
//! };
//!
//! let axis = |name| {
//!     Axis::new(
//!         name,
//!         EncoderReader::new(MockEncoder::new(), 600.0).unwrap(),
//!         PidController::new(PidGains::new(0.14, 0.0, 0.0022), 0.01).unwrap(),
//!         OutputMapper::new(ControlMode::Position, 5.4, 0.01).unwrap(),
//!         MockMotor::new(),
//!     )
//! };
//!
//! let program = Program::Shared {
//!     segment: Segment::oscillate(0.0, 270.0, Interpolation::Cosine),
//!     polarity: [1.0, -1.0],
//! };
//! let mut seq = Sequencer::new([axis("A"), axis("B")], program, 100).unwrap();
//!
//! let report = seq.tick().unwrap();
//! assert_eq!(report.setpoints, [0.0, 0.0]);
//! ```

use crate::axis::{Axis, AxisState};
use crate::drive::{DriveSequence, Maneuver};
use crate::error::ConfigError;
use crate::throttle::Throttle;
use crate::trajectory::{Segment, SegmentCounter};
use crate::traits::{EncoderSource, MotorSink};

/// What the axes should be doing.
#[derive(Clone, Debug)]
pub enum Program<const N: usize> {
    /// One segment for every axis, each scaled by a static sign.
    Shared {
        /// The common segment.
        segment: Segment,
        /// Per-axis multiplier, usually `1.0` or `-1.0`.
        polarity: [f32; N],
    },
    /// An independent segment per axis, rotated together.
    PerAxis([Segment; N]),
    /// A four-wheel maneuver cycle, one maneuver per segment.
    Drive(DriveSequence),
}

impl<const N: usize> Program<N> {
    /// One segment, same sign on every axis.
    pub fn shared(segment: Segment) -> Self {
        Program::Shared {
            segment,
            polarity: [1.0; N],
        }
    }

    fn setpoints(&self, percent: f32) -> [f32; N] {
        match self {
            Program::Shared { segment, polarity } => {
                let value = segment.value_at(percent);
                core::array::from_fn(|i| value * polarity[i])
            }
            Program::PerAxis(segments) => {
                core::array::from_fn(|i| segments[i].value_at(percent))
            }
            Program::Drive(sequence) => sequence.setpoints(percent),
        }
    }

    fn rotate(&mut self) {
        match self {
            Program::Shared { segment, .. } => segment.rotate(),
            Program::PerAxis(segments) => segments.iter_mut().for_each(Segment::rotate),
            Program::Drive(sequence) => {
                sequence.advance();
            }
        }
    }

    /// The active maneuver, for drive programs.
    pub fn maneuver(&self) -> Option<Maneuver> {
        match self {
            Program::Drive(sequence) => Some(sequence.current()),
            _ => None,
        }
    }
}

/// Outcome of one [`Sequencer::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport<const N: usize> {
    /// Tick number, starting at zero.
    pub tick: u64,
    /// Segment progress used for this tick.
    pub percent: f32,
    /// Setpoint given to each axis.
    pub setpoints: [f32; N],
    /// Throttle each axis holds after the tick.
    pub throttles: [Throttle; N],
    /// Whether each axis had a fresh encoder sample.
    pub fresh: [bool; N],
    /// Whether this tick finished a segment.
    pub segment_complete: bool,
}

impl<const N: usize> TickReport<N> {
    /// Number of axes whose update was skipped.
    pub fn stale_axes(&self) -> usize {
        self.fresh.iter().filter(|f| !**f).count()
    }
}

/// Runs `N` axes against a shared program.
pub struct Sequencer<E: EncoderSource, M: MotorSink, const N: usize> {
    axes: [Axis<E, M>; N],
    program: Program<N>,
    counter: SegmentCounter,
    telemetry_divider: u32,
    print_count: u32,
    ticks: u64,
    segments: u64,
}

impl<E: EncoderSource, M: MotorSink, const N: usize> Sequencer<E, M, N> {
    /// Create a sequencer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWheelIndex`] if a drive program's wheel
    /// layout does not fit `N` axes.
    pub fn new(
        axes: [Axis<E, M>; N],
        program: Program<N>,
        updates_per_segment: u32,
    ) -> Result<Self, ConfigError> {
        if let Program::Drive(sequence) = &program {
            sequence.layout().validate(N)?;
        }
        Ok(Self {
            axes,
            program,
            counter: SegmentCounter::new(updates_per_segment),
            telemetry_divider: 1,
            print_count: 0,
            ticks: 0,
            segments: 0,
        })
    }

    /// Emit per-axis telemetry only every `divider` ticks (`0` is treated as 1).
    pub fn with_telemetry_divider(mut self, divider: u32) -> Self {
        self.telemetry_divider = divider.max(1);
        self
    }

    /// Setpoints for the current point of the current segment.
    pub fn setpoints(&self) -> [f32; N] {
        self.program.setpoints(self.counter.percent_along())
    }

    /// Run one control period.
    ///
    /// # Errors
    ///
    /// Returns the first motor error. Axes after the failing one keep their
    /// previous throttle for this tick.
    pub fn tick(&mut self) -> Result<TickReport<N>, M::Error> {
        let mut fresh = [false; N];
        for (axis, f) in self.axes.iter_mut().zip(fresh.iter_mut()) {
            *f = axis.sample();
        }

        let percent = self.counter.percent_along();
        let setpoints = self.program.setpoints(percent);

        for (axis, &sp) in self.axes.iter_mut().zip(setpoints.iter()) {
            axis.drive(sp)?;
        }

        if self.print_count == 0 {
            for axis in &self.axes {
                let s = axis.state();
                tracing::debug!(
                    axis = %s.name,
                    degrees = s.degrees,
                    velocity = s.velocity,
                    setpoint = s.setpoint,
                    throttle = s.throttle.as_f32(),
                    "sample"
                );
            }
        }
        self.print_count = (self.print_count + 1) % self.telemetry_divider;

        let report = TickReport {
            tick: self.ticks,
            percent,
            setpoints,
            throttles: core::array::from_fn(|i| self.axes[i].throttle()),
            fresh,
            segment_complete: self.counter.advance(),
        };
        self.ticks += 1;

        if report.segment_complete {
            self.program.rotate();
            self.segments += 1;
            match self.program.maneuver() {
                Some(m) => tracing::info!(segment = self.segments, maneuver = m.as_str(), "next maneuver"),
                None => tracing::info!(segment = self.segments, "next segment"),
            }
        }

        Ok(report)
    }

    /// Release every motor to coast and clear controller history.
    ///
    /// Every axis is attempted; the first error is returned.
    pub fn release_all(&mut self) -> Result<(), M::Error> {
        let mut first_err = None;
        for axis in self.axes.iter_mut() {
            if let Err(e) = axis.release() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Snapshot of every axis.
    pub fn states(&self) -> [AxisState; N] {
        core::array::from_fn(|i| self.axes[i].state())
    }

    /// The axes.
    pub fn axes(&self) -> &[Axis<E, M>; N] {
        &self.axes
    }

    /// Mutable access to the axes.
    pub fn axes_mut(&mut self) -> &mut [Axis<E, M>; N] {
        &mut self.axes
    }

    /// The running program.
    pub fn program(&self) -> &Program<N> {
        &self.program
    }

    /// The shared segment counter.
    pub fn counter(&self) -> &SegmentCounter {
        &self.counter
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Segments completed so far.
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Give back the axes.
    pub fn into_axes(self) -> [Axis<E, M>; N] {
        self.axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::WheelLayout;
    use crate::encoder::EncoderReader;
    use crate::hal::{MockEncoder, MockMotor};
    use crate::pid::{PidController, PidGains};
    use crate::throttle::{ControlMode, OutputMapper};
    use crate::trajectory::Interpolation;

    const DT: f32 = 0.01;

    fn position_axis(name: &str) -> Axis<MockEncoder, MockMotor> {
        Axis::new(
            name,
            EncoderReader::new(MockEncoder::new(), 600.0).unwrap(),
            PidController::new(PidGains::new(0.14, 0.0, 0.0022), DT).unwrap(),
            OutputMapper::new(ControlMode::Position, 5.4, DT).unwrap(),
            MockMotor::new(),
        )
    }

    fn velocity_axis(name: &str) -> Axis<MockEncoder, MockMotor> {
        Axis::new(
            name,
            EncoderReader::new(MockEncoder::new(), 600.0).unwrap(),
            PidController::new(PidGains::new(30.0, 0.0, 0.4), DT).unwrap(),
            OutputMapper::new(ControlMode::Velocity, 5.4, DT).unwrap(),
            MockMotor::new(),
        )
    }

    fn wave(polarity: [f32; 2]) -> Sequencer<MockEncoder, MockMotor, 2> {
        let program = Program::Shared {
            segment: Segment::oscillate(0.0, 270.0, Interpolation::Linear),
            polarity,
        };
        Sequencer::new([position_axis("A"), position_axis("B")], program, 10).unwrap()
    }

    // =========================================================================
    // Shared program
    // =========================================================================

    #[test]
    fn shared_setpoints_follow_percent() {
        let mut seq = wave([1.0, 1.0]);
        let first = seq.tick().unwrap();
        assert_eq!(first.percent, 0.0);
        assert_eq!(first.setpoints, [0.0, 0.0]);

        let second = seq.tick().unwrap();
        assert!((second.setpoints[0] - 27.0).abs() < 1e-3);
        assert_eq!(second.tick, 1);
    }

    #[test]
    fn polarity_mirrors_axis() {
        let mut seq = wave([1.0, -1.0]);
        seq.tick().unwrap();
        let r = seq.tick().unwrap();
        assert_eq!(r.setpoints[0], -r.setpoints[1]);
        assert!(r.throttles[0].as_f32() > 0.0);
        assert!(r.throttles[1].as_f32() < 0.0);
    }

    #[test]
    fn segment_completes_and_oscillates() {
        let mut seq = wave([1.0, 1.0]);
        for i in 0..10 {
            let r = seq.tick().unwrap();
            assert_eq!(r.segment_complete, i == 9);
        }
        assert_eq!(seq.segments(), 1);
        assert_eq!(seq.counter().elapsed(), 0);
        // Swapped: next segment starts at 270
        assert_eq!(seq.setpoints(), [270.0, 270.0]);
    }

    #[test]
    fn zero_length_segment_jumps_to_end() {
        let program = Program::shared(Segment::oscillate(0.0, 90.0, Interpolation::Cosine));
        let mut seq = Sequencer::new([position_axis("A")], program, 0).unwrap();
        let r = seq.tick().unwrap();
        assert_eq!(r.percent, 1.0);
        assert_eq!(r.setpoints, [90.0]);
        assert!(r.segment_complete);
    }

    // =========================================================================
    // Per-axis program
    // =========================================================================

    #[test]
    fn per_axis_segments_rotate_together() {
        let program = Program::PerAxis([
            Segment::oscillate(0.0, 10.0, Interpolation::Step),
            Segment::waypoints(0.0, &[5.0, -5.0], Interpolation::Step).unwrap(),
        ]);
        let mut seq =
            Sequencer::new([position_axis("A"), position_axis("B")], program, 1).unwrap();
        assert_eq!(seq.tick().unwrap().setpoints, [10.0, 5.0]);
        assert_eq!(seq.tick().unwrap().setpoints, [0.0, -5.0]);
        assert_eq!(seq.tick().unwrap().setpoints, [10.0, 5.0]);
    }

    // =========================================================================
    // Drive program
    // =========================================================================

    fn quad() -> Sequencer<MockEncoder, MockMotor, 4> {
        let drive = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
        Sequencer::new(
            [
                velocity_axis("RR"),
                velocity_axis("RL"),
                velocity_axis("FL"),
                velocity_axis("FR"),
            ],
            Program::Drive(drive),
            2,
        )
        .unwrap()
    }

    #[test]
    fn drive_program_cycles_maneuvers() {
        let mut seq = quad();
        assert_eq!(seq.program().maneuver(), Some(Maneuver::Forward));
        assert_eq!(seq.tick().unwrap().setpoints, [1.0; 4]);
        seq.tick().unwrap();
        assert_eq!(seq.program().maneuver(), Some(Maneuver::Reverse));
        assert_eq!(seq.tick().unwrap().setpoints, [-1.0; 4]);
        seq.tick().unwrap();
        // TurnRight: RR -, RL +, FL +, FR -
        assert_eq!(seq.tick().unwrap().setpoints, [-1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn drive_program_wraps_after_stop() {
        let mut seq = quad();
        for _ in 0..14 {
            seq.tick().unwrap();
        }
        assert_eq!(seq.segments(), 7);
        assert_eq!(seq.program().maneuver(), Some(Maneuver::Forward));
    }

    #[test]
    fn drive_layout_must_fit_axes() {
        let drive = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
        let result = Sequencer::new(
            [velocity_axis("A"), velocity_axis("B")],
            Program::Drive(drive),
            100,
        );
        assert!(matches!(result, Err(ConfigError::InvalidWheelIndex(_))));
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn encoder_failure_skips_only_that_axis() {
        let mut seq = wave([1.0, 1.0]);
        seq.tick().unwrap();
        seq.tick().unwrap();
        let held = seq.axes()[1].throttle();
        let calls = seq.axes()[1].motor().call_count;

        seq.axes_mut()[1].encoder_mut().source_mut().fail_next();
        let r = seq.tick().unwrap();

        assert_eq!(r.fresh, [true, false]);
        assert_eq!(r.stale_axes(), 1);
        assert_eq!(r.throttles[1], held);
        assert_eq!(seq.axes()[1].motor().call_count, calls);
        assert_eq!(seq.axes()[0].motor().call_count, 3);

        // Recovers on the next tick
        let r = seq.tick().unwrap();
        assert_eq!(r.fresh, [true, true]);
    }

    #[test]
    fn motor_error_propagates() {
        let mut axes = [position_axis("A")];
        axes[0].motor_mut().fail = true;
        let mut seq = Sequencer::new(
            axes,
            Program::shared(Segment::hold(0.0, 90.0, Interpolation::Step)),
            10,
        )
        .unwrap();
        assert_eq!(seq.tick(), Err(()));
    }

    #[test]
    fn release_all_coasts_every_motor() {
        let mut seq = wave([1.0, 1.0]);
        seq.tick().unwrap();
        seq.release_all().unwrap();
        for axis in seq.axes() {
            assert_eq!(axis.motor().throttle, Throttle::Coast);
        }
    }

    #[test]
    fn states_snapshot_names() {
        let seq = wave([1.0, 1.0]).with_telemetry_divider(4);
        let states = seq.states();
        assert_eq!(states[0].name.as_str(), "A");
        assert_eq!(states[1].name.as_str(), "B");
    }
}
