//! Four-wheel drive maneuvers and open-loop throttle scripts.
//!
//! [`DriveSequence`] steps a mecanum-style four-wheel base through a fixed
//! list of [`Maneuver`]s, one per trajectory segment, and turns the current
//! maneuver into per-axis velocity setpoints through a [`WheelLayout`].
//!
//! ```text
//!              FL    FR    RL    RR
//! Forward      +s    +s    +s    +s
//! TurnRight    +s    -s    +s    -s
//! StrafeRight  +s    -s    -s    +s
//! Stop          0     0     0     0
//! ```
//!
//! The reverse, left-turn and left-strafe maneuvers negate their right-hand
//! counterparts.
//!
//! [`ThrottleScript`] is the open-loop counterpart: a timed list of raw
//! throttle steps written to every motor, with no encoder feedback.

use heapless::Vec;

use crate::error::ConfigError;
use crate::throttle::Throttle;
use crate::trajectory::Interpolation;
use crate::traits::{Delay, MotorSink, StopSignal};

/// Maximum number of maneuvers in a [`DriveSequence`].
pub const MAX_MANEUVERS: usize = 16;

/// Maximum number of steps in a [`ThrottleScript`].
pub const MAX_SCRIPT_STEPS: usize = 16;

// ============================================================================
// Maneuver
// ============================================================================

/// One leg of a drive sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Maneuver {
    /// All wheels forward.
    Forward,
    /// All wheels backward.
    Reverse,
    /// Spin clockwise in place.
    TurnRight,
    /// Spin counter-clockwise in place.
    TurnLeft,
    /// Slide sideways to the right.
    StrafeRight,
    /// Slide sideways to the left.
    StrafeLeft,
    /// All wheels at rest.
    Stop,
}

impl Maneuver {
    /// Every maneuver in sequence order.
    pub const ALL: [Maneuver; 7] = [
        Maneuver::Forward,
        Maneuver::Reverse,
        Maneuver::TurnRight,
        Maneuver::TurnLeft,
        Maneuver::StrafeRight,
        Maneuver::StrafeLeft,
        Maneuver::Stop,
    ];

    /// The following maneuver, wrapping after [`Maneuver::Stop`].
    ///
    /// ```
    /// use rs_motorctl::Maneuver;
    ///
    /// assert_eq!(Maneuver::Forward.next(), Maneuver::Reverse);
    /// assert_eq!(Maneuver::Stop.next(), Maneuver::Forward);
    /// ```
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    /// Wheel speeds for this maneuver at `speed`.
    pub fn wheel_speeds(self, speed: f32) -> WheelSpeeds {
        let s = speed;
        match self {
            Maneuver::Forward => WheelSpeeds::new(s, s, s, s),
            Maneuver::Reverse => WheelSpeeds::new(-s, -s, -s, -s),
            Maneuver::TurnRight => WheelSpeeds::new(s, -s, s, -s),
            Maneuver::TurnLeft => WheelSpeeds::new(-s, s, -s, s),
            Maneuver::StrafeRight => WheelSpeeds::new(s, -s, -s, s),
            Maneuver::StrafeLeft => WheelSpeeds::new(-s, s, s, -s),
            Maneuver::Stop => WheelSpeeds::default(),
        }
    }

    /// Returns the maneuver as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Maneuver::Forward => "forward",
            Maneuver::Reverse => "reverse",
            Maneuver::TurnRight => "turn_right",
            Maneuver::TurnLeft => "turn_left",
            Maneuver::StrafeRight => "strafe_right",
            Maneuver::StrafeLeft => "strafe_left",
            Maneuver::Stop => "stop",
        }
    }
}

/// Per-wheel speeds, by wheel position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelSpeeds {
    /// Front left.
    pub front_left: f32,
    /// Front right.
    pub front_right: f32,
    /// Rear left.
    pub rear_left: f32,
    /// Rear right.
    pub rear_right: f32,
}

impl WheelSpeeds {
    /// Build from individual speeds.
    pub const fn new(front_left: f32, front_right: f32, rear_left: f32, rear_right: f32) -> Self {
        Self {
            front_left,
            front_right,
            rear_left,
            rear_right,
        }
    }

    /// Blend two speed sets wheel by wheel.
    pub fn interpolate(&self, to: &WheelSpeeds, interpolation: Interpolation, percent: f32) -> Self {
        let f = |a: f32, b: f32| interpolation.apply(a, b, percent);
        Self {
            front_left: f(self.front_left, to.front_left),
            front_right: f(self.front_right, to.front_right),
            rear_left: f(self.rear_left, to.rear_left),
            rear_right: f(self.rear_right, to.rear_right),
        }
    }
}

// ============================================================================
// Wheel layout
// ============================================================================

/// Which axis drives which wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelLayout {
    /// Axis index of the front-left wheel.
    pub front_left: usize,
    /// Axis index of the front-right wheel.
    pub front_right: usize,
    /// Axis index of the rear-left wheel.
    pub rear_left: usize,
    /// Axis index of the rear-right wheel.
    pub rear_right: usize,
}

impl Default for WheelLayout {
    /// The four-motor board wiring: RR on axis 0, RL on 1, FL on 2, FR on 3.
    fn default() -> Self {
        Self {
            front_left: 2,
            front_right: 3,
            rear_left: 1,
            rear_right: 0,
        }
    }
}

impl WheelLayout {
    fn indices(&self) -> [usize; 4] {
        [
            self.front_left,
            self.front_right,
            self.rear_left,
            self.rear_right,
        ]
    }

    /// Check that every wheel maps to a distinct axis below `axes`.
    pub fn validate(&self, axes: usize) -> Result<(), ConfigError> {
        let idx = self.indices();
        for (i, &a) in idx.iter().enumerate() {
            if a >= axes || idx[..i].contains(&a) {
                return Err(ConfigError::InvalidWheelIndex(a));
            }
        }
        Ok(())
    }

    /// Scatter wheel speeds into an axis-indexed array.
    ///
    /// Axes without a wheel get zero; out-of-range indices are ignored.
    pub fn scatter<const N: usize>(&self, speeds: &WheelSpeeds) -> [f32; N] {
        let mut out = [0.0; N];
        let values = [
            speeds.front_left,
            speeds.front_right,
            speeds.rear_left,
            speeds.rear_right,
        ];
        for (axis, value) in self.indices().into_iter().zip(values) {
            if let Some(slot) = out.get_mut(axis) {
                *slot = value;
            }
        }
        out
    }

    /// Short wheel name for an axis index, e.g. `"FL"`.
    pub fn wheel_name(&self, axis: usize) -> Option<&'static str> {
        match axis {
            a if a == self.front_left => Some("FL"),
            a if a == self.front_right => Some("FR"),
            a if a == self.rear_left => Some("RL"),
            a if a == self.rear_right => Some("RR"),
            _ => None,
        }
    }
}

// ============================================================================
// Drive sequence
// ============================================================================

/// Cycles a four-wheel base through a list of maneuvers.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::{DriveSequence, Maneuver, WheelLayout};
///
/// let mut seq = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
/// assert_eq!(seq.current(), Maneuver::Forward);
/// assert_eq!(seq.setpoints::<4>(1.0), [1.0; 4]);
///
/// seq.advance();
/// assert_eq!(seq.setpoints::<4>(1.0), [-1.0; 4]);
/// ```
#[derive(Clone, Debug)]
pub struct DriveSequence {
    maneuvers: Vec<Maneuver, MAX_MANEUVERS>,
    index: usize,
    previous: Maneuver,
    speed: f32,
    layout: WheelLayout,
    interpolation: Interpolation,
}

impl DriveSequence {
    /// The full seven-maneuver cycle at `speed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidExtent`] unless `speed` is finite and
    /// non-negative.
    pub fn new(speed: f32, layout: WheelLayout) -> Result<Self, ConfigError> {
        Self::with_maneuvers(&Maneuver::ALL, speed, layout)
    }

    /// A custom cycle. Maneuvers beyond [`MAX_MANEUVERS`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySequence`] for an empty list.
    pub fn with_maneuvers(
        maneuvers: &[Maneuver],
        speed: f32,
        layout: WheelLayout,
    ) -> Result<Self, ConfigError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(ConfigError::InvalidExtent(speed));
        }
        let mut stored = Vec::new();
        for &m in maneuvers.iter().take(MAX_MANEUVERS) {
            let _ = stored.push(m);
        }
        if stored.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        Ok(Self {
            maneuvers: stored,
            index: 0,
            previous: Maneuver::Stop,
            speed,
            layout,
            interpolation: Interpolation::Step,
        })
    }

    /// Blend wheel speeds from the previous maneuver over each segment.
    ///
    /// The default, [`Interpolation::Step`], switches at the segment boundary.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// The active maneuver.
    pub fn current(&self) -> Maneuver {
        self.maneuvers[self.index]
    }

    /// Move to the next maneuver, wrapping at the end of the list.
    pub fn advance(&mut self) -> Maneuver {
        self.previous = self.current();
        self.index = (self.index + 1) % self.maneuvers.len();
        self.current()
    }

    /// Axis setpoints `percent` of the way into the current maneuver.
    pub fn setpoints<const N: usize>(&self, percent: f32) -> [f32; N] {
        let from = self.previous.wheel_speeds(self.speed);
        let to = self.current().wheel_speeds(self.speed);
        self.layout
            .scatter(&from.interpolate(&to, self.interpolation, percent))
    }

    /// Position in the maneuver list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of maneuvers in one cycle.
    pub fn len(&self) -> usize {
        self.maneuvers.len()
    }

    /// Always false; a sequence has at least one maneuver.
    pub fn is_empty(&self) -> bool {
        self.maneuvers.is_empty()
    }

    /// Wheel speed magnitude.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// The wheel to axis mapping.
    pub fn layout(&self) -> &WheelLayout {
        &self.layout
    }
}

// ============================================================================
// Open-loop throttle script
// ============================================================================

/// One timed step of a [`ThrottleScript`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleStep {
    /// Throttle written to every motor (before per-motor polarity).
    pub throttle: Throttle,
    /// How long to hold it.
    pub duration_ms: u32,
}

impl ThrottleStep {
    /// Build a step.
    pub const fn new(throttle: Throttle, duration_ms: u32) -> Self {
        Self {
            throttle,
            duration_ms,
        }
    }
}

/// How a script run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Steps applied, across all cycles.
    pub steps_run: u32,
    /// Whether the stop signal ended the run.
    pub stopped: bool,
}

/// Timed open-loop throttle steps.
///
/// The stop signal is checked after each step's hold time. When it fires, or
/// when the requested cycles are done, every motor is released to coast.
///
/// # Example
///
/// ```rust
/// use rs_motorctl::hal::{MockClock, MockDelay, MockMotor, MockStop};
/// use rs_motorctl::traits::Clock;
/// use rs_motorctl::ThrottleScript;
///
/// let clock = MockClock::new();
/// let mut delay = MockDelay::new(&clock);
/// let mut motors = [MockMotor::new(), MockMotor::new()];
/// let mut stop = MockStop::after(3);
///
/// let outcome = ThrottleScript::demo()
///     .run(&mut motors, &[1.0, -1.0], &mut stop, &mut delay, None)
///     .unwrap();
///
/// assert!(outcome.stopped);
/// assert_eq!(outcome.steps_run, 4);
/// assert_eq!(clock.now_us(), 4_000_000);
/// ```
#[derive(Clone, Debug)]
pub struct ThrottleScript {
    steps: Vec<ThrottleStep, MAX_SCRIPT_STEPS>,
}

impl ThrottleScript {
    /// Build a script. Steps beyond [`MAX_SCRIPT_STEPS`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySequence`] for an empty list.
    pub fn new(steps: &[ThrottleStep]) -> Result<Self, ConfigError> {
        let mut stored = Vec::new();
        for &s in steps.iter().take(MAX_SCRIPT_STEPS) {
            let _ = stored.push(s);
        }
        if stored.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        Ok(Self { steps: stored })
    }

    /// Forward slow, brake, forward fast, coast, then the same backwards,
    /// one second each.
    pub fn demo() -> Self {
        const SECOND: u32 = 1000;
        let steps = [
            ThrottleStep::new(Throttle::Drive(0.5), SECOND),
            ThrottleStep::new(Throttle::Brake, SECOND),
            ThrottleStep::new(Throttle::Drive(1.0), SECOND),
            ThrottleStep::new(Throttle::Coast, SECOND),
            ThrottleStep::new(Throttle::Drive(-0.5), SECOND),
            ThrottleStep::new(Throttle::Brake, SECOND),
            ThrottleStep::new(Throttle::Drive(-1.0), SECOND),
            ThrottleStep::new(Throttle::Coast, SECOND),
        ];
        let mut stored = Vec::new();
        for s in steps {
            let _ = stored.push(s);
        }
        Self { steps: stored }
    }

    /// The script's steps.
    pub fn steps(&self) -> &[ThrottleStep] {
        &self.steps
    }

    /// Play the script on `motors`.
    ///
    /// `polarity[i]` scales motor `i`'s drive throttle (missing entries are
    /// `1.0`). `cycles` of `None` repeats until the stop signal fires.
    ///
    /// # Errors
    ///
    /// Returns the first motor error. Motors already written keep their
    /// throttle.
    pub fn run<M, S, D>(
        &self,
        motors: &mut [M],
        polarity: &[f32],
        stop: &mut S,
        delay: &mut D,
        cycles: Option<u32>,
    ) -> Result<ScriptOutcome, M::Error>
    where
        M: MotorSink,
        S: StopSignal,
        D: Delay,
    {
        let mut outcome = ScriptOutcome {
            steps_run: 0,
            stopped: false,
        };
        let mut cycle = 0;
        'cycles: while cycles.map_or(true, |n| cycle < n) {
            for step in self.steps.iter() {
                for (i, motor) in motors.iter_mut().enumerate() {
                    let sign = polarity.get(i).copied().unwrap_or(1.0);
                    motor.set_throttle(step.throttle.scaled(sign))?;
                }
                tracing::debug!(throttle = ?step.throttle, ms = step.duration_ms, "script step");
                outcome.steps_run += 1;
                delay.delay_us(u64::from(step.duration_ms) * 1000);
                if stop.is_pressed() {
                    outcome.stopped = true;
                    break 'cycles;
                }
            }
            cycle += 1;
        }
        for motor in motors.iter_mut() {
            motor.coast()?;
        }
        tracing::info!(steps = outcome.steps_run, stopped = outcome.stopped, "script finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockClock, MockDelay, MockMotor, MockStop};

    // =========================================================================
    // Maneuver Tests
    // =========================================================================

    #[test]
    fn maneuver_cycle_wraps() {
        let mut m = Maneuver::Forward;
        for _ in 0..7 {
            m = m.next();
        }
        assert_eq!(m, Maneuver::Forward);
        assert_eq!(Maneuver::StrafeLeft.next(), Maneuver::Stop);
    }

    #[test]
    fn opposite_maneuvers_negate() {
        let pairs = [
            (Maneuver::Forward, Maneuver::Reverse),
            (Maneuver::TurnRight, Maneuver::TurnLeft),
            (Maneuver::StrafeRight, Maneuver::StrafeLeft),
        ];
        for (a, b) in pairs {
            let x = a.wheel_speeds(1.0);
            let y = b.wheel_speeds(1.0);
            assert_eq!(x.front_left, -y.front_left);
            assert_eq!(x.front_right, -y.front_right);
            assert_eq!(x.rear_left, -y.rear_left);
            assert_eq!(x.rear_right, -y.rear_right);
        }
    }

    #[test]
    fn strafe_right_pattern() {
        assert_eq!(
            Maneuver::StrafeRight.wheel_speeds(2.0),
            WheelSpeeds::new(2.0, -2.0, -2.0, 2.0)
        );
        assert_eq!(Maneuver::Stop.wheel_speeds(2.0), WheelSpeeds::default());
    }

    #[test]
    fn maneuver_names() {
        assert_eq!(Maneuver::TurnLeft.as_str(), "turn_left");
        assert_eq!(Maneuver::Stop.as_str(), "stop");
    }

    // =========================================================================
    // WheelLayout Tests
    // =========================================================================

    #[test]
    fn default_layout_scatter() {
        let layout = WheelLayout::default();
        let axes: [f32; 4] = layout.scatter(&Maneuver::TurnRight.wheel_speeds(1.0));
        // RR, RL, FL, FR
        assert_eq!(axes, [-1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn layout_validation() {
        assert!(WheelLayout::default().validate(4).is_ok());
        assert_eq!(
            WheelLayout::default().validate(3),
            Err(ConfigError::InvalidWheelIndex(3))
        );
        let dup = WheelLayout {
            front_left: 0,
            front_right: 1,
            rear_left: 1,
            rear_right: 2,
        };
        assert_eq!(dup.validate(4), Err(ConfigError::InvalidWheelIndex(1)));
    }

    #[test]
    fn layout_wheel_names() {
        let layout = WheelLayout::default();
        let names: [Option<&str>; 5] = core::array::from_fn(|i| layout.wheel_name(i));
        assert_eq!(names, [Some("RR"), Some("RL"), Some("FL"), Some("FR"), None]);
    }

    #[test]
    fn scatter_into_more_axes_pads_zero() {
        let axes: [f32; 6] = WheelLayout::default().scatter(&Maneuver::Forward.wheel_speeds(1.0));
        assert_eq!(axes, [1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    // =========================================================================
    // DriveSequence Tests
    // =========================================================================

    #[test]
    fn sequence_rejects_bad_input() {
        assert_eq!(
            DriveSequence::new(-1.0, WheelLayout::default()).unwrap_err(),
            ConfigError::InvalidExtent(-1.0)
        );
        assert_eq!(
            DriveSequence::with_maneuvers(&[], 1.0, WheelLayout::default()).unwrap_err(),
            ConfigError::EmptySequence
        );
    }

    #[test]
    fn sequence_wraps_after_stop() {
        let mut seq = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
        assert_eq!(seq.len(), 7);
        for _ in 0..6 {
            seq.advance();
        }
        assert_eq!(seq.current(), Maneuver::Stop);
        assert_eq!(seq.setpoints::<4>(0.5), [0.0; 4]);
        assert_eq!(seq.advance(), Maneuver::Forward);
        assert_eq!(seq.index(), 0);
    }

    #[test]
    fn step_interpolation_switches_immediately() {
        let mut seq = DriveSequence::new(1.0, WheelLayout::default()).unwrap();
        seq.advance();
        assert_eq!(seq.setpoints::<4>(0.0), [-1.0; 4]);
    }

    #[test]
    fn linear_interpolation_blends_from_previous() {
        let mut seq = DriveSequence::new(1.0, WheelLayout::default())
            .unwrap()
            .with_interpolation(Interpolation::Linear);
        // Starts from rest
        assert_eq!(seq.setpoints::<4>(0.5), [0.5; 4]);
        seq.advance();
        assert_eq!(seq.setpoints::<4>(0.5), [0.0; 4]);
        assert_eq!(seq.setpoints::<4>(1.0), [-1.0; 4]);
    }

    #[test]
    fn custom_sequence() {
        let mut seq = DriveSequence::with_maneuvers(
            &[Maneuver::StrafeLeft, Maneuver::Stop],
            0.5,
            WheelLayout::default(),
        )
        .unwrap();
        assert_eq!(seq.current(), Maneuver::StrafeLeft);
        seq.advance();
        seq.advance();
        assert_eq!(seq.current(), Maneuver::StrafeLeft);
        assert_eq!(seq.speed(), 0.5);
    }

    // =========================================================================
    // ThrottleScript Tests
    // =========================================================================

    #[test]
    fn script_rejects_empty() {
        assert_eq!(ThrottleScript::new(&[]).unwrap_err(), ConfigError::EmptySequence);
    }

    #[test]
    fn demo_script_shape() {
        let script = ThrottleScript::demo();
        assert_eq!(script.steps().len(), 8);
        assert_eq!(script.steps()[1].throttle, Throttle::Brake);
        assert_eq!(script.steps()[3].throttle, Throttle::Coast);
    }

    #[test]
    fn script_runs_cycles_then_coasts() {
        let clock = MockClock::new();
        let mut delay = MockDelay::new(&clock);
        let mut motors = [MockMotor::new(), MockMotor::new()];
        let script = ThrottleScript::new(&[
            ThrottleStep::new(Throttle::Drive(0.5), 10),
            ThrottleStep::new(Throttle::Brake, 20),
        ])
        .unwrap();

        let outcome = script
            .run(&mut motors, &[1.0, -1.0], &mut MockStop::new(), &mut delay, Some(2))
            .unwrap();

        assert_eq!(outcome, ScriptOutcome { steps_run: 4, stopped: false });
        assert_eq!(delay.total_us(), 60_000);
        assert_eq!(
            motors[1].history,
            [
                Throttle::Drive(-0.5),
                Throttle::Brake,
                Throttle::Drive(-0.5),
                Throttle::Brake,
                Throttle::Coast
            ]
        );
        assert_eq!(motors[0].throttle, Throttle::Coast);
    }

    #[test]
    fn script_stop_checked_after_each_step() {
        let clock = MockClock::new();
        let mut delay = MockDelay::new(&clock);
        let mut motors = [MockMotor::new()];
        let mut stop = MockStop::after(0);

        let outcome = ThrottleScript::demo()
            .run(&mut motors, &[], &mut stop, &mut delay, None)
            .unwrap();

        assert_eq!(outcome, ScriptOutcome { steps_run: 1, stopped: true });
        assert_eq!(motors[0].history, [Throttle::Drive(0.5), Throttle::Coast]);
    }

    #[test]
    fn script_propagates_motor_error() {
        let clock = MockClock::new();
        let mut delay = MockDelay::new(&clock);
        let mut motors = [MockMotor::failing()];
        let result = ThrottleScript::demo().run(
            &mut motors,
            &[],
            &mut MockStop::new(),
            &mut delay,
            Some(1),
        );
        assert_eq!(result, Err(()));
        assert!(delay.delays.is_empty());
    }
}
