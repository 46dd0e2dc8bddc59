//! Generic drivers over `embedded-hal` 1.0.
//!
//! These adapt any board's PWM channels and GPIO inputs to the collaborator
//! traits, so the control core runs unchanged on any HAL that implements
//! `embedded-hal` 1.0.
//!
//! | Driver | Trait | Hardware |
//! |--------|-------|----------|
//! | [`HBridge`] | [`MotorSink`] | Two PWM channels, one per bridge leg |
//! | [`QuadratureDecoder`] | [`EncoderSource`] | Two GPIO inputs (A, B) |
//! | [`ActiveLowButton`] | [`StopSignal`] | One GPIO input with pull-up |
//!
//! # H-bridge control logic
//!
//! | Throttle | Fast decay | Slow decay |
//! |----------|------------|------------|
//! | `Drive(+d)` | A = d, B = 0 | A = 100%, B = 1 - d |
//! | `Drive(-d)` | A = 0, B = d | A = 1 - d, B = 100% |
//! | `Brake` | A = 100%, B = 100% | same |
//! | `Coast` | A = 0, B = 0 | same |

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::throttle::{DecayMode, Throttle};
use crate::traits::{EncoderSource, MotorSink, StopSignal};

// ============================================================================
// H-bridge
// ============================================================================

/// Two-leg H-bridge driven by a pair of PWM channels.
///
/// # Example
///
/// ```ignore
/// use rs_motorctl::hal::embedded::HBridge;
/// use rs_motorctl::{DecayMode, Throttle};
/// use rs_motorctl::traits::MotorSink;
///
/// let mut motor = HBridge::new(pwm_a, pwm_b, DecayMode::Slow)?;
/// motor.set_throttle(Throttle::Drive(0.5))?;
/// ```
pub struct HBridge<A, B> {
    leg_a: A,
    leg_b: B,
    decay: DecayMode,
}

impl<A, B> HBridge<A, B>
where
    A: SetDutyCycle,
    B: SetDutyCycle<Error = A::Error>,
{
    /// Creates the driver and releases both legs.
    ///
    /// # Errors
    ///
    /// Returns the PWM error if the initial write fails.
    pub fn new(leg_a: A, leg_b: B, decay: DecayMode) -> Result<Self, A::Error> {
        let mut bridge = Self {
            leg_a,
            leg_b,
            decay,
        };
        bridge.set_throttle(Throttle::Coast)?;
        Ok(bridge)
    }

    /// Current decay mode.
    pub fn decay(&self) -> DecayMode {
        self.decay
    }

    /// Change the decay mode. Takes effect on the next write.
    pub fn set_decay(&mut self, decay: DecayMode) {
        self.decay = decay;
    }

    /// Release the PWM channels.
    pub fn release(self) -> (A, B) {
        (self.leg_a, self.leg_b)
    }
}

fn set_fraction<P: SetDutyCycle>(pin: &mut P, fraction: f32) -> Result<(), P::Error> {
    let max = pin.max_duty_cycle();
    let duty = (f32::from(max) * fraction.clamp(0.0, 1.0)) as u16;
    pin.set_duty_cycle(duty)
}

impl<A, B> MotorSink for HBridge<A, B>
where
    A: SetDutyCycle,
    B: SetDutyCycle<Error = A::Error>,
{
    type Error = A::Error;

    fn set_throttle(&mut self, throttle: Throttle) -> Result<(), A::Error> {
        match throttle {
            Throttle::Brake => {
                self.leg_a.set_duty_cycle_fully_on()?;
                self.leg_b.set_duty_cycle_fully_on()
            }
            Throttle::Coast => {
                self.leg_a.set_duty_cycle_fully_off()?;
                self.leg_b.set_duty_cycle_fully_off()
            }
            Throttle::Drive(v) => {
                let duty = v.abs().min(1.0);
                match (self.decay, v > 0.0) {
                    (DecayMode::Fast, true) => {
                        set_fraction(&mut self.leg_a, duty)?;
                        self.leg_b.set_duty_cycle_fully_off()
                    }
                    (DecayMode::Fast, false) => {
                        self.leg_a.set_duty_cycle_fully_off()?;
                        set_fraction(&mut self.leg_b, duty)
                    }
                    (DecayMode::Slow, true) => {
                        self.leg_a.set_duty_cycle_fully_on()?;
                        set_fraction(&mut self.leg_b, 1.0 - duty)
                    }
                    (DecayMode::Slow, false) => {
                        set_fraction(&mut self.leg_a, 1.0 - duty)?;
                        self.leg_b.set_duty_cycle_fully_on()
                    }
                }
            }
        }
    }
}

// ============================================================================
// Quadrature decoder
// ============================================================================

/// Transition table indexed by `(previous << 2) | current`, with the state
/// packed as `(a << 1) | b`. Invalid double-edge transitions count zero.
const QUADRATURE_TABLE: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Software 4x quadrature decoder over two GPIO inputs.
///
/// Counts every edge of both channels. [`poll`](Self::poll) must run faster
/// than the fastest expected edge rate; [`read`](EncoderSource::read) polls
/// once before returning the count. Boards with a hardware counter should
/// implement [`EncoderSource`] on that instead.
pub struct QuadratureDecoder<A, B> {
    pin_a: A,
    pin_b: B,
    state: u8,
    count: i32,
    missed: u32,
}

impl<A, B> QuadratureDecoder<A, B>
where
    A: InputPin,
    B: InputPin<Error = A::Error>,
{
    /// Creates the decoder, latching the current pin levels as the baseline.
    ///
    /// # Errors
    ///
    /// Returns the GPIO error if a pin cannot be read.
    pub fn new(mut pin_a: A, mut pin_b: B) -> Result<Self, A::Error> {
        let state = Self::levels(&mut pin_a, &mut pin_b)?;
        Ok(Self {
            pin_a,
            pin_b,
            state,
            count: 0,
            missed: 0,
        })
    }

    fn levels(pin_a: &mut A, pin_b: &mut B) -> Result<u8, A::Error> {
        Ok(((pin_a.is_high()? as u8) << 1) | pin_b.is_high()? as u8)
    }

    /// Sample both pins and fold any edge into the count.
    pub fn poll(&mut self) -> Result<(), A::Error> {
        let next = Self::levels(&mut self.pin_a, &mut self.pin_b)?;
        if next != self.state {
            let index = usize::from((self.state << 2) | next);
            let step = QUADRATURE_TABLE[index];
            if step == 0 {
                self.missed = self.missed.saturating_add(1);
            }
            self.count = self.count.wrapping_add(i32::from(step));
            self.state = next;
        }
        Ok(())
    }

    /// Current count without polling.
    pub fn count(&self) -> i32 {
        self.count
    }

    /// Transitions where both channels changed between polls.
    pub fn missed(&self) -> u32 {
        self.missed
    }
}

impl<A, B> EncoderSource for QuadratureDecoder<A, B>
where
    A: InputPin,
    B: InputPin<Error = A::Error>,
{
    type Error = A::Error;

    fn read(&mut self) -> Result<i32, A::Error> {
        self.poll()?;
        Ok(self.count)
    }
}

// ============================================================================
// Stop button
// ============================================================================

/// Push button wired to ground with a pull-up; pressed reads low.
///
/// A pin read error reports released.
pub struct ActiveLowButton<P> {
    pin: P,
}

impl<P: InputPin> ActiveLowButton<P> {
    /// Wrap an input pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> StopSignal for ActiveLowButton<P> {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }
}
