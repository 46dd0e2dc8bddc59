//! Simulated DC motors for desktop runs.
//!
//! A [`SimPlant`] holds a set of first-order motor models. Each model is
//! shared between a [`SimMotor`] (the sink the controller writes) and a
//! [`SimEncoder`] (the source it reads), so closing the loop in simulation is
//! the same code path as on hardware:
//!
//! ```text
//! drive:  dv/dt = (throttle * free_speed - v) / time_constant
//! brake:  dv/dt = -v / brake_time_constant
//! coast:  dv/dt = -v / coast_time_constant
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_motorctl::hal::sim::{MotorModel, SimPlant};
//! use rs_motorctl::traits::{EncoderSource, MotorSink};
//! use rs_motorctl::Throttle;
//!
//! let mut plant = SimPlant::new();
//! let (mut encoder, mut motor) = plant.add_motor(MotorModel::default());
//!
//! motor.set_throttle(Throttle::Drive(1.0)).unwrap();
//! for _ in 0..100 {
//!     plant.step(0.01);
//! }
//! assert!(encoder.read().unwrap() > 0);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::throttle::Throttle;
use crate::traits::{EncoderSource, MotorSink};

/// Physical parameters of one simulated motor.
#[derive(Clone, Debug)]
pub struct MotorModel {
    /// Output shaft speed at full throttle, revolutions per second.
    pub free_speed_rps: f32,
    /// Drive response time constant in seconds.
    pub time_constant_s: f32,
    /// Deceleration time constant while braked.
    pub brake_time_constant_s: f32,
    /// Deceleration time constant while coasting.
    pub coast_time_constant_s: f32,
    /// Encoder counts per output revolution.
    pub counts_per_rev: f32,
}

impl Default for MotorModel {
    fn default() -> Self {
        Self {
            free_speed_rps: 5.4,
            time_constant_s: 0.05,
            brake_time_constant_s: 0.02,
            coast_time_constant_s: 0.5,
            counts_per_rev: 600.0,
        }
    }
}

#[derive(Debug)]
struct MotorState {
    model: MotorModel,
    throttle: Throttle,
    velocity_rps: f32,
    revolutions: f64,
    dropout: Option<(f32, SmallRng)>,
}

impl MotorState {
    fn step(&mut self, dt: f32) {
        let m = &self.model;
        let (target, tau) = match self.throttle {
            Throttle::Drive(v) => (v * m.free_speed_rps, m.time_constant_s),
            Throttle::Brake => (0.0, m.brake_time_constant_s),
            Throttle::Coast => (0.0, m.coast_time_constant_s),
        };
        let alpha = (dt / tau).min(1.0);
        self.velocity_rps += (target - self.velocity_rps) * alpha;
        self.revolutions += f64::from(self.velocity_rps * dt);
    }

    fn count(&self) -> i32 {
        (self.revolutions * f64::from(self.model.counts_per_rev)) as i64 as i32
    }
}

/// Error returned by a [`SimEncoder`] when a dropout is simulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimDropout;

/// A set of simulated motors advanced together.
#[derive(Debug, Default)]
pub struct SimPlant {
    motors: Vec<Rc<RefCell<MotorState>>>,
}

impl SimPlant {
    /// An empty plant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a motor, returning its encoder and motor handles.
    pub fn add_motor(&mut self, model: MotorModel) -> (SimEncoder, SimMotor) {
        let state = Rc::new(RefCell::new(MotorState {
            model,
            throttle: Throttle::Brake,
            velocity_rps: 0.0,
            revolutions: 0.0,
            dropout: None,
        }));
        self.motors.push(Rc::clone(&state));
        (
            SimEncoder {
                state: Rc::clone(&state),
            },
            SimMotor { state },
        )
    }

    /// Make encoder `index` fail a fraction of its reads.
    pub fn set_dropout(&mut self, index: usize, probability: f32, seed: u64) {
        if let Some(motor) = self.motors.get(index) {
            motor.borrow_mut().dropout = Some((probability, SmallRng::seed_from_u64(seed)));
        }
    }

    /// Advance every motor by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        for motor in &self.motors {
            motor.borrow_mut().step(dt);
        }
    }

    /// Number of motors.
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// Returns true if no motors were added.
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    /// Shaft position of motor `index` in revolutions.
    pub fn revolutions(&self, index: usize) -> Option<f64> {
        self.motors.get(index).map(|m| m.borrow().revolutions)
    }

    /// Shaft speed of motor `index` in revolutions per second.
    pub fn velocity(&self, index: usize) -> Option<f32> {
        self.motors.get(index).map(|m| m.borrow().velocity_rps)
    }
}

/// Encoder handle of a simulated motor.
#[derive(Debug)]
pub struct SimEncoder {
    state: Rc<RefCell<MotorState>>,
}

impl EncoderSource for SimEncoder {
    type Error = SimDropout;

    fn read(&mut self) -> Result<i32, SimDropout> {
        let mut state = self.state.borrow_mut();
        if let Some((probability, rng)) = state.dropout.as_mut() {
            if rng.gen::<f32>() < *probability {
                return Err(SimDropout);
            }
        }
        Ok(state.count())
    }
}

/// Motor handle of a simulated motor.
#[derive(Debug)]
pub struct SimMotor {
    state: Rc<RefCell<MotorState>>,
}

impl MotorSink for SimMotor {
    type Error = core::convert::Infallible;

    fn set_throttle(&mut self, throttle: Throttle) -> Result<(), Self::Error> {
        self.state.borrow_mut().throttle = throttle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_throttle_approaches_free_speed() {
        let mut plant = SimPlant::new();
        let (_enc, mut motor) = plant.add_motor(MotorModel::default());
        motor.set_throttle(Throttle::Drive(1.0)).unwrap();
        for _ in 0..200 {
            plant.step(0.01);
        }
        let v = plant.velocity(0).unwrap();
        assert!((v - 5.4).abs() < 0.01);
    }

    #[test]
    fn brake_stops_faster_than_coast() {
        let mut plant = SimPlant::new();
        let (_e1, mut braked) = plant.add_motor(MotorModel::default());
        let (_e2, mut coasting) = plant.add_motor(MotorModel::default());
        braked.set_throttle(Throttle::Drive(1.0)).unwrap();
        coasting.set_throttle(Throttle::Drive(1.0)).unwrap();
        for _ in 0..100 {
            plant.step(0.01);
        }
        braked.brake().unwrap();
        coasting.coast().unwrap();
        for _ in 0..10 {
            plant.step(0.01);
        }
        assert!(plant.velocity(0).unwrap() < plant.velocity(1).unwrap());
    }

    #[test]
    fn encoder_counts_follow_revolutions() {
        let mut plant = SimPlant::new();
        let (mut enc, mut motor) = plant.add_motor(MotorModel::default());
        motor.set_throttle(Throttle::Drive(-0.5)).unwrap();
        for _ in 0..100 {
            plant.step(0.01);
        }
        let revs = plant.revolutions(0).unwrap();
        let count = enc.read().unwrap();
        assert!(count < 0);
        assert!((f64::from(count) - revs * 600.0).abs() <= 1.0);
    }

    #[test]
    fn dropout_fails_some_reads() {
        let mut plant = SimPlant::new();
        let (mut enc, _motor) = plant.add_motor(MotorModel::default());
        plant.set_dropout(0, 0.5, 7);
        let failures = (0..200).filter(|_| enc.read().is_err()).count();
        assert!(failures > 20 && failures < 180);
    }

    #[test]
    fn empty_plant() {
        let plant = SimPlant::new();
        assert!(plant.is_empty());
        assert_eq!(plant.len(), 0);
        assert_eq!(plant.revolutions(0), None);
    }
}
