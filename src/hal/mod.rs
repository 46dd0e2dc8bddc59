//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `sim`: First-order DC motor plant for closed-loop simulation (requires `std`)
//! - `std_time`: `std::time` clock and sleeping delay (requires `std`)
//! - `embedded`: H-bridge, quadrature decoder and stop button over
//!   `embedded-hal` 1.0 (requires `embedded-hal` feature)

pub mod mock;

#[cfg(feature = "std")]
pub mod sim;

#[cfg(feature = "std")]
pub mod std_time;

#[cfg(feature = "embedded-hal")]
pub mod embedded;

pub use mock::*;

#[cfg(feature = "std")]
pub use std_time::{StdClock, StdDelay};
