//! # Regulators
//!
//! The two regulation layers between the follower and the motors:
//!
//! - [`VelocityRegulator`] turns target body velocities into wheel voltages,
//!   sharing the battery voltage between the linear and angular axes.
//! - [`CurrentRegulator`] turns wheel voltages into PWM counts, keeping the
//!   motor current within its limit.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod current;
pub mod params;
pub mod velocity;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use current::*;
pub use params::*;
pub use velocity::*;
