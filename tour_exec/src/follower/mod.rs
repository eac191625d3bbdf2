//! # Follower module
//!
//! The follower turns a compiled [`Course`](crate::course::Course) into a
//! target linear and angular velocity each control tick.
//!
//! Each route is driven in `Movement` mode using pure pursuit: a goal point
//! is found where a circle of radius `look_ahead_cm` around the robot meets
//! the route, and the robot steers towards it. The speed is planned so that
//! the route is finished by its deadline, limited by the course's velocity
//! limits and the maximum acceleration. Speed never drops below the minimum
//! velocity, so the robot always crosses the end of the route.
//!
//! Between routes the robot stops and turns on the spot in `Rotation` mode
//! until it faces along the next route. Once the last route is done the
//! follower is `Finished` and commands zero velocity forever.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod movement;
pub mod params;
mod rotation;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use movement::{plan_speed, Movement};
pub use params::{Params, ParamsError, RotationParams};
pub use rotation::{route_heading, Rotation};
pub use state::*;
