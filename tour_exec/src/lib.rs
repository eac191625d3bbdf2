//! # Robot Tour library.
//!
//! This library allows the executables and benchmarks in this crate to access the course compiler,
//! the follower, the regulators and the simulated robot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Course compiler - turns a list of commands into a dense, time annotated course
pub mod course;

/// Controller composition - proportional, integral, derivative and feedforward terms
pub mod ctrl;

/// Control loops - run the course against the robot
pub mod ctrl_loop;

/// Equipment interfaces - the traits the control core drives the robot through
pub mod eqpt;

/// Low pass filters
pub mod filters;

/// Follower - produces the velocity targets which keep the robot on the course
pub mod follower;

/// Geometry kernel - angles, vector helpers and per wheel pairs
pub mod geom;

/// Executable parameters
pub mod params;

/// Path commands and path files
pub mod path;

/// Velocity and current regulators - convert velocity targets into motor drive values
pub mod regulators;

/// Snapshot cell shared between the loops
pub mod shared;

/// Simulated robot
pub mod sim;
