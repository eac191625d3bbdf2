//! # Equipment interfaces
//!
//! The control core never talks to hardware directly. It reads the robot's
//! state and drives the motors through these traits, which are implemented
//! by the simulator in [`crate::sim`] and, on a real robot, by the drivers.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use crate::geom::{Angle, WheelPair};
use crate::shared::SharedCell;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the robot published by the estimation loop each tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Snapshot {
    /// Units: centimetres
    pub position: Vector2<f64>,

    /// Units: centimetres/second
    pub velocity: Vector2<f64>,

    /// Direction the front of the robot faces.
    pub heading: Angle,

    /// Units: radians/second
    pub angular_velocity: f64,

    /// Wheel angular velocities.
    ///
    /// Units: radians/second
    pub wheel_speeds: WheelPair<f64>
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of the robot's estimated state.
pub trait PoseSource {
    fn snapshot(&self) -> Snapshot;
}

/// Source of the battery voltage.
pub trait BatterySource {
    /// Units: volts
    fn voltage(&mut self) -> f64;
}

/// Sink for signed motor power values.
pub trait MotorSink {
    /// Set the PWM counts of each motor, in `[-max_pwm, max_pwm]`. Positive
    /// values drive the wheel forwards.
    fn set_power(&mut self, pwm: WheelPair<i32>);
}

/// Motor current sensors, which cannot tell the direction of the current.
pub trait CurrentSensor {
    /// Units: amps, always positive
    fn current_magnitudes(&mut self) -> WheelPair<f64>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Snapshot {
    /// Speed along the heading, negative when driving backwards.
    pub fn signed_speed(&self) -> f64 {
        self.velocity.dot(&self.heading.unit_vector())
    }
}

impl PoseSource for SharedCell<Snapshot> {
    fn snapshot(&self) -> Snapshot {
        self.load()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_signed_speed() {
        let mut s = Snapshot {
            heading: Angle::new(PI / 2.0),
            velocity: Vector2::new(0.0, -3.0),
            ..Default::default()
        };
        assert!((s.signed_speed() + 3.0).abs() < 1e-12);

        s.velocity = Vector2::new(4.0, 0.0);
        assert!(s.signed_speed().abs() < 1e-12);
    }
}
