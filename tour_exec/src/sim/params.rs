//! Simulator parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::regulators::MotorParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated robot
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    // ---- CHASSIS ----

    /// Units: centimetres
    pub wheel_radius_cm: f64,

    /// Units: centimetres
    pub axle_length_cm: f64,

    /// Heading of the robot at the start of the run.
    ///
    /// Units: radians
    pub initial_heading_rad: f64,

    // ---- DRIVE ----

    pub motor: MotorParams,

    /// Time constant of the wheel speed's response to the motor voltage.
    ///
    /// Units: seconds
    pub wheel_time_constant_s: f64,

    /// Voltage lost to friction before a wheel starts turning.
    ///
    /// Units: volts
    pub friction_v: f64,

    /// Gain of the right motor relative to the left, modelling a mechanical
    /// bias between the two sides.
    pub right_motor_gain: f64,

    /// PWM count corresponding to the full battery voltage.
    pub max_pwm: i32,

    // ---- BATTERY ----

    /// Units: volts
    pub battery_v: f64,

    /// Units: ohms
    pub battery_resistance_ohm: f64,

    // ---- SENSORS ----

    pub encoder_counts_per_rev: u32,

    /// Cutoff of the filter on the estimated body velocity.
    ///
    /// Units: hertz
    pub velocity_cutoff_hz: f64,

    /// Cutoff of the filter on the estimated wheel speeds.
    ///
    /// Units: hertz
    pub wheel_speed_cutoff_hz: f64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let params: Params =
            util::params::parse(include_str!("../../../params/sim.toml")).unwrap();

        assert_eq!(params.wheel_radius_cm, 3.01625);
        assert_eq!(params.axle_length_cm, 13.35);
        assert_eq!(params.max_pwm, 16384);
        assert!(params.friction_v < 0.4);
    }
}
