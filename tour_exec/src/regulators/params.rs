//! Regulator parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::ctrl::TermParams;
use crate::filters::FilterParams;
use crate::geom::WheelPair;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the velocity regulator
#[derive(Deserialize, Debug, Clone)]
pub struct VelocityParams {
    /// Fraction of the battery voltage the linear controller may claim. The
    /// angular controller gets whatever the linear claim leaves.
    pub linear_budget: f64,

    /// Factor applied to the right wheel's voltage to correct a mechanical
    /// bias between the two sides.
    pub right_wheel_factor: f64,

    /// Linear velocity control. Terms output volts for a setpoint in
    /// centimetres/second.
    pub linear: AxisParams,

    /// Angular velocity control. Terms output volts for a setpoint in
    /// radians/second.
    pub angular: AxisParams
}

/// One axis of the velocity regulator
#[derive(Deserialize, Debug, Clone)]
pub struct AxisParams {
    /// Filter applied to the target before it reaches the controller.
    #[serde(default)]
    pub setpoint_filter: FilterParams,

    pub terms: Vec<TermParams>
}

/// Parameters for the current regulator
#[derive(Deserialize, Debug, Clone)]
pub struct CurrentParams {
    pub mode: CurrentMode,

    /// Units: amps
    pub max_current_a: f64,

    /// PWM count corresponding to the full battery voltage.
    pub max_pwm: i32,

    pub motor: MotorParams,

    pub feedback: FeedbackParams
}

/// DC motor model of each drive motor.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct MotorParams {
    /// Units: ohms
    pub resistance_ohm: WheelPair<f64>,

    /// Wheel speed with no load at `free_voltage_v`.
    ///
    /// Units: radians/second
    pub free_speed_rads: WheelPair<f64>,

    /// Units: volts
    pub free_voltage_v: f64,

    /// Current drawn with no load at `free_voltage_v`.
    ///
    /// Units: amps
    pub free_current_a: WheelPair<f64>
}

/// Feedback mode settings of the current regulator
#[derive(Deserialize, Debug, Clone)]
pub struct FeedbackParams {
    #[serde(default)]
    pub current_filter: FilterParams,

    #[serde(default)]
    pub target_filter: FilterParams,

    /// Terms of each wheel's controller, which outputs the voltage on top of
    /// the back-EMF. Integral bands are replaced by the battery voltage every
    /// tick.
    pub terms: Vec<TermParams>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the current regulator limits the motor current.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentMode {
    /// Closed loop control of the measured current.
    Feedback,

    /// Limit the commanded voltage so that the current predicted by the
    /// motor model stays in bounds. No current measurement is needed.
    Model
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorParams {
    /// Speed constant of each motor, `free_speed / (free_voltage - free_current * R)`.
    ///
    /// Units: radians/second/volt
    pub fn kv(&self) -> WheelPair<f64> {
        let free_voltage = WheelPair::splat(self.free_voltage_v);

        self.free_speed_rads / (free_voltage - self.free_current_a * self.resistance_ohm)
    }

    /// Voltage generated by each motor at the given wheel speeds.
    pub fn back_emf(&self, wheel_speeds: WheelPair<f64>) -> WheelPair<f64> {
        wheel_speeds / self.kv()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_files() {
        let vel: VelocityParams =
            util::params::parse(include_str!("../../../params/velocity_reg.toml")).unwrap();
        assert_eq!(vel.linear_budget, 0.7);
        assert_eq!(vel.right_wheel_factor, 0.85);
        assert_eq!(vel.linear.terms.len(), 5);

        let cur: CurrentParams =
            util::params::parse(include_str!("../../../params/current_reg.toml")).unwrap();
        assert_eq!(cur.mode, CurrentMode::Model);
        assert_eq!(cur.max_pwm, 16384);
        assert_eq!(cur.max_current_a, 0.4);
    }

    #[test]
    fn test_kv() {
        let motor = MotorParams {
            resistance_ohm: WheelPair::new(3.30982, 3.33778),
            free_speed_rads: WheelPair::new(91.0553, 90.0371),
            free_voltage_v: 10.5,
            free_current_a: WheelPair::new(0.0576, 0.0608)
        };
        let kv = motor.kv();

        assert!((kv.left - 91.0553 / (10.5 - 0.0576 * 3.30982)).abs() < 1e-12);
        assert!(kv.right > 8.0 && kv.right < 9.0);

        // At the free speed the back-EMF is the free voltage less the
        // resistive drop
        let emf = motor.back_emf(motor.free_speed_rads);
        assert!((emf.left - (10.5 - 0.0576 * 3.30982)).abs() < 1e-9);
    }
}
