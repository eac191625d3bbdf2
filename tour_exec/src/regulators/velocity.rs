//! Velocity regulator
//!
//! Converts the follower's target linear and angular velocity into a voltage
//! for each wheel. The battery voltage is the budget shared by the two axes:
//! the linear controller may claim up to `linear_budget` of it, and the
//! angular controller gets whatever is left. The sum of the two claims never
//! exceeds the battery voltage, so turning authority is kept even at full
//! speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::VelocityParams;
use crate::ctrl::{ControlTerm, Controller};
use crate::eqpt::Snapshot;
use crate::filters::LowPass;
use crate::follower::VelocityTarget;
use crate::geom::WheelPair;
use util::{maths::clamp_abs, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct VelocityRegulator {
    params: VelocityParams,

    linear_filter: LowPass,
    angular_filter: LowPass,

    linear_controller: Controller,
    angular_controller: Controller
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityRegInput {
    pub target: VelocityTarget,
    pub snapshot: Snapshot,

    /// Units: volts
    pub battery_v: f64,

    /// Units: seconds
    pub dt: f64
}

/// The split of the budget between the two axes and the resulting outputs.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct VelocityRegReport {
    pub linear_target_cms: f64,
    pub linear_actual_cms: f64,
    pub angular_target_rads: f64,
    pub angular_actual_rads: f64,

    /// Voltage claimed by each axis after the budget split
    pub linear_claim_v: f64,
    pub angular_claim_v: f64,

    pub left_v: f64,
    pub right_v: f64,

    /// True if the outputs were rescaled into the battery voltage
    pub rescaled: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityRegulator {
    pub fn new(params: VelocityParams) -> Self {
        Self {
            linear_filter: params.linear.setpoint_filter.into(),
            angular_filter: params.angular.setpoint_filter.into(),
            linear_controller: Controller::from_params(&params.linear.terms),
            angular_controller: Controller::from_params(&params.angular.terms),
            params
        }
    }
}

impl State for VelocityRegulator {
    type InputData = VelocityRegInput;
    type OutputData = WheelPair<f64>;
    type StatusReport = VelocityRegReport;

    fn proc(&mut self, input: &VelocityRegInput) -> (WheelPair<f64>, VelocityRegReport) {
        let dt = input.dt;
        let battery_v = input.battery_v;

        let linear_actual = input.snapshot.signed_speed();
        let angular_actual = input.snapshot.angular_velocity;

        let linear_target = self.linear_filter.update(input.target.linear_cms, dt);
        let angular_target = self.angular_filter.update(input.target.angular_rads, dt);

        let linear_out = self.linear_controller.update(linear_target, linear_actual, dt);
        let angular_out = self.angular_controller.update(angular_target, angular_actual, dt);

        // ---- BUDGET SPLIT ----

        let linear_claim = clamp_abs(linear_out, self.params.linear_budget * battery_v);
        let angular_claim = clamp_abs(angular_out, battery_v - linear_claim.abs());

        let mut output = WheelPair::new(
            linear_claim - angular_claim,
            (linear_claim + angular_claim) * self.params.right_wheel_factor
        );

        // Rescale both wheels together to keep their ratio
        let peak = output.max_abs();
        let rescaled = peak > battery_v;
        if rescaled {
            output = output * (battery_v / peak);
        }

        let report = VelocityRegReport {
            linear_target_cms: linear_target,
            linear_actual_cms: linear_actual,
            angular_target_rads: angular_target,
            angular_actual_rads: angular_actual,
            linear_claim_v: linear_claim,
            angular_claim_v: angular_claim,
            left_v: output.left,
            right_v: output.right,
            rescaled
        };

        (output, report)
    }

    fn reset(&mut self) {
        self.linear_filter.reset();
        self.angular_filter.reset();
        self.linear_controller.reset();
        self.angular_controller.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::TermParams;
    use crate::filters::FilterParams;
    use crate::regulators::AxisParams;

    fn params(linear_k_p: f64, angular_k_p: f64, right_wheel_factor: f64) -> VelocityParams {
        VelocityParams {
            linear_budget: 0.7,
            right_wheel_factor,
            linear: AxisParams {
                setpoint_filter: FilterParams::None,
                terms: vec![TermParams::Proportional { k_p: linear_k_p }]
            },
            angular: AxisParams {
                setpoint_filter: FilterParams::None,
                terms: vec![TermParams::Proportional { k_p: angular_k_p }]
            }
        }
    }

    fn input(linear_cms: f64, angular_rads: f64, battery_v: f64) -> VelocityRegInput {
        VelocityRegInput {
            target: VelocityTarget {
                linear_cms,
                angular_rads
            },
            battery_v,
            dt: 0.0005,
            ..Default::default()
        }
    }

    #[test]
    fn test_budget_split() {
        let mut reg = VelocityRegulator::new(params(1.0, 1.0, 1.0));

        let cases = [
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 100.0),
            (-100.0, 100.0),
            (3.0, -100.0),
            (-5.0, 2.0),
            (0.0, -7.5),
            (1e9, -1e9)
        ];

        for &battery_v in [6.0, 8.4].iter() {
            for &(lin, ang) in cases.iter() {
                let (out, report) = reg.proc(&input(lin, ang, battery_v));

                let total = report.linear_claim_v.abs() + report.angular_claim_v.abs();
                assert!(total <= battery_v + 1e-9, "{} + {}", lin, ang);
                assert!(report.linear_claim_v.abs() <= 0.7 * battery_v + 1e-9);
                assert!(out.max_abs() <= battery_v + 1e-9);
            }
        }
    }

    #[test]
    fn test_angular_gets_the_remainder() {
        let mut reg = VelocityRegulator::new(params(1.0, 1.0, 1.0));

        let (out, report) = reg.proc(&input(100.0, 100.0, 10.0));
        assert!((report.linear_claim_v - 7.0).abs() < 1e-9);
        assert!((report.angular_claim_v - 3.0).abs() < 1e-9);

        // Differential mix
        assert!((out.left - 4.0).abs() < 1e-9);
        assert!((out.right - 10.0).abs() < 1e-9);
        assert!(!report.rescaled);
    }

    #[test]
    fn test_right_wheel_factor_and_rescale() {
        let mut reg = VelocityRegulator::new(params(1.0, 1.0, 0.85));
        let (out, _) = reg.proc(&input(2.0, 0.0, 10.0));
        assert!((out.left - 2.0).abs() < 1e-9);
        assert!((out.right - 1.7).abs() < 1e-9);

        // A factor above one can push a wheel past the battery
        let mut reg = VelocityRegulator::new(params(1.0, 1.0, 1.5));
        let (out, report) = reg.proc(&input(100.0, 100.0, 10.0));
        assert!(report.rescaled);
        assert!((out.right - 10.0).abs() < 1e-9);
        // Ratio kept: 4 / 15 before the rescale
        assert!((out.left / out.right - 4.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_params_drive_forwards() {
        let params: VelocityParams =
            util::params::parse(include_str!("../../../params/velocity_reg.toml")).unwrap();
        let mut reg = VelocityRegulator::new(params);

        let mut out = WheelPair::default();
        for _ in 0..200 {
            out = reg.proc(&input(20.0, 0.0, 8.0)).0;
        }
        assert!(out.left > 0.0 && out.right > 0.0);
        assert!(out.left > out.right);
    }
}
