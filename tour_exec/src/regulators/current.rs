//! Current regulator
//!
//! Converts the velocity regulator's target voltages into PWM counts for the
//! motor driver while keeping the motor current within `max_current_a`.
//! Two modes are available, see [`CurrentMode`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{CurrentMode, CurrentParams};
use crate::ctrl::{ControlTerm, Controller};
use crate::filters::LowPass;
use crate::geom::WheelPair;
use util::{
    maths::{clamp, clamp_abs, copysign_or_zero},
    module::State
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct CurrentRegulator {
    params: CurrentParams,

    /// Per wheel controllers used in feedback mode
    controllers: WheelPair<Controller>,
    current_filters: WheelPair<LowPass>,
    target_filters: WheelPair<LowPass>,

    /// Voltage commanded on the previous tick, used to tell the direction of
    /// the measured current.
    applied_v: WheelPair<f64>
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentRegInput {
    /// Units: volts
    pub target_v: WheelPair<f64>,

    /// Units: radians/second
    pub wheel_speeds: WheelPair<f64>,

    /// Unsigned readings of the current sensors, only used in feedback mode.
    ///
    /// Units: amps
    pub current_magnitudes: WheelPair<f64>,

    /// Units: volts
    pub battery_v: f64,

    /// Units: seconds
    pub dt: f64
}

#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct CurrentRegReport {
    pub back_emf_left_v: f64,
    pub back_emf_right_v: f64,

    /// Filtered target current, feedback mode only
    pub target_left_a: f64,
    pub target_right_a: f64,

    /// Filtered signed measured current, feedback mode only
    pub measured_left_a: f64,
    pub measured_right_a: f64,

    /// Voltage after current limiting
    pub left_v: f64,
    pub right_v: f64,

    pub left_pwm: i32,
    pub right_pwm: i32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CurrentRegulator {
    pub fn new(params: CurrentParams) -> Self {
        let controller = Controller::from_params(&params.feedback.terms);
        let current_filter = LowPass::from(params.feedback.current_filter);
        let target_filter = LowPass::from(params.feedback.target_filter);

        Self {
            controllers: WheelPair::new(controller.clone(), controller),
            current_filters: WheelPair::splat(current_filter),
            target_filters: WheelPair::splat(target_filter),
            applied_v: WheelPair::default(),
            params
        }
    }

    pub fn mode(&self) -> CurrentMode {
        self.params.mode
    }

    /// Model mode: scale the target voltages into the window that keeps the
    /// predicted current in bounds.
    fn limit_by_model(&self, input: &CurrentRegInput, report: &mut CurrentRegReport) -> WheelPair<f64> {
        let back_emf = self.params.motor.back_emf(input.wheel_speeds);
        let drop = self.params.motor.resistance_ohm * self.params.max_current_a;

        report.back_emf_left_v = back_emf.left;
        report.back_emf_right_v = back_emf.right;

        scale_into_window(input.target_v, back_emf - drop, back_emf + drop)
    }

    /// Feedback mode: run each wheel's controller on the measured current.
    fn limit_by_feedback(
        &mut self,
        input: &CurrentRegInput,
        report: &mut CurrentRegReport
    ) -> WheelPair<f64> {
        let motor = self.params.motor;
        let max_current_a = self.params.max_current_a;
        let battery_v = input.battery_v;
        let dt = input.dt;

        let back_emf = motor.back_emf(input.wheel_speeds);

        // The target current is what the target voltage would drive, within
        // the limit
        let target_a = (input.target_v - back_emf) / motor.resistance_ohm;
        let target_a = target_a.map(|i| clamp_abs(i, max_current_a));

        // The sensor cannot tell the direction of the current. It flows from
        // the higher of the applied voltage and the back-EMF.
        let direction = self.applied_v - back_emf;
        let signed_a = input
            .current_magnitudes
            .zip_with(direction, copysign_or_zero);

        let target_f = WheelPair::new(
            self.target_filters.left.update(target_a.left, dt),
            self.target_filters.right.update(target_a.right, dt)
        );
        let measured_f = WheelPair::new(
            self.current_filters.left.update(signed_a.left, dt),
            self.current_filters.right.update(signed_a.right, dt)
        );

        self.controllers.left.set_integral_bounds(-battery_v, battery_v);
        self.controllers.right.set_integral_bounds(-battery_v, battery_v);

        let output = WheelPair::new(
            back_emf.left + self.controllers.left.update(target_f.left, measured_f.left, dt),
            back_emf.right + self.controllers.right.update(target_f.right, measured_f.right, dt)
        );

        report.back_emf_left_v = back_emf.left;
        report.back_emf_right_v = back_emf.right;
        report.target_left_a = target_f.left;
        report.target_right_a = target_f.right;
        report.measured_left_a = measured_f.left;
        report.measured_right_a = measured_f.right;

        output
    }
}

impl State for CurrentRegulator {
    type InputData = CurrentRegInput;
    type OutputData = WheelPair<i32>;
    type StatusReport = CurrentRegReport;

    fn proc(&mut self, input: &CurrentRegInput) -> (WheelPair<i32>, CurrentRegReport) {
        let mut report = CurrentRegReport::default();

        let voltage = match self.params.mode {
            CurrentMode::Model => self.limit_by_model(input, &mut report),
            CurrentMode::Feedback => self.limit_by_feedback(input, &mut report)
        };

        let battery_v = input.battery_v;
        let voltage = voltage.map(|v| clamp_abs(v, battery_v));
        self.applied_v = voltage;

        let max_pwm = self.params.max_pwm;
        let pwm = voltage.map(|v| voltage_to_pwm(v, battery_v, max_pwm));

        report.left_v = voltage.left;
        report.right_v = voltage.right;
        report.left_pwm = pwm.left;
        report.right_pwm = pwm.right;

        (pwm, report)
    }

    fn reset(&mut self) {
        self.controllers.left.reset();
        self.controllers.right.reset();
        self.current_filters.left.reset();
        self.current_filters.right.reset();
        self.target_filters.left.reset();
        self.target_filters.right.reset();
        self.applied_v = WheelPair::default();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Fit `target` into the window `[min, max]` of each wheel.
///
/// Both wheels are scaled by the same factor so that the ratio between them
/// is kept. The candidate factors are those that put either wheel on either
/// edge of its window, plus one, and the one closest to one that lands both
/// wheels inside their windows is used. If no factor works each wheel is
/// clamped on its own.
pub fn scale_into_window(
    target: WheelPair<f64>,
    min: WheelPair<f64>,
    max: WheelPair<f64>
) -> WheelPair<f64> {
    let candidates = [
        divide(max.left, target.left),
        divide(max.right, target.right),
        divide(min.left, target.left),
        divide(min.right, target.right),
        Some(1.0)
    ];

    let fits = |v: &WheelPair<f64>| {
        v.left >= min.left && v.left <= max.left && v.right >= min.right && v.right <= max.right
    };

    let best = candidates
        .iter()
        .filter_map(|&s| s)
        .filter(|&s| fits(&(target * s)))
        .fold(None, |best: Option<f64>, s| match best {
            Some(b) if (b - 1.0).abs() <= (s - 1.0).abs() => Some(b),
            _ => Some(s)
        });

    match best {
        Some(s) => target * s,
        None => WheelPair::new(
            clamp(target.left, min.left, max.left),
            clamp(target.right, min.right, max.right)
        )
    }
}

fn divide(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        None
    }
    else {
        Some(a / b)
    }
}

/// Convert a voltage to PWM counts, `v / battery * max_pwm`, limited to
/// `[-max_pwm, max_pwm]`.
pub fn voltage_to_pwm(voltage: f64, battery_v: f64, max_pwm: i32) -> i32 {
    let max_pwm = max_pwm as f64;

    clamp_abs(voltage / battery_v * max_pwm, max_pwm).round() as i32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::TermParams;
    use crate::filters::FilterParams;
    use crate::regulators::{FeedbackParams, MotorParams};

    fn params(mode: CurrentMode) -> CurrentParams {
        CurrentParams {
            mode,
            max_current_a: 0.4,
            max_pwm: 16384,
            motor: MotorParams {
                resistance_ohm: WheelPair::splat(3.3),
                free_speed_rads: WheelPair::splat(90.0),
                free_voltage_v: 10.5,
                free_current_a: WheelPair::splat(0.06)
            },
            feedback: FeedbackParams {
                current_filter: FilterParams::None,
                target_filter: FilterParams::None,
                terms: vec![
                    TermParams::Velocity { k_v: 3.3 },
                    TermParams::Proportional { k_p: 1.0 },
                    TermParams::Integral {
                        k_i: 100.0,
                        min: -1.0,
                        max: 1.0
                    }
                ]
            }
        }
    }

    #[test]
    fn test_scale_into_window() {
        let min = WheelPair::splat(-1.0);
        let max = WheelPair::splat(1.0);

        // Already inside
        let v = scale_into_window(WheelPair::new(0.5, -0.2), min, max);
        assert_eq!(v, WheelPair::new(0.5, -0.2));

        // Scaled down keeping the ratio
        let v = scale_into_window(WheelPair::new(2.0, 1.0), min, max);
        assert_eq!(v, WheelPair::new(1.0, 0.5));

        // No common factor, clamped per wheel
        let v = scale_into_window(
            WheelPair::new(2.0, 2.0),
            WheelPair::new(-1.0, 3.0),
            WheelPair::new(1.0, 4.0)
        );
        assert_eq!(v, WheelPair::new(1.0, 3.0));

        // A window away from zero scales up
        let v = scale_into_window(
            WheelPair::new(1.0, 1.0),
            WheelPair::splat(2.0),
            WheelPair::splat(3.0)
        );
        assert_eq!(v, WheelPair::new(2.0, 2.0));
    }

    #[test]
    fn test_voltage_to_pwm() {
        assert_eq!(voltage_to_pwm(4.0, 8.0, 16384), 8192);
        assert_eq!(voltage_to_pwm(-8.0, 8.0, 16384), -16384);
        assert_eq!(voltage_to_pwm(20.0, 8.0, 16384), 16384);
        // Flat battery gives full power rather than overflow
        assert_eq!(voltage_to_pwm(1.0, 0.0, 16384), 16384);
        assert_eq!(voltage_to_pwm(f64::NAN, 8.0, 16384), 0);
    }

    #[test]
    fn test_model_limits_stall_current() {
        let mut reg = CurrentRegulator::new(params(CurrentMode::Model));

        // At rest only the resistive drop of the max current is allowed
        let input = CurrentRegInput {
            target_v: WheelPair::new(6.0, 3.0),
            battery_v: 8.0,
            dt: 0.0005,
            ..Default::default()
        };
        let (pwm, report) = reg.proc(&input);

        assert!((report.left_v - 1.32).abs() < 1e-9);
        assert!((report.right_v - 0.66).abs() < 1e-9);
        assert_eq!(pwm.left, voltage_to_pwm(1.32, 8.0, 16384));
    }

    #[test]
    fn test_feedback_tracks_target_current() {
        let p = params(CurrentMode::Feedback);
        let motor = p.motor;
        let mut reg = CurrentRegulator::new(p);

        // Motor held at a fixed speed, current from Ohm's law
        let wheel_speeds = WheelPair::new(30.0, -30.0);
        let back_emf = motor.back_emf(wheel_speeds);
        let mut current = WheelPair::default();
        let mut report = CurrentRegReport::default();

        for _ in 0..2000 {
            let input = CurrentRegInput {
                target_v: back_emf + WheelPair::new(0.66, -0.33),
                wheel_speeds,
                current_magnitudes: current.map(f64::abs),
                battery_v: 8.0,
                dt: 0.0005
            };
            report = reg.proc(&input).1;

            current = (WheelPair::new(report.left_v, report.right_v) - back_emf)
                / motor.resistance_ohm;
        }

        assert!((current.left - 0.2).abs() < 1e-3, "{:?}", current);
        assert!((current.right + 0.1).abs() < 1e-3, "{:?}", current);
        assert!(report.measured_right_a < 0.0);
    }

    #[test]
    fn test_feedback_limits_current() {
        let p = params(CurrentMode::Feedback);
        let motor = p.motor;
        let mut reg = CurrentRegulator::new(p);
        let mut current = WheelPair::default();

        for _ in 0..2000 {
            let input = CurrentRegInput {
                target_v: WheelPair::splat(8.0),
                current_magnitudes: current.map(f64::abs),
                battery_v: 8.0,
                dt: 0.0005,
                ..Default::default()
            };
            let (_, report) = reg.proc(&input);
            current = WheelPair::new(report.left_v, report.right_v) / motor.resistance_ohm;
        }

        assert!(current.left <= 0.4 + 1e-3);
        assert!(current.left > 0.39);
    }
}
