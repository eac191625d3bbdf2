//! Simulated drive train and chassis

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use std::f64::consts::TAU;

// Internal
use super::Params;
use crate::geom::{Angle, Vec2Ext, WheelPair};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The physical robot: two DC motors driving the wheels of a differential
/// drive chassis, powered by a battery with some internal resistance.
///
/// Each wheel's speed follows a first order response towards the free speed
/// for its motor voltage, less a friction deadband.
#[derive(Debug, Clone)]
pub struct Plant {
    params: Params,
    kv: WheelPair<f64>,

    pwm: WheelPair<i32>,
    battery_v: f64,
    currents_a: WheelPair<f64>,

    /// Units: radians
    wheel_angles: WheelPair<f64>,

    /// Units: radians/second
    wheel_speeds: WheelPair<f64>,

    position: Vector2<f64>,
    heading: Angle,

    /// Units: radians/second
    angular_velocity: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Plant {
    /// A robot at rest at the origin.
    pub fn new(params: &Params) -> Self {
        Self {
            kv: params.motor.kv(),
            pwm: WheelPair::default(),
            battery_v: params.battery_v,
            currents_a: WheelPair::default(),
            wheel_angles: WheelPair::default(),
            wheel_speeds: WheelPair::default(),
            position: Vector2::zeros(),
            heading: Angle::new(params.initial_heading_rad),
            angular_velocity: 0.0,
            params: params.clone()
        }
    }

    /// Set the motor driver's PWM counts.
    pub fn set_pwm(&mut self, pwm: WheelPair<i32>) {
        let max = self.params.max_pwm;
        self.pwm = pwm.map(|p| p.max(-max).min(max));
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let p = &self.params;

        // ---- MOTORS ----

        let duty = self.pwm.map(|c| c as f64 / p.max_pwm as f64);
        let mut voltage = duty * self.battery_v;
        voltage.right *= p.right_motor_gain;

        let back_emf = self.wheel_speeds / self.kv;
        self.currents_a = (voltage - back_emf) / p.motor.resistance_ohm;

        let friction_v = p.friction_v;
        let drive_v = voltage.map(|v| {
            if v.abs() <= friction_v {
                0.0
            }
            else {
                v - friction_v.copysign(v)
            }
        });

        let alpha = (dt / p.wheel_time_constant_s).min(1.0);
        let target_speeds = drive_v * self.kv;
        self.wheel_speeds = self.wheel_speeds + (target_speeds - self.wheel_speeds) * alpha;
        self.wheel_angles = self.wheel_angles + self.wheel_speeds * dt;

        self.battery_v = p.battery_v
            - p.battery_resistance_ohm * (self.currents_a.left.abs() + self.currents_a.right.abs());

        // ---- CHASSIS ----

        let r = p.wheel_radius_cm;
        let speed = r * (self.wheel_speeds.left + self.wheel_speeds.right) / 2.0;
        self.angular_velocity = r * (self.wheel_speeds.right - self.wheel_speeds.left) / p.axle_length_cm;

        let d_theta = Angle::new(self.angular_velocity * dt);
        self.position += Vector2::from_polar(speed * dt, self.heading + d_theta / 2.0);
        self.heading += d_theta;
    }

    /// Wheel angles as read by the encoders, to the nearest count below.
    pub fn encoder_angles(&self) -> WheelPair<f64> {
        let step = TAU / self.params.encoder_counts_per_rev as f64;

        self.wheel_angles.map(|a| (a / step).floor() * step)
    }

    /// Angular velocity measured by the gyroscope.
    pub fn gyro_rate(&self) -> f64 {
        self.angular_velocity
    }

    pub fn battery_voltage(&self) -> f64 {
        self.battery_v
    }

    /// Motor currents as read by the unsigned current sensors.
    pub fn current_magnitudes(&self) -> WheelPair<f64> {
        self.currents_a.map(f64::abs)
    }

    /// Position of the robot, without any estimation error.
    pub fn true_position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn true_heading(&self) -> Angle {
        self.heading
    }

    pub fn wheel_speeds(&self) -> WheelPair<f64> {
        self.wheel_speeds
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn params() -> Params {
        util::params::parse(include_str!("../../../params/sim.toml")).unwrap()
    }

    #[test]
    fn test_friction_deadband() {
        let mut plant = Plant::new(&params());

        // 0.2 V is inside the deadband
        let pwm = (0.2 / 8.2 * 16384.0) as i32;
        plant.set_pwm(WheelPair::splat(pwm));
        for _ in 0..1000 {
            plant.step(0.001);
        }
        assert_eq!(plant.wheel_speeds(), WheelPair::default());
        assert!(plant.current_magnitudes().left > 0.0);
    }

    #[test]
    fn test_drives_straight_and_turns() {
        let mut p = params();
        p.right_motor_gain = 1.0;
        p.motor.resistance_ohm = WheelPair::splat(3.3);
        p.motor.free_speed_rads = WheelPair::splat(90.0);
        p.motor.free_current_a = WheelPair::splat(0.06);
        let mut plant = Plant::new(&p);

        plant.set_pwm(WheelPair::splat(8000));
        for _ in 0..1000 {
            plant.step(0.001);
        }
        let pos = plant.true_position();
        assert!(pos[1] > 10.0);
        assert!(pos[0].abs() < 1e-6);
        assert!(plant.true_heading().approx_eq(Angle::new(PI / 2.0), 1e-9));

        // Right wheel forwards, left backwards turns anticlockwise
        plant.set_pwm(WheelPair::new(-8000, 8000));
        for _ in 0..100 {
            plant.step(0.001);
        }
        assert!(plant.gyro_rate() > 0.0);

        // PWM is limited to the driver's range
        plant.set_pwm(WheelPair::new(-100_000, 100_000));
        assert_eq!(plant.pwm, WheelPair::new(-16384, 16384));
    }

    #[test]
    fn test_encoder_quantisation() {
        let mut plant = Plant::new(&params());
        plant.wheel_angles = WheelPair::new(0.001, TAU / 1440.0 * 2.5);

        let enc = plant.encoder_angles();
        assert_eq!(enc.left, 0.0);
        assert!((enc.right - TAU / 1440.0 * 2.0).abs() < 1e-12);
    }
}
