//! # Simulator
//!
//! A simulated robot standing in for the hardware, so the whole pipeline can
//! be run and tested on a host.
//!
//! The [`Simulator`] plays the part of the fast loop: each step it advances
//! the [`Plant`], integrates the gyroscope into a heading, runs the forward
//! kinematics on the encoder readings and publishes the resulting
//! [`Snapshot`]. It talks to the control loop only through the shared cells
//! of a [`Link`], which also provides the equipment interfaces the control
//! loop drives.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod fusion;
pub mod kinematics;
pub mod params;
pub mod plant;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::Arc;

// Internal
use crate::eqpt::{BatterySource, CurrentSensor, MotorSink, Snapshot};
use crate::geom::{Angle, WheelPair};
use crate::shared::SharedCell;
pub use fusion::Fusion;
pub use kinematics::ForwardKinematics;
pub use params::Params;
pub use plant::Plant;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Simulator {
    plant: Plant,
    fusion: Fusion,
    kinematics: ForwardKinematics,
    link: Link
}

/// Cells shared between the simulator and the control loop.
#[derive(Clone)]
pub struct Link {
    /// Estimated state, written by the simulator
    pub snapshot: Arc<SharedCell<Snapshot>>,

    /// Motor driver input, written by the control loop
    pub pwm: Arc<SharedCell<WheelPair<i32>>>,

    /// Battery reading, written by the simulator
    pub battery_v: Arc<SharedCell<f64>>,

    /// Current sensor readings, written by the simulator
    pub currents_a: Arc<SharedCell<WheelPair<f64>>>
}

/// [`MotorSink`] writing into a [`Link`].
pub struct SimMotors(Arc<SharedCell<WheelPair<i32>>>);

/// [`BatterySource`] reading from a [`Link`].
pub struct SimBattery(Arc<SharedCell<f64>>);

/// [`CurrentSensor`] reading from a [`Link`].
pub struct SimCurrentSensor(Arc<SharedCell<WheelPair<f64>>>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Simulator {
    pub fn new(params: &Params) -> Self {
        let plant = Plant::new(params);
        let fusion = Fusion::new(Angle::new(params.initial_heading_rad));
        let kinematics = ForwardKinematics::new(params, plant.encoder_angles());

        let link = Link {
            snapshot: Arc::new(SharedCell::new(kinematics.snapshot())),
            pwm: Arc::new(SharedCell::new(WheelPair::default())),
            battery_v: Arc::new(SharedCell::new(plant.battery_voltage())),
            currents_a: Arc::new(SharedCell::new(WheelPair::default()))
        };

        Self {
            plant,
            fusion,
            kinematics,
            link
        }
    }

    pub fn link(&self) -> Link {
        self.link.clone()
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    /// Run one fast loop tick of `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.plant.set_pwm(self.link.pwm.load());
        self.plant.step(dt);

        let rate = self.plant.gyro_rate();
        let heading = self.fusion.update(rate, dt);
        let snapshot =
            self.kinematics
                .update(self.plant.encoder_angles(), Some(heading), Some(rate), dt);

        self.link.snapshot.store(snapshot);
        self.link.battery_v.store(self.plant.battery_voltage());
        self.link.currents_a.store(self.plant.current_magnitudes());
    }
}

impl Link {
    pub fn motors(&self) -> SimMotors {
        SimMotors(self.pwm.clone())
    }

    pub fn battery(&self) -> SimBattery {
        SimBattery(self.battery_v.clone())
    }

    pub fn current_sensor(&self) -> SimCurrentSensor {
        SimCurrentSensor(self.currents_a.clone())
    }
}

impl MotorSink for SimMotors {
    fn set_power(&mut self, pwm: WheelPair<i32>) {
        self.0.store(pwm);
    }
}

impl BatterySource for SimBattery {
    fn voltage(&mut self) -> f64 {
        self.0.load()
    }
}

impl CurrentSensor for SimCurrentSensor {
    fn current_magnitudes(&mut self) -> WheelPair<f64> {
        self.0.load()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::PoseSource;

    #[test]
    fn test_link_round_trip() {
        let params: Params =
            util::params::parse(include_str!("../../../params/sim.toml")).unwrap();
        let mut sim = Simulator::new(&params);
        let link = sim.link();

        let mut motors = link.motors();
        motors.set_power(WheelPair::splat(8000));

        for _ in 0..32_000 {
            sim.step(1.0 / 32_000.0);
        }

        let snapshot = link.snapshot.snapshot();
        let mut battery = link.battery();
        let mut currents = link.current_sensor();

        // Moved forwards, up the track
        assert!(snapshot.position[1] > 10.0);
        assert!(snapshot.signed_speed() > 0.0);
        assert!((snapshot.position - sim.plant().true_position()).norm() < 1.0);

        // The battery sags under load
        assert!(battery.voltage() < params.battery_v);
        assert!(currents.current_magnitudes().left > 0.0);
    }
}
