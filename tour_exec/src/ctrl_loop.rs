//! # Control Loops
//!
//! Runs the compiled course on the robot. Two loops are involved:
//!
//! - The fast loop estimates the robot's state and publishes it as a
//!   [`Snapshot`]. On the host this is the [`Simulator`].
//! - The slow loop takes the latest snapshot and runs the control pipeline:
//!
//! ```text
//! snapshot -> Follower -> VelocityRegulator -> CurrentRegulator -> motors
//! ```
//!
//! The loops can either run on their own threads against the wall clock
//! ([`run_realtime`]) or be interleaved on one thread with a simulated clock
//! ([`run_lockstep`]), which gives repeatable runs.
//!
//! The control pipeline itself, [`Controllers`], only sees the equipment
//! traits, so it does not know which of the two it is running under.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

// Internal
use crate::course::Course;
use crate::eqpt::{BatterySource, CurrentSensor, MotorSink, PoseSource, Snapshot};
use crate::filters::MovingAverage;
use crate::follower::{self, Follower, FollowerInput, FollowerMode};
use crate::geom::WheelPair;
use crate::params::TourExecParams;
use crate::regulators::{
    CurrentParams, CurrentRegInput, CurrentRegulator, VelocityParams, VelocityRegInput,
    VelocityRegulator
};
use crate::sim::{Plant, Simulator};
use util::archive::Archiver;
use util::module::State;
use util::time::{Stopwatch, Ticker};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The slow loop's control pipeline.
pub struct Controllers {
    follower: Follower,
    velocity_reg: VelocityRegulator,
    current_reg: CurrentRegulator,

    battery_average: MovingAverage,
    battery_primed: bool
}

/// One control tick, flattened for the CSV archive.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct TickRecord {
    pub time_s: f64,
    pub mode: FollowerMode,
    pub route_index: usize,

    // Estimated state
    pub x_cm: f64,
    pub y_cm: f64,
    pub heading_rad: f64,
    pub speed_cms: f64,
    pub angular_rads: f64,

    // Follower
    pub goal_x_cm: f64,
    pub goal_y_cm: f64,
    pub distance_left_cm: f64,
    pub time_left_s: f64,
    pub target_linear_cms: f64,
    pub target_angular_rads: f64,

    // Velocity regulator
    pub battery_v: f64,
    pub linear_claim_v: f64,
    pub angular_claim_v: f64,
    pub rescaled: bool,

    // Current regulator
    pub left_v: f64,
    pub right_v: f64,
    pub left_pwm: i32,
    pub right_pwm: i32
}

/// The outcome of a run, saved into the session at the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub finished: bool,

    /// True if the run was abandoned at the maximum run time
    pub timed_out: bool,

    pub elapsed_s: f64,
    pub target_time_s: f64,

    pub num_control_ticks: u64,
    pub num_fast_overruns: u64,
    pub num_slow_overruns: u64,

    /// Pose estimated by the fast loop
    pub estimated_x_cm: f64,
    pub estimated_y_cm: f64,
    pub estimated_heading_rad: f64,

    /// Pose of the simulated plant
    pub true_x_cm: f64,
    pub true_y_cm: f64,
    pub true_heading_rad: f64,

    pub destination_x_cm: f64,
    pub destination_y_cm: f64,

    /// Distance between the true position and the destination
    pub final_error_cm: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RunError {
    #[error("The fast loop thread panicked")]
    FastLoopPanicked
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Controllers {
    pub fn new(
        course: Course,
        follower_params: follower::Params,
        velocity_params: VelocityParams,
        current_params: CurrentParams,
        battery_average_len: usize
    ) -> Self {
        Self {
            follower: Follower::new(course, follower_params),
            velocity_reg: VelocityRegulator::new(velocity_params),
            current_reg: CurrentRegulator::new(current_params),
            battery_average: MovingAverage::new(battery_average_len),
            battery_primed: false
        }
    }

    pub fn follower(&self) -> &Follower {
        &self.follower
    }

    pub fn finished(&self) -> bool {
        self.follower.finished()
    }

    /// Run one tick of the pipeline and drive the motors.
    ///
    /// `time_s` is the time since the start of the run and `dt` the time
    /// since the previous tick.
    pub fn tick<P, B, M, C>(
        &mut self,
        pose: &P,
        battery: &mut B,
        motors: &mut M,
        current_sensor: &mut C,
        time_s: f64,
        dt: f64
    ) -> TickRecord
    where
        P: PoseSource,
        B: BatterySource,
        M: MotorSink,
        C: CurrentSensor
    {
        let snapshot = pose.snapshot();
        let battery_v = self.filter_battery(battery.voltage());

        let (target, follower_rpt) = self.follower.proc(&FollowerInput {
            snapshot,
            time_s,
            dt
        });

        let (target_v, velocity_rpt) = self.velocity_reg.proc(&VelocityRegInput {
            target,
            snapshot,
            battery_v,
            dt
        });

        let (pwm, current_rpt) = self.current_reg.proc(&CurrentRegInput {
            target_v,
            wheel_speeds: snapshot.wheel_speeds,
            current_magnitudes: current_sensor.current_magnitudes(),
            battery_v,
            dt
        });

        motors.set_power(pwm);

        let record = TickRecord {
            time_s,
            mode: follower_rpt.mode,
            route_index: follower_rpt.route_index,
            x_cm: snapshot.position[0],
            y_cm: snapshot.position[1],
            heading_rad: snapshot.heading.radians(),
            speed_cms: snapshot.signed_speed(),
            angular_rads: snapshot.angular_velocity,
            goal_x_cm: follower_rpt.goal_x_cm,
            goal_y_cm: follower_rpt.goal_y_cm,
            distance_left_cm: follower_rpt.distance_left_cm,
            time_left_s: follower_rpt.time_left_s,
            target_linear_cms: target.linear_cms,
            target_angular_rads: target.angular_rads,
            battery_v,
            linear_claim_v: velocity_rpt.linear_claim_v,
            angular_claim_v: velocity_rpt.angular_claim_v,
            rescaled: velocity_rpt.rescaled,
            left_v: current_rpt.left_v,
            right_v: current_rpt.right_v,
            left_pwm: current_rpt.left_pwm,
            right_pwm: current_rpt.right_pwm
        };
        trace!("{:?}", record);

        record
    }

    /// Restart the course from the beginning.
    pub fn reset(&mut self) {
        self.follower.reset();
        self.velocity_reg.reset();
        self.current_reg.reset();
        self.battery_average.reset();
        self.battery_primed = false;
    }

    fn filter_battery(&mut self, raw_v: f64) -> f64 {
        if self.battery_primed {
            self.battery_average.update(raw_v)
        }
        else {
            self.battery_average.prime(raw_v);
            self.battery_primed = true;
            raw_v
        }
    }
}

impl RunSummary {
    fn new(
        controllers: &Controllers,
        estimated: &Snapshot,
        plant: &Plant,
        elapsed_s: f64,
        num_control_ticks: u64
    ) -> Self {
        let course = controllers.follower().course();
        let destination = course.destination();
        let true_position = plant.true_position();

        Self {
            finished: controllers.finished(),
            timed_out: !controllers.finished(),
            elapsed_s,
            target_time_s: course.total_target_time(),
            num_control_ticks,
            num_fast_overruns: 0,
            num_slow_overruns: 0,
            estimated_x_cm: estimated.position[0],
            estimated_y_cm: estimated.position[1],
            estimated_heading_rad: estimated.heading.radians(),
            true_x_cm: true_position[0],
            true_y_cm: true_position[1],
            true_heading_rad: plant.true_heading().radians(),
            destination_x_cm: destination[0],
            destination_y_cm: destination[1],
            final_error_cm: (true_position - destination).norm()
        }
    }

    fn log(&self) {
        match self.finished {
            true => info!(
                "Course finished in {:.3} s (target {:.3} s) after {} control ticks",
                self.elapsed_s, self.target_time_s, self.num_control_ticks
            ),
            false => warn!(
                "Run abandoned after {:.3} s without finishing the course",
                self.elapsed_s
            )
        }

        info!(
            "Final position ({:.2}, {:.2}) cm, estimated ({:.2}, {:.2}) cm, {:.2} cm from the \
             destination",
            self.true_x_cm,
            self.true_y_cm,
            self.estimated_x_cm,
            self.estimated_y_cm,
            self.final_error_cm
        );

        if self.num_fast_overruns > 0 || self.num_slow_overruns > 0 {
            warn!(
                "Loop overruns: {} fast, {} slow",
                self.num_fast_overruns, self.num_slow_overruns
            );
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the course on a single thread, stepping the simulator between control
/// ticks with a simulated clock.
pub fn run_lockstep(
    controllers: &mut Controllers,
    sim: &mut Simulator,
    params: &TourExecParams,
    mut archiver: Option<&mut Archiver>
) -> RunSummary {
    let link = sim.link();
    let mut battery = link.battery();
    let mut motors = link.motors();
    let mut current_sensor = link.current_sensor();

    let fast_dt = params.fast_period_s();
    let slow_dt = params.slow_period_s();
    let fast_ticks = params.fast_ticks_per_slow();

    let mut time_s = 0.0;
    let mut num_ticks = 0u64;

    info!("Running the course in lockstep");

    loop {
        let record = controllers.tick(
            &*link.snapshot,
            &mut battery,
            &mut motors,
            &mut current_sensor,
            time_s,
            slow_dt
        );
        num_ticks += 1;
        archive(&mut archiver, record);

        if controllers.finished() || time_s >= params.max_run_time_s {
            break;
        }

        for _ in 0..fast_ticks {
            sim.step(fast_dt);
        }
        time_s = num_ticks as f64 * slow_dt;
    }

    motors.set_power(WheelPair::default());
    flush(&mut archiver);

    let summary = RunSummary::new(
        controllers,
        &link.snapshot.load(),
        sim.plant(),
        time_s,
        num_ticks
    );
    summary.log();

    summary
}

/// Run the course with the simulator on its own thread, each loop paced
/// against the wall clock.
pub fn run_realtime(
    controllers: &mut Controllers,
    mut sim: Simulator,
    params: &TourExecParams,
    mut archiver: Option<&mut Archiver>
) -> Result<RunSummary, RunError> {
    let link = sim.link();
    let mut battery = link.battery();
    let mut motors = link.motors();
    let mut current_sensor = link.current_sensor();

    let stop = Arc::new(AtomicBool::new(false));

    // ---- FAST LOOP ----

    let fast_stop = stop.clone();
    let fast_period = Duration::from_secs_f64(params.fast_period_s());

    let fast_handle = thread::spawn(move || {
        let mut ticker = Ticker::new(fast_period);
        let mut watch = Stopwatch::start();

        while !fast_stop.load(Ordering::Relaxed) {
            ticker.wait();
            sim.step(watch.lap().as_secs_f64());
        }

        (sim, ticker.num_overruns())
    });

    // ---- SLOW LOOP ----

    info!("Running the course in realtime");

    let mut ticker = Ticker::new(Duration::from_secs_f64(params.slow_period_s()));
    let mut watch = Stopwatch::start();
    let run_start = Stopwatch::start();
    let mut num_ticks = 0u64;

    loop {
        ticker.wait();
        let dt = watch.lap().as_secs_f64();
        let time_s = run_start.elapsed().as_secs_f64();

        let record = controllers.tick(
            &*link.snapshot,
            &mut battery,
            &mut motors,
            &mut current_sensor,
            time_s,
            dt
        );
        num_ticks += 1;
        archive(&mut archiver, record);

        if controllers.finished() || time_s >= params.max_run_time_s {
            break;
        }
    }

    // ---- SHUTDOWN ----

    motors.set_power(WheelPair::default());
    let elapsed_s = run_start.elapsed().as_secs_f64();

    stop.store(true, Ordering::Relaxed);
    let (sim, num_fast_overruns) = fast_handle.join().map_err(|_| RunError::FastLoopPanicked)?;

    flush(&mut archiver);

    let mut summary = RunSummary::new(
        controllers,
        &link.snapshot.load(),
        sim.plant(),
        elapsed_s,
        num_ticks
    );
    summary.num_fast_overruns = num_fast_overruns;
    summary.num_slow_overruns = ticker.num_overruns();
    summary.log();

    Ok(summary)
}

/// Write a record to the archive. Archiving stops after the first failure.
fn archive(archiver: &mut Option<&mut Archiver>, record: TickRecord) {
    if let Some(a) = archiver {
        if let Err(e) = a.serialise(record) {
            warn!("Could not archive control tick, archiving stopped: {}", e);
            *archiver = None;
        }
    }
}

fn flush(archiver: &mut Option<&mut Archiver>) {
    if let Some(a) = archiver {
        if let Err(e) = a.flush() {
            warn!("Could not flush the control archive: {}", e);
        }
    }
}
