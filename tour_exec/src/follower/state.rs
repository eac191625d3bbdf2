//! Follower module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{route_heading, Movement, Params, Rotation};
use crate::course::Course;
use crate::eqpt::Snapshot;
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Mode changes allowed in a single tick. Finishing a route, then a rotation
/// that is already aligned, then an empty route, can take a few.
const MAX_MODE_CHANGES_PER_TICK: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Follower {
    params: Params,

    /// Executing mode
    mode: FollowerMode,

    course: Course,

    /// Cumulative deadline of each route, from the start of the run.
    deadlines_s: Vec<f64>,

    /// Index of the route being driven, or turned towards
    route_index: usize,

    movement: Movement,
    rotation: Rotation,

    report: StatusReport
}

/// Input to the follower for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowerInput {
    pub snapshot: Snapshot,

    /// Time since the start of the run.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Time since the previous tick.
    ///
    /// Units: seconds
    pub dt: f64
}

/// Target velocities of the robot's body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VelocityTarget {
    /// Positive forwards.
    ///
    /// Units: centimetres/second
    pub linear_cms: f64,

    /// Positive anticlockwise.
    ///
    /// Units: radians/second
    pub angular_rads: f64
}

/// Status report for the follower, produced every tick.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub time_s: f64,
    pub mode: FollowerMode,
    pub route_index: usize,

    /// First edge not yet passed
    pub next_edge: usize,

    /// Edge the goal point lies on
    pub goal_edge: usize,
    pub goal_x_cm: f64,
    pub goal_y_cm: f64,

    /// Path length left to the end of the route
    pub distance_left_cm: f64,

    /// Time left to the route's deadline
    pub time_left_s: f64,

    /// Error to the goal point when moving, or to the target heading when
    /// rotating
    pub heading_error_rad: f64,

    pub linear_cms: f64,
    pub angular_rads: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of the follower. Each mode is handled by
/// a `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FollowerMode {
    Movement,
    Rotation,
    Finished
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FollowerMode {
    fn default() -> Self {
        FollowerMode::Movement
    }
}

impl Follower {
    /// Create a follower for the course, ready to start the first route.
    pub fn new(course: Course, params: Params) -> Self {
        let deadlines_s = course
            .routes
            .iter()
            .scan(0.0, |total, r| {
                *total += r.target_time_s;
                Some(*total)
            })
            .collect();

        let rotation = Rotation::new(&params.rotation);
        let movement = Self::first_movement(&course);

        let mut follower = Self {
            params,
            mode: FollowerMode::Finished,
            course,
            deadlines_s,
            route_index: 0,
            movement,
            rotation,
            report: StatusReport::default()
        };
        follower.reset();

        follower
    }

    pub fn finished(&self) -> bool {
        self.mode == FollowerMode::Finished
    }

    pub fn mode(&self) -> FollowerMode {
        self.mode
    }

    pub fn route_index(&self) -> usize {
        self.route_index
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Deadline of every route, from the start of the run.
    pub fn deadlines_s(&self) -> &[f64] {
        &self.deadlines_s
    }

    /// Mode movement.
    ///
    /// Returns `None` if the route was completed and the mode changed.
    fn mode_movement(&mut self, input: &FollowerInput) -> Option<VelocityTarget> {
        let target = self.movement.update(
            &self.course,
            &self.params,
            &input.snapshot,
            input.time_s,
            input.dt,
            &mut self.report
        );

        if target.is_none() {
            debug!(
                "Route {} complete at {:.3} s, deadline {:.3} s",
                self.route_index, input.time_s, self.deadlines_s[self.route_index]
            );
            self.next_route(input);
        }

        target
    }

    /// Mode rotation.
    ///
    /// Returns `None` if the robot faces the next route and the mode changed.
    fn mode_rotation(&mut self, input: &FollowerInput) -> Option<VelocityTarget> {
        let heading = input.snapshot.heading;
        self.report.heading_error_rad = (self.rotation.target() - heading).radians();

        match self.rotation.update(heading, input.dt) {
            Some(angular_rads) => Some(VelocityTarget {
                linear_cms: 0.0,
                angular_rads
            }),
            None => {
                debug!("Rotation to {} complete", self.rotation.target());
                self.start_movement();
                None
            }
        }
    }

    /// Mode finished, the robot is held still.
    fn mode_finished(&mut self) -> Option<VelocityTarget> {
        Some(VelocityTarget::default())
    }

    /// Advance to the next route, turning towards it first if needed.
    fn next_route(&mut self, input: &FollowerInput) {
        if self.route_index + 1 >= self.course.routes.len() {
            info!("Course finished at {:.3} s", input.time_s);
            self.mode = FollowerMode::Finished;
            return;
        }

        self.route_index += 1;

        match route_heading(&self.course, &self.course.routes[self.route_index]) {
            Some(heading) => {
                self.rotation.start(heading);
                self.mode = FollowerMode::Rotation;
            }
            None => self.start_movement()
        }
    }

    fn start_movement(&mut self) {
        self.movement = Movement::new(
            &self.course,
            self.course.routes[self.route_index],
            self.deadlines_s[self.route_index]
        );
        self.mode = FollowerMode::Movement;
    }

    fn first_movement(course: &Course) -> Movement {
        let route = course.routes.first().copied().unwrap_or_default();
        Movement::new(course, route, route.target_time_s)
    }
}

impl State for Follower {
    type InputData = FollowerInput;
    type OutputData = VelocityTarget;
    type StatusReport = StatusReport;

    /// Process the follower.
    ///
    /// Processing involves running the current mode. When a mode completes
    /// the next mode is run in the same tick, so a new command is produced
    /// without a gap.
    fn proc(&mut self, input: &FollowerInput) -> (VelocityTarget, StatusReport) {
        self.report = StatusReport {
            time_s: input.time_s,
            ..StatusReport::default()
        };

        let mut output = VelocityTarget::default();

        for _ in 0..MAX_MODE_CHANGES_PER_TICK {
            let target = match self.mode {
                FollowerMode::Movement => self.mode_movement(input),
                FollowerMode::Rotation => self.mode_rotation(input),
                FollowerMode::Finished => self.mode_finished()
            };

            if let Some(t) = target {
                output = t;
                break;
            }
        }

        self.report.mode = self.mode;
        self.report.route_index = self.route_index;
        self.report.linear_cms = output.linear_cms;
        self.report.angular_rads = output.angular_rads;

        (output, self.report)
    }

    /// Go back to the start of the first route.
    fn reset(&mut self) {
        self.route_index = 0;
        self.movement = Self::first_movement(&self.course);
        self.report = StatusReport::default();

        self.mode = match self.course.routes.is_empty() {
            true => FollowerMode::Finished,
            false => FollowerMode::Movement
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::course::{compile, Params as CourseParams};
    use crate::geom::{down, left, up, Angle};
    use crate::path::{move_by, Command};
    use nalgebra::Vector2;
    use std::f64::consts::PI;

    const DT: f64 = 0.002;

    fn params() -> Params {
        util::params::parse(include_str!("../../../params/follower.toml")).unwrap()
    }

    fn follower(commands: &[Command], target_time_s: f64) -> Follower {
        let course = compile(commands, target_time_s, &CourseParams::default());
        Follower::new(course, params())
    }

    /// Drive an ideal robot that follows the commanded velocities exactly,
    /// starting at the origin and facing up. Returns the final state, the
    /// time taken, and every command issued.
    fn drive(follower: &mut Follower, max_time_s: f64) -> (Snapshot, f64, Vec<StatusReport>) {
        let mut snapshot = Snapshot {
            heading: Angle::new(PI / 2.0),
            ..Default::default()
        };
        let mut reports = Vec::new();
        let mut time_s = 0.0;

        while time_s < max_time_s {
            let input = FollowerInput {
                snapshot,
                time_s,
                dt: DT
            };
            let (target, report) = follower.proc(&input);
            reports.push(report);

            if follower.finished() {
                break;
            }

            let direction = snapshot.heading.unit_vector();
            snapshot.velocity = direction * target.linear_cms;
            snapshot.position += snapshot.velocity * DT;
            snapshot.angular_velocity = target.angular_rads;
            snapshot.heading += Angle::new(target.angular_rads * DT);

            time_s += DT;
        }

        (snapshot, time_s, reports)
    }

    #[test]
    fn test_two_routes_terminate() {
        let mut f = follower(&[move_by(up()), move_by(left())], 50.0);
        assert_eq!(f.deadlines_s().len(), 2);
        assert!((f.deadlines_s()[1] - 50.0).abs() < 1e-9);

        let (snapshot, time_s, reports) = drive(&mut f, 120.0);

        assert!(f.finished());
        assert!(time_s < 120.0);
        assert!((snapshot.position - Vector2::new(-50.0, 50.0)).norm() < 3.0);

        // The robot turned on the spot between the routes
        assert!(reports
            .iter()
            .any(|r| r.mode == FollowerMode::Rotation && r.linear_cms == 0.0));
        assert!(reports.iter().any(|r| r.route_index == 1));
    }

    #[test]
    fn test_single_route_on_time() {
        let mut f = follower(&[move_by(up() * 50.0).centimeters()], 5.0);
        let (snapshot, time_s, _) = drive(&mut f, 20.0);

        assert!(f.finished());
        assert!(time_s > 4.0 && time_s < 6.0, "finished at {} s", time_s);
        assert!(snapshot.position[1] >= 50.0);
        assert!(snapshot.position[0].abs() < 1.0);
    }

    #[test]
    fn test_reverse_route() {
        let mut f = follower(&[move_by(up()), move_by(down()).reverse()], 30.0);
        let (snapshot, _, reports) = drive(&mut f, 60.0);

        assert!(f.finished());
        assert!(snapshot.position.norm() < 3.0);

        // Still facing up, having backed down the second route
        assert!(snapshot.heading.approx_eq(Angle::new(PI / 2.0), 0.1));
        assert!(reports
            .iter()
            .filter(|r| r.route_index == 1 && r.mode == FollowerMode::Movement)
            .all(|r| r.linear_cms < 0.0));
    }

    #[test]
    fn test_finished_is_idempotent() {
        let mut f = follower(&[move_by(up() * 20.0).centimeters()], 2.0);
        drive(&mut f, 20.0);
        assert!(f.finished());

        let input = FollowerInput {
            snapshot: Snapshot::default(),
            time_s: 100.0,
            dt: DT
        };
        for _ in 0..10 {
            let (target, report) = f.proc(&input);
            assert_eq!(target, VelocityTarget::default());
            assert_eq!(report.mode, FollowerMode::Finished);
        }

        // A reset starts the course again
        f.reset();
        assert_eq!(f.mode(), FollowerMode::Movement);
        assert_eq!(f.route_index(), 0);
    }

    #[test]
    fn test_empty_course_is_finished() {
        let mut f = Follower::new(Course::default(), params());
        assert!(f.finished());

        let (target, _) = f.proc(&FollowerInput::default());
        assert_eq!(target, VelocityTarget::default());
    }
}
