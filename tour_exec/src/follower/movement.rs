//! Pure pursuit along a single route

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::{Params, StatusReport, VelocityTarget};
use crate::course::{Course, Route};
use crate::eqpt::Snapshot;
use crate::geom::{Angle, Vec2Ext};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives the robot along one route of the course.
///
/// Edge `i` of the course runs from segment `i - 1` to segment `i`. Both
/// cursors below are edge indices and only ever move forwards.
#[derive(Debug, Clone, Copy)]
pub struct Movement {
    route: Route,

    /// Time since the start of the run by which the route should be done.
    ///
    /// Units: seconds
    deadline_s: f64,

    /// First edge the robot has not yet passed.
    next_edge: usize,

    /// Edge the goal point lies on.
    goal_edge: usize,

    goal: Vector2<f64>,

    /// Speed commanded on the previous tick.
    ///
    /// Units: centimetres/second
    speed_cms: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Movement {
    /// Start moving along `route`, from rest.
    pub fn new(course: &Course, route: Route, deadline_s: f64) -> Self {
        let next_edge = (route.begin + 1).min(route.end);

        let goal = course
            .segments
            .get(next_edge.min(route.end.saturating_sub(1)))
            .map(|s| s.position)
            .unwrap_or_else(Vector2::zeros);

        Self {
            route,
            deadline_s,
            next_edge,
            goal_edge: next_edge,
            goal,
            speed_cms: 0.0
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Get the velocity target for this tick, or `None` once the robot has
    /// passed the end of the route.
    pub fn update(
        &mut self,
        course: &Course,
        params: &Params,
        snapshot: &Snapshot,
        time_s: f64,
        dt: f64,
        report: &mut StatusReport
    ) -> Option<VelocityTarget> {
        let segs = &course.segments;
        let position = snapshot.position;

        // ---- PASSED EDGES ----

        while self.next_edge < self.route.end
            && edge_passed(
                segs[self.next_edge - 1].position,
                segs[self.next_edge].position,
                position
            )
        {
            self.next_edge += 1;
        }

        if self.next_edge >= self.route.end {
            return None;
        }

        // ---- GOAL POINT ----

        self.find_goal(course, position, params.look_ahead_cm);

        // ---- SPEED ----

        let next = &segs[self.next_edge];
        let distance_left_cm = (next.position - position).norm() + next.distance_to_end;
        let time_left_s = self.deadline_s - time_s;

        let planned = plan_speed(distance_left_cm, time_left_s, params)
            .min(next.velocity_limit)
            .min(params.max_velocity_cms);

        let max_step = params.max_acceleration_cmss * dt.max(0.0);
        self.speed_cms = clamp(planned, self.speed_cms - max_step, self.speed_cms + max_step)
            .max(params.min_velocity_cms);

        // ---- STEERING ----

        let heading = match self.route.reverse {
            true => snapshot.heading + Angle::half_turn(),
            false => snapshot.heading
        };
        let heading_error = (self.goal - position).bearing() - heading;

        let angular_rads =
            params.axle_length_cm * heading_error.sin() * self.speed_cms / params.look_ahead_cm;
        let linear_cms = match self.route.reverse {
            true => -self.speed_cms,
            false => self.speed_cms
        };

        report.next_edge = self.next_edge;
        report.goal_edge = self.goal_edge;
        report.goal_x_cm = self.goal[0];
        report.goal_y_cm = self.goal[1];
        report.distance_left_cm = distance_left_cm;
        report.time_left_s = time_left_s;
        report.heading_error_rad = heading_error.radians();

        Some(VelocityTarget {
            linear_cms,
            angular_rads
        })
    }

    /// Move the goal to the furthest intersection of the look-ahead circle
    /// with the route, searching forward from the current goal edge. The goal
    /// is held if there is no intersection, except on the last edge where it
    /// is clamped onto the edge.
    fn find_goal(&mut self, course: &Course, position: Vector2<f64>, look_ahead_cm: f64) {
        let segs = &course.segments;
        let first_edge = self.goal_edge.max(self.next_edge);
        let last_edge = self.route.end - 1;

        for edge in first_edge..=last_edge {
            let start = segs[edge - 1].position;
            let end = segs[edge].position;

            // Edges starting outside the circle are beyond the look-ahead
            if edge > first_edge && (start - position).norm() > look_ahead_cm {
                break;
            }

            let t = match circle_intersection(start, end, position, look_ahead_cm) {
                Some(t) if edge == last_edge => Some(t.min(1.0)),
                Some(t) if t <= 1.0 => Some(t),
                None if edge == last_edge => Some(project_onto_edge(start, end, position)),
                _ => None
            };

            if let Some(t) = t {
                self.goal = start + (end - start) * t;
                self.goal_edge = edge;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// True if `position` is past the perpendicular through `end` of the edge.
/// Zero length edges are always passed.
fn edge_passed(start: Vector2<f64>, end: Vector2<f64>, position: Vector2<f64>) -> bool {
    let edge = end - start;
    let length_sq = edge.norm_squared();

    length_sq == 0.0 || (position - start).dot(&edge) > length_sq
}

/// Parameter in `[0, 1]` of the point on the edge closest to `position`.
fn project_onto_edge(start: Vector2<f64>, end: Vector2<f64>, position: Vector2<f64>) -> f64 {
    let edge = end - start;
    let length_sq = edge.norm_squared();

    if length_sq == 0.0 {
        return 1.0;
    }

    clamp((position - start).dot(&edge) / length_sq, 0.0, 1.0)
}

/// Parameter `t >= 0` of the furthest point on the line `start + t * (end -
/// start)` at `radius` from `centre`.
fn circle_intersection(
    start: Vector2<f64>,
    end: Vector2<f64>,
    centre: Vector2<f64>,
    radius: f64
) -> Option<f64> {
    let d = end - start;
    let f = start - centre;

    let a = d.norm_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * f.dot(&d);
    let c = f.norm_squared() - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b + discriminant.sqrt()) / (2.0 * a);
    if t >= 0.0 {
        Some(t)
    }
    else {
        None
    }
}

/// Speed to cover `distance_cm` in `time_s`.
///
/// The profile assumed is a constant speed followed by a deceleration at the
/// maximum rate down to the minimum velocity at the end. When the time has
/// run out, or the distance cannot be covered in the time left, the maximum
/// velocity is returned.
pub fn plan_speed(distance_cm: f64, time_s: f64, params: &Params) -> f64 {
    let v_end = params.min_velocity_cms;
    let accel = params.max_acceleration_cmss;

    if time_s <= 0.0 {
        return params.max_velocity_cms;
    }

    // Short enough to need no deceleration, the speed floor will cover it
    if distance_cm <= v_end * time_s {
        return distance_cm / time_s;
    }

    let discriminant = (accel * time_s).powi(2) - 2.0 * accel * (distance_cm - v_end * time_s);
    if discriminant < 0.0 {
        return params.max_velocity_cms;
    }

    v_end + accel * time_s - discriminant.sqrt()
}
