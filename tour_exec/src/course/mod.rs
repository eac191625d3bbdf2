//! # Course compiler
//!
//! The course is the dense trajectory the follower tracks. It is compiled
//! once, before the control loops start, from the authored commands:
//!
//! 1. [`accumulate`](crate::path::accumulate) the commands into path points,
//! 2. [`convert`] the path into routes, one per stop,
//! 3. [`extend`] each route by resampling it at a fixed spacing,
//! 4. [`smoothen`] each route with a moving average,
//! 5. [`assign_velocity_limits`] from curvature and deceleration,
//! 6. [`assign_distances`] to the end of each route,
//! 7. [`assign_target_times`] by sharing the path's time between routes.
//!
//! Every stage is a pure function. Degenerate input, such as zero length
//! routes, gives degenerate output (zero or NaN fields) rather than an error.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod assign;
mod convert;
pub mod params;
mod resample;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::ops::Range;

// Internal
use crate::path::{accumulate, Command, PathPoint};
pub use assign::{assign_distances, assign_target_times, assign_velocity_limits, curvature};
pub use convert::convert;
pub use params::{Params, ParamsError};
pub use resample::{extend, smoothen};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One resampled point of the course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub position: Vector2<f64>,

    /// Signed curvature at this point, positive for left turns.
    ///
    /// Units: 1/centimetres
    pub curvature: f64,

    /// Upper bound on the speed at this point.
    ///
    /// Units: centimetres/second
    pub velocity_limit: f64,

    /// Path length left to the end of the route.
    ///
    /// Units: centimetres
    pub distance_to_end: f64
}

/// One uninterrupted translation phase, `[begin, end)` into the course's
/// segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub begin: usize,
    pub end: usize,

    /// Time allowed to drive this route and turn towards the next.
    ///
    /// Units: seconds
    pub target_time_s: f64,

    /// Drive the route backwards.
    pub reverse: bool,

    /// Sum of the explicit command times in this route, if any command had
    /// one.
    pub time_override_s: Option<f64>
}

/// A compiled course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub segments: Vec<Segment>,
    pub routes: Vec<Route>
}

/// Summary of a compiled course, logged and saved with each run.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub num_segments: usize,
    pub num_routes: usize,
    pub total_length_cm: f64,
    pub total_target_time_s: f64,
    pub destination_cm: Vector2<f64>,
    pub route_lengths_cm: Vec<f64>,
    pub route_times_s: Vec<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Segment {
    /// A segment at the given position with no annotations yet.
    pub fn at(position: Vector2<f64>) -> Self {
        Self {
            position,
            curvature: 0.0,
            velocity_limit: 0.0,
            distance_to_end: 0.0
        }
    }
}

impl Route {
    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of this route's metadata with a new segment range.
    pub(crate) fn with_range(&self, begin: usize, end: usize) -> Self {
        Self {
            begin,
            end,
            ..*self
        }
    }
}

impl Course {
    /// Segments of the given route.
    pub fn route_segments(&self, route: &Route) -> &[Segment] {
        &self.segments[route.range()]
    }

    /// Length of a route, from the distances assigned at compile time.
    pub fn route_length(&self, route: &Route) -> f64 {
        self.segments
            .get(route.begin)
            .filter(|_| !route.is_empty())
            .map(|s| s.distance_to_end)
            .unwrap_or(0.0)
    }

    pub fn total_length(&self) -> f64 {
        self.routes.iter().map(|r| self.route_length(r)).sum()
    }

    pub fn total_target_time(&self) -> f64 {
        self.routes.iter().map(|r| r.target_time_s).sum()
    }

    /// Final position of the course.
    pub fn destination(&self) -> Vector2<f64> {
        self.segments
            .last()
            .map(|s| s.position)
            .unwrap_or_else(Vector2::zeros)
    }

    /// True if the routes cover every segment exactly once, in order.
    pub fn is_partitioned(&self) -> bool {
        let mut next = 0;
        for route in self.routes.iter() {
            if route.begin != next || route.end < route.begin {
                return false;
            }
            next = route.end;
        }
        next == self.segments.len()
    }

    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            num_segments: self.segments.len(),
            num_routes: self.routes.len(),
            total_length_cm: self.total_length(),
            total_target_time_s: self.total_target_time(),
            destination_cm: self.destination(),
            route_lengths_cm: self.routes.iter().map(|r| self.route_length(r)).collect(),
            route_times_s: self.routes.iter().map(|r| r.target_time_s).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compile a command list into a course.
pub fn compile(commands: &[Command], target_time_s: f64, params: &Params) -> Course {
    let path = accumulate(commands, &params.geometry());
    compile_path(&path, target_time_s, params)
}

/// Compile already accumulated path points into a course.
pub fn compile_path(path: &[PathPoint], target_time_s: f64, params: &Params) -> Course {
    let course = convert(path);
    let course = extend(&course, params.path_spacing_cm);
    let course = smoothen(&course, params.moving_average_width);
    let course = assign_velocity_limits(course, params);
    let course = assign_distances(course);
    assign_target_times(course, target_time_s, params.stop_time_s)
}
