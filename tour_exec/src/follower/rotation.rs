//! Rotation on the spot between routes

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::RotationParams;
use crate::course::{Course, Route};
use crate::ctrl::{ControlTerm, Controller};
use crate::geom::{Angle, Vec2Ext};
use util::maths::clamp_abs;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Segments closer than this are treated as the same point when finding the
/// direction of a route.
const MIN_DIRECTION_LENGTH_CM: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Turns the robot on the spot towards a target heading.
#[derive(Debug, Clone)]
pub struct Rotation {
    target: Angle,
    controller: Controller,
    max_angular_velocity_rads: f64,
    angle_threshold_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Rotation {
    pub fn new(params: &RotationParams) -> Self {
        Self {
            target: Angle::default(),
            controller: Controller::from_params(&params.terms),
            max_angular_velocity_rads: params.max_angular_velocity_rads,
            angle_threshold_rad: params.angle_threshold_rad
        }
    }

    /// Begin turning towards a new heading.
    pub fn start(&mut self, target: Angle) {
        self.target = target;
        self.controller.reset();
    }

    pub fn target(&self) -> Angle {
        self.target
    }

    /// Get the angular velocity for this tick, or `None` once the heading is
    /// within the threshold of the target.
    pub fn update(&mut self, heading: Angle, dt: f64) -> Option<f64> {
        let error = self.target - heading;

        if error.abs() < self.angle_threshold_rad {
            return None;
        }

        let angular_rads = self.controller.update(error.radians(), 0.0, dt);

        Some(clamp_abs(angular_rads, self.max_angular_velocity_rads))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Heading the robot must face to start driving a route: the direction from
/// its first segment to the first segment at a different position, turned
/// around for reverse routes.
///
/// Returns `None` if every segment of the route is at the same position.
pub fn route_heading(course: &Course, route: &Route) -> Option<Angle> {
    let segs = course.route_segments(route);
    let start = segs.first()?.position;

    let direction = segs
        .iter()
        .map(|s| s.position - start)
        .find(|d| d.norm() > MIN_DIRECTION_LENGTH_CM)?;

    let heading = direction.bearing();

    Some(match route.reverse {
        true => heading + Angle::half_turn(),
        false => heading
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::course::{compile, Params as CourseParams};
    use crate::ctrl::TermParams;
    use crate::geom::{left, up};
    use crate::path::move_by;
    use std::f64::consts::PI;

    fn rotation_params() -> RotationParams {
        RotationParams {
            terms: vec![
                TermParams::StaticFriction { k_s: 0.6 },
                TermParams::Proportional { k_p: 3.5 }
            ],
            max_angular_velocity_rads: 2.0,
            angle_threshold_rad: 0.05
        }
    }

    #[test]
    fn test_rotation_turns_and_completes() {
        let mut rot = Rotation::new(&rotation_params());
        rot.start(Angle::new(PI / 2.0));

        // Large errors saturate, in the direction of the error
        assert_eq!(rot.update(Angle::new(0.0), 0.001), Some(2.0));
        assert_eq!(rot.update(Angle::new(PI), 0.001), Some(-2.0));

        // Small errors use the composed terms
        let w = rot.update(Angle::new(PI / 2.0 - 0.1), 0.001).unwrap();
        assert!((w - (0.6 + 0.35)).abs() < 1e-9);

        assert_eq!(rot.update(Angle::new(PI / 2.0 + 0.01), 0.001), None);
    }

    #[test]
    fn test_rotation_across_wrap() {
        let mut rot = Rotation::new(&rotation_params());
        rot.start(Angle::new(PI - 0.05));

        // The short way round from just past -pi is clockwise
        let w = rot.update(Angle::new(-PI + 0.05), 0.001).unwrap();
        assert!(w < 0.0);
    }

    #[test]
    fn test_route_heading() {
        let params = CourseParams::default();
        let course = compile(
            &[move_by(up()), move_by(left()), move_by(up()).reverse()],
            30.0,
            &params
        );
        assert_eq!(course.routes.len(), 3);

        assert_eq!(route_heading(&course, &course.routes[0]), Some(Angle::new(PI / 2.0)));
        assert_eq!(route_heading(&course, &course.routes[1]), Some(Angle::new(PI)));
        // Driving up backwards means facing down
        assert_eq!(route_heading(&course, &course.routes[2]), Some(Angle::new(-PI / 2.0)));
    }
}
