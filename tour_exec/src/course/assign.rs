//! Velocity limit, distance and target time assignment

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::{Course, Params};
use crate::geom::Vec2Ext;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Signed curvature of the circle through three points, positive when
/// `a -> b -> c` turns left.
///
/// Coincident points give NaN.
pub fn curvature(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    let ab = a - b;
    let bc = b - c;
    let ac = c - a;

    2.0 * ab.cross2(&bc) / (ab.norm() * bc.norm() * ac.norm())
}

/// Assign curvature and velocity limits to every segment.
///
/// The limit starts at the centripetal limit, then a backward pass over each
/// route caps it so that the robot can always decelerate to the minimum
/// velocity at the route's end.
pub fn assign_velocity_limits(mut course: Course, params: &Params) -> Course {
    for route in course.routes.iter() {
        let segs = &mut course.segments[route.range()];
        let n = segs.len();

        // Curvature, zero at the route's ends
        for i in 0..n {
            segs[i].curvature = if i == 0 || i + 1 == n {
                0.0
            }
            else {
                curvature(segs[i - 1].position, segs[i].position, segs[i + 1].position)
            };
        }

        // Centripetal limit. A NaN curvature falls back to the max velocity.
        for seg in segs.iter_mut() {
            let k = seg.curvature.abs();
            seg.velocity_limit = if k == 0.0 {
                params.max_velocity_cms
            }
            else {
                (params.curvature_slowdown / k.sqrt()).min(params.max_velocity_cms)
            };
        }

        // Deceleration limit
        if let Some(last) = segs.last_mut() {
            last.velocity_limit = params.min_velocity_cms;
        }
        for i in (0..n.saturating_sub(1)).rev() {
            let distance = (segs[i + 1].position - segs[i].position).norm();
            let reachable = (segs[i + 1].velocity_limit.powi(2)
                + 2.0 * params.max_acceleration_cmss * distance)
                .sqrt();

            segs[i].velocity_limit = reachable.min(segs[i].velocity_limit);
        }
    }

    course
}

/// Assign each segment the path length left to the end of its route.
pub fn assign_distances(mut course: Course) -> Course {
    for route in course.routes.iter() {
        let segs = &mut course.segments[route.range()];

        if let Some(last) = segs.last_mut() {
            last.distance_to_end = 0.0;
        }
        for i in (0..segs.len().saturating_sub(1)).rev() {
            let distance = (segs[i + 1].position - segs[i].position).norm();
            segs[i].distance_to_end = segs[i + 1].distance_to_end + distance;
        }
    }

    course
}

/// Share the path's target time between the routes.
///
/// Every route is given `stop_time_s`. Routes with explicit command times
/// also get the sum of those times. What is left of `target_time_s` (never
/// less than zero) is shared between the other routes in proportion to their
/// length.
pub fn assign_target_times(mut course: Course, target_time_s: f64, stop_time_s: f64) -> Course {
    let mut fixed_time_s = 0.0;
    let mut free_length = 0.0;

    for route in course.routes.iter() {
        match route.time_override_s {
            Some(t) => fixed_time_s += t,
            None => free_length += course.route_length(route)
        }
    }

    let num_routes = course.routes.len() as f64;
    let assignable_s = (target_time_s - num_routes * stop_time_s - fixed_time_s).max(0.0);

    let lengths: Vec<f64> = course
        .routes
        .iter()
        .map(|r| course.route_length(r))
        .collect();

    for (route, length) in course.routes.iter_mut().zip(lengths) {
        route.target_time_s = stop_time_s + match route.time_override_s {
            Some(t) => t,
            None if free_length > 0.0 => assignable_s * length / free_length,
            None => 0.0
        };
    }

    course
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::course::{Route, Segment};

    fn course_from(points: &[(f64, f64)], ranges: &[(usize, usize)]) -> Course {
        Course {
            segments: points
                .iter()
                .map(|&(x, y)| Segment::at(Vector2::new(x, y)))
                .collect(),
            routes: ranges
                .iter()
                .map(|&(begin, end)| Route {
                    begin,
                    end,
                    target_time_s: 0.0,
                    reverse: false,
                    time_override_s: None
                })
                .collect()
        }
    }

    #[test]
    fn test_curvature() {
        // Unit circle through three points, turning left
        let k = curvature(
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(-1.0, 0.0)
        );
        assert!((k - 1.0).abs() < 1e-12);

        let k = curvature(
            Vector2::new(-1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 0.0)
        );
        assert!((k + 1.0).abs() < 1e-12);

        let k = curvature(Vector2::zeros(), Vector2::new(0.0, 1.0), Vector2::new(0.0, 2.0));
        assert_eq!(k, 0.0);
    }

    #[test]
    fn test_velocity_limits() {
        let params = Params::default();
        let course = course_from(
            &[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 20.0)],
            &[(0, 4)]
        );
        let course = assign_velocity_limits(course, &params);
        let segs = &course.segments;

        assert_eq!(segs[0].curvature, 0.0);
        assert!(segs[1].curvature < 0.0, "right turn is negative");
        assert!(segs[2].curvature > 0.0, "left turn is positive");
        assert_eq!(segs[3].velocity_limit, params.min_velocity_cms);

        let k = segs[1].curvature.abs();
        assert!(segs[1].velocity_limit <= params.curvature_slowdown / k.sqrt() + 1e-9);
    }

    #[test]
    fn test_target_times_clamp_to_zero() {
        let course = course_from(&[(0.0, 0.0), (0.0, 10.0)], &[(0, 2)]);
        let course = assign_distances(course);
        let course = assign_target_times(course, 0.1, 0.5);

        assert_eq!(course.routes[0].target_time_s, 0.5);
    }

    #[test]
    fn test_distances() {
        let course = course_from(
            &[(0.0, 0.0), (0.0, 3.0), (4.0, 3.0), (4.0, 3.0), (4.0, 0.0)],
            &[(0, 3), (3, 5)]
        );
        let course = assign_distances(course);

        assert_eq!(course.segments[0].distance_to_end, 7.0);
        assert_eq!(course.segments[2].distance_to_end, 0.0);
        assert_eq!(course.segments[3].distance_to_end, 3.0);
        assert_eq!(course.total_length(), 10.0);
    }
}
