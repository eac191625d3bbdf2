//! Path to course conversion

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::{Course, Route, Segment};
use crate::path::PathPoint;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Split the path into routes at each stop.
///
/// The course starts with a segment at the origin. Each stop point ends its
/// route and is repeated as the first segment of the next route, so that
/// every route has a start position.
pub fn convert(path: &[PathPoint]) -> Course {
    let num_stops = path.iter().filter(|p| p.stop).count();

    let mut segments = Vec::with_capacity(path.len() + num_stops);
    let mut routes = Vec::with_capacity(num_stops);

    segments.push(Segment::at(Vector2::zeros()));

    let mut begin = 0;
    let mut time_override_s: Option<f64> = None;

    for (i, point) in path.iter().enumerate() {
        segments.push(Segment::at(point.position));

        if let Some(t) = point.target_time_s {
            time_override_s = Some(time_override_s.unwrap_or(0.0) + t);
        }

        if point.stop {
            let end = segments.len();
            routes.push(Route {
                begin,
                end,
                target_time_s: 0.0,
                reverse: point.reverse,
                time_override_s: time_override_s.take()
            });
            begin = end;

            if i + 1 < path.len() {
                segments.push(Segment::at(point.position));
            }
        }
    }

    Course { segments, routes }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{left, up};
    use crate::path::{accumulate, move_by, TrackGeometry};

    #[test]
    fn test_convert() {
        let path = accumulate(
            &[
                move_by(up()),
                move_by(up()).target_time(3.0),
                move_by(left()).reverse().target_time(1.5)
            ],
            &TrackGeometry::default()
        );
        let course = convert(&path);

        // Origin, two points, duplicated stop, last point
        assert_eq!(course.segments.len(), 5);
        assert_eq!(course.routes.len(), 2);
        assert_eq!(course.routes[0].range(), 0..3);
        assert_eq!(course.routes[1].range(), 3..5);
        assert_eq!(course.segments[2].position, course.segments[3].position);

        assert!(!course.routes[0].reverse);
        assert!(course.routes[1].reverse);
        assert_eq!(course.routes[0].time_override_s, Some(3.0));
        assert_eq!(course.routes[1].time_override_s, Some(1.5));
        assert!(course.is_partitioned());
    }
}
