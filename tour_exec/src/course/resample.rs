//! Route resampling and smoothing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::{Course, Segment};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resample every route at the given spacing.
///
/// Each edge of length `l` is replaced by `ceil(l / spacing)` points starting
/// at the edge's first point, and the route's last point is kept. Zero length
/// edges add nothing.
pub fn extend(course: &Course, spacing_cm: f64) -> Course {
    let mut segments = Vec::with_capacity(estimate_extended_len(course, spacing_cm));
    let mut routes = Vec::with_capacity(course.routes.len());

    for route in course.routes.iter() {
        let begin = segments.len();

        if let Some(last) = course.route_segments(route).last() {
            for edge in course.route_segments(route).windows(2) {
                let start = edge[0].position;
                let delta = edge[1].position - start;
                let length = delta.norm();
                let count = (length / spacing_cm).ceil();

                if !(count >= 1.0) {
                    continue;
                }

                let step = delta / length * spacing_cm;
                for j in 0..count as usize {
                    segments.push(Segment::at(start + step * j as f64));
                }
            }

            segments.push(Segment::at(last.position));
        }

        routes.push(route.with_range(begin, segments.len()));
    }

    Course { segments, routes }
}

/// Smooth every route with a moving average of the given width.
///
/// Windows never cross a route boundary. Windows hanging off either end of
/// the route are averaged over the points they do cover, so each route gains
/// `width - 1` points and keeps its exact first and last positions.
pub fn smoothen(course: &Course, width: usize) -> Course {
    let width = width.max(1) as isize;

    let mut segments =
        Vec::with_capacity(course.segments.len() + course.routes.len() * (width as usize - 1));
    let mut routes = Vec::with_capacity(course.routes.len());

    for route in course.routes.iter() {
        let begin = segments.len();
        let (route_begin, route_end) = (route.begin as isize, route.end as isize);

        if !route.is_empty() {
            for i in (route_begin - width + 1)..route_end {
                let lo = i.max(route_begin) as usize;
                let hi = (i + width).min(route_end) as usize;

                let sum = course.segments[lo..hi]
                    .iter()
                    .fold(Vector2::zeros(), |acc, s| acc + s.position);

                segments.push(Segment::at(sum / (hi - lo) as f64));
            }
        }

        routes.push(route.with_range(begin, segments.len()));
    }

    Course { segments, routes }
}

fn estimate_extended_len(course: &Course, spacing_cm: f64) -> usize {
    let length: f64 = course
        .segments
        .windows(2)
        .map(|w| (w[1].position - w[0].position).norm())
        .sum();

    let estimate = length / spacing_cm;
    if estimate.is_finite() {
        estimate as usize + 2 * course.segments.len()
    }
    else {
        course.segments.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::course::Route;

    fn straight_course(length: f64) -> Course {
        Course {
            segments: vec![
                Segment::at(Vector2::zeros()),
                Segment::at(Vector2::new(0.0, length))
            ],
            routes: vec![Route {
                begin: 0,
                end: 2,
                target_time_s: 0.0,
                reverse: false,
                time_override_s: None
            }]
        }
    }

    #[test]
    fn test_extend() {
        let course = extend(&straight_course(10.0), 3.0);

        // ceil(10 / 3) = 4 points plus the end
        assert_eq!(course.segments.len(), 5);
        assert_eq!(course.routes[0].range(), 0..5);
        assert_eq!(course.segments[3].position, Vector2::new(0.0, 9.0));
        assert_eq!(course.segments[4].position, Vector2::new(0.0, 10.0));
    }

    #[test]
    fn test_extend_zero_length_edge() {
        let mut course = straight_course(4.0);
        course.segments.insert(1, Segment::at(Vector2::zeros()));
        course.routes[0].end = 3;

        let course = extend(&course, 1.0);
        assert_eq!(course.segments.len(), 5);
        assert!(course.segments.iter().all(|s| s.position[1].is_finite()));
    }

    #[test]
    fn test_smoothen_keeps_endpoints() {
        let course = extend(&straight_course(10.0), 1.0);
        let smooth = smoothen(&course, 4);

        assert_eq!(smooth.segments.len(), course.segments.len() + 3);
        assert_eq!(smooth.segments[0].position, Vector2::zeros());
        assert_eq!(
            smooth.segments[smooth.segments.len() - 1].position,
            Vector2::new(0.0, 10.0)
        );

        // Averages of a straight line stay on it, in order
        for pair in smooth.segments.windows(2) {
            assert_eq!(pair[0].position[0], 0.0);
            assert!(pair[1].position[1] >= pair[0].position[1]);
        }
    }

    #[test]
    fn test_smoothen_respects_route_boundaries() {
        let at = |x: f64, y: f64| Segment::at(Vector2::new(x, y));
        let course = Course {
            segments: vec![
                at(0.0, 0.0),
                at(0.0, 10.0),
                at(0.0, 20.0),
                at(100.0, 20.0),
                at(100.0, 30.0)
            ],
            routes: vec![
                Route {
                    begin: 0,
                    end: 3,
                    ..Default::default()
                },
                Route {
                    begin: 3,
                    end: 5,
                    reverse: true,
                    ..Default::default()
                }
            ]
        };

        let smooth = smoothen(&course, 3);

        assert_eq!(smooth.routes[0].range(), 0..5);
        assert_eq!(smooth.routes[1].range(), 5..9);
        assert!(smooth.routes[1].reverse);
        assert!(smooth.is_partitioned());

        // Any window mixing the two routes would pull x off 0 or 100
        for s in smooth.route_segments(&smooth.routes[0]) {
            assert_eq!(s.position[0], 0.0);
        }
        for s in smooth.route_segments(&smooth.routes[1]) {
            assert_eq!(s.position[0], 100.0);
        }

        assert_eq!(smooth.segments[4].position, Vector2::new(0.0, 20.0));
        assert_eq!(smooth.segments[5].position, Vector2::new(100.0, 20.0));
    }
}
