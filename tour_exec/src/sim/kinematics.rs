//! Forward kinematics
//!
//! Dead reckoning from the wheel encoders, with the heading taken from the
//! gyroscope fusion when it is available.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::Params;
use crate::eqpt::Snapshot;
use crate::filters::RcFilter;
use crate::geom::{Angle, Vec2Ext, WheelPair};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ForwardKinematics {
    wheel_radius_cm: f64,
    axle_length_cm: f64,

    prev_wheel_angles: WheelPair<f64>,
    prev_heading: Angle,
    prev_position: Vector2<f64>,

    velocity_filters: [RcFilter; 2],
    angular_velocity_filter: RcFilter,
    wheel_speed_filters: WheelPair<RcFilter>,

    snapshot: Snapshot
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ForwardKinematics {
    /// Start from rest at the origin, with the wheels at `wheel_angles`.
    pub fn new(params: &Params, wheel_angles: WheelPair<f64>) -> Self {
        let heading = Angle::new(params.initial_heading_rad);
        let velocity_filter = RcFilter::new(params.velocity_cutoff_hz);

        Self {
            wheel_radius_cm: params.wheel_radius_cm,
            axle_length_cm: params.axle_length_cm,
            prev_wheel_angles: wheel_angles,
            prev_heading: heading,
            prev_position: Vector2::zeros(),
            velocity_filters: [velocity_filter; 2],
            angular_velocity_filter: velocity_filter,
            wheel_speed_filters: WheelPair::splat(RcFilter::new(params.wheel_speed_cutoff_hz)),
            snapshot: Snapshot {
                heading,
                ..Default::default()
            }
        }
    }

    /// Update the estimate from new encoder readings.
    ///
    /// If `heading` or `angular_velocity` are given they are used instead of
    /// the values derived from the wheels.
    pub fn update(
        &mut self,
        wheel_angles: WheelPair<f64>,
        heading: Option<Angle>,
        angular_velocity: Option<f64>,
        dt: f64
    ) -> Snapshot {
        let d_wheel = wheel_angles - self.prev_wheel_angles;
        let d_left = self.wheel_radius_cm * d_wheel.left;
        let d_right = self.wheel_radius_cm * d_wheel.right;
        let d = (d_left + d_right) / 2.0;

        let d_theta = Angle::new((d_right - d_left) / self.axle_length_cm);
        let theta = heading.unwrap_or(self.prev_heading + d_theta);

        let s = &mut self.snapshot;
        s.position += Vector2::from_polar(d, self.prev_heading + d_theta / 2.0);
        s.heading = theta;
        s.angular_velocity = match angular_velocity {
            Some(w) => w,
            None => self
                .angular_velocity_filter
                .update((theta - self.prev_heading).radians() / dt, dt)
        };

        let velocity = (s.position - self.prev_position) / dt;
        s.velocity = Vector2::new(
            self.velocity_filters[0].update(velocity[0], dt),
            self.velocity_filters[1].update(velocity[1], dt)
        );

        s.wheel_speeds = WheelPair::new(
            self.wheel_speed_filters.left.update(d_wheel.left / dt, dt),
            self.wheel_speed_filters.right.update(d_wheel.right / dt, dt)
        );

        self.prev_position = s.position;
        self.prev_wheel_angles = wheel_angles;
        self.prev_heading = theta;

        self.snapshot
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }
}
