//! Follower parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::course;
use crate::ctrl::TermParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the follower
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    // ---- MOVEMENT ----

    /// Distance between the robot's wheels.
    ///
    /// Units: centimetres
    pub axle_length_cm: f64,

    /// Radius of the circle used to find the goal point on the course.
    ///
    /// Units: centimetres
    pub look_ahead_cm: f64,

    /// Units: centimetres/second
    pub max_velocity_cms: f64,

    /// Speed floor while moving, so that the end of every route is reached.
    ///
    /// Units: centimetres/second
    pub min_velocity_cms: f64,

    /// Units: centimetres/second^2
    pub max_acceleration_cmss: f64,

    // ---- ROTATION ----

    pub rotation: RotationParams
}

/// Parameters for rotations on the spot between routes
#[derive(Deserialize, Debug, Clone)]
pub struct RotationParams {
    /// Terms of the heading controller. The setpoint given to the controller
    /// is the heading error, the measurement is zero.
    pub terms: Vec<TermParams>,

    /// Units: radians/second
    pub max_angular_velocity_rads: f64,

    /// Heading error under which the rotation is complete.
    ///
    /// Units: radians
    pub angle_threshold_rad: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("The follower's {0} ({1}) differs from the course compiler's ({2})")]
    LimitMismatch(&'static str, f64, f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {

    /// Check the motion limits match those the course was compiled with.
    ///
    /// The course's velocity limits and target times assume the follower
    /// drives within the same limits.
    pub fn agree_with(&self, course: &course::Params) -> Result<(), ParamsError> {
        let limits = [
            ("max_velocity_cms", self.max_velocity_cms, course.max_velocity_cms),
            ("min_velocity_cms", self.min_velocity_cms, course.min_velocity_cms),
            ("max_acceleration_cmss", self.max_acceleration_cmss, course.max_acceleration_cmss)
        ];

        for &(name, follower, course) in limits.iter() {
            if follower != course {
                return Err(ParamsError::LimitMismatch(name, follower, course))
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let params: Params =
            util::params::parse(include_str!("../../../params/follower.toml")).unwrap();

        assert_eq!(params.axle_length_cm, 13.35);
        assert!(params.look_ahead_cm > 0.0);
        assert!(params.min_velocity_cms < params.max_velocity_cms);
        assert_eq!(params.rotation.terms.len(), 2);
        assert_eq!(params.rotation.angle_threshold_rad, 0.05);
    }

    #[test]
    fn test_limits_agree_with_course() {
        let mut params: Params =
            util::params::parse(include_str!("../../../params/follower.toml")).unwrap();
        let course: course::Params =
            util::params::parse(include_str!("../../../params/course.toml")).unwrap();

        assert!(params.agree_with(&course).is_ok());

        params.max_acceleration_cmss += 10.0;
        match params.agree_with(&course) {
            Err(ParamsError::LimitMismatch(name, follower, expected)) => {
                assert_eq!(name, "max_acceleration_cmss");
                assert_eq!(follower, 70.0);
                assert_eq!(expected, 60.0);
            }
            Ok(()) => panic!("Mismatched acceleration limits were accepted")
        }
    }
}
