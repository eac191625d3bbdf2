//! Course compiler parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::path::TrackGeometry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the course compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- TRACK ----

    /// Side length of a track square.
    ///
    /// Units: centimetres
    pub square_size_cm: f64,

    /// Distance from the robot's reference point to its dowel.
    ///
    /// Units: centimetres
    pub dowel_distance_cm: f64,

    // ---- RESAMPLING ----

    /// Target spacing between resampled course segments.
    ///
    /// Units: centimetres
    pub path_spacing_cm: f64,

    /// Width of the moving average used to smooth each route.
    pub moving_average_width: usize,

    // ---- LIMITS ----

    /// Velocity ceiling of every segment.
    ///
    /// Units: centimetres/second
    pub max_velocity_cms: f64,

    /// Velocity the robot is allowed to arrive at a stop with.
    ///
    /// Units: centimetres/second
    pub min_velocity_cms: f64,

    /// Units: centimetres/second^2
    pub max_acceleration_cmss: f64,

    /// The centripetal limit is `curvature_slowdown / sqrt(curvature)`.
    pub curvature_slowdown: f64,

    // ---- TIMING ----

    /// Time reserved at each route for stopping and turning.
    ///
    /// Units: seconds
    pub stop_time_s: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("The square size and path spacing must be positive")]
    NonPositiveLength,

    #[error("The dowel distance must not be negative")]
    NegativeDowelDistance,

    #[error("The moving average width must be at least 1")]
    ZeroMovingAverageWidth,

    #[error("Velocity limits must satisfy 0 < min ({0}) <= max ({1})")]
    InvalidVelocityLimits(f64, f64),

    #[error("The maximum acceleration and curvature slowdown must be positive")]
    NonPositiveDynamics,

    #[error("The stop time must not be negative")]
    NegativeStopTime
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {

    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if !(self.square_size_cm > 0.0 && self.path_spacing_cm > 0.0) {
            return Err(ParamsError::NonPositiveLength)
        }

        if !(self.dowel_distance_cm >= 0.0) {
            return Err(ParamsError::NegativeDowelDistance)
        }

        if self.moving_average_width == 0 {
            return Err(ParamsError::ZeroMovingAverageWidth)
        }

        if !(self.min_velocity_cms > 0.0 && self.min_velocity_cms <= self.max_velocity_cms) {
            return Err(ParamsError::InvalidVelocityLimits(
                self.min_velocity_cms, self.max_velocity_cms
            ))
        }

        if !(self.max_acceleration_cmss > 0.0 && self.curvature_slowdown > 0.0) {
            return Err(ParamsError::NonPositiveDynamics)
        }

        if !(self.stop_time_s >= 0.0) {
            return Err(ParamsError::NegativeStopTime)
        }

        Ok(())
    }

    /// Track dimensions used to resolve commands.
    pub fn geometry(&self) -> TrackGeometry {
        TrackGeometry {
            square_size_cm: self.square_size_cm,
            dowel_distance_cm: self.dowel_distance_cm
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        let geometry = TrackGeometry::default();

        Self {
            square_size_cm: geometry.square_size_cm,
            dowel_distance_cm: geometry.dowel_distance_cm,
            path_spacing_cm: 1.0,
            moving_average_width: 5,
            max_velocity_cms: 80.0,
            min_velocity_cms: 5.0,
            max_acceleration_cmss: 60.0,
            curvature_slowdown: 20.0,
            stop_time_s: 0.5
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file_is_valid() {
        let params: Params = util::params::parse(include_str!("../../../params/course.toml"))
            .unwrap();
        params.are_valid().unwrap();
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.are_valid().unwrap();

        params.min_velocity_cms = 100.0;
        match params.are_valid() {
            Err(ParamsError::InvalidVelocityLimits(_, _)) => (),
            other => panic!("Unexpected validation result {:?}", other)
        }

        let mut params = Params::default();
        params.moving_average_width = 0;
        assert!(params.are_valid().is_err());
    }
}
