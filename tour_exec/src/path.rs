//! # Path
//!
//! A path is authored as an ordered list of [`Command`]s. Commands are built
//! with [`move_by`] or [`move_to`] and refined with the modifier methods:
//!
//! ```
//! use tour_lib::geom::{up, left};
//! use tour_lib::path::{first_move, move_by};
//!
//! let commands = vec![
//!     first_move(),
//!     move_by(up() * 2.0),
//!     move_by(left() * 30.0).centimeters().stop(),
//!     move_by(up()).reverse().last_move(),
//! ];
//! # assert_eq!(commands.len(), 4);
//! ```
//!
//! [`accumulate`] folds the commands into absolute [`PathPoint`]s and decides
//! where the robot has to stop. Paths can also be written as TOML files, see
//! [`PathFile`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single authored path instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Displacement (relative commands) or position (absolute commands), in
    /// `units`.
    pub amount: Vector2<f64>,

    /// Whether `amount` is relative to the previous position.
    pub relative: bool,

    pub units: Units,

    /// Offset added to this command's resolved position only, in centimetres.
    /// It does not carry over to later commands.
    pub offset_cm: Vector2<f64>,

    /// Explicit duration for the route this command belongs to.
    pub target_time_s: Option<f64>,

    /// Drive this command backwards.
    pub reverse: bool,

    /// Force a stop at the end of this command.
    pub stop: bool,

    /// Lengthen or shorten the displacement by the dowel distance.
    pub dowel: DowelAdjust
}

/// Physical dimensions of the track needed to resolve commands.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrackGeometry {
    /// Side length of one track square.
    pub square_size_cm: f64,

    /// Distance between the robot's reference point and its dowel.
    pub dowel_distance_cm: f64
}

/// A resolved absolute waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub position: Vector2<f64>,

    pub reverse: bool,

    /// The robot must come to rest at this point.
    pub stop: bool,

    /// Set on the final point of the path.
    pub accurate: bool,

    /// Explicit duration requested by the command which produced this point.
    pub target_time_s: Option<f64>
}

/// The contents of a path file.
///
/// ```toml
/// target_time_s = 50.0
///
/// [[commands]]
/// first_move = true
///
/// [[commands]]
/// move_by = [0.0, 2.0]
///
/// [[commands]]
/// move_to = [-25.0, 130.0]
/// units = "centimeters"
/// reverse = true
/// last_move = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PathFile {
    pub target_time_s: f64,

    pub commands: Vec<CommandSpec>
}

/// One command in a path file.
///
/// Exactly one of `move_by`, `move_to` or `first_move` must be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    #[serde(default)]
    pub move_by: Option<[f64; 2]>,

    #[serde(default)]
    pub move_to: Option<[f64; 2]>,

    #[serde(default)]
    pub first_move: bool,

    #[serde(default)]
    pub units: Option<Units>,

    #[serde(default)]
    pub reverse: bool,

    #[serde(default)]
    pub stop: bool,

    #[serde(default)]
    pub offset_once_cm: Option<[f64; 2]>,

    #[serde(default)]
    pub offset_all: Option<[f64; 2]>,

    #[serde(default)]
    pub target_time_s: Option<f64>,

    #[serde(default)]
    pub last_move: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Units a command's amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    Squares,
    Centimeters,
    Meters
}

/// Dowel distance adjustment applied when the command is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DowelAdjust {
    None,

    /// Lengthen the displacement, used by the first move out of the start
    /// square.
    Extend,

    /// Shorten the displacement so the dowel, not the robot's reference
    /// point, ends on the target.
    Shorten
}

#[derive(Debug, thiserror::Error)]
pub enum PathFileError {
    #[error("Could not load the path file: {0}")]
    LoadError(params::LoadError),

    #[error("The path file contains no commands")]
    NoCommands,

    #[error("Command {0} must have exactly one of move_by, move_to or first_move")]
    InvalidTarget(usize),

    #[error("Command {0} has a negative target time")]
    NegativeCommandTime(usize),

    #[error("The path target time must be positive, found {0}")]
    InvalidTargetTime(f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Units {
    /// Number of centimetres in one unit.
    pub fn scale_cm(self, square_size_cm: f64) -> f64 {
        match self {
            Units::Squares => square_size_cm,
            Units::Centimeters => 1.0,
            Units::Meters => 100.0
        }
    }
}

impl Command {
    fn new(amount: Vector2<f64>, relative: bool) -> Self {
        Self {
            amount,
            relative,
            units: Units::Squares,
            offset_cm: Vector2::zeros(),
            target_time_s: None,
            reverse: false,
            stop: false,
            dowel: DowelAdjust::None
        }
    }

    pub fn squares(mut self) -> Self {
        self.units = Units::Squares;
        self
    }

    pub fn centimeters(mut self) -> Self {
        self.units = Units::Centimeters;
        self
    }

    pub fn meters(mut self) -> Self {
        self.units = Units::Meters;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn stop(mut self) -> Self {
        self.stop = true;
        self
    }

    /// Shift only this command's resolved position, in centimetres.
    pub fn offset_once(mut self, offset_cm: Vector2<f64>) -> Self {
        self.offset_cm += offset_cm;
        self
    }

    /// Add to the command's amount, in the command's units. For relative
    /// commands the shift carries over to every later position.
    pub fn offset_all(mut self, offset: Vector2<f64>) -> Self {
        self.amount += offset;
        self
    }

    /// Request an explicit duration for the route containing this command.
    pub fn target_time(mut self, time_s: f64) -> Self {
        self.target_time_s = Some(time_s);
        self
    }

    /// Mark the final move, which ends with the dowel over the target.
    pub fn last_move(mut self) -> Self {
        self.dowel = DowelAdjust::Shorten;
        self
    }

    /// The command's amount in centimetres, with the dowel adjustment applied.
    pub fn resolve_cm(&self, geometry: &TrackGeometry) -> Vector2<f64> {
        let amount_cm = self.amount * self.units.scale_cm(geometry.square_size_cm);
        let length_cm = amount_cm.norm();

        let scale = match self.dowel {
            DowelAdjust::None => return amount_cm,
            DowelAdjust::Extend => (length_cm + geometry.dowel_distance_cm) / length_cm,
            DowelAdjust::Shorten => (length_cm - geometry.dowel_distance_cm) / length_cm
        };

        amount_cm * scale
    }
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            square_size_cm: 50.0,
            dowel_distance_cm: 2.314066
        }
    }
}

impl PathPoint {
    fn new(position: Vector2<f64>) -> Self {
        Self {
            position,
            reverse: false,
            stop: false,
            accurate: false,
            target_time_s: None
        }
    }
}

impl PathFile {
    /// Load a path file from the given path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PathFileError> {
        params::load_from(path).map_err(PathFileError::LoadError)
    }

    /// Parse a path file from TOML text.
    pub fn parse(text: &str) -> Result<Self, PathFileError> {
        params::parse(text).map_err(PathFileError::LoadError)
    }

    /// Convert the file into the command list and the path's target time.
    pub fn into_commands(self) -> Result<(Vec<Command>, f64), PathFileError> {
        if self.commands.is_empty() {
            return Err(PathFileError::NoCommands);
        }
        if !(self.target_time_s > 0.0) {
            return Err(PathFileError::InvalidTargetTime(self.target_time_s));
        }

        let commands = self
            .commands
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.to_command(i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((commands, self.target_time_s))
    }
}

impl CommandSpec {
    fn to_command(&self, index: usize) -> Result<Command, PathFileError> {
        let mut cmd = match (self.move_by, self.move_to, self.first_move) {
            (Some(a), None, false) => move_by(Vector2::new(a[0], a[1])),
            (None, Some(p), false) => move_to(Vector2::new(p[0], p[1])),
            (None, None, true) => first_move(),
            _ => return Err(PathFileError::InvalidTarget(index))
        };

        if let Some(units) = self.units {
            cmd.units = units;
        }
        if let Some(o) = self.offset_all {
            cmd = cmd.offset_all(Vector2::new(o[0], o[1]));
        }
        if let Some(o) = self.offset_once_cm {
            cmd = cmd.offset_once(Vector2::new(o[0], o[1]));
        }
        if let Some(t) = self.target_time_s {
            if t < 0.0 {
                return Err(PathFileError::NegativeCommandTime(index));
            }
            cmd = cmd.target_time(t);
        }
        if self.reverse {
            cmd = cmd.reverse();
        }
        if self.stop {
            cmd = cmd.stop();
        }
        if self.last_move {
            cmd = cmd.last_move();
        }

        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Move by a displacement, in squares unless changed.
pub fn move_by(amount: Vector2<f64>) -> Command {
    Command::new(amount, true)
}

/// Move to an absolute position, in squares unless changed.
pub fn move_to(position: Vector2<f64>) -> Command {
    Command::new(position, false)
}

/// The standard first move: half a square forward, out of the start square,
/// plus the dowel distance.
pub fn first_move() -> Command {
    let mut cmd = move_by(crate::geom::up() * 0.5);
    cmd.dowel = DowelAdjust::Extend;
    cmd
}

/// Fold a command list into absolute path points.
///
/// A point is a stop when its command asks for one, when it is the last
/// point, when the next command drives in the other direction (reverse flag
/// changes) or when the next displacement turns by 90 degrees or more.
/// One-shot offsets are applied after the stops have been decided.
pub fn accumulate(commands: &[Command], geometry: &TrackGeometry) -> Vec<PathPoint> {
    let mut cursor = Vector2::zeros();

    // Resolve positions before offsets
    let positions: Vec<Vector2<f64>> = commands
        .iter()
        .map(|cmd| {
            let amount_cm = cmd.resolve_cm(geometry);
            if cmd.relative {
                cursor += amount_cm;
            }
            else {
                cursor = amount_cm;
            }
            cursor
        })
        .collect();

    let mut points = Vec::with_capacity(commands.len());
    let mut previous = Vector2::zeros();

    for (i, cmd) in commands.iter().enumerate() {
        let mut point = PathPoint::new(positions[i]);
        point.reverse = cmd.reverse;
        point.target_time_s = cmd.target_time_s;

        match commands.get(i + 1) {
            None => {
                point.stop = true;
                point.accurate = true;
            },
            Some(next) => {
                let this_dir = positions[i] - previous;
                let next_dir = positions[i + 1] - positions[i];

                point.stop = cmd.stop
                    || cmd.reverse != next.reverse
                    || this_dir.dot(&next_dir) <= 0.0;
            }
        }

        previous = positions[i];
        points.push(point);
    }

    for (point, cmd) in points.iter_mut().zip(commands.iter()) {
        point.position += cmd.offset_cm;
    }

    points
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{down, left, right, up};

    fn close(a: Vector2<f64>, b: Vector2<f64>) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_accumulate_stops() {
        let geom = TrackGeometry::default();

        // Straight line then a right angle then a reversal
        let points = accumulate(
            &[
                move_by(up()),
                move_by(up()),
                move_by(left()),
                move_by(right() * 2.0),
                move_by(down()).reverse()
            ],
            &geom
        );

        assert_eq!(points.len(), 5);
        assert!(!points[0].stop);
        assert!(points[1].stop, "90 degree turn must stop");
        assert!(points[2].stop, "reversal must stop");
        assert!(points[3].stop, "reverse flag change must stop");
        assert!(points[4].stop && points[4].accurate && points[4].reverse);
        assert!(!points[3].accurate);

        assert!(close(points[1].position, Vector2::new(0.0, 100.0)));
        assert!(close(points[3].position, Vector2::new(50.0, 100.0)));
    }

    #[test]
    fn test_units_and_offsets() {
        let geom = TrackGeometry::default();

        let points = accumulate(
            &[
                move_by(up() * 30.0).centimeters().offset_once(right() * 5.0),
                move_by(up()).meters(),
                move_to(Vector2::new(1.0, 3.0)).offset_all(up())
            ],
            &geom
        );

        // One-shot offset does not carry over
        assert!(close(points[0].position, Vector2::new(5.0, 30.0)));
        assert!(close(points[1].position, Vector2::new(0.0, 130.0)));
        assert!(close(points[2].position, Vector2::new(50.0, 200.0)));
    }

    #[test]
    fn test_dowel_moves() {
        let geom = TrackGeometry::default();

        let first = first_move().resolve_cm(&geom);
        assert!(close(first, Vector2::new(0.0, 25.0 + geom.dowel_distance_cm)));

        let last = move_by(up() * 2.0).last_move().resolve_cm(&geom);
        assert!(close(last, Vector2::new(0.0, 100.0 - geom.dowel_distance_cm)));
    }

    #[test]
    fn test_path_file() {
        let file = PathFile::parse(
            r#"
            target_time_s = 50.0

            [[commands]]
            first_move = true

            [[commands]]
            move_by = [0.0, 2.0]
            target_time_s = 4.0

            [[commands]]
            move_to = [-25.0, 130.0]
            units = "centimeters"
            reverse = true
            last_move = true
            "#
        )
        .unwrap();

        let (commands, time) = file.into_commands().unwrap();
        assert_eq!(time, 50.0);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].dowel, DowelAdjust::Extend);
        assert_eq!(commands[1].target_time_s, Some(4.0));
        assert!(!commands[2].relative && commands[2].reverse);
        assert_eq!(commands[2].units, Units::Centimeters);

        let bad = PathFile::parse(
            r#"
            target_time_s = 5.0

            [[commands]]
            move_by = [0.0, 1.0]
            move_to = [0.0, 1.0]
            "#
        )
        .unwrap();
        match bad.into_commands() {
            Err(PathFileError::InvalidTarget(0)) => (),
            other => panic!("Expected an invalid target error, got {:?}", other)
        }
    }
}
