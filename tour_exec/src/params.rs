//! # Tour Executable Parameters
//!
//! This module provides parameters for the tour executable, which runs the
//! compiled course against the simulated robot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TourExecParams {
    /// Rate of the fast (estimation) loop.
    ///
    /// Units: hertz
    pub fast_loop_hz: f64,

    /// Rate of the slow (control) loop.
    ///
    /// Units: hertz
    pub slow_loop_hz: f64,

    /// How the two loops are scheduled
    pub timing: LoopTiming,

    /// Number of control ticks per archived record
    pub archive_decimation: usize,

    /// Number of battery readings averaged before use by the regulators
    pub battery_average_len: usize,

    /// The run is abandoned if the follower has not finished by then.
    ///
    /// Units: seconds
    pub max_run_time_s: f64,

    /// Parameter files of each module, relative to the params directory
    pub files: ParamFiles
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParamFiles {
    pub course: String,
    pub follower: String,
    pub velocity_reg: String,
    pub current_reg: String,
    pub sim: String
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopTiming {
    /// Both loops run on their own thread at their wall clock rate.
    Realtime,

    /// The fast loop is stepped in between control ticks on a single thread
    /// with a simulated clock, so that runs are repeatable.
    Lockstep
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TourExecParams {
    pub fn fast_period_s(&self) -> f64 {
        1.0 / self.fast_loop_hz
    }

    pub fn slow_period_s(&self) -> f64 {
        1.0 / self.slow_loop_hz
    }

    /// Number of fast loop ticks per slow loop tick, at least one.
    pub fn fast_ticks_per_slow(&self) -> usize {
        ((self.fast_loop_hz / self.slow_loop_hz).round() as usize).max(1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_file() {
        let p: TourExecParams =
            util::params::parse(include_str!("../../params/tour_exec.toml")).unwrap();

        assert_eq!(p.timing, LoopTiming::Lockstep);
        assert_eq!(p.fast_ticks_per_slow(), 16);
        assert_eq!(p.battery_average_len, 50);
        assert_eq!(p.files.follower, "follower.toml");
        assert!((p.slow_period_s() - 0.0005).abs() < 1e-12);
    }
}
