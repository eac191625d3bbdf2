//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Waits shorter than this are spun rather than slept, the scheduler cannot
/// wake a thread that precisely.
const SPIN_THRESHOLD: Duration = Duration::from_micros(200);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Measures the time elapsed between successive laps.
///
/// Used by the control loops to get the `dt` of each iteration.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
    last_lap: Instant
}

/// Paces a loop at a fixed period.
///
/// Ticks are due at whole multiples of the period from the start. A tick that
/// starts late is counted as an overrun and the schedule restarts from it,
/// missed ticks are not made up.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period: Duration,
    next: Instant,
    num_overruns: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Stopwatch {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_lap: now
        }
    }

    /// Return the time since the previous lap (or the start) and begin a new
    /// lap.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now - self.last_lap;
        self.last_lap = now;
        lap
    }

    /// Time since the stopwatch was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Ticker {
    /// A ticker whose first tick is due one period from now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
            num_overruns: 0
        }
    }

    /// Block until the next tick is due.
    pub fn wait(&mut self) {
        let now = Instant::now();

        if now > self.next {
            self.num_overruns += 1;
            self.next = now + self.period;
            return;
        }

        let remaining = self.next - now;
        if remaining > SPIN_THRESHOLD {
            thread::sleep(remaining - SPIN_THRESHOLD);
        }
        while Instant::now() < self.next {
            std::hint::spin_loop();
        }

        self.next += self.period;
    }

    /// Number of ticks which started late.
    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a chrono duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
        assert_eq!(duration_to_seconds(chrono::Duration::max_value()), None);
    }

    #[test]
    fn test_ticker_paces_and_counts_overruns() {
        let period = Duration::from_millis(2);
        let watch = Stopwatch::start();
        let mut ticker = Ticker::new(period);

        for _ in 0..5 {
            ticker.wait();
        }
        assert!(watch.elapsed() >= period * 5);

        thread::sleep(period * 3);
        ticker.wait();
        assert_eq!(ticker.num_overruns(), 1);
    }

    #[test]
    fn test_stopwatch_laps() {
        let mut sw = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(2));
        let lap = sw.lap();
        assert!(lap >= Duration::from_millis(2));
        assert!(sw.elapsed() >= lap);
    }
}
