//! # Filters
//!
//! Scalar low pass filters used by the controller terms, the regulators and
//! the simulated sensors. All filters start from a zero output.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::f64::consts::TAU;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// First order lag, `out = k * in + (1 - k) * prev`.
///
/// The response depends on the rate the filter is updated at.
#[derive(Debug, Clone, Copy)]
pub struct LagFilter {
    k: f64,
    prev_output: f64
}

/// RC low pass with a fixed cutoff frequency, taking the elapsed time into
/// account at each update.
#[derive(Debug, Clone, Copy)]
pub struct RcFilter {
    tau_s: f64,
    prev_output: f64
}

/// Average of the last `N` inputs, with `N` fixed at construction.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: Vec<f64>,
    index: usize,
    sum: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Filter configuration.
///
/// ```toml
/// filter = { type = "rc", cutoff_hz = 10.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterParams {
    None,
    Lag { k: f64 },
    Rc { cutoff_hz: f64 }
}

/// A configured low pass filter.
#[derive(Debug, Clone, Copy)]
pub enum LowPass {
    None,
    Lag(LagFilter),
    Rc(RcFilter)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LagFilter {
    pub fn new(k: f64) -> Self {
        Self { k, prev_output: 0.0 }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        self.prev_output = self.k * input + (1.0 - self.k) * self.prev_output;
        self.prev_output
    }

    pub fn output(&self) -> f64 {
        self.prev_output
    }

    pub fn reset(&mut self) {
        self.prev_output = 0.0;
    }
}

impl RcFilter {
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            tau_s: 1.0 / (TAU * cutoff_hz),
            prev_output: 0.0
        }
    }

    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        let denom = dt + self.tau_s;
        self.prev_output = (dt / denom) * input + (self.tau_s / denom) * self.prev_output;
        self.prev_output
    }

    pub fn output(&self) -> f64 {
        self.prev_output
    }

    pub fn reset(&mut self) {
        self.prev_output = 0.0;
    }
}

impl MovingAverage {
    /// A moving average over `len` samples. A zero length is treated as one.
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
            sum: 0.0
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        self.sum += input - self.buffer[self.index];
        self.buffer[self.index] = input;
        self.index = (self.index + 1) % self.buffer.len();

        self.sum / self.buffer.len() as f64
    }

    /// Fill the window with `value`, as if it had been the only input so far.
    pub fn prime(&mut self, value: f64) {
        self.buffer.iter_mut().for_each(|b| *b = value);
        self.index = 0;
        self.sum = value * self.buffer.len() as f64;
    }

    pub fn reset(&mut self) {
        self.prime(0.0);
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams::None
    }
}

impl From<FilterParams> for LowPass {
    fn from(params: FilterParams) -> Self {
        match params {
            FilterParams::None => LowPass::None,
            FilterParams::Lag { k } => LowPass::Lag(LagFilter::new(k)),
            FilterParams::Rc { cutoff_hz } => LowPass::Rc(RcFilter::new(cutoff_hz))
        }
    }
}

impl LowPass {
    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        match self {
            LowPass::None => input,
            LowPass::Lag(f) => f.update(input),
            LowPass::Rc(f) => f.update(input, dt)
        }
    }

    pub fn reset(&mut self) {
        match self {
            LowPass::None => (),
            LowPass::Lag(f) => f.reset(),
            LowPass::Rc(f) => f.reset()
        }
    }
}
