//! # Controller composition
//!
//! A [`Controller`] is a fixed list of independent control terms. Each tick
//! every term is given the same setpoint and measurement and the controller
//! outputs the sum of their contributions. New control strategies are built
//! by changing the list of terms, usually from a parameter file:
//!
//! ```toml
//! [[linear.terms]]
//! type = "static_friction"
//! k_s = 0.4
//!
//! [[linear.terms]]
//! type = "integral"
//! k_i = 0.08
//! min = -1.0
//! max = 1.0
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::filters::{FilterParams, LowPass};
use util::maths::{clamp, copysign_or_zero};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single control term.
pub trait ControlTerm {
    /// Get this term's contribution for the given setpoint and measurement,
    /// `dt` seconds after the previous update.
    fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64;

    /// Clear any internal state.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// `k_p * (setpoint - measurement)`
#[derive(Debug, Clone)]
pub struct Proportional {
    k_p: f64
}

/// Trapezoidal integral of the error, clamped to `[min, max]`.
#[derive(Debug, Clone)]
pub struct Integral {
    k_i: f64,
    min: f64,
    max: f64,
    integrator: f64,
    prev_error: f64
}

/// Derivative on the filtered measurement, negated so that setpoint steps do
/// not kick the output.
#[derive(Debug, Clone)]
pub struct Derivative {
    k_d: f64,
    filter: LowPass,
    prev_measurement: Option<f64>
}

/// `k_s` in the direction of the setpoint, zero when the setpoint is zero.
#[derive(Debug, Clone)]
pub struct StaticFriction {
    k_s: f64
}

/// `k_v * setpoint`
#[derive(Debug, Clone)]
pub struct VelocityFeedforward {
    k_v: f64
}

/// `k_a` times the rate of change of the filtered setpoint.
#[derive(Debug, Clone)]
pub struct AccelerationFeedforward {
    k_a: f64,
    filter: LowPass,
    prev_setpoint: f64
}

/// A sum of control terms.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    terms: Vec<Term>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Any of the control terms.
#[derive(Debug, Clone)]
pub enum Term {
    P(Proportional),
    I(Integral),
    D(Derivative),
    S(StaticFriction),
    V(VelocityFeedforward),
    A(AccelerationFeedforward)
}

/// Configuration of one control term.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TermParams {
    Proportional {
        k_p: f64
    },
    Integral {
        k_i: f64,
        min: f64,
        max: f64
    },
    Derivative {
        k_d: f64,
        #[serde(default)]
        filter: FilterParams
    },
    StaticFriction {
        k_s: f64
    },
    Velocity {
        k_v: f64
    },
    Acceleration {
        k_a: f64,
        #[serde(default)]
        filter: FilterParams
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Proportional {
    pub fn new(k_p: f64) -> Self {
        Self { k_p }
    }
}

impl ControlTerm for Proportional {
    fn update(&mut self, setpoint: f64, measurement: f64, _dt: f64) -> f64 {
        (setpoint - measurement) * self.k_p
    }

    fn reset(&mut self) {}
}

impl Integral {
    pub fn new(k_i: f64, min: f64, max: f64) -> Self {
        Self {
            k_i,
            min,
            max,
            integrator: 0.0,
            prev_error: 0.0
        }
    }

    /// Move the anti-windup band. The integrator is clamped into the new band
    /// at the next update.
    pub fn set_bounds(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    pub fn value(&self) -> f64 {
        self.integrator
    }
}

impl ControlTerm for Integral {
    fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        let error = setpoint - measurement;

        self.integrator += 0.5 * self.k_i * dt * (error + self.prev_error);
        self.integrator = clamp(self.integrator, self.min, self.max);
        self.prev_error = error;

        self.integrator
    }

    fn reset(&mut self) {
        self.integrator = 0.0;
        self.prev_error = 0.0;
    }
}

impl Derivative {
    pub fn new(k_d: f64, filter: FilterParams) -> Self {
        Self {
            k_d,
            filter: filter.into(),
            prev_measurement: None
        }
    }
}

impl ControlTerm for Derivative {
    /// The first update, and any update with a non-positive `dt`, only primes
    /// the term and contributes zero.
    fn update(&mut self, _setpoint: f64, measurement: f64, dt: f64) -> f64 {
        let filtered = self.filter.update(measurement, dt);

        let output = match self.prev_measurement {
            Some(prev) if dt > 0.0 => -self.k_d * (filtered - prev) / dt,
            _ => 0.0
        };

        self.prev_measurement = Some(filtered);
        output
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.prev_measurement = None;
    }
}

impl StaticFriction {
    pub fn new(k_s: f64) -> Self {
        Self { k_s }
    }
}

impl ControlTerm for StaticFriction {
    fn update(&mut self, setpoint: f64, _measurement: f64, _dt: f64) -> f64 {
        copysign_or_zero(self.k_s, setpoint)
    }

    fn reset(&mut self) {}
}

impl VelocityFeedforward {
    pub fn new(k_v: f64) -> Self {
        Self { k_v }
    }
}

impl ControlTerm for VelocityFeedforward {
    fn update(&mut self, setpoint: f64, _measurement: f64, _dt: f64) -> f64 {
        self.k_v * setpoint
    }

    fn reset(&mut self) {}
}

impl AccelerationFeedforward {
    pub fn new(k_a: f64, filter: FilterParams) -> Self {
        Self {
            k_a,
            filter: filter.into(),
            prev_setpoint: 0.0
        }
    }
}

impl ControlTerm for AccelerationFeedforward {
    /// The setpoint is assumed to start from rest.
    fn update(&mut self, setpoint: f64, _measurement: f64, dt: f64) -> f64 {
        let filtered = self.filter.update(setpoint, dt);

        let output = if dt > 0.0 {
            self.k_a * (filtered - self.prev_setpoint) / dt
        }
        else {
            0.0
        };

        self.prev_setpoint = filtered;
        output
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.prev_setpoint = 0.0;
    }
}

impl From<TermParams> for Term {
    fn from(params: TermParams) -> Self {
        match params {
            TermParams::Proportional { k_p } => Term::P(Proportional::new(k_p)),
            TermParams::Integral { k_i, min, max } => Term::I(Integral::new(k_i, min, max)),
            TermParams::Derivative { k_d, filter } => Term::D(Derivative::new(k_d, filter)),
            TermParams::StaticFriction { k_s } => Term::S(StaticFriction::new(k_s)),
            TermParams::Velocity { k_v } => Term::V(VelocityFeedforward::new(k_v)),
            TermParams::Acceleration { k_a, filter } => {
                Term::A(AccelerationFeedforward::new(k_a, filter))
            }
        }
    }
}

impl ControlTerm for Term {
    fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        match self {
            Term::P(t) => t.update(setpoint, measurement, dt),
            Term::I(t) => t.update(setpoint, measurement, dt),
            Term::D(t) => t.update(setpoint, measurement, dt),
            Term::S(t) => t.update(setpoint, measurement, dt),
            Term::V(t) => t.update(setpoint, measurement, dt),
            Term::A(t) => t.update(setpoint, measurement, dt)
        }
    }

    fn reset(&mut self) {
        match self {
            Term::P(t) => t.reset(),
            Term::I(t) => t.reset(),
            Term::D(t) => t.reset(),
            Term::S(t) => t.reset(),
            Term::V(t) => t.reset(),
            Term::A(t) => t.reset()
        }
    }
}

impl Controller {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// Build a controller from its term parameters, in order.
    pub fn from_params(params: &[TermParams]) -> Self {
        Self::new(params.iter().map(|&p| Term::from(p)).collect())
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Move the band of every integral term.
    pub fn set_integral_bounds(&mut self, min: f64, max: f64) {
        for term in self.terms.iter_mut() {
            if let Term::I(i) = term {
                i.set_bounds(min, max);
            }
        }
    }
}

impl ControlTerm for Controller {
    fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        self.terms
            .iter_mut()
            .map(|t| t.update(setpoint, measurement, dt))
            .sum()
    }

    fn reset(&mut self) {
        self.terms.iter_mut().for_each(|t| t.reset());
    }
}
