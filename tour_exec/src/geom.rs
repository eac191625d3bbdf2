//! # Geometry kernel
//!
//! Positions and velocities are `nalgebra::Vector2<f64>` in centimetres, with
//! +y "up" the track and +x to the right. This module adds the few operations
//! nalgebra does not provide for 2D vectors, a wrap-safe [`Angle`] and a
//! [`WheelPair`] for per-wheel quantities.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// Internal
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used by `Angle`'s equality comparison.
pub const ANGLE_TOLERANCE_RAD: f64 = 0.001;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Planar helpers for `Vector2<f64>`.
pub trait Vec2Ext {
    /// Scalar (z) component of the 3D cross product of the two vectors.
    fn cross2(&self, other: &Self) -> f64;

    /// Angle of the vector from the +x axis.
    fn bearing(&self) -> Angle;

    /// Build a vector from its length and bearing.
    fn from_polar(length: f64, bearing: Angle) -> Self;
}

impl Vec2Ext for Vector2<f64> {
    fn cross2(&self, other: &Self) -> f64 {
        self[0] * other[1] - self[1] * other[0]
    }

    fn bearing(&self) -> Angle {
        Angle::new(self[1].atan2(self[0]))
    }

    fn from_polar(length: f64, bearing: Angle) -> Self {
        Vector2::new(length * bearing.cos(), length * bearing.sin())
    }
}

/// Unit vector pointing up the track.
pub fn up() -> Vector2<f64> {
    Vector2::new(0.0, 1.0)
}

/// Unit vector pointing down the track.
pub fn down() -> Vector2<f64> {
    Vector2::new(0.0, -1.0)
}

/// Unit vector pointing to the left of the track.
pub fn left() -> Vector2<f64> {
    Vector2::new(-1.0, 0.0)
}

/// Unit vector pointing to the right of the track.
pub fn right() -> Vector2<f64> {
    Vector2::new(1.0, 0.0)
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An angle in radians, always stored wrapped into `(-pi, pi]`.
///
/// Arithmetic re-wraps the result, and `==` compares the wrapped difference
/// against [`ANGLE_TOLERANCE_RAD`], so `Angle::new(x + 2.0 * PI * k)` equals
/// `Angle::new(x)` for any integer `k`.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Angle(f64);

/// A pair of per-wheel quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelPair<T> {
    pub left: T,
    pub right: T
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Angle {
    pub fn new(rad: f64) -> Self {
        Self(wrap_pi(rad))
    }

    pub fn from_degrees(deg: f64) -> Self {
        Self::new(deg.to_radians())
    }

    pub fn from_rotations(rotations: f64) -> Self {
        Self::new(rotations * TAU)
    }

    /// The half turn, `pi`.
    pub fn half_turn() -> Self {
        Self(PI)
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }

    pub fn rotations(self) -> f64 {
        self.0 / TAU
    }

    pub fn sin(self) -> f64 {
        self.0.sin()
    }

    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    /// Magnitude of the angle in radians, in `[0, pi]`.
    pub fn abs(self) -> f64 {
        self.0.abs()
    }

    /// Unit vector pointing along this angle.
    pub fn unit_vector(self) -> Vector2<f64> {
        Vector2::from_polar(1.0, self)
    }

    /// Compare with an explicit tolerance.
    pub fn approx_eq(self, other: Angle, tolerance_rad: f64) -> bool {
        (self - other).abs() <= tolerance_rad
    }
}

impl From<f64> for Angle {
    fn from(rad: f64) -> Self {
        Self::new(rad)
    }
}

impl From<Angle> for f64 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(*other, ANGLE_TOLERANCE_RAD)
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Angle({:.4} rad)", self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} rad", self.0)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::new(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::new(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle::new(-self.0)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle::new(self.0 * rhs)
    }
}

impl Div<f64> for Angle {
    type Output = Angle;

    fn div(self, rhs: f64) -> Angle {
        Angle::new(self.0 / rhs)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

impl<T> WheelPair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Apply `f` to both wheels.
    pub fn map<U, F: Fn(T) -> U>(self, f: F) -> WheelPair<U> {
        WheelPair {
            left: f(self.left),
            right: f(self.right)
        }
    }

    /// Combine two pairs wheel by wheel.
    pub fn zip_with<U, V, F: Fn(T, U) -> V>(self, other: WheelPair<U>, f: F) -> WheelPair<V> {
        WheelPair {
            left: f(self.left, other.left),
            right: f(self.right, other.right)
        }
    }
}

impl<T: Copy> WheelPair<T> {
    /// A pair with the same value on both wheels.
    pub fn splat(value: T) -> Self {
        Self {
            left: value,
            right: value
        }
    }
}

impl WheelPair<f64> {
    /// Larger of the two magnitudes.
    pub fn max_abs(&self) -> f64 {
        self.left.abs().max(self.right.abs())
    }
}

impl<T: Add<Output = T>> Add for WheelPair<T> {
    type Output = WheelPair<T>;

    fn add(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl<T: Sub<Output = T>> Sub for WheelPair<T> {
    type Output = WheelPair<T>;

    fn sub(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl<T: Mul<Output = T>> Mul for WheelPair<T> {
    type Output = WheelPair<T>;

    fn mul(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl<T: Div<Output = T>> Div for WheelPair<T> {
    type Output = WheelPair<T>;

    fn div(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a / b)
    }
}

impl Mul<f64> for WheelPair<f64> {
    type Output = WheelPair<f64>;

    fn mul(self, rhs: f64) -> Self {
        self.map(|v| v * rhs)
    }
}

impl Neg for WheelPair<f64> {
    type Output = WheelPair<f64>;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_angle_wraparound() {
        let samples = [-7.0, -3.1, -0.5, 0.0, 0.4, 2.9, 3.14159, 6.5, 100.0];

        for &a in samples.iter() {
            for &b in samples.iter() {
                let (a, b) = (Angle::new(a), Angle::new(b));
                assert_eq!((a - b) + (b - a), Angle::new(0.0));
            }

            for k in -3..=3 {
                assert_eq!(Angle::new(a + TAU * k as f64), Angle::new(a));
            }
        }
    }

    #[test]
    fn test_angle_range() {
        assert!((Angle::new(-PI).radians() - PI).abs() < 1e-12);
        assert!((Angle::new(PI).radians() - PI).abs() < 1e-12);

        for bits in [PI.to_bits() - 1, PI.to_bits() + 1, (-PI).to_bits() + 1].iter() {
            let a = Angle::new(f64::from_bits(*bits)).radians();
            assert!(a <= PI && a > -PI, "{} outside (-pi, pi]", a);
        }

        let sum = Angle::new(3.0) + Angle::new(3.0);
        assert!(sum.radians() <= PI && sum.radians() > -PI);
        assert_eq!(sum, Angle::new(6.0 - TAU));

        assert_eq!(Angle::from_degrees(270.0), Angle::from_degrees(-90.0));
        assert!((Angle::from_rotations(0.25).degrees() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_serde() {
        let a: Angle = serde_json::from_str("7.0").unwrap();
        assert_eq!(a, Angle::new(7.0 - TAU));
        assert_eq!(serde_json::to_string(&Angle::new(0.5)).unwrap(), "0.5");
    }

    #[test]
    fn test_vec2_ext() {
        assert_eq!(right().cross2(&up()), 1.0);
        assert_eq!(up().cross2(&right()), -1.0);
        assert_eq!(up().bearing(), Angle::new(PI / 2.0));
        assert_eq!(left().bearing(), Angle::half_turn());

        let v = Vector2::from_polar(2.0, Angle::new(PI / 2.0));
        assert!((v - Vector2::new(0.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_wheel_pair() {
        let a = WheelPair::new(1.0, -3.0);
        let b = WheelPair::splat(2.0);

        assert_eq!(a + b, WheelPair::new(3.0, -1.0));
        assert_eq!(a * 2.0, WheelPair::new(2.0, -6.0));
        assert_eq!(-a, WheelPair::new(-1.0, 3.0));
        assert_eq!(a.max_abs(), 3.0);
    }
}
