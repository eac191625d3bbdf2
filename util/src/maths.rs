//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value into `[min, max]`.
///
/// NaN values pass through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    if value > max {
        max
    }
    else if value < min {
        min
    }
    else {
        value
    }
}

/// Clamp a value into `[-limit, limit]`.
pub fn clamp_abs<T>(value: T, limit: T) -> T
where
    T: Float
{
    let limit = limit.abs();
    clamp(value, -limit, limit)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// `num_traits::Float` has no `rem_euclid`, this matches the std one.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into `(-pi, pi]`.
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float + FloatConst
{
    let tau = T::PI() + T::PI();
    let wrapped = T::PI() - rem_euclid(T::PI() - value, tau);

    // The remainder can round up to exactly tau just above pi
    if wrapped <= -T::PI() {
        T::PI()
    }
    else {
        wrapped
    }
}

/// `magnitude` with the sign of `sign`, or zero if `sign` is zero.
pub fn copysign_or_zero<T>(magnitude: T, sign: T) -> T
where
    T: Float
{
    if sign == T::zero() {
        T::zero()
    }
    else {
        magnitude.abs() * sign.signum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_wrap_pi() {
        assert!(close(wrap_pi(0.0), 0.0));
        assert!(close(wrap_pi(PI), PI));
        assert!(close(wrap_pi(-PI), PI));
        assert!(close(wrap_pi(TAU + 1.0), 1.0));
        assert!(close(wrap_pi(-TAU - 1.0), -1.0));
        assert!(close(wrap_pi(3.0 * PI / 2.0), -PI / 2.0));

        let above_pi = f64::from_bits(PI.to_bits() + 1);
        assert_eq!(wrap_pi(above_pi), PI);
        assert_eq!(wrap_pi(-PI), PI);
        assert!(wrap_pi(f64::NAN).is_nan());
    }

    #[test]
    fn test_clamp_and_sign() {
        assert_eq!(clamp(2.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-2.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp_abs(-0.5, 0.2), -0.2);
        assert!(clamp(f64::NAN, -1.0, 1.0).is_nan());
        assert_eq!(copysign_or_zero(0.4, -3.0), -0.4);
        assert_eq!(copysign_or_zero(0.4, 0.0), 0.0);
    }
}
