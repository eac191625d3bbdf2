//! Heading fusion

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::Angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Heading estimate from integrating the gyroscope rate.
#[derive(Debug, Clone, Copy)]
pub struct Fusion {
    heading: Angle
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Fusion {
    pub fn new(initial_heading: Angle) -> Self {
        Self {
            heading: initial_heading
        }
    }

    /// Integrate a gyroscope reading over `dt` seconds and return the new
    /// heading.
    pub fn update(&mut self, angular_velocity_rads: f64, dt: f64) -> Angle {
        self.heading += Angle::new(angular_velocity_rads * dt);
        self.heading
    }

    pub fn heading(&self) -> Angle {
        self.heading
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_integrates_through_wrap() {
        let mut f = Fusion::new(Angle::new(PI / 2.0));
        for _ in 0..1000 {
            f.update(PI, 0.001);
        }
        assert!(f.heading().approx_eq(Angle::new(-PI / 2.0), 1e-9));
    }
}
