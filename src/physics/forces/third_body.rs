//! Third-body gravitational perturbations
//!
//! Sun and Moon as point masses, using the low-precision ephemerides the
//! location already carries. The second term removes the acceleration of the
//! geocentric frame itself.

use super::ForceModel;
use crate::physics::constants::{GMOON, GSUN};
use crate::physics::location::Location;
use crate::physics::state::PhysicsState;
use nalgebra::Vector3;

#[derive(Debug, Clone)]
pub struct ThirdBody {
    include_sun: bool,
    include_moon: bool,
}

impl Default for ThirdBody {
    fn default() -> Self {
        Self::sun_and_moon()
    }
}

impl ThirdBody {
    pub fn sun_and_moon() -> Self {
        Self {
            include_sun: true,
            include_moon: true,
        }
    }

    pub fn sun_only() -> Self {
        Self {
            include_sun: true,
            include_moon: false,
        }
    }

    pub fn moon_only() -> Self {
        Self {
            include_sun: false,
            include_moon: true,
        }
    }
}

/// μ (r_body - r_sat)/|r_body - r_sat|³ - μ r_body/|r_body|³
pub fn third_body_accel(sat: &Vector3<f64>, body: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let to_body = body - sat;
    let d = to_body.norm();
    let r = body.norm();
    if d < 1.0 || r < 1.0 {
        return Vector3::zeros();
    }
    mu * (to_body / d.powi(3) - body / r.powi(3))
}

impl ForceModel for ThirdBody {
    fn acceleration(&self, loc: &Location, _phys: &PhysicsState) -> Vector3<f64> {
        let s = loc.eci().s;
        let mut accel = Vector3::zeros();
        if self.include_sun {
            accel += third_body_accel(&s, loc.sun(), GSUN);
        }
        if self.include_moon {
            accel += third_body_accel(&s, loc.moon(), GMOON);
        }
        accel
    }

    fn name(&self) -> &'static str {
        match (self.include_sun, self.include_moon) {
            (true, true) => "Sun and Moon",
            (true, false) => "Sun",
            (false, true) => "Moon",
            (false, false) => "Third Body (none)",
        }
    }

    fn enabled(&self) -> bool {
        self.include_sun || self.include_moon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constants::AU;

    #[test]
    fn test_no_perturbation_at_geocenter() {
        let sun = Vector3::new(AU, 0.0, 0.0);
        assert!(third_body_accel(&Vector3::zeros(), &sun, GSUN).norm() < 1e-18);
    }

    #[test]
    fn test_sun_tide_magnitude() {
        // Tidal acceleration along the Sun line: 2 μ r / d³
        let sun = Vector3::new(AU, 0.0, 0.0);
        let r = 7.0e6;
        let a = third_body_accel(&Vector3::new(r, 0.0, 0.0), &sun, GSUN);
        let expected = 2.0 * GSUN * r / AU.powi(3);
        assert!((a.x - expected).abs() / expected < 1e-3);
        assert!(a.y.abs() < 1e-20);
    }

    #[test]
    fn test_disabled_when_empty() {
        let none = ThirdBody {
            include_sun: false,
            include_moon: false,
        };
        assert!(!none.enabled());
        assert!(ThirdBody::moon_only().enabled());
    }
}
