//! Exponential atmospheric density model
//!
//! ρ(h) = ρ₀ · exp(-h / H) with a single scale height. Fast, needs no data,
//! and is what the tests use.

use super::{AtmosphereDensity, AtmosphereModel};
use crate::physics::constants::SEA_LEVEL_DENSITY;
use crate::physics::location::Geodetic;

#[derive(Debug, Clone)]
pub struct Exponential {
    /// Reference density at sea level (kg/m³)
    pub rho0: f64,

    /// Scale height (m)
    pub scale_height: f64,

    /// Altitude above which the density is zero (m)
    pub max_altitude: f64,
}

impl Default for Exponential {
    fn default() -> Self {
        Self::standard()
    }
}

impl Exponential {
    /// Standard Earth atmosphere parameters
    pub fn standard() -> Self {
        Self {
            rho0: SEA_LEVEL_DENSITY,
            scale_height: 8500.0,
            max_altitude: 1_000_000.0,
        }
    }

    pub fn new(rho0: f64, scale_height: f64, max_altitude: f64) -> Self {
        Self {
            rho0,
            scale_height,
            max_altitude,
        }
    }

    /// Scale height chosen for an altitude regime
    pub fn altitude_tuned(reference_altitude_km: f64) -> Self {
        let scale_height = if reference_altitude_km < 100.0 {
            8_500.0
        } else if reference_altitude_km < 200.0 {
            27_000.0
        } else if reference_altitude_km < 400.0 {
            50_000.0
        } else {
            75_000.0
        };

        Self {
            scale_height,
            ..Self::standard()
        }
    }
}

impl AtmosphereModel for Exponential {
    fn density(&self, position: &Geodetic, _utc: f64) -> AtmosphereDensity {
        let altitude = position.h;
        if altitude < 0.0 {
            return AtmosphereDensity::new(self.rho0);
        }
        if altitude > self.max_altitude {
            return AtmosphereDensity::zero();
        }
        AtmosphereDensity::new(self.rho0 * (-altitude / self.scale_height).exp())
    }

    fn name(&self) -> &'static str {
        "Exponential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_sea_level() {
        let model = Exponential::standard();
        let density = model.density(&Geodetic::new(0.0, 0.0, 0.0), 60000.0);
        assert!((density.rho - 1.225).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_one_scale_height() {
        let model = Exponential::standard();
        let density = model.density(&Geodetic::new(0.3, 1.0, 8500.0), 60000.0);
        let expected = 1.225 * (-1.0_f64).exp();
        assert!((density.rho - expected).abs() < 1e-12);
    }

    #[test]
    fn test_above_cutoff() {
        let model = Exponential::altitude_tuned(500.0);
        assert_eq!(model.density(&Geodetic::new(0.0, 0.0, 2.0e6), 60000.0).rho, 0.0);
    }
}
