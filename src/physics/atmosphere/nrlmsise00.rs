//! NRLMSISE-00 atmospheric density model
//!
//! Wraps satkit's NRLMSISE-00. Without space weather the model runs with its
//! nominal solar flux and geomagnetic indices; with space weather it looks up
//! F10.7, its 81-day average and Ap for the epoch.

use super::{AtmosphereDensity, AtmosphereModel};
use crate::physics::location::Geodetic;
use crate::physics::time::mjd_to_instant;

/// Altitude above which the density is taken as zero (m)
const TOP_OF_ATMOSPHERE: f64 = 1_000_000.0;

pub struct Nrlmsise00 {
    use_space_weather: bool,
}

impl Default for Nrlmsise00 {
    fn default() -> Self {
        Self::new()
    }
}

impl Nrlmsise00 {
    /// Nominal solar activity, no data files
    pub fn new() -> Self {
        Self {
            use_space_weather: false,
        }
    }

    /// Space weather from satkit's tables
    pub fn with_space_weather() -> Self {
        Self {
            use_space_weather: true,
        }
    }
}

impl AtmosphereModel for Nrlmsise00 {
    fn density(&self, position: &Geodetic, utc: f64) -> AtmosphereDensity {
        if position.h > TOP_OF_ATMOSPHERE {
            return AtmosphereDensity::zero();
        }

        let epoch = if self.use_space_weather {
            match mjd_to_instant(utc) {
                Ok(instant) => Some(instant),
                Err(e) => {
                    log::warn!("NRLMSISE-00 running without space weather: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let (rho, temp) = satkit::nrlmsise::nrlmsise(
            position.h / 1000.0,
            Some(position.lat.to_degrees()),
            Some(position.lon.to_degrees()),
            epoch.as_ref(),
            epoch.is_some(),
        );

        AtmosphereDensity::with_temperature(rho, temp)
    }

    fn name(&self) -> &'static str {
        "NRLMSISE-00"
    }

    fn requires_space_weather(&self) -> bool {
        self.use_space_weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nrlmsise_leo_density() {
        let model = Nrlmsise00::new();
        let density = model.density(&Geodetic::new(0.0, 0.0, 400_000.0), 60000.0);

        // At 400 km, density should be roughly 1e-12 to 1e-11 kg/m³
        assert!(density.rho > 1e-14);
        assert!(density.rho < 1e-10);
        assert!(density.temperature.is_some());
    }

    #[test]
    fn test_above_atmosphere() {
        let model = Nrlmsise00::new();
        let density = model.density(&Geodetic::new(0.0, 0.0, 2_000_000.0), 60000.0);
        assert_eq!(density.rho, 0.0);
    }
}
