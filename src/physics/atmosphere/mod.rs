//! Atmospheric density models for drag calculations
//!
//! Models are selected at runtime through [`AtmosphereModelType`] and used
//! behind the [`AtmosphereModel`] trait.
//!
//! # Implemented Models
//!
//! - **NRLMSISE-00**: Empirical model with optional space weather (via satkit)
//! - **Exponential**: Single scale height decay, no external data

mod exponential;
mod nrlmsise00;

pub use exponential::Exponential;
pub use nrlmsise00::Nrlmsise00;

use crate::physics::location::Geodetic;
use serde::{Deserialize, Serialize};

/// Output from an atmosphere model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereDensity {
    /// Total mass density in kg/m³
    pub rho: f64,

    /// Exospheric temperature in Kelvin (if available)
    pub temperature: Option<f64>,
}

impl AtmosphereDensity {
    pub fn new(rho: f64) -> Self {
        Self {
            rho,
            temperature: None,
        }
    }

    pub fn with_temperature(rho: f64, temperature: f64) -> Self {
        Self {
            rho,
            temperature: Some(temperature),
        }
    }

    /// Above the atmosphere
    pub fn zero() -> Self {
        Self::new(0.0)
    }
}

/// Trait for atmospheric density models
pub trait AtmosphereModel: Send + Sync {
    /// Density at a geodetic position and time (MJD UTC)
    fn density(&self, position: &Geodetic, utc: f64) -> AtmosphereDensity;

    /// Model name for logging and display
    fn name(&self) -> &'static str;

    /// Whether this model reads space weather tables
    fn requires_space_weather(&self) -> bool {
        false
    }
}

/// Runtime model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AtmosphereModelType {
    /// NRLMSISE-00 with nominal solar activity
    #[default]
    Nrlmsise00,
    /// NRLMSISE-00 driven by the space weather tables for the epoch
    Nrlmsise00SpaceWeather,
    /// Simple exponential model
    Exponential,
}

impl AtmosphereModelType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nrlmsise00 => "NRLMSISE-00",
            Self::Nrlmsise00SpaceWeather => "NRLMSISE-00 (space weather)",
            Self::Exponential => "Exponential",
        }
    }

    pub fn all() -> &'static [AtmosphereModelType] {
        &[
            Self::Nrlmsise00,
            Self::Nrlmsise00SpaceWeather,
            Self::Exponential,
        ]
    }

    /// Create a boxed model instance
    pub fn create(&self) -> Box<dyn AtmosphereModel> {
        match self {
            Self::Nrlmsise00 => Box::new(Nrlmsise00::new()),
            Self::Nrlmsise00SpaceWeather => Box::new(Nrlmsise00::with_space_weather()),
            Self::Exponential => Box::new(Exponential::default()),
        }
    }
}

impl AtmosphereModel for Box<dyn AtmosphereModel> {
    fn density(&self, position: &Geodetic, utc: f64) -> AtmosphereDensity {
        self.as_ref().density(position, utc)
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn requires_space_weather(&self) -> bool {
        self.as_ref().requires_space_weather()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_creates_its_model() {
        for kind in AtmosphereModelType::all() {
            let model = kind.create();
            assert!(!model.name().is_empty());
        }
        assert!(AtmosphereModelType::Nrlmsise00SpaceWeather
            .create()
            .requires_space_weather());
    }
}
