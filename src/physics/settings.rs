//! Simulation configuration
//!
//! Everything the orchestrator needs to build a spacecraft and its
//! propagators. All fields have defaults, so a settings file only has to
//! name what it changes.

use super::atmosphere::AtmosphereModelType;
use super::error::{PhysicsError, PhysicsResult};
use super::forces::{CompositeForce, EarthGravity, ThirdBody};
use super::gravity::{GravityModel, GravityModelId};
use super::location::Geodetic;
use super::metrics::Sensor;
use super::state::PhysicsParams;
use super::structure::{Material, StructureType};
use super::target::{Target, TargetKind};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Translational propagator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionPropagatorType {
    /// Position frozen in the inertial frame
    Inertial,
    /// Third-order Taylor step on the force model
    Iterative,
    /// Eighth-order Gauss–Jackson predictor–corrector
    #[default]
    GaussJackson,
    /// Fixed point on the rotating Earth
    Geo,
    /// Fixed offset from a two-body reference orbit
    Lvlh,
    /// SGP4 on a two-line element set
    Tle,
}

impl PositionPropagatorType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inertial => "Inertial",
            Self::Iterative => "Iterative",
            Self::GaussJackson => "Gauss-Jackson",
            Self::Geo => "Geo",
            Self::Lvlh => "LVLH",
            Self::Tle => "TLE (SGP4)",
        }
    }

    pub fn all() -> &'static [PositionPropagatorType] {
        &[
            Self::Inertial,
            Self::Iterative,
            Self::GaussJackson,
            Self::Geo,
            Self::Lvlh,
            Self::Tle,
        ]
    }
}

/// Rotational propagator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttitudePropagatorType {
    Inertial,
    Iterative,
    #[default]
    Lvlh,
    Geo,
    /// Body axis at the Sun
    Solar,
    /// Body axis at the nearest visible target
    Target,
}

impl AttitudePropagatorType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inertial => "Inertial",
            Self::Iterative => "Iterative",
            Self::Lvlh => "LVLH",
            Self::Geo => "Geo",
            Self::Solar => "Solar pointing",
            Self::Target => "Target pointing",
        }
    }

    pub fn all() -> &'static [AttitudePropagatorType] {
        &[
            Self::Inertial,
            Self::Iterative,
            Self::Lvlh,
            Self::Geo,
            Self::Solar,
            Self::Target,
        ]
    }
}

/// Gravity field configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravitySettings {
    pub model: GravityModelId,
    /// Highest degree and order evaluated; 0 is a point mass
    pub degree: usize,
    /// Coefficient file; the built-in low-degree field is used when absent
    pub file: Option<PathBuf>,
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            model: GravityModelId::Egm2008Norm,
            degree: 3,
            file: None,
        }
    }
}

impl GravitySettings {
    /// Load or build the configured field
    pub fn build(&self) -> PhysicsResult<GravityModel> {
        match &self.file {
            Some(path) => GravityModel::load(self.model, path, self.degree),
            None if self.degree == 0 => Ok(GravityModel::point_mass()),
            None => {
                let model = GravityModel::egm2008_low_degree();
                if self.degree > model.degree() {
                    log::warn!(
                        "Built-in gravity field stops at degree {}, requested {}",
                        model.degree(),
                        self.degree
                    );
                }
                Ok(model)
            }
        }
    }
}

/// A ground station or imaging target in the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSettings {
    pub name: String,
    #[serde(default)]
    pub kind: TargetKind,
    /// Geodetic latitude (deg)
    pub lat: f64,
    /// Longitude (deg)
    pub lon: f64,
    /// Height above the ellipsoid (m)
    #[serde(default)]
    pub alt: f64,
    /// Imaged area (m²)
    #[serde(default)]
    pub area: f64,
}

impl TargetSettings {
    pub fn build(&self) -> Target {
        Target::new(
            self.name.clone(),
            self.kind,
            Geodetic::from_degrees(self.lat, self.lon, self.alt),
            self.area,
        )
    }
}

/// Full simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Timestep (s)
    pub dt: f64,
    pub structure: StructureType,
    /// Total mass (kg)
    pub mass: f64,
    pub material: Material,
    #[serde(flatten)]
    pub params: PhysicsParams,
    pub position: PositionPropagatorType,
    pub attitude: AttitudePropagatorType,
    /// Gauss–Jackson order, rounded down to even
    pub gj_order: usize,
    pub gravity: GravitySettings,
    pub atmosphere: AtmosphereModelType,
    pub include_third_body: bool,
    pub include_surface_forces: bool,
    /// Body axis used by the Solar and Target attitude propagators
    pub pointing_axis: [f64; 3],
    /// LVLH offset for the LVLH position propagator (m)
    pub lvlh_offset: [f64; 3],
    pub targets: Vec<TargetSettings>,
    pub sensors: Vec<Sensor>,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            dt: 10.0,
            structure: StructureType::U3,
            mass: 4.0,
            material: Material::default().with_cells(0.8),
            params: PhysicsParams::default(),
            position: PositionPropagatorType::GaussJackson,
            attitude: AttitudePropagatorType::Lvlh,
            gj_order: 8,
            gravity: GravitySettings::default(),
            atmosphere: AtmosphereModelType::Nrlmsise00,
            include_third_body: true,
            include_surface_forces: true,
            pointing_axis: [0.0, 0.0, 1.0],
            lvlh_offset: [0.0; 3],
            targets: Vec::new(),
            sensors: Vec::new(),
        }
    }
}

impl PhysicsSettings {
    /// Two-body orbit, no surface forces; for quick looks and tests
    pub fn two_body() -> Self {
        Self {
            gravity: GravitySettings {
                degree: 0,
                ..Default::default()
            },
            atmosphere: AtmosphereModelType::Exponential,
            include_third_body: false,
            include_surface_forces: false,
            ..Default::default()
        }
    }

    /// Low-degree field, Sun and Moon, exponential atmosphere
    pub fn fast() -> Self {
        Self {
            dt: 30.0,
            atmosphere: AtmosphereModelType::Exponential,
            ..Default::default()
        }
    }

    /// Space-weather driven atmosphere and a short step
    pub fn high_fidelity() -> Self {
        Self {
            dt: 5.0,
            atmosphere: AtmosphereModelType::Nrlmsise00SpaceWeather,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> PhysicsResult<Self> {
        let settings: Self = serde_json::from_str(text)
            .map_err(|e| PhysicsError::args(format!("settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PhysicsError::io(path, &e))?;
        let settings = Self::from_json(&text)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(PhysicsError::args(format!("timestep {} s", self.dt)));
        }
        if !(self.mass > 0.0) {
            return Err(PhysicsError::args(format!("mass {} kg", self.mass)));
        }
        if self.gj_order < 2 {
            return Err(PhysicsError::args(format!(
                "Gauss-Jackson order {}",
                self.gj_order
            )));
        }
        if self.pointing().norm() == 0.0 {
            return Err(PhysicsError::args("pointing axis is zero"));
        }
        for sensor in &self.sensors {
            sensor.validate()?;
        }
        Ok(())
    }

    pub fn pointing(&self) -> Vector3<f64> {
        Vector3::from(self.pointing_axis)
    }

    pub fn offset(&self) -> Vector3<f64> {
        Vector3::from(self.lvlh_offset)
    }

    /// Assemble the translational force model around `gravity`
    pub fn build_forces(&self, gravity: Arc<GravityModel>) -> CompositeForce {
        let degree = self.gravity.degree.min(gravity.degree());
        let mut builder = CompositeForce::builder().with_gravity(EarthGravity::new(gravity, degree));
        if self.include_third_body {
            builder = builder.with_third_body(ThirdBody::sun_and_moon());
        }
        if self.include_surface_forces {
            builder = builder.with_body_forces();
        }
        builder.build()
    }

    pub fn build_targets(&self) -> Vec<Target> {
        self.targets.iter().map(TargetSettings::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let settings = PhysicsSettings::from_json("{}").unwrap();
        assert_eq!(settings, PhysicsSettings::default());
    }

    #[test]
    fn test_partial_json() {
        let settings = PhysicsSettings::from_json(
            r#"{
                "dt": 30.0,
                "structure": "U1",
                "attitude": "Solar",
                "battcap": 500.0,
                "gravity": { "degree": 0 },
                "targets": [{ "name": "Honolulu", "lat": 21.3, "lon": -157.8 }]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.dt, 30.0);
        assert_eq!(settings.structure, StructureType::U1);
        assert_eq!(settings.attitude, AttitudePropagatorType::Solar);
        assert_eq!(settings.params.battcap, 500.0);
        assert_eq!(settings.gravity.model, GravityModelId::Egm2008Norm);
        assert_eq!(settings.targets[0].kind, TargetKind::GroundStation);
        assert!((settings.build_targets()[0].geod.lat - 21.3f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(
            PhysicsSettings::from_json(r#"{"dt": -1.0}"#),
            Err(PhysicsError::ArgsError { .. })
        ));
        assert!(matches!(
            PhysicsSettings::from_json(r#"{"position": "Warp"}"#),
            Err(PhysicsError::ArgsError { .. })
        ));
        assert!(matches!(
            PhysicsSettings::load("/nonexistent/settings.json"),
            Err(PhysicsError::Io { .. })
        ));
    }

    #[test]
    fn test_presets_build_forces() {
        let two_body = PhysicsSettings::two_body();
        let gravity = Arc::new(two_body.gravity.build().unwrap());
        assert_eq!(gravity.degree(), 0);
        assert_eq!(two_body.build_forces(gravity.clone()).len(), 1);
        assert_eq!(PhysicsSettings::default().build_forces(gravity).len(), 3);
    }

    #[test]
    fn test_selection_names() {
        assert_eq!(PositionPropagatorType::all().len(), 6);
        assert_eq!(AttitudePropagatorType::all().len(), 6);
        assert_eq!(PositionPropagatorType::GaussJackson.name(), "Gauss-Jackson");
    }
}
