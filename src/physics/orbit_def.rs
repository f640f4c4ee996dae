//! Initial orbit definitions
//!
//! A definition is a JSON object with exactly one key naming its form:
//!
//! ```json
//! {"phys": {"lat": 21.3, "lon": -157.8, "alt": 400000, "angle": 54}}
//! {"eci": {"utc": 60000, "x": 7000000, "y": 0, "z": 0, "vx": 0, "vy": 7500, "vz": 0}}
//! {"kep": {"utc": 60000, "ea": 0, "i": 0.9, "ap": 0, "raan": 0, "e": 0.001, "a": 6878137}}
//! {"tle": "iss.tle"}
//! ```

use super::error::{PhysicsError, PhysicsResult};
use super::kepler::{kep2eci, KeplerElements};
use super::location::{shape2eci, Cartesian, Location};
use super::propagator::{load_tle_file, TleOrbit};
use super::time::current_mjd;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Circular orbit over a ground point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysOrbit {
    /// Epoch (MJD UTC); now when absent
    #[serde(default)]
    pub utc: Option<f64>,
    /// Geodetic latitude (deg)
    pub lat: f64,
    /// Longitude (deg)
    pub lon: f64,
    /// Altitude (m)
    pub alt: f64,
    /// Ground-track heading from north (deg)
    #[serde(default, alias = "heading")]
    pub angle: f64,
}

/// Inertial state vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EciOrbit {
    pub utc: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

/// Classical elements; angles in radians, semi-major axis in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KepOrbit {
    #[serde(default)]
    pub utc: Option<f64>,
    pub ea: f64,
    pub i: f64,
    pub ap: f64,
    pub raan: f64,
    pub e: f64,
    pub a: f64,
}

/// Where to find a two-line element set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TleSource {
    Path(PathBuf),
    File {
        filename: PathBuf,
        /// Start time (MJD UTC); the element set epoch when absent
        #[serde(default)]
        utc: Option<f64>,
    },
}

/// One of the accepted initial-orbit forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrbitDefinition {
    Phys(PhysOrbit),
    Eci(EciOrbit),
    Kep(KepOrbit),
    Tle(TleSource),
}

impl OrbitDefinition {
    /// Parse a definition; unknown or missing keys are `ArgsError`
    pub fn parse(text: &str) -> PhysicsResult<Self> {
        serde_json::from_str(text.trim())
            .map_err(|e| PhysicsError::args(format!("orbit definition: {}", e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Phys(_) => "phys",
            Self::Eci(_) => "eci",
            Self::Kep(_) => "kep",
            Self::Tle(_) => "tle",
        }
    }

    /// Element set behind a `tle` definition
    pub fn tle(&self) -> PhysicsResult<Option<TleOrbit>> {
        let path = match self {
            Self::Tle(TleSource::Path(path)) | Self::Tle(TleSource::File { filename: path, .. }) => {
                path
            }
            _ => return Ok(None),
        };
        let mut orbits = load_tle_file(path)?;
        if orbits.len() > 1 {
            log::info!("Using the first of {} element sets", orbits.len());
        }
        Ok(Some(orbits.swap_remove(0)))
    }

    /// Build the initial location; attitude starts aligned with ICRF
    pub fn to_location(&self) -> PhysicsResult<Location> {
        let (utc, eci) = match self {
            Self::Phys(p) => {
                let utc = p.utc.unwrap_or_else(current_mjd);
                let eci = shape2eci(
                    utc,
                    p.lat.to_radians(),
                    p.lon.to_radians(),
                    p.alt,
                    p.angle.to_radians(),
                );
                (utc, eci)
            }
            Self::Eci(e) => (
                e.utc,
                Cartesian::new(
                    Vector3::new(e.x, e.y, e.z),
                    Vector3::new(e.vx, e.vy, e.vz),
                ),
            ),
            Self::Kep(k) => {
                if !(k.a > 0.0 && (0.0..1.0).contains(&k.e)) {
                    return Err(PhysicsError::args(format!(
                        "elements a = {} m, e = {} are not an ellipse",
                        k.a, k.e
                    )));
                }
                let utc = k.utc.unwrap_or_else(current_mjd);
                let mut kep = KeplerElements {
                    utc,
                    a: k.a,
                    e: k.e,
                    i: k.i,
                    raan: k.raan,
                    ap: k.ap,
                    ea: k.ea,
                    ma: k.ea - k.e * k.ea.sin(),
                    ..Default::default()
                };
                let (s, v) = kep2eci(&mut kep);
                (utc, Cartesian::new(s, v))
            }
            Self::Tle(source) => {
                let orbit = self
                    .tle()?
                    .ok_or_else(|| PhysicsError::args("tle definition without elements"))?;
                let utc = match source {
                    TleSource::File { utc: Some(utc), .. } => *utc,
                    _ => orbit.epoch(),
                };
                (utc, orbit.state_at(utc)?)
            }
        };

        if !(eci.s.iter().chain(eci.v.iter()).all(|c| c.is_finite()) && utc.is_finite()) {
            return Err(PhysicsError::args(format!(
                "{} definition gives a non-finite state",
                self.name()
            )));
        }
        log::info!(
            "Initial orbit from {}: MJD {:.6}, radius {:.1} km",
            self.name(),
            utc,
            eci.s.norm() / 1000.0
        );
        Location::from_eci(utc, eci)
    }
}

/// Parse an orbit definition and build its location
pub fn load_loc(text: &str) -> PhysicsResult<Location> {
    OrbitDefinition::parse(text)?.to_location()
}
