//! Physical constants used throughout the engine (SI units)

/// Earth gravitational parameter (m³/s²)
pub const GM: f64 = 3.986004415e14;

/// Earth equatorial radius, WGS-84 (m)
pub const REARTHM: f64 = 6_378_137.0;

/// WGS-84 flattening
pub const FLATTENING: f64 = 1.0 / 298.257223563;

/// Earth rotation rate (rad/s)
pub const OMEGA_EARTH: f64 = 7.2921150e-5;

/// Sun gravitational parameter (m³/s²)
pub const GSUN: f64 = 1.32712440018e20;

/// Moon gravitational parameter (m³/s²)
pub const GMOON: f64 = 4.902800066e12;

/// Sun mean radius (m)
pub const RSUNM: f64 = 6.957e8;

/// Astronomical unit (m)
pub const AU: f64 = 1.495978707e11;

/// Solar irradiance at 1 AU (W/m²)
pub const SOLAR_CONSTANT: f64 = 1366.1;

/// Speed of light used for radiation pressure (m/s)
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Stefan-Boltzmann constant (W/m²/K⁴)
pub const SIGMA: f64 = 5.670374419e-8;

/// Sea-level atmospheric density (kg/m³)
pub const SEA_LEVEL_DENSITY: f64 = 1.225;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;
