//! Two-line element sets evaluated with SGP4

use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::location::Cartesian;
use crate::physics::time::{instant_to_mjd, mjd_to_instant};
use nalgebra::Vector3;
use std::path::Path;

/// Analytic orbit from one element set
///
/// Holds no state between evaluations; every call runs SGP4 afresh.
#[derive(Debug, Clone)]
pub struct TleOrbit {
    tle: satkit::TLE,
}

impl TleOrbit {
    pub fn new(tle: satkit::TLE) -> Self {
        Self { tle }
    }

    pub fn from_lines(line1: &str, line2: &str) -> PhysicsResult<Self> {
        satkit::TLE::load_2line(line1, line2)
            .map(Self::new)
            .map_err(|e| PhysicsError::Tle {
                message: e.to_string(),
            })
    }

    pub fn tle(&self) -> &satkit::TLE {
        &self.tle
    }

    /// Element set epoch (MJD UTC)
    pub fn epoch(&self) -> f64 {
        instant_to_mjd(&self.tle.epoch)
    }

    /// GCRF position and velocity at `utc`
    pub fn state_at(&self, utc: f64) -> PhysicsResult<Cartesian> {
        let instant = mjd_to_instant(utc)?;
        let mut tle = self.tle.clone();
        let result = satkit::sgp4::sgp4(&mut tle, &[instant]).map_err(|_| PhysicsError::Tle {
            message: format!("SGP4 failed at MJD {:.6}", utc),
        })?;

        let pos = result.pos.column(0);
        let vel = result.vel.column(0);
        let pos_teme = Vector3::new(pos[0], pos[1], pos[2]);
        let vel_teme = Vector3::new(vel[0], vel[1], vel[2]);

        let q = satkit::frametransform::qteme2gcrf(&instant);
        Ok(Cartesian::new(
            q.transform_vector(&pos_teme),
            q.transform_vector(&vel_teme),
        ))
    }
}

/// Parse every element set in `text`
///
/// Accepts bare two-line pairs and three-line sets with a name line.
pub fn parse_tles(text: &str) -> PhysicsResult<Vec<TleOrbit>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut orbits = Vec::new();
    let mut i = 0;
    while i + 1 < lines.len() {
        if lines[i].starts_with("1 ") && lines[i + 1].starts_with("2 ") {
            orbits.push(TleOrbit::from_lines(lines[i], lines[i + 1])?);
            i += 2;
        } else {
            i += 1;
        }
    }

    if orbits.is_empty() {
        return Err(PhysicsError::Tle {
            message: "no element sets found".to_string(),
        });
    }
    log::debug!("Parsed {} element sets", orbits.len());
    Ok(orbits)
}

/// Read a TLE file
pub fn load_tle_file(path: impl AsRef<Path>) -> PhysicsResult<Vec<TleOrbit>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| PhysicsError::io(path, &e))?;
    let orbits = parse_tles(&text)?;
    log::info!("Loaded {} TLEs from {}", orbits.len(), path.display());
    Ok(orbits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

    #[test]
    fn test_parse_three_line_set() {
        let orbits = parse_tles(ISS).unwrap();
        assert_eq!(orbits.len(), 1);
        assert!((orbits[0].epoch() - 54729.51782528).abs() < 1e-6);
    }

    #[test]
    fn test_state_is_low_earth_orbit() {
        let orbit = &parse_tles(ISS).unwrap()[0];
        let state = orbit.state_at(orbit.epoch()).unwrap();
        let r = state.s.norm();
        assert!(r > 6.6e6 && r < 6.9e6, "radius {}", r);
        assert!((state.v.norm() - 7700.0).abs() < 100.0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            parse_tles("not a tle\nat all\n"),
            Err(PhysicsError::Tle { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_tle_file("/nonexistent/file.tle"),
            Err(PhysicsError::Io { .. })
        ));
    }
}
