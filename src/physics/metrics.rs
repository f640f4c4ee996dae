//! Sensor coverage metrics
//!
//! Each sensor is modelled as a nadir-pointing cone. Its footprint on the
//! ground is a circle of radius `altitude · tan(fov / 2)`; a target is a
//! circle of the same area as the region it covers. Coverage is the overlap
//! of the two circles as a percentage of the target area.

use super::constants::REARTHM;
use super::error::{PhysicsError, PhysicsResult};
use super::location::{Geodetic, Location};
use super::target::Target;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Area common to two circles of radii `r1`, `r2` whose centres are `d` apart
///
/// Works for any consistent length unit, including small angles.
pub fn circle_intersection_area(r1: f64, r2: f64, d: f64) -> f64 {
    if r1 <= 0.0 || r2 <= 0.0 || d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        let small = r1.min(r2);
        return PI * small * small;
    }

    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = 0.5
        * ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2))
            .max(0.0)
            .sqrt();
    r1 * r1 * a1 + r2 * r2 * a2 - kite
}

/// An imaging sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    /// Full field of view (rad)
    pub fov: f64,
    /// Instantaneous field of view of one pixel (rad)
    pub ifov: f64,
    /// Lower bound of the spectral band (m)
    pub spectrum_low: f64,
    /// Upper bound of the spectral band (m)
    pub spectrum_high: f64,
}

impl Sensor {
    pub fn new(name: impl Into<String>, fov: f64, ifov: f64) -> PhysicsResult<Self> {
        let sensor = Self {
            name: name.into(),
            fov,
            ifov,
            spectrum_low: 0.0,
            spectrum_high: 0.0,
        };
        sensor.validate()?;
        Ok(sensor)
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !(self.fov > 0.0 && self.fov < PI) {
            return Err(PhysicsError::out_of_range(format!(
                "sensor {} field of view {} rad",
                self.name, self.fov
            )));
        }
        if !(self.ifov > 0.0 && self.ifov <= self.fov) {
            return Err(PhysicsError::out_of_range(format!(
                "sensor {} instantaneous field of view {} rad",
                self.name, self.ifov
            )));
        }
        if self.spectrum_high < self.spectrum_low {
            return Err(PhysicsError::out_of_range(format!(
                "sensor {} spectral band is inverted",
                self.name
            )));
        }
        Ok(())
    }
}

/// Coverage and resolution for every (target, sensor) pair
#[derive(Debug, Clone, Default)]
pub struct MetricGenerator {
    sensors: Vec<Sensor>,
    /// Percent of each target's area inside each sensor footprint
    pub coverage: Vec<Vec<f64>>,
    /// Ground sample distance for each target and sensor (m)
    pub resolution: Vec<Vec<f64>>,
}

impl MetricGenerator {
    pub fn new(sensors: Vec<Sensor>) -> PhysicsResult<Self> {
        for sensor in &sensors {
            sensor.validate()?;
        }
        Ok(Self {
            sensors,
            coverage: Vec::new(),
            resolution: Vec::new(),
        })
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Refresh the coverage matrix; targets must already be updated for `loc`
    pub fn update(&mut self, loc: &Location, targets: &[Target]) {
        let altitude = loc.geod().h.max(0.0);
        let nadir = Geodetic::new(loc.geod().lat, loc.geod().lon, 0.0)
            .to_itrf()
            .normalize();

        self.coverage = Vec::with_capacity(targets.len());
        self.resolution = Vec::with_capacity(targets.len());
        for target in targets {
            let ground = target.geod.to_itrf().normalize();
            let offset = REARTHM * nadir.dot(&ground).clamp(-1.0, 1.0).acos();
            let target_radius = (target.area / PI).sqrt();
            let target_area = PI * target_radius * target_radius;

            let mut coverage = Vec::with_capacity(self.sensors.len());
            let mut resolution = Vec::with_capacity(self.sensors.len());
            for sensor in &self.sensors {
                let footprint = altitude * (sensor.fov / 2.0).tan();
                let percent = if target.is_visible() && target_area > 0.0 {
                    100.0 * circle_intersection_area(footprint, target_radius, offset)
                        / target_area
                } else {
                    0.0
                };
                coverage.push(percent);
                resolution.push(target.range * sensor.ifov);
            }
            self.coverage.push(coverage);
            self.resolution.push(resolution);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::location::Cartesian;
    use crate::physics::target::TargetKind;
    use nalgebra::Vector3;

    #[test]
    fn test_intersection_limits() {
        assert_eq!(circle_intersection_area(1.0, 1.0, 3.0), 0.0);
        assert!((circle_intersection_area(1.0, 2.0, 0.5) - PI).abs() < 1e-12);
        // Two unit circles one radius apart: 2π/3 - √3/2
        let expected = 2.0 * PI / 3.0 - 3.0_f64.sqrt() / 2.0;
        assert!((circle_intersection_area(1.0, 1.0, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bad_sensor_geometry() {
        assert!(matches!(
            Sensor::new("wide", 4.0, 1e-4),
            Err(PhysicsError::OutOfRange { .. })
        ));
        assert!(matches!(
            Sensor::new("coarse", 0.1, 0.2),
            Err(PhysicsError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_target_under_wide_footprint_is_fully_covered() {
        let site = Geodetic::from_degrees(10.0, 20.0, 0.0);
        let mut targets = vec![Target::new("field", TargetKind::Target, site, 1.0e8)];

        let mut loc = Location::from_eci(
            60000.0,
            Cartesian::new(Vector3::new(7e6, 0.0, 0.0), Vector3::new(0.0, 7500.0, 0.0)),
        )
        .unwrap();
        loc.set_geod(60000.0, Geodetic::from_degrees(10.0, 20.0, 500_000.0))
            .unwrap();
        targets[0].update(&loc);

        let sensors = vec![Sensor::new("cam", 0.5, 1e-5).unwrap()];
        let mut metrics = MetricGenerator::new(sensors).unwrap();
        metrics.update(&loc, &targets);

        assert!((metrics.coverage[0][0] - 100.0).abs() < 1e-9);
        assert!((metrics.resolution[0][0] - 5.0).abs() < 1e-3);
    }
}
