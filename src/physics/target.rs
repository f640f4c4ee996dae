//! Ground stations and imaging targets
//!
//! A target is fixed on the Earth's surface; its look angles from the
//! spacecraft are refreshed once per step by the orchestrator.

use super::location::{Geodetic, Location};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// What the target is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetKind {
    /// Communication ground station: 0/5/10° and max-elevation events
    #[default]
    GroundStation,
    /// Imaging target: 0° and max-elevation events, sensor coverage
    Target,
}

impl TargetKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GroundStation => "Ground Station",
            Self::Target => "Target",
        }
    }
}

/// A surface point tracked by the event and metric generators
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
    pub geod: Geodetic,
    /// Area of the imaged region (m²), zero for ground stations
    pub area: f64,

    /// Azimuth from the target to the spacecraft (rad, from north towards east)
    pub azimuth: f64,
    /// Elevation of the spacecraft above the local horizon (rad)
    pub elevation: f64,
    /// Slant range (m)
    pub range: f64,
    /// Rate at which the range is closing (m/s, positive when approaching)
    pub close_speed: f64,
}

impl Target {
    pub fn new(name: impl Into<String>, kind: TargetKind, geod: Geodetic, area: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            geod,
            area,
            azimuth: 0.0,
            elevation: -std::f64::consts::FRAC_PI_2,
            range: 0.0,
            close_speed: 0.0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.elevation > 0.0
    }

    /// Recompute look angles for the spacecraft's current location
    pub fn update(&mut self, loc: &Location) {
        let rel = loc.geoc().s - self.geod.to_itrf();
        self.look(&rel, &loc.geoc().v);
    }

    /// Look angles for an Earth-fixed offset and velocity from the target
    fn look(&mut self, rel: &Vector3<f64>, vel: &Vector3<f64>) {
        let range = rel.norm();
        if range <= 0.0 {
            self.azimuth = 0.0;
            self.range = 0.0;
            self.elevation = std::f64::consts::FRAC_PI_2;
            self.close_speed = 0.0;
            return;
        }

        let (east, north, up) = self.geod.enu_basis();
        let (e, n, u) = (rel.dot(&east), rel.dot(&north), rel.dot(&up));
        self.azimuth = e.atan2(n).rem_euclid(std::f64::consts::TAU);
        self.elevation = (u / range).clamp(-1.0, 1.0).asin();
        self.range = range;
        self.close_speed = -rel.dot(vel) / range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::location::Cartesian;

    #[test]
    fn test_overhead_spacecraft_is_at_zenith() {
        let geod = Geodetic::from_degrees(30.0, -40.0, 0.0);
        let mut target = Target::new("site", TargetKind::GroundStation, geod, 0.0);

        let mut loc = Location::from_eci(
            60000.0,
            Cartesian::new(Vector3::new(7e6, 0.0, 0.0), Vector3::new(0.0, 7500.0, 0.0)),
        )
        .unwrap();
        loc.set_geod(60000.0, Geodetic::from_degrees(30.0, -40.0, 500_000.0))
            .unwrap();
        target.update(&loc);

        assert!((target.elevation.to_degrees() - 90.0).abs() < 1e-6);
        assert!((target.range - 500_000.0).abs() < 1e-3);
        assert!(target.is_visible());
        assert!(target.close_speed.abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_spacecraft_is_below_horizon() {
        let mut target = Target::new(
            "far",
            TargetKind::Target,
            Geodetic::from_degrees(0.0, 0.0, 0.0),
            1e6,
        );
        let mut loc = Location::from_eci(
            60000.0,
            Cartesian::new(Vector3::new(7e6, 0.0, 0.0), Vector3::zeros()),
        )
        .unwrap();
        loc.set_geod(60000.0, Geodetic::from_degrees(0.0, 180.0, 500_000.0))
            .unwrap();
        target.update(&loc);
        assert!(!target.is_visible());
    }

    #[test]
    fn test_zero_range_clears_azimuth() {
        let mut target = Target::new(
            "pad",
            TargetKind::GroundStation,
            Geodetic::from_degrees(28.5, -80.6, 0.0),
            0.0,
        );
        target.look(&Vector3::new(0.0, 1000.0, 0.0), &Vector3::zeros());
        assert!(target.azimuth > 0.1);

        target.look(&Vector3::zeros(), &Vector3::zeros());
        assert_eq!(target.azimuth, 0.0);
        assert_eq!(target.range, 0.0);
        assert!(target.is_visible());
    }
}
