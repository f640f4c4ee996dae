//! Earth gravity force model

use super::ForceModel;
use crate::physics::constants::{GM, REARTHM};
use crate::physics::gravity::GravityModel;
use crate::physics::location::Location;
use crate::physics::state::PhysicsState;
use nalgebra::Vector3;
use std::sync::Arc;

/// Earth gravity from a shared coefficient set
///
/// The field is evaluated in the Earth-fixed frame and rotated back to ECI.
/// Below the Earth's radius the expansion is not valid and plain two-body
/// gravity is used.
#[derive(Debug, Clone)]
pub struct EarthGravity {
    model: Arc<GravityModel>,
    degree: usize,
}

impl EarthGravity {
    pub fn new(model: Arc<GravityModel>, degree: usize) -> Self {
        let degree = degree.min(model.degree());
        log::debug!("Earth gravity: {} to degree {}", model.name(), degree);
        Self { model, degree }
    }

    /// Central term only
    pub fn point_mass() -> Self {
        Self::new(Arc::new(GravityModel::point_mass()), 0)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn model(&self) -> &GravityModel {
        &self.model
    }
}

impl ForceModel for EarthGravity {
    fn acceleration(&self, loc: &Location, _phys: &PhysicsState) -> Vector3<f64> {
        let s = loc.eci().s;
        let r = s.norm();
        if r > REARTHM {
            let itrf = loc.eci2itrf();
            itrf.inverse() * self.model.accel(&(itrf * s), self.degree)
        } else {
            -GM / (r * r * r) * s
        }
    }

    fn name(&self) -> &'static str {
        "Earth Gravity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::location::Cartesian;
    use crate::physics::state::{PhysicsParams, PhysicsState};
    use crate::physics::structure::{Material, Structure, StructureType};

    fn phys() -> PhysicsState {
        let structure = Structure::setup(StructureType::U1, &Material::default(), 1.0).unwrap();
        PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap()
    }

    #[test]
    fn test_field_rotates_with_earth() {
        let gravity = EarthGravity::new(Arc::new(GravityModel::egm2008_low_degree()), 3);
        let s = Vector3::new(5.0e6, 4.0e6, 2.0e6);
        let early = Location::from_eci(60000.0, Cartesian::new(s, Vector3::zeros())).unwrap();
        let late = Location::from_eci(60000.25, Cartesian::new(s, Vector3::zeros())).unwrap();
        let a = gravity.acceleration(&early, &phys());
        let b = gravity.acceleration(&late, &phys());
        // Same inertial point, different Earth orientation
        assert!((a - b).norm() > 1e-7);
        assert!((a.norm() - b.norm()).abs() / a.norm() < 1e-3);
    }

    #[test]
    fn test_two_body_below_surface() {
        let gravity = EarthGravity::new(Arc::new(GravityModel::egm2008_low_degree()), 3);
        let s = Vector3::new(6.0e6, 0.0, 0.0);
        let loc = Location::from_eci(60000.0, Cartesian::new(s, Vector3::new(0.0, 1.0, 0.0)))
            .unwrap();
        let a = gravity.acceleration(&loc, &phys());
        assert!((a + GM / 3.6e13 * Vector3::x()).norm() < 1e-12);
    }
}
