//! Force and torque models
//!
//! Translational dynamics are assembled from composable force models; the
//! rotational side is Euler's rigid-body equation with gravity-gradient,
//! control and gyroscopic torques.
//!
//! # Architecture
//!
//! Each force model implements [`ForceModel`] and returns its inertial
//! acceleration contribution for a location and physical state.
//! [`CompositeForce`] sums all enabled contributions; [`pos_accel`] writes
//! the total back into the [`Location`].
//!
//! # Available Models
//!
//! - **EarthGravity**: spherical harmonics above the surface, two-body below
//! - **ThirdBody**: Sun and Moon point masses with the frame correction
//! - **BodyForces**: drag, radiation pressure, fictitious force and thrust
//!   accumulated by [`phys_calc`] in the body frame

mod gravity;
mod surface;
mod third_body;

pub use gravity::EarthGravity;
pub use surface::{phys_calc, BodyForces, DRAG_FLOOR_ALTITUDE};
pub use third_body::ThirdBody;

use crate::physics::constants::GM;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::gravity::GravityModel;
use crate::physics::location::Location;
use crate::physics::state::PhysicsState;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

/// Trait for force model contributions
pub trait ForceModel: Send + Sync {
    /// Inertial acceleration contribution (m/s²)
    fn acceleration(&self, loc: &Location, phys: &PhysicsState) -> Vector3<f64>;

    /// Force model name for debugging and logging
    fn name(&self) -> &'static str;

    /// Disabled models are skipped during acceleration computation
    fn enabled(&self) -> bool {
        true
    }
}

/// Composite force model that aggregates multiple force contributions
///
/// # Example
///
/// ```ignore
/// let forces = CompositeForce::builder()
///     .with_gravity(EarthGravity::new(Arc::new(GravityModel::egm2008_low_degree()), 3))
///     .with_third_body(ThirdBody::sun_and_moon())
///     .with_body_forces()
///     .build();
///
/// let total = forces.total_acceleration(&loc, &phys);
/// ```
pub struct CompositeForce {
    forces: Vec<Box<dyn ForceModel>>,
}

impl Default for CompositeForce {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeForce")
            .field("models", &self.model_names())
            .finish()
    }
}

impl CompositeForce {
    pub fn new() -> Self {
        Self { forces: Vec::new() }
    }

    pub fn add(&mut self, force: Box<dyn ForceModel>) {
        log::debug!("Adding force model: {}", force.name());
        self.forces.push(force);
    }

    pub fn builder() -> CompositeForceBuilder {
        CompositeForceBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn model_names(&self) -> Vec<&'static str> {
        self.forces.iter().map(|f| f.name()).collect()
    }

    /// Sum of all enabled contributions
    pub fn total_acceleration(&self, loc: &Location, phys: &PhysicsState) -> Vector3<f64> {
        self.forces
            .iter()
            .filter(|f| f.enabled())
            .map(|f| f.acceleration(loc, phys))
            .fold(Vector3::zeros(), |acc, a| acc + a)
    }

    /// Per-model contributions, for debugging
    pub fn acceleration_breakdown(
        &self,
        loc: &Location,
        phys: &PhysicsState,
    ) -> Vec<(&'static str, Vector3<f64>)> {
        self.forces
            .iter()
            .filter(|f| f.enabled())
            .map(|f| (f.name(), f.acceleration(loc, phys)))
            .collect()
    }

    /// Earth gravity only, for reference orbits and tests
    pub fn gravity_only(model: Arc<GravityModel>, degree: usize) -> Self {
        Self::builder()
            .with_gravity(EarthGravity::new(model, degree))
            .build()
    }

    /// Full model: gravity field, Sun and Moon, surface forces and thrust
    pub fn full(model: Arc<GravityModel>, degree: usize) -> Self {
        Self::builder()
            .with_gravity(EarthGravity::new(model, degree))
            .with_third_body(ThirdBody::sun_and_moon())
            .with_body_forces()
            .build()
    }
}

/// Builder for CompositeForce
pub struct CompositeForceBuilder {
    forces: Vec<Box<dyn ForceModel>>,
}

impl CompositeForceBuilder {
    fn new() -> Self {
        Self { forces: Vec::new() }
    }

    pub fn with(mut self, force: Box<dyn ForceModel>) -> Self {
        self.forces.push(force);
        self
    }

    pub fn with_gravity(self, model: EarthGravity) -> Self {
        self.with(Box::new(model))
    }

    pub fn with_third_body(self, model: ThirdBody) -> Self {
        self.with(Box::new(model))
    }

    pub fn with_body_forces(self) -> Self {
        self.with(Box::new(BodyForces))
    }

    pub fn build(self) -> CompositeForce {
        let mut composite = CompositeForce::new();
        for force in self.forces {
            composite.add(force);
        }
        composite
    }
}

/// Evaluate the translational acceleration and store it in the location
///
/// Non-finite components are zeroed and reported.
pub fn pos_accel(loc: &mut Location, phys: &PhysicsState, forces: &CompositeForce) -> Vector3<f64> {
    let mut accel = forces.total_acceleration(loc, phys);
    if accel.iter().any(|c| !c.is_finite()) {
        log::warn!(
            "Non-finite acceleration {:?} at MJD {:.8}, radius {:.1} m; zeroing",
            accel,
            loc.utc(),
            loc.radius()
        );
        accel.iter_mut().for_each(|c| {
            if !c.is_finite() {
                *c = 0.0
            }
        });
    }
    let jerk = loc.eci().j;
    loc.set_eci_accel(accel, jerk);
    accel
}

/// Gravity-gradient torque in the body frame (N m)
pub fn gravity_gradient_torque(loc: &Location, moi: &Vector3<f64>) -> Vector3<f64> {
    let r = loc.radius();
    let ue = loc.to_body(&(-loc.eci().s / r));
    let inertia = Matrix3::from_diagonal(moi);
    (3.0 * GM / r.powi(3)) * ue.cross(&(inertia * ue))
}

/// Evaluate the angular acceleration and store it in every attitude frame
///
/// Fails with `OutOfRange` when the inertia tensor cannot be inverted.
pub fn att_accel(loc: &mut Location, phys: &PhysicsState) -> PhysicsResult<Vector3<f64>> {
    let inertia = Matrix3::from_diagonal(&phys.moi);
    let inverse = inertia
        .try_inverse()
        .ok_or_else(|| PhysicsError::out_of_range(format!("singular inertia {:?}", phys.moi)))?;

    let gtorque = gravity_gradient_torque(loc, &phys.moi);
    let omega = loc.to_body(&loc.att_icrf().v);
    let htorque = -omega.cross(&(inertia * omega + phys.hmomentum));
    let torque = phys.ctorque + gtorque + htorque;

    let alpha = loc.from_body(&(inverse * torque));
    loc.set_att_accel(alpha);
    Ok(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::location::{Cartesian, QAtt};
    use crate::physics::state::PhysicsParams;
    use crate::physics::structure::{Material, Structure, StructureType};
    use nalgebra::UnitQuaternion;

    fn cubesat() -> PhysicsState {
        let structure = Structure::setup(StructureType::U3, &Material::default(), 4.0).unwrap();
        PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap()
    }

    fn leo(s: Vector3<f64>) -> Location {
        let v = s.cross(&Vector3::z()).normalize() * -7500.0;
        Location::from_eci(60000.0, Cartesian::new(s, v)).unwrap()
    }

    #[test]
    fn test_composite_force_empty() {
        let forces = CompositeForce::new();
        assert!(forces.is_empty());
        let loc = leo(Vector3::new(7e6, 0.0, 0.0));
        assert_eq!(forces.total_acceleration(&loc, &cubesat()), Vector3::zeros());
    }

    #[test]
    fn test_composite_force_gravity() {
        let forces = CompositeForce::gravity_only(Arc::new(GravityModel::point_mass()), 0);
        let r = 7_000_000.0;
        let mut loc = leo(Vector3::new(r, 0.0, 0.0));
        let accel = pos_accel(&mut loc, &cubesat(), &forces);

        assert!(accel.x < 0.0);
        assert!(accel.y.abs() < 1e-10);
        assert!(accel.z.abs() < 1e-10);
        assert!((accel.norm() - GM / (r * r)).abs() / (GM / (r * r)) < 1e-10);
        assert_eq!(loc.eci().a, accel);
        assert_eq!(forces.model_names(), vec!["Earth Gravity"]);
    }

    #[test]
    fn test_gravity_gradient_vanishes_for_equal_inertia() {
        let moi = Vector3::new(0.7, 0.7, 0.7);
        let positions = [
            Vector3::new(7e6, 0.0, 0.0),
            Vector3::new(-2e6, 5e6, 4e6),
            Vector3::new(1e6, -1e6, -6.9e6),
        ];
        let attitudes = [
            UnitQuaternion::identity(),
            UnitQuaternion::from_euler_angles(0.3, -1.1, 2.0),
            UnitQuaternion::from_euler_angles(-2.5, 0.4, -0.7),
        ];
        for s in positions {
            for q in attitudes {
                let mut loc = leo(s);
                loc.set_att_icrf(QAtt::new(q));
                assert!(gravity_gradient_torque(&loc, &moi).norm() < 1e-15);
            }
        }
    }

    #[test]
    fn test_gravity_gradient_restores_tilted_long_axis() {
        let mut phys = cubesat();
        phys.ctorque = Vector3::zeros();
        let mut loc = leo(Vector3::new(7e6, 0.0, 0.0));
        loc.set_att_icrf(QAtt::new(UnitQuaternion::from_euler_angles(0.0, 0.3, 0.0)));
        let alpha = att_accel(&mut loc, &phys).unwrap();
        assert!(alpha.norm() > 0.0);
        assert_eq!(loc.att_icrf().a, alpha);
        assert!((loc.att_lvlh().a - loc.icrf2lvlh() * alpha).norm() < 1e-20);
    }

    #[test]
    fn test_singular_inertia_is_rejected() {
        let mut phys = cubesat();
        phys.moi = Vector3::new(0.0, 1.0, 1.0);
        let mut loc = leo(Vector3::new(7e6, 0.0, 0.0));
        assert!(matches!(
            att_accel(&mut loc, &phys),
            Err(PhysicsError::OutOfRange { .. })
        ));
    }
}
