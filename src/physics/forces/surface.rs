//! Surface forces: atmospheric drag, solar radiation pressure, Earth infrared
//!
//! [`phys_calc`] walks the external triangles once per step and accumulates
//! body-frame accelerations and torques into the [`PhysicsState`];
//! [`BodyForces`] rotates the accumulated totals into the inertial frame.

use super::ForceModel;
use crate::physics::atmosphere::AtmosphereModel;
use crate::physics::constants::{SEA_LEVEL_DENSITY, SIGMA, SPEED_OF_LIGHT};
use crate::physics::location::Location;
use crate::physics::state::PhysicsState;
use nalgebra::Vector3;

/// Below this altitude the density model is not consulted (m)
pub const DRAG_FLOOR_ALTITUDE: f64 = 10_000.0;

/// Half the drag coefficient
const HALF_CD: f64 = 1.1;

/// Earth infrared grazing cutoff
const EARTH_IR_CUTOFF_DEG: f64 = 5.0;

fn density(loc: &Location, atmosphere: &dyn AtmosphereModel) -> f64 {
    let h = loc.geod().h;
    if h.is_nan() {
        log::warn!("NaN altitude at MJD {:.8}; using sea-level density", loc.utc());
        return SEA_LEVEL_DENSITY;
    }
    if h < DRAG_FLOOR_ALTITUDE {
        log::warn!("Altitude {:.0} m below drag floor; using sea-level density", h);
        return SEA_LEVEL_DENSITY;
    }
    let rho = atmosphere.density(loc.geod(), loc.utc()).rho;
    if rho.is_finite() {
        rho
    } else {
        log::warn!("{} returned {} at {:.0} m; using sea-level density", atmosphere.name(), rho, h);
        SEA_LEVEL_DENSITY
    }
}

/// Effective Earth surface temperature for infrared emission (K)
fn earth_temperature(lat: f64) -> f64 {
    310.0 - 80.0 * lat.abs().sin()
}

/// Accumulate drag, radiation pressure and irradiation over the structure
///
/// Overwrites each triangle's `sirradiation` and `eirradiation` and replaces
/// the `adrag`, `atorque`, `rdrag` and `rtorque` accumulators.
pub fn phys_calc(loc: &Location, phys: &mut PhysicsState, atmosphere: &dyn AtmosphereModel) {
    phys.reset_accumulators();

    // Air co-rotates with the Earth
    let v_air = loc.eci2itrf().inverse() * loc.geoc().v;
    let speed2 = v_air.norm_squared();
    let unitv = if speed2 > 0.0 {
        loc.to_body(&(v_air / speed2.sqrt()))
    } else {
        Vector3::zeros()
    };
    let adrag = density(loc, atmosphere) * HALF_CD * speed2;

    let nadir = loc.to_body(&(-loc.eci().s.normalize()));
    let to_sun = loc.sun() - loc.eci().s;
    let units = loc.to_body(&to_sun.normalize());
    let radiance = loc.sun_radiance();
    let earth_flux = SIGMA * earth_temperature(loc.geod().lat).powi(4);
    let cutoff = EARTH_IR_CUTOFF_DEG.to_radians();
    let mass = phys.mass;

    let mut atorque = Vector3::zeros();
    let mut adrag_sum = Vector3::zeros();
    let mut rtorque = Vector3::zeros();
    let mut rdrag_sum = Vector3::zeros();

    for t in phys.structure.triangles.iter_mut() {
        t.sirradiation = 0.0;
        t.eirradiation = 0.0;
        if !t.external.is_external() {
            continue;
        }

        let sdot = units.dot(&t.normal);
        if radiance > 0.0 && sdot > 0.0 {
            let ddrag = radiance * sdot / (SPEED_OF_LIGHT * mass);
            rtorque += ddrag * t.twist;
            rdrag_sum += ddrag * t.shove;
            t.sirradiation = radiance * sdot;
        }

        let angle = nadir.dot(&t.normal).clamp(-1.0, 1.0).acos() - cutoff;
        let edot = if angle < 0.0 { 1.0 } else { angle.cos() };
        if edot > 0.0 {
            t.eirradiation = edot * earth_flux;
        }

        let vdot = unitv.dot(&t.normal);
        if vdot > 0.0 && mass > 0.0 {
            let ddrag = adrag * vdot / mass;
            atorque += ddrag * t.twist;
            adrag_sum += ddrag * t.shove;
        }
    }

    phys.atorque = atorque;
    phys.adrag = adrag_sum;
    phys.rtorque = rtorque;
    phys.rdrag = rdrag_sum;
    log::trace!(
        "phys_calc: adrag {:?} rdrag {:?} radiance {:.1}",
        phys.adrag,
        phys.rdrag,
        radiance
    );
}

/// Drag, radiation pressure, fictitious force and thrust, rotated to ECI
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyForces;

impl ForceModel for BodyForces {
    fn acceleration(&self, loc: &Location, phys: &PhysicsState) -> Vector3<f64> {
        loc.from_body(&phys.body_acceleration())
    }

    fn name(&self) -> &'static str {
        "Body Forces"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::Exponential;
    use crate::physics::location::{Cartesian, Geodetic};
    use crate::physics::state::PhysicsParams;
    use crate::physics::structure::{Material, Structure, StructureType};

    fn cubesat() -> PhysicsState {
        let structure = Structure::setup(StructureType::U3, &Material::default(), 4.0).unwrap();
        PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap()
    }

    fn leo(alt: f64) -> Location {
        let r = 6_378_137.0 + alt;
        Location::from_eci(
            60000.0,
            Cartesian::new(Vector3::new(0.0, 0.0, r), Vector3::new(7600.0, 0.0, 0.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_drag_opposes_velocity() {
        let mut phys = cubesat();
        let loc = leo(300_000.0);
        phys_calc(&loc, &mut phys, &Exponential::altitude_tuned(300.0));
        let drag = loc.from_body(&phys.adrag);
        assert!(drag.norm() > 0.0);
        assert!(drag.dot(&loc.eci().v) < 0.0);
    }

    #[test]
    fn test_low_altitude_uses_sea_level_density() {
        let mut loc = leo(300_000.0);
        loc.set_geod(60000.0, Geodetic::new(0.0, 0.0, 5_000.0)).unwrap();
        assert_eq!(density(&loc, &Exponential::altitude_tuned(500.0)), SEA_LEVEL_DENSITY);
    }

    #[test]
    fn test_internal_faces_receive_nothing() {
        let structure =
            Structure::setup(StructureType::Hex65W80H, &Material::default(), 30.0).unwrap();
        let mut phys = PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap();
        phys_calc(&leo(500_000.0), &mut phys, &Exponential::standard());
        for t in phys.structure.triangles.iter().filter(|t| !t.external.is_external()) {
            assert_eq!(t.sirradiation, 0.0);
            assert_eq!(t.eirradiation, 0.0);
        }
        assert!(phys
            .structure
            .triangles
            .iter()
            .any(|t| t.eirradiation > 0.0));
    }

    #[test]
    fn test_body_forces_include_thrust() {
        let mut phys = cubesat();
        phys.thrust = Vector3::new(0.0, 0.0, 0.4);
        let loc = leo(500_000.0);
        let a = BodyForces.acceleration(&loc, &phys);
        assert!((a.norm() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_earth_temperature_profile() {
        assert_eq!(earth_temperature(0.0), 310.0);
        assert!((earth_temperature(-std::f64::consts::FRAC_PI_2) - 230.0).abs() < 1e-12);
    }
}
