//! Translational propagators

use super::gauss_jackson::GaussJackson;
use super::tle::TleOrbit;
use super::{Clock, Dynamics};
use crate::physics::constants::SECONDS_PER_DAY;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::kepler::{eci2kep, kep2eci, KeplerElements};
use crate::physics::location::{lvlh_rotation, Cartesian, Geodetic, Location};
use crate::physics::settings::PositionPropagatorType;
use nalgebra::Vector3;

/// Reference orbit and fixed offset for the LVLH strategy
#[derive(Debug, Clone)]
pub struct LvlhOrbit {
    reference: KeplerElements,
    /// Offset from the reference, LVLH axes (m)
    offset: Vector3<f64>,
}

impl LvlhOrbit {
    fn new(loc: &Location, offset: Vector3<f64>) -> PhysicsResult<Self> {
        let reference = eci2kep(loc.utc(), &loc.eci().s, &loc.eci().v);
        if !reference.is_elliptic() {
            return Err(PhysicsError::args("LVLH propagation needs a closed reference orbit"));
        }
        Ok(Self { reference, offset })
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    /// Spacecraft state `seconds` after the reference epoch
    fn state_after(&self, seconds: f64) -> Cartesian {
        let mut kep = self.reference;
        kep.advance(seconds);
        let (s, v) = kep2eci(&mut kep);
        let back = lvlh_rotation(&s, &v).inverse();
        let rate = s.cross(&v) / s.norm_squared();
        let d = back * self.offset;
        Cartesian::new(s + d, v + rate.cross(&d))
    }
}

/// How the position advances
#[derive(Debug, Clone)]
pub enum PositionModel {
    /// Frozen inertial state, only the time moves
    Inertial,
    /// Third-order Taylor series with jerk, no corrector
    Iterative,
    GaussJackson(Box<GaussJackson>),
    /// Fixed geodetic point
    Geo(Geodetic),
    /// Fixed offset from a two-body reference orbit
    Lvlh(LvlhOrbit),
    /// SGP4 at every step
    Tle(TleOrbit),
}

/// Position propagator for one spacecraft
#[derive(Debug, Clone)]
pub struct PositionPropagator {
    clock: Clock,
    initial: Location,
    model: PositionModel,
}

impl PositionPropagator {
    fn with_model(loc: &Location, dt: f64, model: PositionModel) -> Self {
        Self {
            clock: Clock::new(loc.utc(), dt),
            initial: loc.clone(),
            model,
        }
    }

    pub fn inertial(loc: &Location, dt: f64) -> Self {
        Self::with_model(loc, dt, PositionModel::Inertial)
    }

    pub fn iterative(loc: &Location, dt: f64) -> Self {
        Self::with_model(loc, dt, PositionModel::Iterative)
    }

    pub fn gauss_jackson(loc: &Location, dt: f64, order: usize) -> PhysicsResult<Self> {
        let clock = Clock::new(loc.utc(), dt);
        let gj = GaussJackson::new(loc, clock.dt(), clock.dtj(), order)?;
        Ok(Self {
            clock,
            initial: loc.clone(),
            model: PositionModel::GaussJackson(Box::new(gj)),
        })
    }

    pub fn geo(loc: &Location, dt: f64) -> Self {
        Self::with_model(loc, dt, PositionModel::Geo(*loc.geod()))
    }

    /// Hold `offset` (LVLH axes, m) from the orbit currently in `loc`
    pub fn lvlh(loc: &Location, dt: f64, offset: Vector3<f64>) -> PhysicsResult<Self> {
        let orbit = LvlhOrbit::new(loc, offset)?;
        Ok(Self::with_model(loc, dt, PositionModel::Lvlh(orbit)))
    }

    /// Start from the element set evaluated at the time in `loc`
    pub fn tle(loc: &Location, dt: f64, orbit: TleOrbit) -> PhysicsResult<Self> {
        let mut start = loc.clone();
        start.set_eci(loc.utc(), orbit.state_at(loc.utc())?)?;
        Ok(Self::with_model(&start, dt, PositionModel::Tle(orbit)))
    }

    pub fn kind(&self) -> PositionPropagatorType {
        match self.model {
            PositionModel::Inertial => PositionPropagatorType::Inertial,
            PositionModel::Iterative => PositionPropagatorType::Iterative,
            PositionModel::GaussJackson(_) => PositionPropagatorType::GaussJackson,
            PositionModel::Geo(_) => PositionPropagatorType::Geo,
            PositionModel::Lvlh(_) => PositionPropagatorType::Lvlh,
            PositionModel::Tle(_) => PositionPropagatorType::Tle,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn model(&self) -> &PositionModel {
        &self.model
    }

    pub fn initial(&self) -> &Location {
        &self.initial
    }

    /// Place `loc` at the initial state and derive its accelerations
    ///
    /// The attitude already held by `loc` is kept.
    pub fn init(&mut self, loc: &mut Location, dynamics: &Dynamics) -> PhysicsResult<()> {
        self.clock.rewind();
        let utc = self.clock.utc();
        loc.set_eci(utc, *self.initial.eci())?;
        match &mut self.model {
            PositionModel::GaussJackson(gj) => {
                gj.init(loc, dynamics)?;
            }
            PositionModel::Geo(geod) => {
                loc.set_geod(utc, *geod)?;
            }
            PositionModel::Lvlh(orbit) => {
                loc.set_eci(utc, orbit.state_after(0.0))?;
                dynamics.accelerate(loc)?;
            }
            PositionModel::Inertial => {}
            PositionModel::Iterative | PositionModel::Tle(_) => {
                dynamics.accelerate(loc)?;
            }
        }
        log::debug!(
            "{} position propagator initialized at MJD {:.8}",
            self.kind().name(),
            utc
        );
        Ok(())
    }

    /// Advance exactly one timestep
    pub fn step(&mut self, loc: &mut Location, dynamics: &Dynamics) -> PhysicsResult<()> {
        let dt = self.clock.dt();
        let utc = self.clock.tick();
        match &mut self.model {
            PositionModel::Inertial => {
                let frozen = *self.initial.eci();
                loc.set_eci(utc, frozen)?;
            }
            PositionModel::Iterative => {
                let old = *loc.eci();
                let s = old.s
                    + old.v * dt
                    + old.a * (dt * dt / 2.0)
                    + old.j * (dt * dt * dt / 6.0);
                let v = old.v + old.a * dt + old.j * (dt * dt / 2.0);
                loc.set_eci(utc, Cartesian::new(s, v))?;
                dynamics.pos_accel(loc);
                let jerk = (loc.eci().a - old.a) / dt;
                let a = loc.eci().a;
                loc.set_eci_accel(a, jerk);
            }
            PositionModel::GaussJackson(gj) => {
                gj.step(loc, dynamics)?;
            }
            PositionModel::Geo(geod) => {
                loc.set_geod(utc, *geod)?;
            }
            PositionModel::Lvlh(orbit) => {
                let elapsed = (utc - self.clock.epoch()) * SECONDS_PER_DAY;
                loc.set_eci(utc, orbit.state_after(elapsed))?;
                dynamics.pos_accel(loc);
            }
            PositionModel::Tle(orbit) => {
                loc.set_eci(utc, orbit.state_at(utc)?)?;
                dynamics.pos_accel(loc);
            }
        }
        log::trace!("position MJD {:.8} r {:.1} m", utc, loc.radius());
        Ok(())
    }

    /// Step until within half a step of `target`; returns the step count
    pub fn propagate(
        &mut self,
        loc: &mut Location,
        dynamics: &Dynamics,
        target: f64,
    ) -> PhysicsResult<usize> {
        let mut steps = 0;
        while self.clock.before(target) {
            self.step(loc, dynamics)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Return to the initial state and propagate to `target`
    pub fn reset(
        &mut self,
        loc: &mut Location,
        dynamics: &Dynamics,
        target: f64,
    ) -> PhysicsResult<usize> {
        *loc = self.initial.clone();
        self.init(loc, dynamics)?;
        self.propagate(loc, dynamics, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constants::GM;
    use crate::physics::forces::CompositeForce;
    use crate::physics::gravity::GravityModel;
    use crate::physics::state::{PhysicsParams, PhysicsState};
    use crate::physics::structure::{Material, Structure, StructureType};
    use std::sync::Arc;

    fn setup() -> (PhysicsState, CompositeForce, Location) {
        let structure = Structure::setup(StructureType::U1, &Material::default(), 1.0).unwrap();
        let phys = PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap();
        let forces = CompositeForce::gravity_only(Arc::new(GravityModel::point_mass()), 0);
        let r = 7_000_000.0;
        let loc = Location::from_eci(
            60000.0,
            Cartesian::new(Vector3::new(r, 0.0, 0.0), Vector3::new(0.0, (GM / r).sqrt(), 0.0)),
        )
        .unwrap();
        (phys, forces, loc)
    }

    #[test]
    fn test_inertial_only_moves_time() {
        let (phys, forces, mut loc) = setup();
        let dynamics = Dynamics::new(&phys, &forces);
        let mut prop = PositionPropagator::inertial(&loc, 60.0);
        prop.init(&mut loc, &dynamics).unwrap();
        let steps = prop.propagate(&mut loc, &dynamics, 60000.0 + 600.0 / 86400.0).unwrap();
        assert_eq!(steps, 10);
        assert_eq!(loc.eci().s, Vector3::new(7_000_000.0, 0.0, 0.0));
        assert!((loc.utc() - (60000.0 + 600.0 / 86400.0)).abs() < 1e-9);
    }

    #[test]
    fn test_iterative_tracks_circular_orbit() {
        let (phys, forces, mut loc) = setup();
        let dynamics = Dynamics::new(&phys, &forces);
        let mut prop = PositionPropagator::iterative(&loc, 1.0);
        prop.init(&mut loc, &dynamics).unwrap();
        prop.propagate(&mut loc, &dynamics, 60000.0 + 600.0 / 86400.0).unwrap();
        // Radius drifts slowly without a corrector
        assert!((loc.radius() - 7_000_000.0).abs() < 100.0);
        assert!(loc.eci().j.norm() > 0.0);
    }

    #[test]
    fn test_geo_holds_ground_point() {
        let (phys, forces, _) = setup();
        let dynamics = Dynamics::new(&phys, &forces);
        let site = Geodetic::from_degrees(40.0, -105.0, 1600.0);
        let mut loc = Location::from_geod(60000.0, site).unwrap();
        let mut prop = PositionPropagator::geo(&loc, 300.0);
        prop.init(&mut loc, &dynamics).unwrap();
        prop.propagate(&mut loc, &dynamics, 60000.25).unwrap();
        assert!((loc.geod().lat - site.lat).abs() < 1e-9);
        assert!((loc.geod().lon - site.lon).abs() < 1e-9);
        assert!((loc.geod().h - site.h).abs() < 1e-3);
        assert!(loc.geoc().v.norm() < 1e-6);
    }

    #[test]
    fn test_lvlh_offset_is_held() {
        let (phys, forces, mut loc) = setup();
        let dynamics = Dynamics::new(&phys, &forces);
        let offset = Vector3::new(100.0, 0.0, 0.0);
        let reference = loc.clone();
        let mut prop = PositionPropagator::lvlh(&loc, 60.0, offset).unwrap();
        prop.init(&mut loc, &dynamics).unwrap();
        prop.propagate(&mut loc, &dynamics, 60000.0 + 1800.0 / 86400.0).unwrap();

        let mut kep = eci2kep(reference.utc(), &reference.eci().s, &reference.eci().v);
        kep.advance((loc.utc() - reference.utc()) * SECONDS_PER_DAY);
        let (s, v) = kep2eci(&mut kep);
        let relative = lvlh_rotation(&s, &v) * (loc.eci().s - s);
        assert!((relative - offset).norm() < 1e-3);
    }

    #[test]
    fn test_reset_replays_gauss_jackson() {
        let (phys, forces, mut loc) = setup();
        let dynamics = Dynamics::new(&phys, &forces);
        let mut prop = PositionPropagator::gauss_jackson(&loc, 30.0, 8).unwrap();
        prop.init(&mut loc, &dynamics).unwrap();
        let target = 60000.0 + 900.0 / 86400.0;
        prop.propagate(&mut loc, &dynamics, target).unwrap();
        let first = *loc.eci();

        prop.reset(&mut loc, &dynamics, target).unwrap();
        assert!((loc.eci().s - first.s).norm() < 1e-6);
        assert_eq!(prop.kind(), PositionPropagatorType::GaussJackson);
    }
}
