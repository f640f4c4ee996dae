//! Fixed-step propagators, one family per physical quantity
//!
//! # Architecture
//!
//! Every propagator owns a [`Clock`] (munged timestep, cursor, epoch) and a
//! snapshot of its initial state, and exposes the same operations:
//!
//! - `init`: seed from the snapshot and derive initial accelerations
//! - `step`: advance exactly one timestep
//! - `propagate(target)`: step until within half a step of `target`
//! - `reset(target)`: restore the snapshot, re-initialize, propagate to `target`
//!
//! Strategies are closed sets: [`PositionPropagator`] and
//! [`AttitudePropagator`] dispatch over their [`PositionModel`] and
//! [`AttitudeModel`] variants. [`ThermalPropagator`] and
//! [`ElectricalPropagator`] have a single strategy each.

mod attitude;
mod electrical;
mod gauss_jackson;
mod position;
mod thermal;
mod tle;

pub use attitude::{AttitudeModel, AttitudePropagator};
pub use electrical::ElectricalPropagator;
pub use gauss_jackson::{
    Convergence, GaussJackson, GjCoefficients, CONVERGE_TOLERANCE, MAX_CONVERGE_PASSES,
};
pub use position::{LvlhOrbit, PositionModel, PositionPropagator};
pub use thermal::ThermalPropagator;
pub use tle::{load_tle_file, parse_tles, TleOrbit};

use super::error::PhysicsResult;
use super::forces::{att_accel, pos_accel, CompositeForce};
use super::location::Location;
use super::state::PhysicsState;
use super::time::munge_dt;

/// Fixed timestep and time cursor shared by every propagator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    dt: f64,
    dtj: f64,
    utc: f64,
    epoch: f64,
}

impl Clock {
    /// Munge `dt` once so repeated `utc += dtj` does not drift
    pub fn new(utc: f64, dt: f64) -> Self {
        let (dt, dtj) = munge_dt(utc, dt);
        Self {
            dt,
            dtj,
            utc,
            epoch: utc,
        }
    }

    /// Timestep (s)
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Timestep (days)
    pub fn dtj(&self) -> f64 {
        self.dtj
    }

    /// Current time (MJD)
    pub fn utc(&self) -> f64 {
        self.utc
    }

    /// Time of the initial snapshot (MJD)
    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    /// Whether another step brings the cursor closer to `target`
    pub fn before(&self, target: f64) -> bool {
        self.utc + self.dtj / 2.0 < target
    }

    /// Advance one step and return the new time
    pub fn tick(&mut self) -> f64 {
        self.utc += self.dtj;
        self.utc
    }

    pub fn rewind(&mut self) {
        self.utc = self.epoch;
    }
}

/// What translational and rotational accelerations are computed from
#[derive(Debug, Clone, Copy)]
pub struct Dynamics<'a> {
    pub phys: &'a PhysicsState,
    pub forces: &'a CompositeForce,
}

impl<'a> Dynamics<'a> {
    pub fn new(phys: &'a PhysicsState, forces: &'a CompositeForce) -> Self {
        Self { phys, forces }
    }

    /// Refresh the translational acceleration of `loc`
    pub fn pos_accel(&self, loc: &mut Location) {
        pos_accel(loc, self.phys, self.forces);
    }

    /// Refresh both the translational and angular acceleration of `loc`
    pub fn accelerate(&self, loc: &mut Location) -> PhysicsResult<()> {
        pos_accel(loc, self.phys, self.forces);
        att_accel(loc, self.phys)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_stops_within_half_step() {
        let mut clock = Clock::new(60000.0, 10.0);
        let target = 60000.0 + 97.0 / 86400.0;
        let mut steps = 0;
        while clock.before(target) {
            clock.tick();
            steps += 1;
        }
        assert_eq!(steps, 10);
        assert!((clock.utc() - target).abs() <= clock.dtj() / 2.0 + 1e-12);
    }

    #[test]
    fn test_clock_rewind() {
        let mut clock = Clock::new(60000.0, 60.0);
        clock.tick();
        clock.tick();
        assert!(clock.utc() > clock.epoch());
        clock.rewind();
        assert_eq!(clock.utc(), 60000.0);
    }

    #[test]
    fn test_clock_dt_is_munged() {
        let clock = Clock::new(60000.0, 60.0);
        assert!((clock.dtj() * 86400.0 - clock.dt()).abs() < 1e-9);
        assert!((clock.dt() - 60.0).abs() < 1e-6);
    }
}
