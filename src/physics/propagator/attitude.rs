//! Rotational propagators
//!
//! Attitude is written into the location after the position step, so the
//! pointing strategies always see the current orbit geometry.

use super::Clock;
use crate::physics::error::PhysicsResult;
use crate::physics::forces::att_accel;
use crate::physics::location::{Location, QAtt};
use crate::physics::settings::AttitudePropagatorType;
use crate::physics::state::PhysicsState;
use crate::physics::target::Target;
use nalgebra::{Unit, UnitQuaternion, Vector3};

/// How the attitude advances
#[derive(Debug, Clone, PartialEq)]
pub enum AttitudeModel {
    /// Frozen inertial attitude
    Inertial,
    /// Integrate the angular rate and acceleration from the torque model
    Iterative,
    /// Body axes aligned with LVLH
    Lvlh,
    /// Fixed attitude relative to the rotating Earth
    Geo,
    /// Body axis towards the Sun
    Solar { axis: Unit<Vector3<f64>> },
    /// Body axis towards the nearest visible target, LVLH when none is visible
    Target { axis: Unit<Vector3<f64>> },
}

/// Attitude propagator for one spacecraft
#[derive(Debug, Clone)]
pub struct AttitudePropagator {
    clock: Clock,
    initial: QAtt,
    initial_geoc: UnitQuaternion<f64>,
    model: AttitudeModel,
}

impl AttitudePropagator {
    pub fn new(loc: &Location, dt: f64, model: AttitudeModel) -> Self {
        Self {
            clock: Clock::new(loc.utc(), dt),
            initial: *loc.att_icrf(),
            initial_geoc: loc.att_geoc().s,
            model,
        }
    }

    pub fn inertial(loc: &Location, dt: f64) -> Self {
        Self::new(loc, dt, AttitudeModel::Inertial)
    }

    pub fn iterative(loc: &Location, dt: f64) -> Self {
        Self::new(loc, dt, AttitudeModel::Iterative)
    }

    pub fn lvlh(loc: &Location, dt: f64) -> Self {
        Self::new(loc, dt, AttitudeModel::Lvlh)
    }

    pub fn geo(loc: &Location, dt: f64) -> Self {
        Self::new(loc, dt, AttitudeModel::Geo)
    }

    pub fn solar(loc: &Location, dt: f64, axis: Vector3<f64>) -> Self {
        Self::new(
            loc,
            dt,
            AttitudeModel::Solar {
                axis: Unit::new_normalize(axis),
            },
        )
    }

    pub fn target(loc: &Location, dt: f64, axis: Vector3<f64>) -> Self {
        Self::new(
            loc,
            dt,
            AttitudeModel::Target {
                axis: Unit::new_normalize(axis),
            },
        )
    }

    pub fn kind(&self) -> AttitudePropagatorType {
        match self.model {
            AttitudeModel::Inertial => AttitudePropagatorType::Inertial,
            AttitudeModel::Iterative => AttitudePropagatorType::Iterative,
            AttitudeModel::Lvlh => AttitudePropagatorType::Lvlh,
            AttitudeModel::Geo => AttitudePropagatorType::Geo,
            AttitudeModel::Solar { .. } => AttitudePropagatorType::Solar,
            AttitudeModel::Target { .. } => AttitudePropagatorType::Target,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn model(&self) -> &AttitudeModel {
        &self.model
    }

    /// Write the initial attitude into `loc`
    pub fn init(
        &mut self,
        loc: &mut Location,
        phys: &PhysicsState,
        targets: &[Target],
    ) -> PhysicsResult<()> {
        self.clock.rewind();
        match &self.model {
            AttitudeModel::Inertial => loc.set_att_icrf(self.initial),
            AttitudeModel::Iterative => {
                loc.set_att_icrf(self.initial);
                att_accel(loc, phys)?;
            }
            AttitudeModel::Lvlh => loc.set_att_lvlh(QAtt::default()),
            AttitudeModel::Geo => loc.set_att_geoc(QAtt::new(self.initial_geoc)),
            AttitudeModel::Solar { axis } => {
                let q = point_axis(loc, axis, &(loc.sun() - loc.eci().s));
                loc.set_att_icrf(QAtt::new(q));
            }
            AttitudeModel::Target { axis } => match nearest_visible(loc, targets) {
                Some(direction) => loc.set_att_icrf(QAtt::new(point_axis(loc, axis, &direction))),
                None => loc.set_att_lvlh(QAtt::default()),
            },
        }
        Ok(())
    }

    /// Advance exactly one timestep
    ///
    /// `loc` must already hold the position for the new time and `targets`
    /// their look angles from it.
    pub fn step(
        &mut self,
        loc: &mut Location,
        phys: &PhysicsState,
        targets: &[Target],
    ) -> PhysicsResult<()> {
        let dt = self.clock.dt();
        self.clock.tick();
        match &self.model {
            AttitudeModel::Inertial => loc.set_att_icrf(self.initial),
            AttitudeModel::Iterative => {
                let att = *loc.att_icrf();
                loc.set_att_icrf(QAtt {
                    s: att.s * UnitQuaternion::from_scaled_axis(-att.v * dt),
                    v: att.v + att.a * dt,
                    a: att.a,
                });
                att_accel(loc, phys)?;
            }
            AttitudeModel::Lvlh => loc.set_att_lvlh(QAtt::default()),
            AttitudeModel::Geo => loc.set_att_geoc(QAtt::new(self.initial_geoc)),
            AttitudeModel::Solar { axis } => {
                let q = point_axis(loc, axis, &(loc.sun() - loc.eci().s));
                slew_to(loc, q, dt);
            }
            AttitudeModel::Target { axis } => match nearest_visible(loc, targets) {
                Some(direction) => {
                    let q = point_axis(loc, axis, &direction);
                    slew_to(loc, q, dt);
                }
                None => loc.set_att_lvlh(QAtt::default()),
            },
        }
        Ok(())
    }

    /// Step until within half a step of `target_utc`
    pub fn propagate(
        &mut self,
        loc: &mut Location,
        phys: &PhysicsState,
        targets: &[Target],
        target_utc: f64,
    ) -> PhysicsResult<usize> {
        let mut steps = 0;
        while self.clock.before(target_utc) {
            self.step(loc, phys, targets)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Return to the initial attitude and propagate to `target_utc`
    pub fn reset(
        &mut self,
        loc: &mut Location,
        phys: &PhysicsState,
        targets: &[Target],
        target_utc: f64,
    ) -> PhysicsResult<usize> {
        self.init(loc, phys, targets)?;
        self.propagate(loc, phys, targets, target_utc)
    }
}

/// Inertial direction to the closest target above the horizon
fn nearest_visible(loc: &Location, targets: &[Target]) -> Option<Vector3<f64>> {
    let target = targets
        .iter()
        .filter(|t| t.is_visible())
        .min_by(|a, b| a.range.total_cmp(&b.range))?;
    let site = loc.eci2itrf().inverse() * target.geod.to_itrf();
    Some(site - loc.eci().s)
}

/// Attitude putting body `axis` along inertial `direction`
///
/// Of all such attitudes, the one closest to LVLH is chosen.
fn point_axis(
    loc: &Location,
    axis: &Unit<Vector3<f64>>,
    direction: &Vector3<f64>,
) -> UnitQuaternion<f64> {
    let base = UnitQuaternion::from_rotation_matrix(loc.icrf2lvlh());
    let d = base * direction.normalize();
    let turn = UnitQuaternion::rotation_between(&d, axis).unwrap_or_else(|| {
        let mut normal = axis.cross(&Vector3::x());
        if normal.norm() < 1e-6 {
            normal = axis.cross(&Vector3::y());
        }
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(normal), std::f64::consts::PI)
    });
    turn * base
}

/// Write `q`, with the rate implied by moving there from the current attitude in `dt`
fn slew_to(loc: &mut Location, q: UnitQuaternion<f64>, dt: f64) {
    let previous = loc.att_icrf().s;
    let v = -(previous.inverse() * q).scaled_axis() / dt;
    loc.set_att_icrf(QAtt {
        s: q,
        v,
        a: Vector3::zeros(),
    });
}
