//! Whole-spacecraft simulation state
//!
//! [`State`] owns one spacecraft: its structure and physical state, its
//! location, one propagator per physical quantity, the tracked targets and
//! the event and metric generators.
//!
//! Each step runs in a fixed order:
//!
//! 1. `phys_calc`: surface forces and irradiation for the current geometry
//! 2. thermal
//! 3. electrical
//! 4. position
//! 5. target look angles for the new position
//! 6. attitude
//! 7. events and metrics
//!
//! Accelerations consumed by the position step come from step 1, and the
//! pointing attitudes depend on the position and targets of this step.

use super::atmosphere::AtmosphereModel;
use super::error::{PhysicsError, PhysicsResult};
use super::events::{Event, EventGenerator};
use super::forces::{phys_calc, CompositeForce};
use super::gravity::GravityModel;
use super::location::Location;
use super::metrics::MetricGenerator;
use super::orbit_def::OrbitDefinition;
use super::propagator::{
    AttitudePropagator, Dynamics, ElectricalPropagator, PositionPropagator, ThermalPropagator,
    TleOrbit,
};
use super::settings::{AttitudePropagatorType, PhysicsSettings, PositionPropagatorType};
use super::state::PhysicsState;
use super::structure::Structure;
use super::target::Target;
use std::sync::Arc;

/// One simulated spacecraft
pub struct State {
    settings: PhysicsSettings,
    loc: Location,
    phys: PhysicsState,
    gravity: Arc<GravityModel>,
    forces: CompositeForce,
    atmosphere: Box<dyn AtmosphereModel>,
    position: PositionPropagator,
    attitude: AttitudePropagator,
    thermal: ThermalPropagator,
    electrical: ElectricalPropagator,
    targets: Vec<Target>,
    events: EventGenerator,
    metrics: MetricGenerator,
    event_log: Vec<Event>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("utc", &self.loc.utc())
            .field("position", &self.position.kind())
            .field("attitude", &self.attitude.kind())
            .field("forces", &self.forces)
            .field("atmosphere", &self.atmosphere.name())
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl State {
    /// Build a spacecraft from settings and an orbit definition
    ///
    /// Loads the gravity field and, for `tle` definitions, the element set.
    pub fn new(settings: PhysicsSettings, orbit: &OrbitDefinition) -> PhysicsResult<Self> {
        let gravity = Arc::new(settings.gravity.build()?);
        let tle = orbit.tle()?;
        let loc = orbit.to_location()?;
        Self::from_location(settings, loc, gravity, tle)
    }

    /// Build a spacecraft at `loc` around an already loaded gravity field
    pub fn from_location(
        settings: PhysicsSettings,
        loc: Location,
        gravity: Arc<GravityModel>,
        tle: Option<TleOrbit>,
    ) -> PhysicsResult<Self> {
        settings.validate()?;
        let dt = settings.dt;

        let structure = Structure::setup(settings.structure, &settings.material, settings.mass)?;
        let phys = PhysicsState::phys_setup(structure, &settings.params)?;
        let forces = settings.build_forces(gravity.clone());
        let atmosphere = settings.atmosphere.create();

        let position = match settings.position {
            PositionPropagatorType::Inertial => PositionPropagator::inertial(&loc, dt),
            PositionPropagatorType::Iterative => PositionPropagator::iterative(&loc, dt),
            PositionPropagatorType::GaussJackson => {
                PositionPropagator::gauss_jackson(&loc, dt, settings.gj_order)?
            }
            PositionPropagatorType::Geo => PositionPropagator::geo(&loc, dt),
            PositionPropagatorType::Lvlh => PositionPropagator::lvlh(&loc, dt, settings.offset())?,
            PositionPropagatorType::Tle => {
                let orbit = tle.ok_or_else(|| {
                    PhysicsError::args("TLE position propagator needs a tle orbit definition")
                })?;
                PositionPropagator::tle(&loc, dt, orbit)?
            }
        };

        let attitude = match settings.attitude {
            AttitudePropagatorType::Inertial => AttitudePropagator::inertial(&loc, dt),
            AttitudePropagatorType::Iterative => AttitudePropagator::iterative(&loc, dt),
            AttitudePropagatorType::Lvlh => AttitudePropagator::lvlh(&loc, dt),
            AttitudePropagatorType::Geo => AttitudePropagator::geo(&loc, dt),
            AttitudePropagatorType::Solar => {
                AttitudePropagator::solar(&loc, dt, settings.pointing())
            }
            AttitudePropagatorType::Target => {
                AttitudePropagator::target(&loc, dt, settings.pointing())
            }
        };

        let thermal = ThermalPropagator::new(loc.utc(), dt, settings.params.temp);
        let electrical = ElectricalPropagator::new(loc.utc(), dt, settings.params.battlev);
        let targets = settings.build_targets();
        let metrics = MetricGenerator::new(settings.sensors.clone())?;

        log::info!(
            "Spacecraft {} with {} position, {} attitude, forces {:?}, atmosphere {}",
            settings.structure.name(),
            position.kind().name(),
            attitude.kind().name(),
            forces.model_names(),
            atmosphere.name()
        );

        Ok(Self {
            settings,
            loc,
            phys,
            gravity,
            forces,
            atmosphere,
            position,
            attitude,
            thermal,
            electrical,
            targets,
            events: EventGenerator::new(),
            metrics,
            event_log: Vec::new(),
        })
    }

    /// Seed every propagator from its initial snapshot
    pub fn init(&mut self) -> PhysicsResult<()> {
        phys_calc(&self.loc, &mut self.phys, self.atmosphere.as_ref());
        self.thermal.init(&mut self.phys);
        self.electrical.init(&mut self.phys);

        let dynamics = Dynamics::new(&self.phys, &self.forces);
        self.position.init(&mut self.loc, &dynamics)?;
        self.update_targets();
        self.attitude
            .init(&mut self.loc, &self.phys, &self.targets)?;

        self.events.clear();
        self.event_log.clear();
        self.generate(false);
        Ok(())
    }

    /// Advance exactly one timestep
    pub fn step(&mut self) -> PhysicsResult<()> {
        phys_calc(&self.loc, &mut self.phys, self.atmosphere.as_ref());
        self.thermal.step(&mut self.phys);
        self.electrical.step(&mut self.phys);

        let dynamics = Dynamics::new(&self.phys, &self.forces);
        self.position.step(&mut self.loc, &dynamics)?;
        self.update_targets();
        self.attitude
            .step(&mut self.loc, &self.phys, &self.targets)?;

        self.generate(false);
        Ok(())
    }

    /// Step until within half a step of `target_utc`; returns the step count
    pub fn propagate(&mut self, target_utc: f64) -> PhysicsResult<usize> {
        let mut steps = 0;
        while self.position.clock().before(target_utc) {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Re-initialize from the initial snapshot and propagate to `target_utc`
    pub fn reset(&mut self, target_utc: f64) -> PhysicsResult<usize> {
        self.loc = self.position.initial().clone();
        self.init()?;
        self.propagate(target_utc)
    }

    /// Close every open event at the current time
    pub fn finish(&mut self) -> &[Event] {
        self.generate(true);
        self.events.events()
    }

    fn update_targets(&mut self) {
        for target in self.targets.iter_mut() {
            target.update(&self.loc);
        }
    }

    fn generate(&mut self, force_end: bool) {
        let emitted = self.events.update(&self.loc, &self.targets, force_end);
        self.event_log.extend_from_slice(emitted);
        self.metrics.update(&self.loc, &self.targets);
    }

    pub fn utc(&self) -> f64 {
        self.loc.utc()
    }

    pub fn dt(&self) -> f64 {
        self.position.clock().dt()
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    pub fn phys(&self) -> &PhysicsState {
        &self.phys
    }

    /// Mutable physical state, for thrust and control torque commands
    pub fn phys_mut(&mut self) -> &mut PhysicsState {
        &mut self.phys
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn gravity(&self) -> &GravityModel {
        &self.gravity
    }

    pub fn position(&self) -> &PositionPropagator {
        &self.position
    }

    pub fn attitude(&self) -> &AttitudePropagator {
        &self.attitude
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Events emitted by the last step
    pub fn step_events(&self) -> &[Event] {
        self.events.events()
    }

    /// Every event since the last `init`
    pub fn event_log(&self) -> &[Event] {
        &self.event_log
    }

    /// Coverage percentage per target and sensor
    pub fn coverage(&self) -> &[Vec<f64>] {
        &self.metrics.coverage
    }

    pub fn metrics(&self) -> &MetricGenerator {
        &self.metrics
    }
}
