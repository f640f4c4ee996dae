//! Spacecraft physics propagation
//!
//! Advances one spacecraft's orbit, attitude, temperature and battery charge
//! in fixed timesteps.
//!
//! # Architecture
//!
//! - **Location**: time plus every position and attitude frame, kept
//!   consistent on each write
//! - **Structure / PhysicsState**: triangulated mesh with frozen geometry and
//!   per-step energy fields
//! - **ForceModel**: Earth gravity field, Sun and Moon, and the surface forces
//!   accumulated by `phys_calc`
//! - **Propagators**: one per physical quantity, sharing a fixed-step `Clock`
//! - **State**: owns one spacecraft and steps everything in order
//!
//! # Example
//!
//! ```ignore
//! use spacephys::physics::*;
//!
//! let orbit = OrbitDefinition::parse(
//!     r#"{"eci":{"utc":60000,"x":7000000,"y":0,"z":0,"vx":0,"vy":7500,"vz":0}}"#,
//! )?;
//! let mut state = State::new(PhysicsSettings::default(), &orbit)?;
//! state.init()?;
//! state.propagate(60000.0 + 1.0)?;
//! let events = state.finish();
//! ```

pub mod atmosphere;
pub mod constants;
pub mod error;
pub mod events;
pub mod forces;
pub mod gravity;
pub mod kepler;
pub mod location;
pub mod metrics;
pub mod orbit_def;
pub mod propagator;
pub mod settings;
pub mod simulation;
pub mod state;
pub mod structure;
pub mod target;
pub mod time;

pub use atmosphere::{AtmosphereModel, AtmosphereModelType};
pub use error::{PhysicsError, PhysicsResult};
pub use events::{Event, EventGenerator, EventKind};
pub use forces::{att_accel, phys_calc, pos_accel, CompositeForce, ForceModel};
pub use gravity::{gravity_accel, GravityModel, GravityModelId};
pub use location::{Cartesian, Geodetic, Location, QAtt};
pub use metrics::{MetricGenerator, Sensor};
pub use orbit_def::{load_loc, OrbitDefinition};
pub use propagator::{
    AttitudePropagator, Clock, ElectricalPropagator, GaussJackson, PositionPropagator,
    ThermalPropagator,
};
pub use settings::{AttitudePropagatorType, PhysicsSettings, PositionPropagatorType};
pub use simulation::State;
pub use state::{BatteryStatus, PhysicsParams, PhysicsState};
pub use structure::{Material, Structure, StructureType};
pub use target::{Target, TargetKind};
