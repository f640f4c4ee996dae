//! spacephys - spacecraft physics propagation
//!
//! Orbit, attitude, thermal and electrical simulation of a single spacecraft,
//! with ground-station events and sensor coverage.

pub mod physics;
