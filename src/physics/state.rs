//! Whole-body physical state of one spacecraft
//!
//! Mass properties are fixed at setup; the force/torque accumulators and the
//! energy fields change every step.

use super::error::PhysicsResult;
use super::structure::{MassProperties, Structure};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Inputs to [`PhysicsState::phys_setup`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Initial temperature (K)
    pub temp: f64,
    /// Battery capacity (J)
    pub battcap: f64,
    /// Initial battery charge (J)
    pub battlev: f64,
    /// Nominal bus voltage (V)
    pub volt: f64,
    /// Battery charge resistance (Ω)
    pub rin: f64,
    /// Battery discharge resistance (Ω)
    pub rout: f64,
    /// Constant device load (W)
    pub powuse: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            temp: 300.0,
            battcap: 36_000.0,
            battlev: 36_000.0,
            volt: 8.4,
            rin: 0.1,
            rout: 0.1,
            powuse: 2.0,
        }
    }
}

/// Battery charge direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BatteryStatus {
    #[default]
    Charging,
    Discharging,
}

/// Aggregate state over the whole structure
#[derive(Debug, Clone)]
pub struct PhysicsState {
    pub structure: Structure,

    /// Total mass (kg)
    pub mass: f64,
    /// Centre of mass in the construction frame (m)
    pub com: Vector3<f64>,
    /// Principal moments of inertia (kg m²)
    pub moi: Vector3<f64>,
    /// Total area (m²)
    pub area: f64,
    /// Total heat capacity (J/K)
    pub hcap: f64,
    /// Mean temperature (K)
    pub temp: f64,
    /// Total heat content (J)
    pub heat: f64,

    /// Drag acceleration, body frame (m/s²)
    pub adrag: Vector3<f64>,
    /// Drag torque per unit mass, body frame
    pub atorque: Vector3<f64>,
    /// Radiation pressure acceleration, body frame (m/s²)
    pub rdrag: Vector3<f64>,
    /// Radiation pressure torque per unit mass, body frame
    pub rtorque: Vector3<f64>,
    /// Fictitious acceleration injected by the caller, body frame (m/s²)
    pub fdrag: Vector3<f64>,
    /// Thrust, body frame (N)
    pub thrust: Vector3<f64>,
    /// Control torque, body frame (N m)
    pub ctorque: Vector3<f64>,
    /// Stored angular momentum of wheels, body frame (N m s)
    pub hmomentum: Vector3<f64>,

    /// Battery capacity (J)
    pub battcap: f64,
    /// Battery charge (J)
    pub battlev: f64,
    /// Power generated this step (W)
    pub powgen: f64,
    /// Power drawn by devices (W)
    pub powuse: f64,
    /// Bus voltage (V)
    pub volt: f64,
    /// Battery current (A), positive while charging
    pub amp: f64,
    pub rin: f64,
    pub rout: f64,
    pub batt_status: BatteryStatus,
}

impl PhysicsState {
    /// Derive mass properties from a finished structure and seed energy fields
    pub fn phys_setup(mut structure: Structure, params: &PhysicsParams) -> PhysicsResult<Self> {
        let MassProperties {
            mass,
            com,
            moi,
            heat_capacity,
            area,
        } = structure.mass_properties()?;

        for t in &mut structure.triangles {
            t.temp = params.temp;
            t.heat = t.heat_capacity() * params.temp;
        }

        let mut state = Self {
            structure,
            mass,
            com,
            moi,
            area,
            hcap: heat_capacity,
            temp: params.temp,
            heat: 0.0,
            adrag: Vector3::zeros(),
            atorque: Vector3::zeros(),
            rdrag: Vector3::zeros(),
            rtorque: Vector3::zeros(),
            fdrag: Vector3::zeros(),
            thrust: Vector3::zeros(),
            ctorque: Vector3::zeros(),
            hmomentum: Vector3::zeros(),
            battcap: params.battcap,
            battlev: params.battlev.clamp(0.0, params.battcap),
            powgen: 0.0,
            powuse: params.powuse,
            volt: params.volt,
            amp: 0.0,
            rin: params.rin,
            rout: params.rout,
            batt_status: BatteryStatus::Charging,
        };
        state.heat = state.total_heat();
        log::info!(
            "Physics state: {:.3} kg, moi [{:.4}, {:.4}, {:.4}] kg m², {:.1} K",
            state.mass,
            state.moi.x,
            state.moi.y,
            state.moi.z,
            state.temp
        );
        Ok(state)
    }

    /// Sum of per-triangle heat content (J)
    pub fn total_heat(&self) -> f64 {
        self.structure.triangles.iter().map(|t| t.heat).sum()
    }

    /// Clear the surface force and torque accumulators
    pub fn reset_accumulators(&mut self) {
        self.adrag = Vector3::zeros();
        self.atorque = Vector3::zeros();
        self.rdrag = Vector3::zeros();
        self.rtorque = Vector3::zeros();
    }

    /// Total body-frame acceleration from surface forces, fictitious forces and thrust
    pub fn body_acceleration(&self) -> Vector3<f64> {
        self.adrag + self.rdrag + self.fdrag + self.thrust / self.mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::structure::{Material, StructureType};

    #[test]
    fn test_setup_seeds_heat() {
        let material = Material::default();
        let structure = Structure::setup(StructureType::U1, &material, 1.0).unwrap();
        let params = PhysicsParams {
            temp: 280.0,
            ..Default::default()
        };
        let state = PhysicsState::phys_setup(structure, &params).unwrap();
        let expected = 1.0 * material.hcap * 280.0;
        assert!((state.heat - expected).abs() / expected < 1e-12);
        assert!((state.hcap - material.hcap).abs() < 1e-9);
    }

    #[test]
    fn test_battery_clamped_on_setup() {
        let structure = Structure::setup(StructureType::U1, &Material::default(), 1.0).unwrap();
        let params = PhysicsParams {
            battcap: 100.0,
            battlev: 500.0,
            ..Default::default()
        };
        let state = PhysicsState::phys_setup(structure, &params).unwrap();
        assert_eq!(state.battlev, 100.0);
    }
}
