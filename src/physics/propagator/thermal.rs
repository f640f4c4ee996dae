//! Lumped thermal model over the mesh

use super::Clock;
use crate::physics::constants::SIGMA;
use crate::physics::state::PhysicsState;

/// Absorptivity assumed for the solar-cell covered part of a face
pub const CELL_ABSORPTIVITY: f64 = 0.7;
/// Multiplier on radiated infrared
pub const EMISSION_FACTOR: f64 = 1.05;
/// Multiplier on absorbed Earth infrared
pub const EARTH_IR_FACTOR: f64 = 1.95;
/// Relaxation constant for conduction towards the mean body temperature
const CONDUCTION_SCALE: f64 = 100_000.0;

/// Advances per-triangle heat content and temperature
#[derive(Debug, Clone)]
pub struct ThermalPropagator {
    clock: Clock,
    initial_temp: f64,
}

impl ThermalPropagator {
    pub fn new(utc: f64, dt: f64, temp: f64) -> Self {
        Self {
            clock: Clock::new(utc, dt),
            initial_temp: temp,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Put every triangle at the initial temperature
    pub fn init(&mut self, phys: &mut PhysicsState) {
        self.clock.rewind();
        for t in phys.structure.triangles.iter_mut() {
            t.temp = self.initial_temp;
            t.heat = t.heat_capacity() * self.initial_temp;
        }
        phys.heat = phys.total_heat();
        phys.temp = self.initial_temp;
    }

    /// Advance one step using the irradiation left by `phys_calc`
    pub fn step(&mut self, phys: &mut PhysicsState) {
        let dt = self.clock.dt();
        self.clock.tick();

        let mean_temp = if phys.hcap > 0.0 {
            phys.total_heat() / phys.hcap
        } else {
            0.0
        };

        let mut exchanged = 0.0;
        for t in phys.structure.triangles.iter_mut() {
            let dheat = (t.temp - mean_temp) / CONDUCTION_SCALE * t.heat;
            t.heat -= dheat;
            exchanged += dheat;

            if !t.external.is_external() {
                continue;
            }
            let m = &t.material;
            if t.sirradiation > 0.0 {
                let absorptance = (1.0 - m.pcell) * m.abs + m.pcell * CELL_ABSORPTIVITY;
                t.heat += (t.sirradiation * t.area * absorptance - t.pv_power()) * dt;
            }
            if t.eirradiation > 0.0 {
                t.heat += EARTH_IR_FACTOR * m.emi * t.area * t.eirradiation * dt;
            }
            t.heat -= EMISSION_FACTOR * m.emi * t.area * SIGMA * t.temp.powi(4) * dt;
        }

        let mass = phys.mass;
        let mut total = 0.0;
        for t in phys.structure.triangles.iter_mut() {
            if mass > 0.0 {
                t.heat += exchanged * t.mass / mass;
            }
            let capacity = t.heat_capacity();
            t.temp = if capacity > 0.0 { t.heat / capacity } else { 0.0 };
            total += t.heat;
        }

        phys.heat = total;
        phys.temp = if phys.hcap > 0.0 { total / phys.hcap } else { 0.0 };
        log::trace!("Thermal: {:.3} J, {:.2} K", phys.heat, phys.temp);
    }

    /// Step until within half a step of `target_utc`
    pub fn propagate(&mut self, phys: &mut PhysicsState, target_utc: f64) -> usize {
        let mut steps = 0;
        while self.clock.before(target_utc) {
            self.step(phys);
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self, phys: &mut PhysicsState, target_utc: f64) -> usize {
        self.init(phys);
        self.propagate(phys, target_utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::state::PhysicsParams;
    use crate::physics::structure::{Material, Structure, StructureType};

    fn cube(material: Material) -> PhysicsState {
        let structure = Structure::setup(StructureType::U1, &material, 1.0).unwrap();
        PhysicsState::phys_setup(structure, &PhysicsParams::default()).unwrap()
    }

    #[test]
    fn test_heat_conserved_without_flux() {
        let material = Material {
            emi: 0.0,
            ..Default::default()
        };
        let mut phys = cube(material);
        let mut prop = ThermalPropagator::new(60000.0, 10.0, 300.0);
        prop.init(&mut phys);

        // Uneven start so conduction actually moves heat around
        for (i, t) in phys.structure.triangles.iter_mut().enumerate() {
            t.temp = 250.0 + 10.0 * (i % 7) as f64;
            t.heat = t.heat_capacity() * t.temp;
        }
        let before = phys.total_heat();

        for _ in 0..100 {
            prop.step(&mut phys);
        }
        assert!((phys.heat - before).abs() / before < 1e-6);
    }

    #[test]
    fn test_radiator_cools() {
        let mut phys = cube(Material::default());
        let mut prop = ThermalPropagator::new(60000.0, 10.0, 300.0);
        prop.init(&mut phys);
        prop.propagate(&mut phys, 60000.0 + 600.0 / 86400.0);

        assert!(phys.temp < 300.0);
        let expected_loss =
            EMISSION_FACTOR * 0.88 * phys.area * SIGMA * 300f64.powi(4) * 10.0;
        assert!(phys.temp > 300.0 - 61.0 * expected_loss / phys.hcap);
    }

    #[test]
    fn test_sunlit_face_warms() {
        let mut phys = cube(Material {
            emi: 0.0,
            ..Default::default()
        });
        let mut prop = ThermalPropagator::new(60000.0, 10.0, 300.0);
        prop.init(&mut phys);
        for t in phys.structure.triangles.iter_mut() {
            if t.normal.z > 0.9 {
                t.sirradiation = 1366.0;
            }
        }
        let before = phys.heat;
        prop.step(&mut phys);
        let top: f64 = phys
            .structure
            .triangles
            .iter()
            .filter(|t| t.normal.z > 0.9)
            .map(|t| t.area)
            .sum();
        let gain = 1366.0 * top * 0.88 * 10.0;
        assert!((phys.heat - before - gain).abs() / gain < 1e-9);
    }

    #[test]
    fn test_reset_restores_temperature() {
        let mut phys = cube(Material::default());
        let mut prop = ThermalPropagator::new(60000.0, 10.0, 290.0);
        prop.init(&mut phys);
        prop.propagate(&mut phys, 60000.0 + 0.01);
        assert!(phys.temp < 290.0);
        prop.reset(&mut phys, 60000.0);
        assert!((phys.temp - 290.0).abs() < 1e-9);
    }
}
