//! Photovoltaic generation and a single battery bank

use super::Clock;
use crate::physics::state::{BatteryStatus, PhysicsState};

/// Advances solar-cell output and battery charge
#[derive(Debug, Clone)]
pub struct ElectricalPropagator {
    clock: Clock,
    initial_charge: f64,
}

impl ElectricalPropagator {
    pub fn new(utc: f64, dt: f64, battlev: f64) -> Self {
        Self {
            clock: Clock::new(utc, dt),
            initial_charge: battlev,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn init(&mut self, phys: &mut PhysicsState) {
        self.clock.rewind();
        phys.battlev = self.initial_charge.clamp(0.0, phys.battcap);
        phys.powgen = generate(phys);
        phys.amp = 0.0;
        phys.batt_status = status(phys);
    }

    /// Advance one step using the irradiation and temperatures of this step
    pub fn step(&mut self, phys: &mut PhysicsState) {
        let dt = self.clock.dt();
        self.clock.tick();

        phys.powgen = generate(phys);
        let net = phys.powgen - phys.powuse;
        let (amp, loss) = if phys.volt > 0.0 {
            let amp = net / phys.volt;
            let resistance = if net >= 0.0 { phys.rin } else { phys.rout };
            (amp, amp * amp * resistance)
        } else {
            (0.0, 0.0)
        };

        let charge = phys.battlev + (net - loss) * dt;
        if charge > phys.battcap || charge < 0.0 {
            log::trace!("Battery clamped from {:.1} J", charge);
        }
        phys.battlev = charge.clamp(0.0, phys.battcap);
        phys.amp = amp;
        phys.batt_status = status(phys);
        log::trace!(
            "Electrical: gen {:.3} W, use {:.3} W, battery {:.1} J",
            phys.powgen,
            phys.powuse,
            phys.battlev
        );
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

/// Sum cell output over the exposed faces, recording it per face
fn generate(phys: &mut PhysicsState) -> f64 {
    let volt = phys.volt;
    let mut total = 0.0;
    for t in phys.structure.triangles.iter_mut() {
        t.power = if t.external.is_external() {
            t.pv_power()
        } else {
            0.0
        };
        t.volt = if t.power > 0.0 { volt } else { 0.0 };
        t.amp = if t.power > 0.0 && volt > 0.0 {
            -t.power / volt
        } else {
            0.0
        };
        total += t.power;
    }
    total
}

fn status(phys: &PhysicsState) -> BatteryStatus {
    if phys.powgen > phys.powuse {
        BatteryStatus::Charging
    } else {
        BatteryStatus::Discharging
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::state::PhysicsParams;
    use crate::physics::structure::{Material, Structure, StructureType};

    fn cube(params: &PhysicsParams) -> PhysicsState {
        let material = Material::default().with_cells(0.8);
        let structure = Structure::setup(StructureType::U1, &material, 1.0).unwrap();
        PhysicsState::phys_setup(structure, params).unwrap()
    }

    #[test]
    fn test_eclipse_discharges() {
        let params = PhysicsParams {
            battlev: 1000.0,
            ..Default::default()
        };
        let mut phys = cube(&params);
        let mut prop = ElectricalPropagator::new(60000.0, 10.0, phys.battlev);
        prop.init(&mut phys);
        prop.step(&mut phys);

        let amp = params.powuse / params.volt;
        let expected = 1000.0 - (params.powuse + amp * amp * params.rout) * 10.0;
        assert!((phys.battlev - expected).abs() < 1e-9);
        assert_eq!(phys.batt_status, BatteryStatus::Discharging);
        assert!(phys.amp < 0.0);
    }

    #[test]
    fn test_sunlit_cells_charge_and_clamp() {
        let params = PhysicsParams {
            battcap: 100.0,
            battlev: 99.0,
            powuse: 0.0,
            ..Default::default()
        };
        let mut phys = cube(&params);
        for t in phys.structure.triangles.iter_mut() {
            if t.normal.x > 0.9 {
                t.sirradiation = 1366.0;
            }
        }
        let mut prop = ElectricalPropagator::new(60000.0, 10.0, phys.battlev);
        prop.init(&mut phys);
        prop.step(&mut phys);

        // 0.8 × 0.01 m² × (0.25 − 0.0004 × 300) × 1366 W/m²
        let expected = 0.8 * 0.01 * (0.25 - 0.0004 * 300.0) * 1366.0;
        assert!((phys.powgen - expected).abs() / expected < 1e-9);
        assert_eq!(phys.batt_status, BatteryStatus::Charging);
        assert_eq!(phys.battlev, 100.0);
    }

    #[test]
    fn test_empty_battery_stays_at_zero() {
        let params = PhysicsParams {
            battlev: 0.0,
            ..Default::default()
        };
        let mut phys = cube(&params);
        let mut prop = ElectricalPropagator::new(60000.0, 10.0, 0.0);
        prop.init(&mut phys);
        prop.propagate(&mut phys, 60000.0 + 0.01);
        assert_eq!(phys.battlev, 0.0);
    }
}
