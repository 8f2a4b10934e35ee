use super::{ProcessType, StatePoint, CP, CV, GAS_CONSTANT};
use crate::cycle::Cycle;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Energy balance of a single process.
///
/// Energies are given in J and the entropy change in J/K. `work` is the work done by the
/// gas, so that `heat = internal_energy + work` holds for every process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessQuantities {
    #[serde(rename = "heat [J]")]
    pub heat: f64,
    #[serde(rename = "work [J]")]
    pub work: f64,
    #[serde(rename = "internal_energy [J]")]
    pub internal_energy: f64,
    #[serde(rename = "enthalpy [J]")]
    pub enthalpy: f64,
    #[serde(rename = "entropy [J/K]")]
    pub entropy: f64,
}

impl Add for ProcessQuantities {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            heat: self.heat + rhs.heat,
            work: self.work + rhs.work,
            internal_energy: self.internal_energy + rhs.internal_energy,
            enthalpy: self.enthalpy + rhs.enthalpy,
            entropy: self.entropy + rhs.entropy,
        }
    }
}

impl ProcessQuantities {
    pub fn new(process: ProcessType, [s1, s2]: [&StatePoint; 2], moles: f64) -> Self {
        let dt = s2.temperature - s1.temperature;
        let dv = s2.volume - s1.volume;
        let internal_energy = moles * CV * dt;
        let enthalpy = moles * CP * dt;
        match process {
            ProcessType::Adiabatic => Self {
                heat: 0.0,
                work: -internal_energy,
                internal_energy,
                enthalpy,
                entropy: 0.0,
            },
            ProcessType::Isochoric => Self {
                heat: internal_energy,
                work: 0.0,
                internal_energy,
                enthalpy,
                entropy: moles * CV * (s2.temperature / s1.temperature).ln(),
            },
            ProcessType::Isothermal => {
                let work = moles * GAS_CONSTANT * s1.temperature * (s2.volume / s1.volume).ln();
                Self {
                    heat: work,
                    work,
                    internal_energy: 0.0,
                    enthalpy: 0.0,
                    entropy: work / s1.temperature,
                }
            }
            ProcessType::Isobaric => Self {
                heat: enthalpy,
                work: s1.pressure * dv,
                internal_energy,
                enthalpy,
                entropy: moles * CP * (s2.temperature / s1.temperature).ln(),
            },
            // Trapezoidal work; enthalpy and entropy are the usual classroom approximations
            ProcessType::LinearPV => {
                let work = 0.5 * (s1.pressure + s2.pressure) * dv;
                let heat = internal_energy + work;
                Self {
                    heat,
                    work,
                    internal_energy,
                    enthalpy: internal_energy + s1.pressure * dv,
                    entropy: heat / (0.5 * (s1.temperature + s2.temperature)),
                }
            }
        }
    }
}

/// Energy balances of all processes of a cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleQuantities {
    pub per_process: Vec<ProcessQuantities>,
    pub totals: ProcessQuantities,
}

impl CycleQuantities {
    /// Net work done by the gas divided by the heat absorbed.
    ///
    /// Negative for cycles that run counterclockwise in the P-V plane.
    pub fn efficiency(&self) -> Option<f64> {
        let heat_in: f64 = self
            .per_process
            .iter()
            .map(|q| q.heat)
            .filter(|&q| q > 0.0)
            .sum();
        (heat_in > 0.0).then(|| self.totals.work / heat_in)
    }
}

/// Evaluates heat, work and changes of state functions for every process of `cycle`.
///
/// The totals of the state functions are exactly zero for a closed cycle and are reported
/// as such, independent of round-off in the individual contributions.
pub fn compute_quantities(cycle: &Cycle) -> CycleQuantities {
    let per_process: Vec<_> = cycle
        .transitions()
        .map(|(s1, s2, process)| ProcessQuantities::new(process, [s1, s2], cycle.moles()))
        .collect();
    let sum = per_process
        .iter()
        .fold(ProcessQuantities::default(), |acc, &q| acc + q);
    let totals = ProcessQuantities {
        internal_energy: 0.0,
        enthalpy: 0.0,
        entropy: 0.0,
        ..sum
    };
    CycleQuantities {
        per_process,
        totals,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::process::GAMMA;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle() {
        let cycle = Cycle::safe_fallback();
        let quantities = compute_quantities(&cycle);
        let expected = [
            (7500.0, 3000.0, 4500.0, 7500.0),
            (12000.0, 0.0, 12000.0, 20000.0),
            (-15000.0, -6000.0, -9000.0, -15000.0),
            (-7500.0, 0.0, -7500.0, -12500.0),
        ];
        for (q, (heat, work, u, h)) in quantities.per_process.iter().zip(expected) {
            assert_relative_eq!(q.heat, heat, max_relative = 1e-10);
            assert_relative_eq!(q.work, work, max_relative = 1e-10);
            assert_relative_eq!(q.internal_energy, u, max_relative = 1e-10);
            assert_relative_eq!(q.enthalpy, h, max_relative = 1e-10);
        }
        assert_relative_eq!(quantities.totals.work, -3000.0, max_relative = 1e-10);
        assert_relative_eq!(quantities.totals.heat, -3000.0, max_relative = 1e-10);
        assert_eq!(quantities.totals.internal_energy, 0.0);
        assert_eq!(quantities.totals.enthalpy, 0.0);
        assert_eq!(quantities.totals.entropy, 0.0);
        assert_relative_eq!(
            quantities.efficiency().unwrap(),
            -3000.0 / 19500.0,
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_isothermal() {
        let s1 = StatePoint::new(100.0, 20.0, 1.0);
        let s2 = StatePoint::new(50.0, 40.0, 1.0);
        let q = ProcessQuantities::new(ProcessType::Isothermal, [&s1, &s2], 1.0);
        assert_relative_eq!(q.work, 2000.0 * 2.0f64.ln(), max_relative = 1e-12);
        assert_relative_eq!(q.heat, q.work);
        assert_relative_eq!(q.entropy, GAS_CONSTANT * 2.0f64.ln(), max_relative = 1e-12);
        assert_eq!(q.internal_energy, 0.0);
    }

    #[test]
    fn test_adiabatic() {
        let s1 = StatePoint::new(100.0, 50.0, 2.0);
        let s2 = StatePoint::new(100.0 * 0.5f64.powf(GAMMA), 100.0, 2.0);
        let q = ProcessQuantities::new(ProcessType::Adiabatic, [&s1, &s2], 2.0);
        assert_eq!(q.heat, 0.0);
        assert_eq!(q.entropy, 0.0);
        // reversible adiabatic work equals (P1 V1 - P2 V2) / (gamma - 1)
        assert_relative_eq!(q.work, 1.5 * (s1.pv() - s2.pv()), max_relative = 1e-12);
        assert_relative_eq!(q.heat, q.internal_energy + q.work);
    }

    #[test]
    fn test_idempotent() {
        let cycle = Cycle::safe_fallback();
        assert_eq!(compute_quantities(&cycle), compute_quantities(&cycle));
    }
}
