use super::GAS_CONSTANT;
use serde::{Deserialize, Serialize};

/// Equilibrium state of the ideal gas.
///
/// Pressure is given in kPa and volume in L, so that `P·V` is an energy in J
/// and the temperature follows from the ideal gas law without conversion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatePoint {
    pub pressure: f64,
    pub volume: f64,
    pub temperature: f64,
}

impl StatePoint {
    pub fn new(pressure: f64, volume: f64, moles: f64) -> Self {
        Self {
            pressure,
            volume,
            temperature: pressure * volume / (moles * GAS_CONSTANT),
        }
    }

    /// Amount of substance consistent with the stored temperature.
    pub fn moles(&self) -> f64 {
        self.pressure * self.volume / (self.temperature * GAS_CONSTANT)
    }

    /// Product `P·V` in J.
    pub fn pv(&self) -> f64 {
        self.pressure * self.volume
    }

    pub fn is_physical(&self) -> bool {
        [self.pressure, self.volume, self.temperature]
            .iter()
            .all(|x| x.is_finite() && *x > 0.0)
    }

    /// Sum of the relative changes in pressure and volume between two states.
    pub fn relative_distance(&self, other: &Self) -> f64 {
        (other.pressure - self.pressure).abs() / self.pressure
            + (other.volume - self.volume).abs() / self.volume
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ideal_gas() {
        let state = StatePoint::new(120.0, 40.0, 1.0);
        assert_relative_eq!(state.temperature, 4800.0 / GAS_CONSTANT);
        assert_relative_eq!(state.moles(), 1.0, max_relative = 1e-12);

        let state = StatePoint::new(200.0, 50.0, 2.5);
        assert_relative_eq!(state.temperature * 2.5 * GAS_CONSTANT, 10000.0);
        assert!(state.is_physical());
        assert!(!StatePoint::new(-1.0, 50.0, 1.0).is_physical());
    }
}
