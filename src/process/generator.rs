use super::{ProcessType, StatePoint, GAMMA, LAW_TOLERANCE};
use crate::settings::{Bounds, GeneratorSettings};
use rand::Rng;

/// Generates random states that are connected to a given state by a process.
#[derive(Clone, Debug)]
pub struct PointGenerator {
    pub bounds: Bounds,
    pub tolerance: f64,
    pub max_attempts: usize,
}

impl Default for PointGenerator {
    fn default() -> Self {
        Self::from(&GeneratorSettings::default())
    }
}

impl From<&GeneratorSettings> for PointGenerator {
    fn from(settings: &GeneratorSettings) -> Self {
        Self {
            bounds: settings.physical_bounds,
            tolerance: settings.tolerances.law,
            max_attempts: settings.max_point_attempts,
        }
    }
}

fn perturb<R: Rng + ?Sized>(rng: &mut R, value: f64, [lo, hi]: [f64; 2]) -> f64 {
    let factor = rng.gen_range(lo..=hi);
    if rng.gen_bool(0.5) {
        value * (1.0 + factor)
    } else {
        value * (1.0 - factor)
    }
}

impl PointGenerator {
    pub fn new(bounds: Bounds, tolerance: f64, max_attempts: usize) -> Self {
        Self {
            bounds,
            tolerance,
            max_attempts,
        }
    }

    /// Generator that accepts transitions within [LAW_TOLERANCE].
    pub fn strict(bounds: Bounds, max_attempts: usize) -> Self {
        Self::new(bounds, LAW_TOLERANCE, max_attempts)
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        state: &StatePoint,
        process: ProcessType,
        moles: f64,
        rng: &mut R,
    ) -> StatePoint {
        let range = process.perturbation();
        let (pressure, volume) = match process {
            ProcessType::Adiabatic => {
                let k = state.pressure * state.volume.powf(GAMMA);
                let volume = perturb(rng, state.volume, range);
                (k / volume.powf(GAMMA), volume)
            }
            ProcessType::Isochoric => (perturb(rng, state.pressure, range), state.volume),
            ProcessType::Isothermal => {
                let volume = perturb(rng, state.volume, range);
                (state.pv() / volume, volume)
            }
            ProcessType::Isobaric => (state.pressure, perturb(rng, state.volume, range)),
            ProcessType::LinearPV => (
                perturb(rng, state.pressure, range),
                perturb(rng, state.volume, range),
            ),
        };
        StatePoint::new(pressure, volume, moles)
    }

    /// Returns a state that is reached from `start` by `process`.
    ///
    /// Returns `None` if no state within the bounds was found in `max_attempts` tries.
    pub fn generate_next<R: Rng + ?Sized>(
        &self,
        start: &StatePoint,
        process: ProcessType,
        moles: f64,
        rng: &mut R,
    ) -> Option<StatePoint> {
        (0..self.max_attempts)
            .map(|_| self.sample(start, process, moles, rng))
            .find(|end| {
                self.bounds.contains(end) && process.is_valid_within(start, end, self.tolerance)
            })
    }

    /// Returns a state from which `start` is reached by `process`.
    pub fn generate_previous<R: Rng + ?Sized>(
        &self,
        start: &StatePoint,
        process: ProcessType,
        moles: f64,
        rng: &mut R,
    ) -> Option<StatePoint> {
        (0..self.max_attempts)
            .map(|_| self.sample(start, process, moles, rng))
            .find(|previous| {
                self.bounds.contains(previous)
                    && process.is_valid_within(previous, start, self.tolerance)
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_next() {
        let generator = PointGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);
        let start = StatePoint::new(150.0, 60.0, 1.5);
        for process in ProcessType::ALL {
            for _ in 0..20 {
                let end = generator
                    .generate_next(&start, process, 1.5, &mut rng)
                    .unwrap();
                assert!(process.is_valid(&start, &end), "{process}");
                assert!(generator.bounds.contains(&end));
                assert!(start.relative_distance(&end) > 0.1);
            }
        }
    }

    #[test]
    fn test_generate_previous() {
        let generator = PointGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);
        let start = StatePoint::new(80.0, 40.0, 0.8);
        for process in ProcessType::ALL {
            let previous = generator
                .generate_previous(&start, process, 0.8, &mut rng)
                .unwrap();
            assert!(process.is_valid(&previous, &start), "{process}");
            assert!(generator.bounds.contains(&previous));
        }
    }

    #[test]
    fn test_exhausted() {
        let generator = PointGenerator::strict(Bounds::default(), 20);
        let mut rng = StdRng::seed_from_u64(0);
        // the pressure of an isobar starting outside the bounds cannot be corrected
        let start = StatePoint::new(400.0, 50.0, 1.0);
        assert!(generator
            .generate_next(&start, ProcessType::Isobaric, 1.0, &mut rng)
            .is_none());
    }
}
