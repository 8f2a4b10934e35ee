use super::{Cycle, CycleKind};
use crate::process::{PointGenerator, ProcessType, StatePoint};
use crate::settings::GeneratorSettings;
use crate::solver::IntersectionSolver;
use crate::CycleError;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Reasons for discarding a cycle candidate. These never leave the builder.
#[derive(Debug, Error)]
enum Rejection {
    #[error("no valid state found for process {0}")]
    PointGeneration(usize),
    #[error("no state closes the cycle")]
    NoClosure,
    #[error("closing state ({0:.1} kPa, {1:.1} L) is out of bounds")]
    ClosureOutOfBounds(f64, f64),
    #[error(transparent)]
    Invalid(#[from] CycleError),
}

/// Summary of a call to [CycleBuilder::generate_with_stats].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub attempts: usize,
    pub used_fallback: bool,
}

fn sample<R: Rng + ?Sized>(rng: &mut R, [lo, hi]: [f64; 2]) -> f64 {
    if lo < hi {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Generates random, physically consistent cycles.
///
/// The builder holds no state besides its settings; every call returns a new cycle.
#[derive(Clone, Debug, Default)]
pub struct CycleBuilder {
    settings: GeneratorSettings,
}

impl CycleBuilder {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn generate(&self, kind: CycleKind) -> Cycle {
        self.generate_with_rng(kind, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(&self, kind: CycleKind, rng: &mut R) -> Cycle {
        self.generate_with_stats(kind, rng).0
    }

    /// Generates a cycle of the given kind.
    ///
    /// Candidates are generated from scratch until one passes validation. After
    /// `max_cycle_attempts` failures, [Cycle::safe_fallback] is returned.
    pub fn generate_with_stats<R: Rng + ?Sized>(
        &self,
        kind: CycleKind,
        rng: &mut R,
    ) -> (Cycle, GenerationStats) {
        let max_attempts = self.settings.max_cycle_attempts;
        for attempt in 1..=max_attempts {
            match self.try_generate(kind, rng) {
                Ok(cycle) => {
                    tracing::debug!(%kind, attempt, points = cycle.len(), "generated cycle");
                    let stats = GenerationStats {
                        attempts: attempt,
                        used_fallback: false,
                    };
                    return (cycle, stats);
                }
                Err(rejection) => {
                    tracing::debug!(%kind, attempt, %rejection, "rejected cycle candidate")
                }
            }
        }
        tracing::warn!(%kind, max_attempts, "cycle generation failed, using fallback cycle");
        let stats = GenerationStats {
            attempts: max_attempts,
            used_fallback: true,
        };
        (Cycle::safe_fallback(), stats)
    }

    /// Random sequence of processes without two equal neighbors (also across the
    /// boundary of the cycle).
    pub fn choose_processes<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ProcessType> {
        let lengths = self.settings.points.clone();
        let n = if lengths.is_empty() {
            *lengths.start()
        } else {
            rng.gen_range(lengths)
        };
        let mut processes: Vec<ProcessType> = Vec::with_capacity(n);
        for i in 0..n {
            let candidates: Vec<_> = ProcessType::ALL
                .into_iter()
                .filter(|p| processes.last() != Some(p))
                .filter(|p| i + 1 < n || processes.first() != Some(p))
                .collect();
            if let Some(&process) = candidates.choose(rng) {
                processes.push(process);
            }
        }
        debug_assert!(n < 2 || processes.iter().circular_tuple_windows().all(|(a, b)| a != b));
        processes
    }

    fn try_generate<R: Rng + ?Sized>(
        &self,
        kind: CycleKind,
        rng: &mut R,
    ) -> Result<Cycle, Rejection> {
        let processes = match kind.processes() {
            Some(processes) => processes.to_vec(),
            None => self.choose_processes(rng),
        };
        let n = processes.len();
        if n < 3 {
            return Err(CycleError::InvalidLength(n).into());
        }

        let moles = sample(
            rng,
            [*self.settings.moles.start(), *self.settings.moles.end()],
        );
        let bounds = self.settings.initial_bounds;
        let first = StatePoint::new(
            sample(rng, bounds.pressure),
            sample(rng, bounds.volume),
            moles,
        );

        // Interior points
        let generator = PointGenerator::from(&self.settings);
        let mut states = vec![first];
        for (i, &process) in processes[..n - 2].iter().enumerate() {
            let next = generator
                .generate_next(&states[i], process, moles, rng)
                .ok_or(Rejection::PointGeneration(i))?;
            states.push(next);
        }

        // The second-to-last process has to be feasible on its own before it is
        // intersected with the last process through the first point.
        let penultimate = states[n - 2];
        generator
            .generate_next(&penultimate, processes[n - 2], moles, rng)
            .ok_or(Rejection::PointGeneration(n - 2))?;

        // Closing point
        let solver =
            IntersectionSolver::new(self.settings.grid_resolution, self.settings.tolerances);
        let last = solver
            .solve(&penultimate, &first, processes[n - 2], processes[n - 1])
            .ok_or(Rejection::NoClosure)?;
        let last = StatePoint::new(last.pressure, last.volume, moles);
        if !self.settings.physical_bounds.contains(&last) {
            return Err(Rejection::ClosureOutOfBounds(last.pressure, last.volume));
        }
        states.push(last);

        // Validation
        let cycle = Cycle::assemble(moles, &states, &processes);
        cycle.verify_with(&self.settings.physical_bounds, &self.settings.tolerances)?;
        Ok(cycle)
    }
}
