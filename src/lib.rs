#![warn(clippy::all)]
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

pub mod cycle;
pub mod process;
pub mod settings;
pub mod solver;
pub use cycle::{Cycle, CycleBuilder, CycleKind, CyclePoint, GenerationStats};
pub use process::{
    compute_quantities, CycleQuantities, PointGenerator, ProcessQuantities, ProcessType,
    StatePoint,
};
pub use settings::{Bounds, GeneratorSettings, Tolerances};
pub use solver::{solve_closure, IntersectionSolver};

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("a cycle consists of 3 to 5 points, got {0}")]
    InvalidLength(usize),
    #[error("invalid number of moles: {0}")]
    InvalidMoleCount(f64),
    #[error("the successors of point {0} do not form a single loop")]
    BrokenChain(usize),
    #[error("process {1} is repeated at point {0}")]
    RepeatedProcess(usize, ProcessType),
    #[error("point {0} ({1} kPa, {2} L) is out of bounds")]
    OutOfBounds(usize, f64, f64),
    #[error("temperature of point {0} does not match the ideal gas law")]
    InconsistentTemperature(usize),
    #[error("process {0} connects a state with itself")]
    DegenerateProcess(usize),
    #[error("process {0} is not {1} (relative error {2:.3e})")]
    ProcessLawViolated(usize, ProcessType, f64),
    #[error("{0} points but {1} processes")]
    MismatchedProcesses(usize, usize),
    #[error("the cycle is not a {0} cycle")]
    KindMismatch(CycleKind),
    #[error("unknown cycle kind: {0}")]
    UnknownCycleKind(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CycleResult<T> = Result<T, CycleError>;

/// Generates a random cycle of the given kind with the default settings.
pub fn generate_cycle(kind: CycleKind) -> Cycle {
    CycleBuilder::default().generate(kind)
}

#[derive(Serialize, Deserialize)]
struct ExerciseJSON {
    kind: CycleKind,
    cycle: Cycle,
    #[serde(default)]
    answers: IndexMap<String, f64>,
}

/// A cycle handed out as an exercise together with the answers given so far.
///
/// The processes of the cycle always follow `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExerciseJSON")]
#[serde(into = "ExerciseJSON")]
pub struct Exercise {
    kind: CycleKind,
    cycle: Cycle,
    pub answers: IndexMap<String, f64>,
}

impl TryFrom<ExerciseJSON> for Exercise {
    type Error = CycleError;

    fn try_from(exercise: ExerciseJSON) -> CycleResult<Self> {
        let mut result = Self::new(exercise.kind, exercise.cycle)?;
        result.answers = exercise.answers;
        Ok(result)
    }
}

impl From<Exercise> for ExerciseJSON {
    fn from(exercise: Exercise) -> Self {
        Self {
            kind: exercise.kind,
            cycle: exercise.cycle,
            answers: exercise.answers,
        }
    }
}

impl Exercise {
    pub fn new(kind: CycleKind, cycle: Cycle) -> CycleResult<Self> {
        if !kind.matches(&cycle) {
            return Err(CycleError::KindMismatch(kind));
        }
        Ok(Self {
            kind,
            cycle,
            answers: IndexMap::new(),
        })
    }

    /// Generates a new exercise. If generation falls back to the safe cycle, the
    /// exercise is a random one.
    pub fn generate(kind: CycleKind) -> Self {
        let (cycle, stats) =
            CycleBuilder::default().generate_with_stats(kind, &mut rand::thread_rng());
        let kind = if stats.used_fallback {
            CycleKind::Random
        } else {
            kind
        };
        Self {
            kind,
            cycle,
            answers: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> CycleKind {
        self.kind
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn quantities(&self) -> CycleQuantities {
        compute_quantities(&self.cycle)
    }

    pub fn from_json<P: AsRef<Path>>(file: P) -> CycleResult<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(file)?))?)
    }

    pub fn to_json<P: AsRef<Path>>(&self, file: P) -> CycleResult<()> {
        Ok(serde_json::to_writer_pretty(
            BufWriter::new(File::create(file)?),
            self,
        )?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exercise() {
        let mut exercise = Exercise::new(CycleKind::Random, Cycle::safe_fallback()).unwrap();
        exercise.answers.insert("W_total".into(), -3000.0);
        exercise.answers.insert("Q_1".into(), 7500.0);
        let json = serde_json::to_string(&exercise).unwrap();
        let other: Exercise = serde_json::from_str(&json).unwrap();
        assert_eq!(exercise, other);
        assert_eq!(
            other.answers.keys().collect::<Vec<_>>(),
            vec!["W_total", "Q_1"]
        );
    }

    #[test]
    fn test_exercise_kind() {
        assert!(matches!(
            Exercise::new(CycleKind::Carnot, Cycle::safe_fallback()),
            Err(CycleError::KindMismatch(CycleKind::Carnot))
        ));

        let cycle = serde_json::to_string(&Cycle::safe_fallback()).unwrap();
        let json = format!(r#"{{"kind": "carnot", "cycle": {cycle}}}"#);
        assert!(serde_json::from_str::<Exercise>(&json).is_err());
        let json = format!(r#"{{"kind": "random", "cycle": {cycle}}}"#);
        let exercise: Exercise = serde_json::from_str(&json).unwrap();
        assert_eq!(exercise.kind(), CycleKind::Random);
        assert!(exercise.answers.is_empty());

        for kind in [CycleKind::Otto, CycleKind::Brayton] {
            let exercise = Exercise::generate(kind);
            assert!(exercise.kind().matches(exercise.cycle()));
        }
    }

    #[test]
    fn test_generate_cycle() {
        for kind in [CycleKind::Random, CycleKind::Carnot, CycleKind::Diesel] {
            generate_cycle(kind).verify().unwrap();
        }
    }

    #[test]
    fn test_error_message() {
        let error = "stirling".parse::<CycleKind>().unwrap_err();
        assert_eq!(error.to_string(), "unknown cycle kind: stirling");
    }
}
