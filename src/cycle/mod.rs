use crate::process::{ProcessPlot, ProcessType, StatePoint};
use crate::settings::{Bounds, Tolerances};
use crate::{CycleError, CycleResult};
use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

pub mod builder;
pub use builder::{CycleBuilder, GenerationStats};

/// Number of points a cycle consists of.
pub const CYCLE_LENGTHS: std::ops::RangeInclusive<usize> = 3..=5;

/// Type of cycle requested from the [CycleBuilder].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    #[default]
    Random,
    Carnot,
    Otto,
    Diesel,
    Rankine,
    Brayton,
}

impl CycleKind {
    /// Whether `cycle` runs through the processes of this kind. Every cycle is random.
    pub fn matches(&self, cycle: &Cycle) -> bool {
        self.processes()
            .map_or(true, |processes| cycle.processes().eq(processes))
    }

    /// Fixed sequence of processes for the named cycles.
    pub fn processes(&self) -> Option<[ProcessType; 4]> {
        use ProcessType::*;
        match self {
            Self::Random => None,
            Self::Carnot => Some([Isothermal, Adiabatic, Isothermal, Adiabatic]),
            Self::Otto => Some([Adiabatic, Isochoric, Adiabatic, Isochoric]),
            Self::Diesel => Some([Adiabatic, Isobaric, Adiabatic, Isochoric]),
            Self::Rankine => Some([Isochoric, Isobaric, Adiabatic, Isobaric]),
            Self::Brayton => Some([Adiabatic, Isobaric, Adiabatic, Isobaric]),
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Random => "random",
            Self::Carnot => "carnot",
            Self::Otto => "otto",
            Self::Diesel => "diesel",
            Self::Rankine => "rankine",
            Self::Brayton => "brayton",
        };
        write!(f, "{name}")
    }
}

impl FromStr for CycleKind {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "carnot" => Ok(Self::Carnot),
            "otto" => Ok(Self::Otto),
            "diesel" => Ok(Self::Diesel),
            "rankine" => Ok(Self::Rankine),
            "brayton" => Ok(Self::Brayton),
            _ => Err(CycleError::UnknownCycleKind(s.into())),
        }
    }
}

/// Point of a cycle together with the process that leaves it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CyclePoint {
    pub state: StatePoint,
    pub sequence_index: usize,
    pub next_index: usize,
    pub process: ProcessType,
}

#[derive(Serialize, Deserialize)]
struct CyclePointJSON {
    #[serde(rename = "pressure [kPa]")]
    pressure: f64,
    #[serde(rename = "volume [L]")]
    volume: f64,
    process: ProcessType,
    next: usize,
}

#[derive(Serialize, Deserialize)]
struct CycleJSON {
    #[serde(rename = "moles [mol]")]
    moles: f64,
    points: Vec<CyclePointJSON>,
}

/// Closed cycle of 3 to 5 ideal gas processes.
///
/// A cycle can only be obtained from the [CycleBuilder], from [Cycle::new] or by
/// deserialization, all of which validate the cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CycleJSON")]
#[serde(into = "CycleJSON")]
pub struct Cycle {
    moles: f64,
    points: Vec<CyclePoint>,
}

impl TryFrom<CycleJSON> for Cycle {
    type Error = CycleError;

    fn try_from(cycle: CycleJSON) -> CycleResult<Self> {
        let points = cycle
            .points
            .into_iter()
            .enumerate()
            .map(|(i, p)| CyclePoint {
                state: StatePoint::new(p.pressure, p.volume, cycle.moles),
                sequence_index: i,
                next_index: p.next,
                process: p.process,
            })
            .collect();
        let cycle = Self {
            moles: cycle.moles,
            points,
        };
        cycle.verify()?;
        Ok(cycle)
    }
}

impl From<Cycle> for CycleJSON {
    fn from(cycle: Cycle) -> Self {
        Self {
            moles: cycle.moles,
            points: cycle
                .points
                .into_iter()
                .map(|p| CyclePointJSON {
                    pressure: p.state.pressure,
                    volume: p.state.volume,
                    process: p.process,
                    next: p.next_index,
                })
                .collect(),
        }
    }
}

impl Cycle {
    /// Assembles the points `states` into a cycle in which `processes[i]` connects the
    /// states `i` and `i + 1`, and the last process returns to the first state.
    pub fn new(moles: f64, states: &[StatePoint], processes: &[ProcessType]) -> CycleResult<Self> {
        if states.len() != processes.len() {
            return Err(CycleError::MismatchedProcesses(states.len(), processes.len()));
        }
        let cycle = Self::assemble(moles, states, processes);
        cycle.verify()?;
        Ok(cycle)
    }

    pub(crate) fn assemble(moles: f64, states: &[StatePoint], processes: &[ProcessType]) -> Self {
        let n = states.len();
        let points = states
            .iter()
            .zip(processes)
            .enumerate()
            .map(|(i, (&state, &process))| CyclePoint {
                state,
                sequence_index: i,
                next_index: (i + 1) % n,
                process,
            })
            .collect();
        Self { moles, points }
    }

    /// Rectangular cycle that is always valid.
    pub fn safe_fallback() -> Self {
        use ProcessType::*;
        let moles = 1.0;
        let states = [(100.0, 50.0), (100.0, 80.0), (200.0, 80.0), (200.0, 50.0)]
            .map(|(p, v)| StatePoint::new(p, v, moles));
        Self::assemble(moles, &states, &[Isobaric, Isochoric, Isobaric, Isochoric])
    }

    pub fn moles(&self) -> f64 {
        self.moles
    }

    pub fn points(&self) -> &[CyclePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn processes(&self) -> impl Iterator<Item = ProcessType> + '_ {
        self.points.iter().map(|p| p.process)
    }

    /// Start state, end state and process of every step of the cycle.
    pub fn transitions(
        &self,
    ) -> impl Iterator<Item = (&StatePoint, &StatePoint, ProcessType)> + '_ {
        self.points
            .iter()
            .map(|p| (&p.state, &self.points[p.next_index].state, p.process))
    }

    /// The cycle as a directed graph with states as nodes and processes as edges.
    pub fn graph(&self) -> Graph<StatePoint, ProcessType> {
        let mut graph = Graph::with_capacity(self.len(), self.len());
        let nodes: Vec<_> = self.points.iter().map(|p| graph.add_node(p.state)).collect();
        for p in &self.points {
            if let Some(&next) = nodes.get(p.next_index) {
                graph.add_edge(nodes[p.sequence_index], next, p.process);
            }
        }
        graph
    }

    /// Sampled paths of all processes for plotting.
    pub fn plot(&self, n: usize) -> Vec<ProcessPlot> {
        self.transitions()
            .map(|(s1, s2, process)| process.plot_pv([s1, s2], n))
            .collect()
    }

    /// Validates the cycle with the default bounds and tolerances.
    pub fn verify(&self) -> CycleResult<()> {
        self.verify_with(&Bounds::default(), &Tolerances::default())
    }

    pub fn verify_with(&self, bounds: &Bounds, tolerances: &Tolerances) -> CycleResult<()> {
        let n = self.len();
        if !CYCLE_LENGTHS.contains(&n) {
            return Err(CycleError::InvalidLength(n));
        }
        if !(self.moles.is_finite() && self.moles > 0.0) {
            return Err(CycleError::InvalidMoleCount(self.moles));
        }
        self.verify_chain()?;

        for p in &self.points {
            let next = &self.points[p.next_index];
            if p.process == next.process {
                return Err(CycleError::RepeatedProcess(next.sequence_index, p.process));
            }
        }

        for p in &self.points {
            let s = &p.state;
            if !bounds.contains(s) {
                return Err(CycleError::OutOfBounds(p.sequence_index, s.pressure, s.volume));
            }
            let temperature = StatePoint::new(s.pressure, s.volume, self.moles).temperature;
            if (temperature - s.temperature).abs() > 1e-9 * temperature {
                return Err(CycleError::InconsistentTemperature(p.sequence_index));
            }
        }

        for (i, (s1, s2, process)) in self.transitions().enumerate() {
            if s1.relative_distance(s2) <= tolerances.degenerate {
                return Err(CycleError::DegenerateProcess(i));
            }
            if !process.is_valid_within(s1, s2, tolerances.law) {
                let error = process.invariant_error(s2, s1);
                if error < tolerances.diagnostic {
                    tracing::debug!(index = i, %process, error, "process law missed narrowly");
                }
                return Err(CycleError::ProcessLawViolated(i, process, error));
            }
        }
        Ok(())
    }

    fn verify_chain(&self) -> CycleResult<()> {
        let n = self.len();
        if let Some((i, _)) = self
            .points
            .iter()
            .enumerate()
            .find(|&(i, p)| p.sequence_index != i || p.next_index >= n)
        {
            return Err(CycleError::BrokenChain(i));
        }
        // every point has exactly one successor, so a single strongly connected
        // component means that the successors form one loop through all points
        let components = kosaraju_scc(&self.graph());
        if components.len() == 1 {
            return Ok(());
        }
        let first = components.iter().find(|c| c.contains(&NodeIndex::new(0)));
        let detached = (0..n)
            .find(|&i| !first.map_or(false, |c| c.contains(&NodeIndex::new(i))))
            .unwrap_or_default();
        Err(CycleError::BrokenChain(detached))
    }

    pub fn from_json<P: AsRef<Path>>(file: P) -> CycleResult<Self> {
        let reader = BufReader::new(File::open(file)?);
        Ok(serde_json::from_reader(reader)?)
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
    use itertools::Itertools;
    use ProcessType::*;

    fn rectangle() -> Vec<StatePoint> {
        [(100.0, 50.0), (100.0, 80.0), (200.0, 80.0), (200.0, 50.0)]
            .map(|(p, v)| StatePoint::new(p, v, 1.0))
            .to_vec()
    }

    #[test]
    fn test_safe_fallback() {
        let cycle = Cycle::safe_fallback();
        cycle.verify().unwrap();
        assert_eq!(cycle.len(), 4);
        assert_eq!(
            cycle.processes().collect::<Vec<_>>(),
            vec![Isobaric, Isochoric, Isobaric, Isochoric]
        );
        assert_eq!(cycle.points()[3].next_index, 0);
    }

    #[test]
    fn test_invalid() {
        let states = rectangle();
        assert!(matches!(
            Cycle::new(1.0, &states, &[Isochoric, Isobaric, Isochoric, Isobaric]),
            Err(CycleError::ProcessLawViolated(0, Isochoric, _))
        ));
        assert!(matches!(
            Cycle::new(1.0, &states[..2], &[Isobaric, Isochoric]),
            Err(CycleError::InvalidLength(2))
        ));
        assert!(matches!(
            Cycle::new(1.0, &states[..3], &[Isobaric, LinearPV, Isochoric, Adiabatic]),
            Err(CycleError::MismatchedProcesses(3, 4))
        ));
        assert!(matches!(
            Cycle::new(1.0, &states, &[Isobaric, Isochoric, Isobaric]),
            Err(CycleError::MismatchedProcesses(4, 3))
        ));
        assert!(matches!(
            Cycle::new(0.0, &states, &[Isobaric, Isochoric, Isobaric, Isochoric]),
            Err(CycleError::InvalidMoleCount(_))
        ));
        assert!(matches!(
            Cycle::new(1.0, &states, &[Isobaric, Isochoric, LinearPV, LinearPV]),
            Err(CycleError::RepeatedProcess(3, LinearPV))
        ));
        // first and last process must differ, too
        assert!(matches!(
            Cycle::new(1.0, &states, &[LinearPV, Isochoric, Isobaric, LinearPV]),
            Err(CycleError::RepeatedProcess(0, LinearPV))
        ));
    }

    #[test]
    fn test_broken_chain() {
        let mut cycle = Cycle::safe_fallback();
        cycle.points[1].next_index = 0;
        assert!(matches!(cycle.verify(), Err(CycleError::BrokenChain(2))));

        let mut cycle = Cycle::safe_fallback();
        cycle.points[3].next_index = 4;
        assert!(matches!(cycle.verify(), Err(CycleError::BrokenChain(3))));
    }

    #[test]
    fn test_graph() {
        let graph = Cycle::safe_fallback().graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        for node in graph.node_indices() {
            assert_eq!(graph.edges(node).count(), 1);
        }
    }

    #[test]
    fn test_json() {
        let cycle = Cycle::safe_fallback();
        let json = serde_json::to_string(&cycle).unwrap();
        let other: Cycle = serde_json::from_str(&json).unwrap();
        assert_eq!(cycle, other);

        let tampered = json.replacen("80.0", "85.0", 1);
        assert!(serde_json::from_str::<Cycle>(&tampered).is_err());
    }

    #[test]
    fn test_kind() {
        assert_eq!("Otto".parse::<CycleKind>().unwrap(), CycleKind::Otto);
        assert!("stirling".parse::<CycleKind>().is_err());
        for kind in [
            CycleKind::Carnot,
            CycleKind::Otto,
            CycleKind::Diesel,
            CycleKind::Rankine,
            CycleKind::Brayton,
        ] {
            let processes = kind.processes().unwrap();
            for (p1, p2) in processes.iter().circular_tuple_windows() {
                assert_ne!(p1, p2, "{kind}");
            }
        }
    }
}
