use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod generator;
mod process_state;
mod quantities;
pub use generator::PointGenerator;
pub use process_state::StatePoint;
pub use quantities::{compute_quantities, CycleQuantities, ProcessQuantities};

/// Ideal gas constant in J/(mol·K), equal to kPa·L/(mol·K).
pub const GAS_CONSTANT: f64 = 8.31;
/// Adiabatic index of a monatomic ideal gas.
pub const GAMMA: f64 = 5.0 / 3.0;
/// Molar isochoric heat capacity of a monatomic ideal gas.
pub const CV: f64 = 1.5 * GAS_CONSTANT;
/// Molar isobaric heat capacity of a monatomic ideal gas.
pub const CP: f64 = 2.5 * GAS_CONSTANT;

/// Relative tolerance used to accept a transition.
pub const LAW_TOLERANCE: f64 = 1e-4;
/// Minimum relative separation of two states connected by a process.
pub const DEGENERATE_TOLERANCE: f64 = 1e-10;

/// Process connecting two consecutive points of a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Adiabatic,
    Isochoric,
    Isothermal,
    Isobaric,
    #[serde(rename = "linear")]
    LinearPV,
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Adiabatic => "adiabatic",
            Self::Isochoric => "isochoric",
            Self::Isothermal => "isothermal",
            Self::Isobaric => "isobaric",
            Self::LinearPV => "linear",
        };
        write!(f, "{name}")
    }
}

fn relative_difference(reference: f64, value: f64) -> f64 {
    (value - reference).abs() / reference.abs()
}

impl ProcessType {
    pub const ALL: [Self; 5] = [
        Self::Adiabatic,
        Self::Isochoric,
        Self::Isothermal,
        Self::Isobaric,
        Self::LinearPV,
    ];

    /// Quantity that stays constant along the process, evaluated at `state`.
    ///
    /// Returns `None` for a linear process, which has no invariant.
    pub fn invariant(&self, state: &StatePoint) -> Option<f64> {
        match self {
            Self::Adiabatic => Some(state.pressure * state.volume.powf(GAMMA)),
            Self::Isochoric => Some(state.volume),
            Self::Isothermal => Some(state.pv()),
            Self::Isobaric => Some(state.pressure),
            Self::LinearPV => None,
        }
    }

    /// Checks the transition `start -> end` against the process law using [LAW_TOLERANCE].
    pub fn is_valid(&self, start: &StatePoint, end: &StatePoint) -> bool {
        self.is_valid_within(start, end, LAW_TOLERANCE)
    }

    pub fn is_valid_within(&self, start: &StatePoint, end: &StatePoint, tolerance: f64) -> bool {
        if !start.is_physical() || !end.is_physical() {
            return false;
        }
        match self {
            Self::Isothermal => {
                self.invariant_error(end, start) < tolerance
                    && relative_difference(start.temperature, end.temperature) < tolerance
            }
            Self::LinearPV => start.relative_distance(end) > DEGENERATE_TOLERANCE,
            _ => self.invariant_error(end, start) < tolerance,
        }
    }

    /// Relative deviation of `candidate` from the process law anchored at `reference`.
    ///
    /// A linear process accepts every point and therefore has zero error.
    /// Non-physical candidates have an infinite error.
    pub fn invariant_error(&self, candidate: &StatePoint, reference: &StatePoint) -> f64 {
        if !(candidate.pressure > 0.0 && candidate.volume > 0.0)
            || !(candidate.pressure.is_finite() && candidate.volume.is_finite())
        {
            return f64::INFINITY;
        }
        match (self.invariant(reference), self.invariant(candidate)) {
            (Some(k0), Some(k1)) => relative_difference(k0, k1),
            _ => 0.0,
        }
    }

    /// The process law as a straight line `a·ln(P) + b·ln(V) = c` through `reference`.
    pub fn log_constraint(&self, reference: &StatePoint) -> Option<[f64; 3]> {
        let (a, b) = match self {
            Self::Adiabatic => (1.0, GAMMA),
            Self::Isochoric => (0.0, 1.0),
            Self::Isothermal => (1.0, 1.0),
            Self::Isobaric => (1.0, 0.0),
            Self::LinearPV => return None,
        };
        let c = a * reference.pressure.ln() + b * reference.volume.ln();
        Some([a, b, c])
    }

    /// Relative perturbation range of the independent variable(s) used by the point generator.
    pub fn perturbation(&self) -> [f64; 2] {
        match self {
            Self::Adiabatic => [0.3, 0.6],
            Self::Isochoric | Self::Isothermal | Self::Isobaric => [0.3, 0.7],
            Self::LinearPV => [0.2, 0.5],
        }
    }

    /// Samples the path of the process in the P-V plane.
    pub fn plot_pv(&self, states: [&StatePoint; 2], n: usize) -> ProcessPlot {
        let [s0, s1] = states;
        let volume = Array1::linspace(s0.volume, s1.volume, n);
        let pressure = match self {
            Self::Isochoric => Array1::linspace(s0.pressure, s1.pressure, n),
            Self::Isobaric => Array1::from_elem(n, s0.pressure),
            Self::Isothermal => volume.mapv(|v| s0.pv() / v),
            Self::Adiabatic => {
                let k = s0.pressure * s0.volume.powf(GAMMA);
                volume.mapv(|v| k / v.powf(GAMMA))
            }
            Self::LinearPV => Array1::linspace(s0.pressure, s1.pressure, n),
        };
        ProcessPlot {
            process: *self,
            pressure,
            volume,
        }
    }
}

/// Sampled path of a single process in the P-V plane.
#[derive(Clone, Debug)]
pub struct ProcessPlot {
    pub process: ProcessType,
    pub pressure: Array1<f64>,
    pub volume: Array1<f64>,
}
