//! Computation of the state that closes a cycle.
//!
//! The closing state has to lie on two process paths at once: the path of
//! `process_a` through `a` and the path of `process_b` through `b`. For the
//! common combinations the intersection is known in closed form. All other
//! combinations are handled by a grid search followed by a refinement in
//! logarithmic coordinates, in which every process law except the linear
//! one is a straight line.
use crate::process::{ProcessType, StatePoint, GAMMA};
use crate::settings::Tolerances;
use ndarray::Array1;

/// Default number of grid points per dimension.
pub const GRID_RESOLUTION: usize = 100;

/// Settings of the closure computation.
#[derive(Clone, Copy, Debug)]
pub struct IntersectionSolver {
    pub grid_resolution: usize,
    pub tolerances: Tolerances,
}

impl Default for IntersectionSolver {
    fn default() -> Self {
        Self {
            grid_resolution: GRID_RESOLUTION,
            tolerances: Tolerances::default(),
        }
    }
}

/// Finds the state reached from `a` by `process_a` and from `b` by `process_b`.
pub fn solve_closure(
    a: &StatePoint,
    b: &StatePoint,
    process_a: ProcessType,
    process_b: ProcessType,
) -> Option<StatePoint> {
    IntersectionSolver::default().solve(a, b, process_a, process_b)
}

impl IntersectionSolver {
    pub fn new(grid_resolution: usize, tolerances: Tolerances) -> Self {
        Self {
            grid_resolution,
            tolerances,
        }
    }

    pub fn solve(
        &self,
        a: &StatePoint,
        b: &StatePoint,
        process_a: ProcessType,
        process_b: ProcessType,
    ) -> Option<StatePoint> {
        let moles = a.moles();
        match analytic_closure([a, b], [process_a, process_b], self.tolerances.law) {
            Analytic::Solution(p, v) => Some(StatePoint::new(p, v, moles)),
            Analytic::NoIntersection => None,
            Analytic::Unknown => self.numeric_closure(a, b, process_a, process_b),
        }
    }

    fn total_error(
        &self,
        candidate: &StatePoint,
        [a, b]: [&StatePoint; 2],
        [process_a, process_b]: [ProcessType; 2],
    ) -> f64 {
        process_a.invariant_error(candidate, a) + process_b.invariant_error(candidate, b)
    }

    fn numeric_closure(
        &self,
        a: &StatePoint,
        b: &StatePoint,
        process_a: ProcessType,
        process_b: ProcessType,
    ) -> Option<StatePoint> {
        let moles = a.moles();
        let anchors = [a, b];
        let processes = [process_a, process_b];
        let n = self.grid_resolution;
        let pressure = Array1::linspace(
            0.5 * a.pressure.min(b.pressure),
            1.5 * a.pressure.max(b.pressure),
            n,
        );
        let volume = Array1::linspace(
            0.5 * a.volume.min(b.volume),
            1.5 * a.volume.max(b.volume),
            n,
        );

        // ties (e.g. for linear processes) are resolved towards the midpoint of the anchors
        let center = [
            0.5 * (a.pressure.ln() + b.pressure.ln()),
            0.5 * (a.volume.ln() + b.volume.ln()),
        ];
        let tie_break = |s: &StatePoint| {
            1e-9 * ((s.pressure.ln() - center[0]).powi(2) + (s.volume.ln() - center[1]).powi(2))
                .sqrt()
        };

        let mut best: Option<(f64, f64, StatePoint)> = None;
        for &p in pressure.iter() {
            for &v in volume.iter() {
                let candidate = StatePoint::new(p, v, moles);
                if anchors
                    .iter()
                    .any(|s| s.relative_distance(&candidate) < 1e-2)
                {
                    continue;
                }
                let error = self.total_error(&candidate, anchors, processes);
                let score = error + tie_break(&candidate);
                if best.map_or(true, |(s, _, _)| score < s) {
                    best = Some((score, error, candidate));
                }
            }
        }

        let (_, error, candidate) = best?;
        let in_box = |s: &StatePoint| {
            (pressure[0]..=pressure[n - 1]).contains(&s.pressure)
                && (volume[0]..=volume[n - 1]).contains(&s.volume)
        };
        let refined = refine_log_space(&candidate, anchors, processes, moles)
            .filter(|s| s.is_physical() && in_box(s))
            .filter(|s| {
                anchors
                    .iter()
                    .all(|a| a.relative_distance(s) > self.tolerances.degenerate)
            })
            .map(|s| (self.total_error(&s, anchors, processes), s))
            .filter(|&(e, _)| e < error);
        let (error, solution) = refined.unwrap_or((error, candidate));
        (error < self.tolerances.closure).then_some(solution)
    }
}

enum Analytic {
    Solution(f64, f64),
    NoIntersection,
    Unknown,
}

fn analytic_closure(
    [a, b]: [&StatePoint; 2],
    processes: [ProcessType; 2],
    tolerance: f64,
) -> Analytic {
    use ProcessType::*;
    let same = |x: f64, y: f64| (x - y).abs() / x.abs() < tolerance;
    match processes {
        [Isochoric, Isobaric] => Analytic::Solution(b.pressure, a.volume),
        [Isobaric, Isochoric] => Analytic::Solution(a.pressure, b.volume),
        [Isochoric, Isochoric] if same(a.volume, b.volume) => {
            Analytic::Solution(0.5 * (a.pressure + b.pressure), a.volume)
        }
        [Isobaric, Isobaric] if same(a.pressure, b.pressure) => {
            Analytic::Solution(a.pressure, 0.5 * (a.volume + b.volume))
        }
        [Isochoric, Isochoric] | [Isobaric, Isobaric] => Analytic::NoIntersection,
        [Adiabatic, Isothermal] => adiabat_isotherm(a, b),
        [Isothermal, Adiabatic] => adiabat_isotherm(b, a),
        _ => Analytic::Unknown,
    }
}

fn adiabat_isotherm(adiabat: &StatePoint, isotherm: &StatePoint) -> Analytic {
    let k1 = adiabat.pressure * adiabat.volume.powf(GAMMA);
    let k2 = isotherm.pv();
    let volume = (k1 / k2).powf(1.0 / (GAMMA - 1.0));
    Analytic::Solution(k2 / volume, volume)
}

/// Gauss-Newton step on the process laws in the coordinates `(ln P, ln V)`.
///
/// The residuals are linear in these coordinates, so a single step is exact if both laws
/// are defined. If only one law is defined, the point is projected onto it.
fn refine_log_space(
    start: &StatePoint,
    [a, b]: [&StatePoint; 2],
    [process_a, process_b]: [ProcessType; 2],
    moles: f64,
) -> Option<StatePoint> {
    let x = [start.pressure.ln(), start.volume.ln()];
    let rows: Vec<_> = [process_a.log_constraint(a), process_b.log_constraint(b)]
        .into_iter()
        .flatten()
        .collect();
    let [ln_p, ln_v] = match rows[..] {
        [[a1, b1, c1], [a2, b2, c2]] => {
            let det = a1 * b2 - a2 * b1;
            if det.abs() < 1e-12 {
                return None;
            }
            [(c1 * b2 - c2 * b1) / det, (a1 * c2 - a2 * c1) / det]
        }
        [[a1, b1, c1]] => {
            let r = (a1 * x[0] + b1 * x[1] - c1) / (a1 * a1 + b1 * b1);
            [x[0] - a1 * r, x[1] - b1 * r]
        }
        _ => x,
    };
    Some(StatePoint::new(ln_p.exp(), ln_v.exp(), moles))
}
