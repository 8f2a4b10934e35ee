use crate::process::{StatePoint, DEGENERATE_TOLERANCE, LAW_TOLERANCE};
use crate::CycleResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::RangeInclusive;
use std::path::Path;

/// Rectangular region of the P-V plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(rename = "pressure [kPa]")]
    pub pressure: [f64; 2],
    #[serde(rename = "volume [L]")]
    pub volume: [f64; 2],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new([30.0, 350.0], [5.0, 200.0])
    }
}

impl Bounds {
    pub fn new(pressure: [f64; 2], volume: [f64; 2]) -> Self {
        Self { pressure, volume }
    }

    /// Region from which the first point of a random cycle is drawn.
    pub fn initial() -> Self {
        Self::new([50.0, 300.0], [20.0, 100.0])
    }

    pub fn pressure_range(&self) -> RangeInclusive<f64> {
        self.pressure[0]..=self.pressure[1]
    }

    pub fn volume_range(&self) -> RangeInclusive<f64> {
        self.volume[0]..=self.volume[1]
    }

    pub fn contains(&self, state: &StatePoint) -> bool {
        self.pressure_range().contains(&state.pressure)
            && self.volume_range().contains(&state.volume)
            && state.temperature > 0.0
    }
}

/// Relative tolerances, one per purpose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Acceptance of a transition during generation and validation.
    pub law: f64,
    /// Near misses within this tolerance are logged.
    pub diagnostic: f64,
    /// Maximum summed invariant error of a closure point found by grid search.
    pub closure: f64,
    /// Minimum separation of two connected states.
    pub degenerate: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            law: LAW_TOLERANCE,
            diagnostic: 1e-3,
            closure: 1e-2,
            degenerate: DEGENERATE_TOLERANCE,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GeneratorSettingsJSON {
    physical_bounds: Bounds,
    initial_bounds: Bounds,
    #[serde(rename = "moles [mol]")]
    moles: [f64; 2],
    points: [usize; 2],
    max_point_attempts: usize,
    max_cycle_attempts: usize,
    grid_resolution: usize,
    #[serde(default)]
    tolerances: Tolerances,
}

/// Parameters of the cycle generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "GeneratorSettingsJSON")]
#[serde(into = "GeneratorSettingsJSON")]
pub struct GeneratorSettings {
    pub physical_bounds: Bounds,
    pub initial_bounds: Bounds,
    pub moles: RangeInclusive<f64>,
    pub points: RangeInclusive<usize>,
    pub max_point_attempts: usize,
    pub max_cycle_attempts: usize,
    pub grid_resolution: usize,
    pub tolerances: Tolerances,
}

impl From<GeneratorSettingsJSON> for GeneratorSettings {
    fn from(settings: GeneratorSettingsJSON) -> Self {
        let [n_min, n_max] = settings.moles;
        let [p_min, p_max] = settings.points;
        Self {
            physical_bounds: settings.physical_bounds,
            initial_bounds: settings.initial_bounds,
            moles: n_min..=n_max,
            points: p_min..=p_max,
            max_point_attempts: settings.max_point_attempts,
            max_cycle_attempts: settings.max_cycle_attempts,
            grid_resolution: settings.grid_resolution,
            tolerances: settings.tolerances,
        }
    }
}

impl From<GeneratorSettings> for GeneratorSettingsJSON {
    fn from(settings: GeneratorSettings) -> Self {
        Self {
            physical_bounds: settings.physical_bounds,
            initial_bounds: settings.initial_bounds,
            moles: [*settings.moles.start(), *settings.moles.end()],
            points: [*settings.points.start(), *settings.points.end()],
            max_point_attempts: settings.max_point_attempts,
            max_cycle_attempts: settings.max_cycle_attempts,
            grid_resolution: settings.grid_resolution,
            tolerances: settings.tolerances,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            physical_bounds: Bounds::default(),
            initial_bounds: Bounds::initial(),
            moles: 0.5..=3.0,
            points: 3..=5,
            max_point_attempts: 20,
            max_cycle_attempts: 50,
            grid_resolution: 100,
            tolerances: Tolerances::default(),
        }
    }
}

impl GeneratorSettings {
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

    #[test]
    fn test_json() {
        let settings: GeneratorSettings = serde_json::from_str(
            r#"{
                "physical_bounds": {"pressure [kPa]": [30.0, 350.0], "volume [L]": [5.0, 200.0]},
                "initial_bounds": {"pressure [kPa]": [50.0, 300.0], "volume [L]": [20.0, 100.0]},
                "moles [mol]": [1.0, 2.0],
                "points": [4, 4],
                "max_point_attempts": 10,
                "max_cycle_attempts": 5,
                "grid_resolution": 50
            }"#,
        )
        .unwrap();
        assert_eq!(settings.points, 4..=4);
        assert_eq!(settings.moles, 1.0..=2.0);
        assert_eq!(settings.tolerances, Tolerances::default());
        assert_eq!(settings.physical_bounds, Bounds::default());

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["max_cycle_attempts"], 5);
        assert_eq!(json["volume [L]"], serde_json::Value::Null);
        assert_eq!(json["initial_bounds"]["volume [L]"][1], 100.0);
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::default();
        assert!(bounds.contains(&StatePoint::new(30.0, 200.0, 1.0)));
        assert!(!bounds.contains(&StatePoint::new(29.9, 100.0, 1.0)));
        assert!(!bounds.contains(&StatePoint::new(100.0, 4.0, 1.0)));
    }
}
