use crate::core::models::simbox::{BoundaryType, SimulationBox};
use nalgebra::Vector3;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be a positive number, got {}", value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationConfig {
    pub steps: usize,
    /// Distance in Å the whole selection moves per step.
    pub step_length: f64,
    /// A pair closer than this fraction of its combined σ counts as overlapping.
    pub overlap_ratio: f64,
    /// Relax overlapping structures before a run starts.
    pub auto_minimize: bool,
}

impl Default for MinimizationConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            step_length: 0.05,
            overlap_ratio: 0.5,
            auto_minimize: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatBathConfig {
    /// Target temperature in K.
    pub target: f64,
    /// Steps between two velocity reassignments.
    pub interval: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Lower bound on the wall-clock time of one step; zero runs flat out.
    pub min_step_interval: Duration,
    pub snapshot_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_step_interval: Duration::ZERO,
            snapshot_interval: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub capacity: usize,
    /// Integration time step in fs.
    pub time_step: f64,
    /// Interaction cutoff, in units of each pair's √(σᵢσⱼ).
    pub cutoff_ratio: f64,
    /// Neighbor-list radius in the same units; the gap to `cutoff_ratio` is the skin.
    pub list_ratio: f64,
    pub simulation_box: SimulationBox,
    pub minimization: MinimizationConfig,
    pub heat_bath: Option<HeatBathConfig>,
    pub run: RunConfig,
    /// Seed for velocity assignment. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            time_step: 1.0,
            cutoff_ratio: 2.5,
            list_ratio: 3.0,
            simulation_box: SimulationBox::default(),
            minimization: MinimizationConfig::default(),
            heat_bath: None,
            run: RunConfig::default(),
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    capacity: Option<usize>,
    time_step: Option<f64>,
    cutoff_ratio: Option<f64>,
    list_ratio: Option<f64>,
    box_half_extents: Option<Vector3<f64>>,
    boundary: Option<BoundaryType>,
    minimization_steps: Option<usize>,
    step_length: Option<f64>,
    overlap_ratio: Option<f64>,
    auto_minimize: Option<bool>,
    heat_bath: Option<HeatBathConfig>,
    min_step_interval: Option<Duration>,
    snapshot_interval: Option<u64>,
    seed: Option<u64>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
    pub fn time_step(mut self, fs: f64) -> Self {
        self.time_step = Some(fs);
        self
    }
    pub fn cutoff_ratio(mut self, ratio: f64) -> Self {
        self.cutoff_ratio = Some(ratio);
        self
    }
    pub fn list_ratio(mut self, ratio: f64) -> Self {
        self.list_ratio = Some(ratio);
        self
    }
    pub fn box_half_extents(mut self, half_extents: Vector3<f64>) -> Self {
        self.box_half_extents = Some(half_extents);
        self
    }
    pub fn boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = Some(boundary);
        self
    }
    pub fn minimization_steps(mut self, steps: usize) -> Self {
        self.minimization_steps = Some(steps);
        self
    }
    pub fn step_length(mut self, angstroms: f64) -> Self {
        self.step_length = Some(angstroms);
        self
    }
    pub fn overlap_ratio(mut self, ratio: f64) -> Self {
        self.overlap_ratio = Some(ratio);
        self
    }
    pub fn auto_minimize(mut self, enabled: bool) -> Self {
        self.auto_minimize = Some(enabled);
        self
    }
    pub fn heat_bath(mut self, target: f64, interval: u64) -> Self {
        self.heat_bath = Some(HeatBathConfig { target, interval });
        self
    }
    pub fn min_step_interval(mut self, interval: Duration) -> Self {
        self.min_step_interval = Some(interval);
        self
    }
    pub fn snapshot_interval(mut self, steps: u64) -> Self {
        self.snapshot_interval = Some(steps);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let defaults = SimulationConfig::default();

        let capacity = self.capacity.unwrap_or(defaults.capacity);
        if capacity == 0 {
            return Err(invalid("capacity", "must hold at least one atom"));
        }

        let time_step = self.time_step.unwrap_or(defaults.time_step);
        require_positive("time_step", time_step)?;

        let cutoff_ratio = self.cutoff_ratio.unwrap_or(defaults.cutoff_ratio);
        let list_ratio = self.list_ratio.unwrap_or(defaults.list_ratio);
        require_positive("cutoff_ratio", cutoff_ratio)?;
        if list_ratio.is_nan() || list_ratio <= cutoff_ratio {
            return Err(invalid(
                "list_ratio",
                format!(
                    "must exceed cutoff_ratio ({}), got {}",
                    cutoff_ratio, list_ratio
                ),
            ));
        }

        let half_extents = self
            .box_half_extents
            .unwrap_or(defaults.simulation_box.half_extents);
        half_extents
            .iter()
            .try_for_each(|&extent| require_positive("box_half_extents", extent))?;
        let simulation_box =
            SimulationBox::new(half_extents, self.boundary.unwrap_or_default());

        let minimization = MinimizationConfig {
            steps: self
                .minimization_steps
                .unwrap_or(defaults.minimization.steps),
            step_length: self
                .step_length
                .unwrap_or(defaults.minimization.step_length),
            overlap_ratio: self
                .overlap_ratio
                .unwrap_or(defaults.minimization.overlap_ratio),
            auto_minimize: self
                .auto_minimize
                .unwrap_or(defaults.minimization.auto_minimize),
        };
        require_positive("step_length", minimization.step_length)?;
        require_positive("overlap_ratio", minimization.overlap_ratio)?;

        if let Some(bath) = &self.heat_bath {
            if !(bath.target.is_finite() && bath.target >= 0.0) {
                return Err(invalid(
                    "heat_bath.target",
                    format!("must be a non-negative temperature, got {}", bath.target),
                ));
            }
            if bath.interval == 0 {
                return Err(invalid("heat_bath.interval", "must be at least one step"));
            }
        }

        let run = RunConfig {
            min_step_interval: self
                .min_step_interval
                .unwrap_or(defaults.run.min_step_interval),
            snapshot_interval: self
                .snapshot_interval
                .unwrap_or(defaults.run.snapshot_interval),
        };
        if run.snapshot_interval == 0 {
            return Err(invalid("snapshot_interval", "must be at least one step"));
        }

        Ok(SimulationConfig {
            capacity,
            time_step,
            cutoff_ratio,
            list_ratio,
            simulation_box,
            minimization,
            heat_bath: self.heat_bath,
            run,
            seed: self.seed,
        })
    }
}
