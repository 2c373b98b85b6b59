use crate::error::{CliError, Result};
use molsim::core::forcefield::fields::FieldKind;
use molsim::core::models::simbox::BoundaryType;
use molsim::engine::config::{SimulationConfig, SimulationConfigBuilder};
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialNeighborConfig {
    cutoff_ratio: Option<f64>,
    list_ratio: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialBoxConfig {
    half_extents: Option<[f64; 3]>,
    boundary: Option<BoundaryType>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialMinimizationConfig {
    steps: Option<usize>,
    step_length: Option<f64>,
    overlap_ratio: Option<f64>,
    auto_minimize: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialHeatBathConfig {
    target: Option<f64>,
    interval: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRunConfig {
    snapshot_interval: Option<u64>,
    min_step_interval_ms: Option<u64>,
    initial_temperature: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FieldEntry {
    kind: String,
    intensity: f64,
    direction: [f64; 3],
}

/// The configuration file as written, every value optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialSimulationConfig {
    capacity: Option<usize>,
    time_step: Option<f64>,
    seed: Option<u64>,
    element_params: Option<PathBuf>,
    neighbors: Option<PartialNeighborConfig>,
    #[serde(rename = "box")]
    simulation_box: Option<PartialBoxConfig>,
    minimization: Option<PartialMinimizationConfig>,
    heat_bath: Option<PartialHeatBathConfig>,
    run: Option<PartialRunConfig>,
    #[serde(default, rename = "field")]
    fields: Vec<FieldEntry>,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides<'a> {
    pub time_step: Option<f64>,
    pub seed: Option<u64>,
    pub temperature: Option<f64>,
    pub step_length: Option<f64>,
    pub no_auto_minimize: bool,
    pub set_values: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSetting {
    pub kind: FieldKind,
    pub intensity: f64,
    pub direction: Vector3<f64>,
}

/// Everything a command needs to build and drive a model.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub simulation: SimulationConfig,
    pub element_params: Option<PathBuf>,
    pub fields: Vec<FieldSetting>,
    pub initial_temperature: Option<f64>,
}

impl PartialSimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut partial: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        // Relative parameter files are taken relative to the config file.
        if let (Some(params), Some(dir)) = (&partial.element_params, path.parent()) {
            if params.is_relative() {
                partial.element_params = Some(dir.join(params));
            }
        }
        Ok(partial)
    }

    pub fn merge_with_cli(mut self, overrides: &CliOverrides) -> Result<ResolvedConfig> {
        self.apply_set_values(overrides.set_values)?;

        let mut builder = SimulationConfigBuilder::new();
        if let Some(capacity) = self.capacity {
            builder = builder.capacity(capacity);
        }
        if let Some(time_step) = overrides.time_step.or(self.time_step) {
            builder = builder.time_step(time_step);
        }
        if let Some(seed) = overrides.seed.or(self.seed) {
            builder = builder.seed(seed);
        }

        let neighbors = self.neighbors.take().unwrap_or_default();
        if let Some(ratio) = neighbors.cutoff_ratio {
            builder = builder.cutoff_ratio(ratio);
        }
        if let Some(ratio) = neighbors.list_ratio {
            builder = builder.list_ratio(ratio);
        }

        let simulation_box = self.simulation_box.take().unwrap_or_default();
        if let Some([x, y, z]) = simulation_box.half_extents {
            builder = builder.box_half_extents(Vector3::new(x, y, z));
        }
        if let Some(boundary) = simulation_box.boundary {
            builder = builder.boundary(boundary);
        }

        let minimization = self.minimization.take().unwrap_or_default();
        if let Some(steps) = minimization.steps {
            builder = builder.minimization_steps(steps);
        }
        if let Some(step_length) = overrides.step_length.or(minimization.step_length) {
            builder = builder.step_length(step_length);
        }
        if let Some(ratio) = minimization.overlap_ratio {
            builder = builder.overlap_ratio(ratio);
        }
        if overrides.no_auto_minimize {
            builder = builder.auto_minimize(false);
        } else if let Some(enabled) = minimization.auto_minimize {
            builder = builder.auto_minimize(enabled);
        }

        if let Some(bath) = self.heat_bath.take() {
            let target = bath.target.ok_or_else(|| {
                CliError::Config("`heat-bath` requires `target`".to_string())
            })?;
            let interval = bath.interval.ok_or_else(|| {
                CliError::Config("`heat-bath` requires `interval`".to_string())
            })?;
            builder = builder.heat_bath(target, interval);
        }

        let run = self.run.take().unwrap_or_default();
        if let Some(interval) = run.snapshot_interval {
            builder = builder.snapshot_interval(interval);
        }
        if let Some(millis) = run.min_step_interval_ms {
            builder = builder.min_step_interval(Duration::from_millis(millis));
        }

        let fields = self
            .fields
            .iter()
            .map(|entry| {
                let kind = FieldKind::from_str(&entry.kind)
                    .map_err(|e| CliError::Config(e.to_string()))?;
                let [x, y, z] = entry.direction;
                Ok(FieldSetting {
                    kind,
                    intensity: entry.intensity,
                    direction: Vector3::new(x, y, z),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let simulation = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(ResolvedConfig {
            simulation,
            element_params: self.element_params,
            fields,
            initial_temperature: overrides.temperature.or(run.initial_temperature),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "capacity" => self.capacity = Some(parse_value(key, value)?),
                "time-step" => self.time_step = Some(parse_value(key, value)?),
                "seed" => self.seed = Some(parse_value(key, value)?),
                "element-params" => self.element_params = Some(PathBuf::from(value)),
                "neighbors.cutoff-ratio" => {
                    self.neighbors
                        .get_or_insert_with(Default::default)
                        .cutoff_ratio = Some(parse_value(key, value)?);
                }
                "neighbors.list-ratio" => {
                    self.neighbors
                        .get_or_insert_with(Default::default)
                        .list_ratio = Some(parse_value(key, value)?);
                }
                "box.boundary" => {
                    self.simulation_box
                        .get_or_insert_with(Default::default)
                        .boundary = Some(parse_value(key, value)?);
                }
                "minimization.steps" => {
                    self.minimization
                        .get_or_insert_with(Default::default)
                        .steps = Some(parse_value(key, value)?);
                }
                "minimization.step-length" => {
                    self.minimization
                        .get_or_insert_with(Default::default)
                        .step_length = Some(parse_value(key, value)?);
                }
                "minimization.overlap-ratio" => {
                    self.minimization
                        .get_or_insert_with(Default::default)
                        .overlap_ratio = Some(parse_value(key, value)?);
                }
                "minimization.auto-minimize" => {
                    self.minimization
                        .get_or_insert_with(Default::default)
                        .auto_minimize = Some(parse_value(key, value)?);
                }
                "heat-bath.target" => {
                    self.heat_bath.get_or_insert_with(Default::default).target =
                        Some(parse_value(key, value)?);
                }
                "heat-bath.interval" => {
                    self.heat_bath.get_or_insert_with(Default::default).interval =
                        Some(parse_value(key, value)?);
                }
                "run.snapshot-interval" => {
                    self.run.get_or_insert_with(Default::default).snapshot_interval =
                        Some(parse_value(key, value)?);
                }
                "run.initial-temperature" => {
                    self.run
                        .get_or_insert_with(Default::default)
                        .initial_temperature = Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}
