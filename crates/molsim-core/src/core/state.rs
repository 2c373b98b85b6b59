use super::models::bonds::BondError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("State holds {requested} atoms but the model can hold only {capacity}")]
    Capacity { requested: usize, capacity: usize },
    #[error("Invalid bond in state: {0}")]
    Bond(#[from] BondError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub symbol: String,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub damping: f64,
    #[serde(default = "default_movable")]
    pub movable: bool,
}

fn default_movable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RBondRecord {
    pub atoms: [usize; 2],
    pub stiffness: f64,
    pub rest_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ABondRecord {
    pub atoms: [usize; 3],
    pub stiffness: f64,
    pub equilibrium_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TBondRecord {
    pub atoms: [usize; 4],
    pub stiffness: f64,
    pub periodicity: u32,
    pub equilibrium_angle: f64,
}

/// The fields needed to save and restore a model. Every number survives a TOML round trip
/// bit for bit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    #[serde(default)]
    pub atoms: Vec<AtomRecord>,
    #[serde(default)]
    pub rbonds: Vec<RBondRecord>,
    #[serde(default)]
    pub abonds: Vec<ABondRecord>,
    #[serde(default)]
    pub tbonds: Vec<TBondRecord>,
}

impl SimulationState {
    pub fn from_toml_str(content: &str) -> Result<Self, StateError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, StateError> {
        Ok(toml::to_string(self)?)
    }

    pub fn read_from_path(path: &Path) -> Result<Self, StateError> {
        let content = std::fs::read_to_string(path).map_err(|e| StateError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), StateError> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| StateError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}
