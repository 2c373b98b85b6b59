use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::bonds::BondError;
use crate::core::state::StateError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Bond construction failed: {source}")]
    Bond {
        #[from]
        source: BondError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Simulation state error: {source}")]
    State {
        #[from]
        source: StateError,
    },

    #[error("Operation '{operation}' refused: {reason}")]
    Busy {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
