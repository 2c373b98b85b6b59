//! # Engine Module
//!
//! The stateful half of the library: everything that owns a time step, caches derived data
//! between steps, or mutates particle state.
//!
//! ## Architecture
//!
//! - **Neighbor List** ([`neighbors`]) - Verlet list of candidate pairs with a
//!   displacement-based rebuild criterion
//! - **Force Evaluation** ([`forces`]) - Non-bonded, field and bonded forces turned into
//!   per-atom accelerations
//! - **Integration** ([`integrator`]) - Predictor and corrector halves of each step
//! - **Boundaries** ([`boundary`]) - Reflecting-wall velocity correction and position confinement
//! - **Temperature Control** ([`thermostat`]) - Kinetic temperature, velocity assignment and the heat bath
//! - **Relaxation** ([`minimizer`]) - Steepest-descent energy minimization
//! - **Model** ([`model`]) - `MolecularModel`, which owns all of the above and exposes `step()`
//! - **Configuration** ([`config`]) - Validated simulation parameters
//! - **Progress Monitoring** ([`progress`]) - Callback events for long-running operations
//! - **Error Handling** ([`error`]) - Engine-level error type

pub mod boundary;
pub mod config;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod minimizer;
pub mod model;
pub mod neighbors;
pub mod progress;
pub mod thermostat;
