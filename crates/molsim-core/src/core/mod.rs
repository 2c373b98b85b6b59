//! # Core Module
//!
//! Fundamental building blocks of the simulator: particle and bond storage, static
//! obstacles, the simulation box, and the force-field formulas.
//!
//! - **Particle Representation** ([`models`]) - Atoms, bonds, obstacles, selections and the box
//! - **Energy and Forces** ([`forcefield`]) - Unit constants, element parameters and potentials
//! - **Persistence** ([`state`]) - The minimal field list needed to save and restore a model
//!
//! Nothing in this module owns a time step or a thread; it is pure data and pure math that
//! the [`crate::engine`] layer drives.

pub mod forcefield;
pub mod models;
pub mod state;
