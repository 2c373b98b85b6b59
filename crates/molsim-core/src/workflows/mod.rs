//! # Workflows Module
//!
//! Host-facing entry points. A [`session::SimulationSession`] owns one
//! [`MolecularModel`](crate::engine::model::MolecularModel) and runs it either on a
//! background stepping thread or synchronously for a fixed number of steps, publishing
//! immutable [`snapshot::Snapshot`]s that renderers and recorders read without touching the
//! live model.

pub mod session;
pub mod snapshot;
