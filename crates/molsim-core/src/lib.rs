//! # molsim Core Library
//!
//! The computational core of an interactive particle-dynamics simulator. Given a set of
//! point particles with pairwise and bonded interactions, it advances their positions and
//! velocities through time, enforces boundary and obstacle constraints, and supports
//! temperature control and energy relaxation.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomStore`, `BondSet`,
//!   `ObstacleSet`, `SimulationBox`), the pure force-field math (`potentials`, `bonded`,
//!   `fields`) and the persisted-state contract.
//!
//! - **[`engine`]: The Logic Core.** The stateful machinery: the Verlet `NeighborList`, the
//!   `ForceCalculator`, the predictor-corrector integrator, boundary handling, thermostats,
//!   the steepest-descent minimizer, and `MolecularModel`, which ties them into a single
//!   `step()`.
//!
//! - **[`workflows`]: The Public API.** `SimulationSession` owns a model behind a lock and
//!   runs it on a stepping thread, publishing immutable snapshots for renderers and
//!   recorders.

pub mod core;
pub mod engine;
pub mod workflows;
