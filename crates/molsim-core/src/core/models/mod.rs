//! # Core Models Module
//!
//! Data structures describing the particles of a simulation and what constrains them.
//!
//! - [`atom`] - Per-particle state: kinematics, force accumulator and Lennard-Jones parameters
//! - [`store`] - Fixed-capacity atom storage with compacting removal
//! - [`bonds`] - Radial, angular and torsional bonds plus the non-bonded exclusion index
//! - [`obstacle`] - Static rigid bodies that reflect colliding particles
//! - [`simbox`] - The simulation box and its boundary type
//! - [`selection`] - Bit-sets over atom indices
//! - [`ids`] - Key types for slot-mapped collections
//!
//! ```ignore
//! use molsim::core::forcefield::elements::ElementTable;
//! use molsim::core::models::store::AtomStore;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut store = AtomStore::new(100);
//! let argon = ElementTable::builtin("Ar").unwrap();
//! assert!(store.add_atom(argon, Point3::origin(), Vector3::zeros(), 0.0));
//! ```

pub mod atom;
pub mod bonds;
pub mod ids;
pub mod obstacle;
pub mod selection;
pub mod simbox;
pub mod store;
