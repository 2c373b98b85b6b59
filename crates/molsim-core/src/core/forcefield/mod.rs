//! # Force Field Module
//!
//! Pure formulas for every interaction the simulator knows about.
//!
//! - **Non-bonded pairs** ([`potentials`]) - Lennard-Jones 12-6 with an arithmetic combining
//!   rule and a clamped overlap, plus Coulomb.
//! - **Bonded terms** ([`bonded`]) - Harmonic radial and angular bonds and the periodic
//!   torsional term.
//! - **External fields** ([`fields`]) - Gravitational, electric and magnetic fields.
//! - **Parameters** ([`elements`]) - Per-element mass and Lennard-Jones parameters.
//! - **Units** ([`units`]) - Conversion constants shared by all of the above.
//!
//! Forces are returned in eV/Å. Turning them into accelerations is the job of the
//! [`crate::engine::forces::ForceCalculator`].

pub mod bonded;
pub mod elements;
pub mod fields;
pub mod potentials;
pub mod units;
