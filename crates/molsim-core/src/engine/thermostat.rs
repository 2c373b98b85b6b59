use crate::core::forcefield::units::{BOLTZMANN_CONSTANT, EV_TO_KELVIN, GF_CONVERSION_CONSTANT};
use crate::core::models::atom::Atom;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use super::config::HeatBathConfig;

/// Below this kinetic energy (eV) a system counts as at rest and gets fresh velocities
/// instead of a rescale.
const REST_KINETIC_ENERGY: f64 = 1e-12;

/// Total kinetic energy of the movable atoms, in eV.
pub fn kinetic_energy(atoms: &[Atom]) -> f64 {
    atoms
        .iter()
        .filter(|atom| atom.movable)
        .map(Atom::kinetic_energy)
        .sum()
}

/// Instantaneous temperature in K: average kinetic energy per movable atom times
/// [`EV_TO_KELVIN`].
pub fn temperature(atoms: &[Atom]) -> f64 {
    let movable = atoms.iter().filter(|atom| atom.movable).count();
    if movable == 0 {
        return 0.0;
    }
    kinetic_energy(atoms) / movable as f64 * EV_TO_KELVIN
}

/// Subtracts the mass-weighted mean velocity from every movable atom.
pub fn remove_drift(atoms: &mut [Atom]) {
    let (momentum, mass) = atoms
        .iter()
        .filter(|atom| atom.movable)
        .fold((Vector3::zeros(), 0.0), |(p, m), atom| {
            (p + atom.velocity * atom.mass, m + atom.mass)
        });
    if mass <= 0.0 {
        return;
    }
    let drift = momentum / mass;
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        atom.velocity -= drift;
    }
}

/// Drives the movable atoms to `target` K and returns the temperature reached.
///
/// A system at rest receives Maxwell-Boltzmann velocities with the centre-of-mass drift
/// removed; any other system is rescaled by √(target / current). Either way the result
/// sits exactly at the target unless there is only one degree of freedom left to move.
pub fn set_temperature<R: Rng + ?Sized>(atoms: &mut [Atom], target: f64, rng: &mut R) -> f64 {
    if !atoms.iter().any(|atom| atom.movable) {
        warn!(target_kelvin = target, "No movable atoms to set a temperature on.");
        return 0.0;
    }

    let target = target.max(0.0);
    if target == 0.0 {
        for atom in atoms.iter_mut().filter(|atom| atom.movable) {
            atom.velocity = Vector3::zeros();
        }
        return 0.0;
    }

    if kinetic_energy(atoms) < REST_KINETIC_ENERGY {
        assign_maxwell_boltzmann(atoms, target, rng);
        remove_drift(atoms);
    }

    let current = temperature(atoms);
    if current <= 0.0 {
        debug!("Velocities cancelled out after drift removal; temperature stays at zero.");
        return 0.0;
    }
    let scale = (target / current).sqrt();
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        atom.velocity *= scale;
    }
    temperature(atoms)
}

/// Each Cartesian component is drawn from N(0, k_B·T/m) in Å/fs.
fn assign_maxwell_boltzmann<R: Rng + ?Sized>(atoms: &mut [Atom], target: f64, rng: &mut R) {
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        let sigma = (BOLTZMANN_CONSTANT * target * GF_CONVERSION_CONSTANT / atom.mass).sqrt();
        atom.velocity = Vector3::from_fn(|_, _| {
            let unit: f64 = rng.sample(StandardNormal);
            unit * sigma
        });
    }
}

/// Periodically resets the temperature to a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatBath {
    pub target: f64,
    pub interval: u64,
}

impl HeatBath {
    pub fn new(config: HeatBathConfig) -> Self {
        Self {
            target: config.target,
            interval: config.interval.max(1),
        }
    }

    #[inline]
    pub fn is_due(&self, step: u64) -> bool {
        step > 0 && step % self.interval == 0
    }
}
