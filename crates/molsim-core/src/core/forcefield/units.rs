//! Physical constants for the model's unit system: Å, fs, amu, eV and elementary charges.

/// Converts a force-over-mass in eV/(Å·amu) into an acceleration in Å/fs².
pub const GF_CONVERSION_CONSTANT: f64 = 0.009648533;

/// k·e² in eV·Å.
pub const COULOMB_CONSTANT: f64 = 14.399645;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_CONSTANT: f64 = 8.617333262e-5;

/// Average kinetic energy per atom (eV) times this constant gives the temperature in Kelvin.
pub const EV_TO_KELVIN: f64 = 2.0 / (3.0 * BOLTZMANN_CONSTANT);

/// Kinetic energy in eV of a particle of `mass` amu moving with `speed_sq` Å²/fs².
#[inline]
pub fn kinetic_energy(mass: f64, speed_sq: f64) -> f64 {
    0.5 * mass * speed_sq / GF_CONVERSION_CONSTANT
}
