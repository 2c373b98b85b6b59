//! Predictor and corrector halves of one time step.
//!
//! Together with a force evaluation in between they reproduce velocity Verlet:
//! `v(t + h) = v(t) + ½h(a(t) + a(t + h))`. Pinned atoms take part in neither half.

use crate::core::models::atom::Atom;
use nalgebra::Vector3;

/// Second-order Taylor step from the stored acceleration.
///
/// Records each atom's displacement for the neighbor-list and obstacle checks, and leaves
/// the velocity advanced by a full `a·h`; [`correct`] replaces half of that with the new
/// acceleration.
pub fn predict(atoms: &mut [Atom], time_step: f64) {
    let half_step_sq = 0.5 * time_step * time_step;
    for atom in atoms.iter_mut() {
        if !atom.movable {
            atom.displacement = Vector3::zeros();
            continue;
        }
        let displacement = atom.velocity * time_step + atom.acceleration * half_step_sq;
        atom.position += displacement;
        atom.displacement = displacement;
        atom.velocity += atom.acceleration * time_step;
    }
}

/// Folds the freshly evaluated acceleration (held in `force`) into the velocity, stores it
/// as the current acceleration and rescales `force` back to `mass × acceleration`.
pub fn correct(atoms: &mut [Atom], time_step: f64) {
    let half_step = 0.5 * time_step;
    for atom in atoms.iter_mut() {
        if !atom.movable {
            atom.velocity = Vector3::zeros();
            atom.acceleration = Vector3::zeros();
            atom.force = Vector3::zeros();
            continue;
        }
        let fresh = atom.force;
        atom.velocity += (fresh - atom.acceleration) * half_step;
        atom.acceleration = fresh;
        atom.force = fresh * atom.mass;
    }
}
