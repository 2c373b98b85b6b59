use crate::core::models::atom::Atom;
use crate::core::models::simbox::SimulationBox;

/// Points the normal velocity component of every movable atom whose surface has passed a
/// box face back into the box. Returns the number of atoms touched.
///
/// This is a sign correction applied every step an atom sits across a face, not an
/// exact time-of-impact bounce. Periodic boxes are left alone; only pair separations
/// see the periodicity.
pub fn reflect_velocities(atoms: &mut [Atom], sim_box: &SimulationBox) -> usize {
    if sim_box.is_periodic() {
        return 0;
    }
    let half = &sim_box.half_extents;
    let mut touched = 0;
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        let radius = 0.5 * atom.sigma;
        let mut hit = false;
        for k in 0..3 {
            if atom.position[k] + radius > half[k] {
                atom.velocity[k] = -atom.velocity[k].abs();
                hit = true;
            } else if atom.position[k] - radius < -half[k] {
                atom.velocity[k] = atom.velocity[k].abs();
                hit = true;
            }
        }
        if hit {
            touched += 1;
        }
    }
    touched
}

/// Clamps movable atoms back inside a reflecting box. Used by relaxation, which moves atoms
/// without velocities to flip.
pub fn confine_positions(atoms: &mut [Atom], sim_box: &SimulationBox) {
    if sim_box.is_periodic() {
        return;
    }
    let half = &sim_box.half_extents;
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        let radius = 0.5 * atom.sigma;
        for k in 0..3 {
            let limit = (half[k] - radius).max(0.0);
            atom.position[k] = atom.position[k].clamp(-limit, limit);
        }
    }
}
