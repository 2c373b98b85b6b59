use crate::core::forcefield::units::GF_CONVERSION_CONSTANT;
use crate::core::models::atom::Atom;
use crate::core::models::selection::AtomSelection;
use nalgebra::Vector3;

/// Global force norms below this (eV/Å) count as converged.
pub const CONVERGED_FORCE_NORM: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationSummary {
    pub steps_taken: usize,
    /// Average potential energy per movable atom before the first step, in eV.
    pub initial_energy: f64,
    /// Average potential energy per movable atom after the last step, in eV.
    pub final_energy: f64,
    pub converged: bool,
}

/// What one descent step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescentStep {
    /// The selection moved; carries the global force norm in eV/Å.
    Moved(f64),
    /// The forces were too small to define a direction. Nothing moved.
    Converged,
    /// The force norm was NaN or infinite. Nothing moved.
    NonFinite,
}

/// Fixed-length steepest descent.
///
/// Each step moves every selected movable atom by `F · step_length / ‖F‖`, where `‖F‖` is
/// the Euclidean norm of the concatenated forces of the whole selection. The selection as a
/// whole therefore travels exactly `step_length` Å per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteepestDescent {
    pub step_length: f64,
}

impl SteepestDescent {
    pub fn new(step_length: f64) -> Self {
        Self { step_length }
    }

    /// Moves the atoms along the forces left by the last evaluation, which hold
    /// accelerations.
    pub fn step(&self, atoms: &mut [Atom], selection: Option<&AtomSelection>) -> DescentStep {
        let participates =
            |atom: &Atom| atom.movable && selection.is_none_or(|s| s.contains(atom.index));

        let norm = atoms
            .iter()
            .filter(|&atom| participates(atom))
            .map(|atom| raw_force(atom).norm_squared())
            .sum::<f64>()
            .sqrt();
        let positions_finite = atoms
            .iter()
            .filter(|&atom| participates(atom))
            .all(|atom| atom.position.iter().all(|c| c.is_finite()));
        if !(positions_finite && norm.is_finite()) {
            return DescentStep::NonFinite;
        }
        if norm <= CONVERGED_FORCE_NORM {
            return DescentStep::Converged;
        }

        let scale = self.step_length / norm;
        for atom in atoms.iter_mut() {
            if participates(atom) {
                let displacement = raw_force(atom) * scale;
                atom.position += displacement;
                atom.displacement = displacement;
            } else {
                atom.displacement = Vector3::zeros();
            }
        }
        DescentStep::Moved(norm)
    }
}

/// Recovers eV/Å from an acceleration in Å/fs².
#[inline]
fn raw_force(atom: &Atom) -> Vector3<f64> {
    atom.force * (atom.mass / GF_CONVERSION_CONSTANT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn atom_with_force(index: usize, force_ev_per_a: Vector3<f64>, mass: f64) -> Atom {
        Atom {
            index,
            mass,
            force: force_ev_per_a * (GF_CONVERSION_CONSTANT / mass),
            ..Atom::default()
        }
    }

    #[test]
    fn selection_moves_exactly_one_step_length() {
        let mut atoms = vec![
            atom_with_force(0, Vector3::new(3.0, 0.0, 0.0), 10.0),
            atom_with_force(1, Vector3::new(0.0, 4.0, 0.0), 20.0),
        ];
        let outcome = SteepestDescent::new(0.5).step(&mut atoms, None);

        assert!(matches!(outcome, DescentStep::Moved(norm) if (norm - 5.0).abs() < 1e-12));
        assert!((atoms[0].position.x - 0.3).abs() < 1e-12);
        assert!((atoms[1].position.y - 0.4).abs() < 1e-12);
        let travelled: f64 = atoms
            .iter()
            .map(|atom| atom.displacement.norm_squared())
            .sum::<f64>()
            .sqrt();
        assert!((travelled - 0.5).abs() < 1e-12);
    }

    #[test]
    fn norm_covers_only_the_selection() {
        let mut atoms = vec![
            atom_with_force(0, Vector3::new(3.0, 0.0, 0.0), 10.0),
            atom_with_force(1, Vector3::new(0.0, 4.0, 0.0), 20.0),
        ];
        let selection = AtomSelection::from_indices([1]);
        let outcome = SteepestDescent::new(0.5).step(&mut atoms, Some(&selection));

        assert!(matches!(outcome, DescentStep::Moved(norm) if (norm - 4.0).abs() < 1e-12));
        assert_eq!(atoms[0].position, Point3::origin());
        assert!((atoms[1].position.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pinned_atoms_stay_put() {
        let mut atoms = vec![
            atom_with_force(0, Vector3::new(3.0, 0.0, 0.0), 10.0),
            atom_with_force(1, Vector3::new(0.0, 4.0, 0.0), 20.0),
        ];
        atoms[0].movable = false;
        let outcome = SteepestDescent::new(0.5).step(&mut atoms, None);
        assert!(matches!(outcome, DescentStep::Moved(_)));
        assert_eq!(atoms[0].position, Point3::origin());
        assert_eq!(atoms[0].displacement, Vector3::zeros());
    }

    #[test]
    fn vanishing_forces_stop_the_descent() {
        let mut atoms = vec![atom_with_force(0, Vector3::zeros(), 10.0)];
        assert_eq!(
            SteepestDescent::new(0.5).step(&mut atoms, None),
            DescentStep::Converged
        );
        assert_eq!(atoms[0].position, Point3::origin());
    }

    #[test]
    fn non_finite_forces_are_not_convergence() {
        let mut atoms = vec![
            atom_with_force(0, Vector3::new(f64::NAN, 0.0, 0.0), 10.0),
            atom_with_force(1, Vector3::new(1.0, 0.0, 0.0), 10.0),
        ];
        assert_eq!(
            SteepestDescent::new(0.5).step(&mut atoms, None),
            DescentStep::NonFinite
        );
        assert_eq!(atoms[1].position, Point3::origin());

        // A lost coordinate leaves its pair out of every sum, so the forces alone look calm.
        let mut atoms = vec![atom_with_force(0, Vector3::zeros(), 10.0)];
        atoms[0].position.y = f64::NAN;
        assert_eq!(
            SteepestDescent::new(0.5).step(&mut atoms, None),
            DescentStep::NonFinite
        );
    }
}
