use crate::engine::model::MolecularModel;
use nalgebra::{Point3, Vector3};
use std::fmt;

/// Identifies one simulation session in logs and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The state of a model after one step, detached from the live atom arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub session: SessionId,
    pub step: u64,
    /// Simulated time in fs.
    pub time: f64,
    pub positions: Vec<Point3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    /// eV.
    pub kinetic_energy: f64,
    /// Average per movable atom, eV.
    pub potential_energy: f64,
    /// K.
    pub temperature: f64,
}

impl Snapshot {
    pub fn capture(session: SessionId, model: &MolecularModel) -> Self {
        let atoms = model.atoms();
        Self {
            session,
            step: model.step_count(),
            time: model.elapsed(),
            positions: atoms.iter().map(|atom| atom.position).collect(),
            velocities: atoms.iter().map(|atom| atom.velocity).collect(),
            kinetic_energy: model.kinetic_energy(),
            potential_energy: model.potential_energy(),
            temperature: model.temperature(),
        }
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::elements::ElementTable;
    use crate::engine::config::SimulationConfigBuilder;

    #[test]
    fn capture_copies_positions_and_energies() {
        let config = SimulationConfigBuilder::new().seed(3).build().unwrap();
        let mut model = MolecularModel::new(&config);
        let argon = ElementTable::builtin("Ar").unwrap();
        model.add_atom(argon, Point3::new(-1.9, 0.0, 0.0), Vector3::zeros(), 0.0);
        model.add_atom(argon, Point3::new(1.9, 0.0, 0.0), Vector3::zeros(), 0.0);
        model.step();

        let snapshot = Snapshot::capture(SessionId(4), &model);
        assert_eq!(snapshot.session, SessionId(4));
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.atom_count(), 2);
        assert_eq!(snapshot.positions[1], model.atoms()[1].position);
        assert_eq!(snapshot.potential_energy, model.potential_energy());

        model.step();
        assert_ne!(snapshot.positions[1], model.atoms()[1].position);
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId(12).to_string(), "session-12");
    }
}
