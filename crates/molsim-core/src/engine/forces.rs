use super::neighbors::NeighborList;
use crate::core::forcefield::bonded::{self, BondedForces};
use crate::core::forcefield::fields::ExternalFields;
use crate::core::forcefield::potentials::{
    coulomb, combined_epsilon, combined_sigma_sq, lennard_jones_12_6,
};
use crate::core::forcefield::units::GF_CONVERSION_CONSTANT;
use crate::core::models::atom::Atom;
use crate::core::models::bonds::BondSet;
use crate::core::models::simbox::SimulationBox;

/// Charges smaller than this are treated as neutral.
const CHARGE_EPSILON: f64 = 1e-12;

/// Potential energy of the last evaluation, split by term. All values in eV.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyBreakdown {
    pub lennard_jones: f64,
    pub coulomb: f64,
    pub field: f64,
    pub bonded: f64,
}

impl EnergyBreakdown {
    pub fn total(&self) -> f64 {
        self.lennard_jones + self.coulomb + self.field + self.bonded
    }
}

/// Everything a force evaluation reads besides the atoms themselves.
#[derive(Debug, Clone, Copy)]
pub struct ForceContext<'a> {
    pub bonds: &'a BondSet,
    pub sim_box: &'a SimulationBox,
    pub fields: &'a ExternalFields,
}

/// Turns positions into accelerations.
///
/// After [`ForceCalculator::evaluate`] each movable atom's `force` field holds its new
/// acceleration in Å/fs²; pinned atoms are left with zero.
#[derive(Debug)]
pub struct ForceCalculator {
    neighbors: NeighborList,
    last_energy: EnergyBreakdown,
}

impl ForceCalculator {
    pub fn new(cutoff_ratio: f64, list_ratio: f64) -> Self {
        Self {
            neighbors: NeighborList::new(cutoff_ratio, list_ratio),
            last_energy: EnergyBreakdown::default(),
        }
    }

    pub fn neighbors(&self) -> &NeighborList {
        &self.neighbors
    }

    pub fn neighbors_mut(&mut self) -> &mut NeighborList {
        &mut self.neighbors
    }

    pub fn last_energy(&self) -> &EnergyBreakdown {
        &self.last_energy
    }

    /// Full force evaluation for a dynamics step: [`evaluate`](Self::evaluate) followed by
    /// velocity damping. Returns the average potential energy per movable atom.
    pub fn compute(&mut self, atoms: &mut [Atom], ctx: ForceContext<'_>) -> f64 {
        let average = self.evaluate(atoms, ctx);
        apply_damping(atoms);
        average
    }

    /// Evaluates every conservative and field term, rebuilding the neighbor list first if it
    /// is stale. Returns the average potential energy per movable atom.
    pub fn evaluate(&mut self, atoms: &mut [Atom], ctx: ForceContext<'_>) -> f64 {
        if self.neighbors.is_stale() {
            self.neighbors.rebuild(atoms, ctx.bonds, ctx.sim_box);
        }

        for atom in atoms.iter_mut() {
            atom.force.fill(0.0);
        }

        let mut energy = EnergyBreakdown::default();
        self.accumulate_pairs(atoms, ctx.sim_box, &mut energy);
        energy.field = accumulate_fields(atoms, ctx.fields);
        forces_to_accelerations(atoms);
        energy.bonded = accumulate_bonded(atoms, ctx.bonds);

        self.last_energy = energy;
        let movable = atoms.iter().filter(|atom| atom.movable).count();
        if movable == 0 {
            0.0
        } else {
            energy.total() / movable as f64
        }
    }

    fn accumulate_pairs(
        &self,
        atoms: &mut [Atom],
        sim_box: &SimulationBox,
        energy: &mut EnergyBreakdown,
    ) {
        let cutoff_sq = self.neighbors.cutoff_ratio() * self.neighbors.cutoff_ratio();
        let any_charged = atoms.iter().any(|atom| atom.charge.abs() > CHARGE_EPSILON);

        for i in 0..atoms.len() {
            for &j in self.neighbors.neighbors(i) {
                let (a, b) = (&atoms[i], &atoms[j]);
                let separation = sim_box.separation(&a.position, &b.position);
                let dist_sq = separation.norm_squared();
                if dist_sq >= cutoff_sq * a.sigma * b.sigma {
                    continue;
                }

                let lj = lennard_jones_12_6(
                    dist_sq,
                    combined_sigma_sq(a.sigma, b.sigma),
                    combined_epsilon(a.epsilon, b.epsilon),
                );
                let mut force_over_r = lj.force_over_r;
                energy.lennard_jones += lj.energy;

                if any_charged
                    && a.charge.abs() > CHARGE_EPSILON
                    && b.charge.abs() > CHARGE_EPSILON
                {
                    let electrostatic = coulomb(dist_sq, a.charge, b.charge);
                    force_over_r += electrostatic.force_over_r;
                    energy.coulomb += electrostatic.energy;
                }

                let force = separation * force_over_r;
                atoms[i].force += force;
                atoms[j].force -= force;
            }
        }
    }
}

fn accumulate_fields(atoms: &mut [Atom], fields: &ExternalFields) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let mut energy = 0.0;
    for atom in atoms.iter_mut().filter(|atom| atom.movable) {
        let contribution =
            fields.contribution(&atom.position, &atom.velocity, atom.mass, atom.charge);
        atom.force += contribution.force;
        energy += contribution.energy;
    }
    energy
}

/// Converts the accumulated eV/Å into Å/fs² in place.
fn forces_to_accelerations(atoms: &mut [Atom]) {
    for atom in atoms.iter_mut() {
        if atom.movable {
            atom.force *= GF_CONVERSION_CONSTANT / atom.mass;
        } else {
            atom.force.fill(0.0);
        }
    }
}

/// Adds each bonded term's acceleration to its atoms and returns the bonded energy.
fn accumulate_bonded(atoms: &mut [Atom], bonds: &BondSet) -> f64 {
    fn apply<const N: usize>(atoms: &mut [Atom], indices: &[usize; N], term: &BondedForces<N>) {
        for (&index, force) in indices.iter().zip(term.forces.iter()) {
            if let Some(atom) = atoms.get_mut(index).filter(|atom| atom.movable) {
                atom.force += force * (GF_CONVERSION_CONSTANT / atom.mass);
            }
        }
    }

    let mut energy = 0.0;
    for bond in bonds.rbonds() {
        let [a, b] = bond.atoms;
        let term = bonded::radial(
            &atoms[a].position,
            &atoms[b].position,
            bond.stiffness,
            bond.rest_length,
        );
        energy += term.energy;
        apply(atoms, &bond.atoms, &term);
    }
    for bond in bonds.abonds() {
        let [a, b, c] = bond.atoms;
        let term = bonded::angular(
            &atoms[a].position,
            &atoms[b].position,
            &atoms[c].position,
            bond.stiffness,
            bond.equilibrium_angle,
        );
        energy += term.energy;
        apply(atoms, &bond.atoms, &term);
    }
    for bond in bonds.tbonds() {
        let [a, b, c, d] = bond.atoms;
        let term = bonded::torsional(
            &atoms[a].position,
            &atoms[b].position,
            &atoms[c].position,
            &atoms[d].position,
            bond.stiffness,
            bond.periodicity,
            bond.equilibrium_angle,
        );
        energy += term.energy;
        apply(atoms, &bond.atoms, &term);
    }
    energy
}

/// Subtracts `damping · v` from each movable atom's acceleration.
pub fn apply_damping(atoms: &mut [Atom]) {
    for atom in atoms.iter_mut().filter(|atom| atom.movable && atom.damping != 0.0) {
        atom.force -= atom.velocity * atom.damping;
    }
}
