use super::store::IndexRemap;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BondError {
    #[error("Illegal bond construction: {0}")]
    IllegalConstruction(String),
}

fn illegal(message: impl Into<String>) -> BondError {
    BondError::IllegalConstruction(message.into())
}

/// A harmonic bond between two atoms.
///
/// Equality and hashing consider only the (unordered) atom pair.
#[derive(Debug, Clone, Copy)]
pub struct RBond {
    pub atoms: [usize; 2],
    /// Stiffness in eV/Å².
    pub stiffness: f64,
    /// Rest length in Å.
    pub rest_length: f64,
}

impl RBond {
    fn key(&self) -> (usize, usize) {
        let [a, b] = self.atoms;
        (a.min(b), a.max(b))
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atoms.contains(&atom)
    }

    pub fn connects(&self, a: usize, b: usize) -> bool {
        self.key() == (a.min(b), a.max(b))
    }
}

impl PartialEq for RBond {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for RBond {}

impl Hash for RBond {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// A harmonic angle `atoms[0] - atoms[1] - atoms[2]` with the vertex in the middle.
///
/// Equality considers the vertex and the unordered pair of end atoms.
#[derive(Debug, Clone, Copy)]
pub struct ABond {
    pub atoms: [usize; 3],
    /// Stiffness in eV/rad².
    pub stiffness: f64,
    /// Equilibrium angle in radians.
    pub equilibrium_angle: f64,
}

impl ABond {
    fn key(&self) -> (usize, usize, usize) {
        let [a, v, b] = self.atoms;
        (a.min(b), v, a.max(b))
    }

    pub fn vertex(&self) -> usize {
        self.atoms[1]
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atoms.contains(&atom)
    }

    /// Whether one of the two arms is the radial bond `a`-`b`.
    pub fn has_arm(&self, a: usize, b: usize) -> bool {
        let [e1, v, e2] = self.atoms;
        let arm = (a.min(b), a.max(b));
        arm == (e1.min(v), e1.max(v)) || arm == (e2.min(v), e2.max(v))
    }

    fn matches(&self, end1: usize, vertex: usize, end2: usize) -> bool {
        self.key() == (end1.min(end2), vertex, end1.max(end2))
    }
}

impl PartialEq for ABond {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for ABond {}

impl Hash for ABond {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// A periodic torsion over the chain `atoms[0]-atoms[1]-atoms[2]-atoms[3]`.
///
/// Equality treats the chain and its reverse as the same torsion.
#[derive(Debug, Clone, Copy)]
pub struct TBond {
    pub atoms: [usize; 4],
    pub periodicity: u32,
    /// Barrier stiffness in eV.
    pub stiffness: f64,
    /// Phase γ in radians.
    pub equilibrium_angle: f64,
}

impl TBond {
    fn key(&self) -> [usize; 4] {
        let forward = self.atoms;
        let mut reverse = self.atoms;
        reverse.reverse();
        forward.min(reverse)
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atoms.contains(&atom)
    }
}

impl PartialEq for TBond {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for TBond {}

impl Hash for TBond {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// The three bond collections together with the per-atom topology index.
///
/// Bonds refer to atoms by index. The index (radially bonded neighbors and the set of pairs
/// excluded from non-bonded evaluation) is rebuilt whenever the bond topology changes, so
/// exclusion checks are a lookup in a short per-atom list.
#[derive(Debug, Clone, Default)]
pub struct BondSet {
    rbonds: Vec<RBond>,
    abonds: Vec<ABond>,
    tbonds: Vec<TBond>,
    neighbors: Vec<Vec<usize>>,
    exclusions: Vec<Vec<usize>>,
}

impl BondSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rbonds(&self) -> &[RBond] {
        &self.rbonds
    }

    pub fn abonds(&self) -> &[ABond] {
        &self.abonds
    }

    pub fn tbonds(&self) -> &[TBond] {
        &self.tbonds
    }

    pub fn rbond(&self, index: usize) -> Option<&RBond> {
        self.rbonds.get(index)
    }

    pub fn abond(&self, index: usize) -> Option<&ABond> {
        self.abonds.get(index)
    }

    pub fn tbond(&self, index: usize) -> Option<&TBond> {
        self.tbonds.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.rbonds.is_empty() && self.abonds.is_empty() && self.tbonds.is_empty()
    }

    /// Atoms radially bonded to `atom`.
    pub fn bonded_neighbors(&self, atom: usize) -> &[usize] {
        self.neighbors.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_bonded(&self, a: usize, b: usize) -> bool {
        self.bonded_neighbors(a).contains(&b)
    }

    /// Whether the pair is skipped by non-bonded evaluation: radially bonded, or the two
    /// ends of an angular bond.
    #[inline]
    pub fn is_excluded(&self, a: usize, b: usize) -> bool {
        self.exclusions.get(a).is_some_and(|list| list.contains(&b))
    }

    pub fn add_rbond(
        &mut self,
        atom_count: usize,
        a: usize,
        b: usize,
        stiffness: f64,
        rest_length: f64,
    ) -> Result<usize, BondError> {
        check_atoms(atom_count, &[a, b])?;
        if self.are_bonded(a, b) {
            return Err(illegal(format!("atoms {} and {} are already bonded", a, b)));
        }
        self.rbonds.push(RBond {
            atoms: [a, b],
            stiffness,
            rest_length,
        });
        self.rebuild_index();
        Ok(self.rbonds.len() - 1)
    }

    /// Adds an angle at `vertex`. Both arms must already be radial bonds.
    pub fn add_abond(
        &mut self,
        atom_count: usize,
        end1: usize,
        vertex: usize,
        end2: usize,
        stiffness: f64,
        equilibrium_angle: f64,
    ) -> Result<usize, BondError> {
        check_atoms(atom_count, &[end1, vertex, end2])?;
        if !self.are_bonded(end1, vertex) || !self.are_bonded(vertex, end2) {
            return Err(illegal(format!(
                "angle {}-{}-{} needs radial bonds on both arms",
                end1, vertex, end2
            )));
        }
        if self.find_abond(end1, vertex, end2).is_some() {
            return Err(illegal(format!(
                "angle {}-{}-{} already exists",
                end1, vertex, end2
            )));
        }
        self.abonds.push(ABond {
            atoms: [end1, vertex, end2],
            stiffness,
            equilibrium_angle,
        });
        self.rebuild_index();
        Ok(self.abonds.len() - 1)
    }

    /// Adds a torsion over `a-b-c-d`. The angles `a-b-c` and `b-c-d` must already exist.
    pub fn add_tbond(
        &mut self,
        atom_count: usize,
        atoms: [usize; 4],
        periodicity: u32,
        stiffness: f64,
        equilibrium_angle: f64,
    ) -> Result<usize, BondError> {
        check_atoms(atom_count, &atoms)?;
        let [a, b, c, d] = atoms;
        if periodicity == 0 {
            return Err(illegal("torsion periodicity must be a positive integer"));
        }
        if self.find_abond(a, b, c).is_none() || self.find_abond(b, c, d).is_none() {
            return Err(illegal(format!(
                "torsion {}-{}-{}-{} needs angles {}-{}-{} and {}-{}-{}",
                a, b, c, d, a, b, c, b, c, d
            )));
        }
        let candidate = TBond {
            atoms,
            periodicity,
            stiffness,
            equilibrium_angle,
        };
        if self.tbonds.contains(&candidate) {
            return Err(illegal(format!(
                "torsion {}-{}-{}-{} already exists",
                a, b, c, d
            )));
        }
        self.tbonds.push(candidate);
        Ok(self.tbonds.len() - 1)
    }

    pub fn find_rbond(&self, a: usize, b: usize) -> Option<usize> {
        self.rbonds.iter().position(|bond| bond.connects(a, b))
    }

    pub fn find_abond(&self, end1: usize, vertex: usize, end2: usize) -> Option<usize> {
        self.abonds
            .iter()
            .position(|bond| bond.matches(end1, vertex, end2))
    }

    /// Removes a radial bond along with every angle and torsion built on it.
    /// Returns `None` for an invalid index.
    pub fn remove_rbond(&mut self, index: usize) -> Option<RBond> {
        if index >= self.rbonds.len() {
            return None;
        }
        let removed = self.rbonds.remove(index);
        let [a, b] = removed.atoms;
        self.abonds.retain(|angle| !angle.has_arm(a, b));
        self.prune_torsions();
        self.rebuild_index();
        Some(removed)
    }

    /// Removes an angle along with every torsion built on it.
    pub fn remove_abond(&mut self, index: usize) -> Option<ABond> {
        if index >= self.abonds.len() {
            return None;
        }
        let removed = self.abonds.remove(index);
        self.prune_torsions();
        self.rebuild_index();
        Some(removed)
    }

    pub fn remove_tbond(&mut self, index: usize) -> Option<TBond> {
        if index >= self.tbonds.len() {
            return None;
        }
        Some(self.tbonds.remove(index))
    }

    /// Drops every bond touching a removed atom and rewrites the survivors' indices.
    pub fn remap_atoms(&mut self, remap: &IndexRemap) {
        fn map<const N: usize>(atoms: &mut [usize; N], remap: &IndexRemap) -> bool {
            let mut mapped = *atoms;
            for slot in mapped.iter_mut() {
                match remap.get(*slot).copied().flatten() {
                    Some(new_index) => *slot = new_index,
                    None => return false,
                }
            }
            *atoms = mapped;
            true
        }

        self.rbonds.retain_mut(|bond| map(&mut bond.atoms, remap));
        self.abonds.retain_mut(|bond| map(&mut bond.atoms, remap));
        self.tbonds.retain_mut(|bond| map(&mut bond.atoms, remap));
        self.rebuild_index();
    }

    pub fn clear(&mut self) {
        self.rbonds.clear();
        self.abonds.clear();
        self.tbonds.clear();
        self.rebuild_index();
    }

    fn prune_torsions(&mut self) {
        let abonds = &self.abonds;
        let has_angle = |e1, v, e2| abonds.iter().any(|angle| angle.matches(e1, v, e2));
        self.tbonds.retain(|torsion| {
            let [a, b, c, d] = torsion.atoms;
            has_angle(a, b, c) && has_angle(b, c, d)
        });
    }

    fn rebuild_index(&mut self) {
        let highest = self
            .rbonds
            .iter()
            .flat_map(|bond| bond.atoms)
            .chain(self.abonds.iter().flat_map(|bond| bond.atoms))
            .max();
        let size = highest.map_or(0, |h| h + 1);

        self.neighbors = vec![Vec::new(); size];
        self.exclusions = vec![Vec::new(); size];

        for bond in &self.rbonds {
            let [a, b] = bond.atoms;
            self.neighbors[a].push(b);
            self.neighbors[b].push(a);
            self.exclusions[a].push(b);
            self.exclusions[b].push(a);
        }
        for angle in &self.abonds {
            let [a, _, b] = angle.atoms;
            if !self.exclusions[a].contains(&b) {
                self.exclusions[a].push(b);
                self.exclusions[b].push(a);
            }
        }
    }
}

fn check_atoms(atom_count: usize, atoms: &[usize]) -> Result<(), BondError> {
    if let Some(&bad) = atoms.iter().find(|&&i| i >= atom_count) {
        return Err(illegal(format!(
            "atom index {} is out of range ({} atoms)",
            bad, atom_count
        )));
    }
    for (i, a) in atoms.iter().enumerate() {
        if atoms[i + 1..].contains(a) {
            return Err(illegal(format!("atom {} appears more than once", a)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Chain 0-1-2-3 with angles at 1 and 2 and one torsion.
    fn chain() -> BondSet {
        let mut bonds = BondSet::new();
        bonds.add_rbond(5, 0, 1, 1.0, 1.0).unwrap();
        bonds.add_rbond(5, 1, 2, 1.0, 1.0).unwrap();
        bonds.add_rbond(5, 2, 3, 1.0, 1.0).unwrap();
        bonds.add_abond(5, 0, 1, 2, 1.0, 2.0).unwrap();
        bonds.add_abond(5, 1, 2, 3, 1.0, 2.0).unwrap();
        bonds.add_tbond(5, [0, 1, 2, 3], 2, 0.5, 0.0).unwrap();
        bonds
    }

    #[test]
    fn rbond_equality_is_symmetric() {
        let forward = RBond {
            atoms: [1, 2],
            stiffness: 1.0,
            rest_length: 1.0,
        };
        let reverse = RBond {
            atoms: [2, 1],
            stiffness: 3.0,
            rest_length: 2.0,
        };
        assert_eq!(forward, reverse);
        let set: HashSet<RBond> = [forward, reverse].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn abond_and_tbond_equality_ignore_direction() {
        let a = ABond {
            atoms: [0, 1, 2],
            stiffness: 1.0,
            equilibrium_angle: 1.0,
        };
        let b = ABond {
            atoms: [2, 1, 0],
            stiffness: 2.0,
            equilibrium_angle: 2.0,
        };
        assert_eq!(a, b);

        let t1 = TBond {
            atoms: [0, 1, 2, 3],
            periodicity: 1,
            stiffness: 1.0,
            equilibrium_angle: 0.0,
        };
        let t2 = TBond {
            atoms: [3, 2, 1, 0],
            ..t1
        };
        assert_eq!(t1, t2);
    }

    #[test]
    fn add_rbond_rejects_same_atom_and_out_of_range() {
        let mut bonds = BondSet::new();
        assert!(matches!(
            bonds.add_rbond(3, 1, 1, 1.0, 1.0),
            Err(BondError::IllegalConstruction(_))
        ));
        assert!(matches!(
            bonds.add_rbond(3, 0, 3, 1.0, 1.0),
            Err(BondError::IllegalConstruction(_))
        ));
    }

    #[test]
    fn add_rbond_rejects_duplicates_in_either_order() {
        let mut bonds = BondSet::new();
        bonds.add_rbond(3, 0, 1, 1.0, 1.0).unwrap();
        assert!(bonds.add_rbond(3, 1, 0, 1.0, 1.0).is_err());
    }

    #[test]
    fn add_abond_requires_both_arms() {
        let mut bonds = BondSet::new();
        bonds.add_rbond(3, 0, 1, 1.0, 1.0).unwrap();
        assert!(bonds.add_abond(3, 0, 1, 2, 1.0, 2.0).is_err());
        bonds.add_rbond(3, 1, 2, 1.0, 1.0).unwrap();
        assert_eq!(bonds.add_abond(3, 0, 1, 2, 1.0, 2.0).unwrap(), 0);
        assert!(bonds.add_abond(3, 2, 1, 0, 1.0, 2.0).is_err());
    }

    #[test]
    fn add_tbond_requires_both_angles_and_positive_periodicity() {
        let mut bonds = BondSet::new();
        bonds.add_rbond(4, 0, 1, 1.0, 1.0).unwrap();
        bonds.add_rbond(4, 1, 2, 1.0, 1.0).unwrap();
        bonds.add_rbond(4, 2, 3, 1.0, 1.0).unwrap();
        bonds.add_abond(4, 0, 1, 2, 1.0, 2.0).unwrap();
        assert!(bonds.add_tbond(4, [0, 1, 2, 3], 1, 1.0, 0.0).is_err());
        bonds.add_abond(4, 1, 2, 3, 1.0, 2.0).unwrap();
        assert!(bonds.add_tbond(4, [0, 1, 2, 3], 0, 1.0, 0.0).is_err());
        assert!(bonds.add_tbond(4, [0, 1, 2, 0], 1, 1.0, 0.0).is_err());
        assert!(bonds.add_tbond(4, [0, 1, 2, 3], 1, 1.0, 0.0).is_ok());
    }

    #[test]
    fn exclusions_cover_bonded_and_angle_end_pairs() {
        let bonds = chain();
        assert!(bonds.is_excluded(0, 1));
        assert!(bonds.is_excluded(1, 0));
        assert!(bonds.is_excluded(0, 2));
        assert!(bonds.is_excluded(3, 1));
        assert!(!bonds.is_excluded(0, 3));
        assert!(!bonds.is_excluded(0, 4));
        assert!(!bonds.is_excluded(42, 0));
    }

    #[test]
    fn removing_rbond_cascades_to_angles_and_torsions() {
        let mut bonds = chain();
        let index = bonds.find_rbond(2, 1).unwrap();
        bonds.remove_rbond(index).unwrap();

        assert_eq!(bonds.rbonds().len(), 2);
        assert!(bonds.abonds().is_empty());
        assert!(bonds.tbonds().is_empty());
        assert!(!bonds.is_excluded(0, 2));
    }

    #[test]
    fn removing_outer_rbond_keeps_unrelated_angle() {
        let mut bonds = chain();
        let index = bonds.find_rbond(0, 1).unwrap();
        bonds.remove_rbond(index);
        assert_eq!(bonds.abonds().len(), 1);
        assert_eq!(bonds.abonds()[0].vertex(), 2);
        assert!(bonds.tbonds().is_empty());
    }

    #[test]
    fn removing_abond_cascades_to_torsions() {
        let mut bonds = chain();
        bonds.remove_abond(1).unwrap();
        assert_eq!(bonds.rbonds().len(), 3);
        assert!(bonds.tbonds().is_empty());
    }

    #[test]
    fn invalid_removal_indices_are_ignored() {
        let mut bonds = chain();
        assert!(bonds.remove_rbond(10).is_none());
        assert!(bonds.remove_abond(10).is_none());
        assert!(bonds.remove_tbond(10).is_none());
        assert_eq!(bonds.rbonds().len(), 3);
    }

    #[test]
    fn remap_atoms_drops_bonds_to_removed_atoms_and_shifts_the_rest() {
        let mut bonds = chain();
        // Atom 0 removed, everything else shifts down by one.
        let remap = vec![None, Some(0), Some(1), Some(2), Some(3)];
        bonds.remap_atoms(&remap);

        assert_eq!(bonds.rbonds().len(), 2);
        assert!(bonds.are_bonded(0, 1));
        assert!(bonds.are_bonded(1, 2));
        assert_eq!(bonds.abonds().len(), 1);
        assert_eq!(bonds.abonds()[0].atoms, [0, 1, 2]);
        assert!(bonds.tbonds().is_empty());
    }
}
