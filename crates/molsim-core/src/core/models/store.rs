use super::atom::Atom;
use super::selection::AtomSelection;
use crate::core::forcefield::elements::ElementParams;
use nalgebra::{Point3, Vector3};

/// Maps each pre-removal index to its new slot, or `None` if the atom was removed.
pub type IndexRemap = Vec<Option<usize>>;

/// Fixed-capacity storage for atoms.
///
/// Live atoms occupy slots `[0, len)`. Slots past `len` hold cleared atoms that are reused by
/// [`AtomStore::add_atom`]. Any removal compacts the live atoms to the front, so indices held
/// elsewhere must be remapped with the returned [`IndexRemap`].
#[derive(Debug, Clone)]
pub struct AtomStore {
    slots: Vec<Atom>,
    count: usize,
}

impl AtomStore {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|index| Atom {
                index,
                ..Atom::default()
            })
            .collect();
        Self { slots, count: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.slots[..self.count]
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.slots[..self.count]
    }

    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.atoms().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms_mut().get_mut(index)
    }

    /// Appends an atom at the next free slot. Returns `false` when the store is full.
    pub fn add_atom(
        &mut self,
        element: &ElementParams,
        position: Point3<f64>,
        velocity: Vector3<f64>,
        charge: f64,
    ) -> bool {
        if self.count >= self.slots.len() {
            return false;
        }
        self.slots[self.count] = Atom::new(self.count, element, position, velocity, charge);
        self.count += 1;
        true
    }

    /// Removes the selected atoms, keeping the survivors in their original relative order.
    ///
    /// Removed atoms are cleared and parked directly after the survivors, ready for reuse.
    /// Indices outside the live range are ignored.
    pub fn remove_atoms(&mut self, selection: &AtomSelection) -> IndexRemap {
        let live: Vec<Atom> = self.slots.drain(..self.count).collect();
        let mut remap = Vec::with_capacity(live.len());
        let mut kept = Vec::with_capacity(live.len());
        let mut removed = Vec::new();

        for (old_index, atom) in live.into_iter().enumerate() {
            if selection.contains(old_index) {
                remap.push(None);
                removed.push(atom);
            } else {
                remap.push(Some(kept.len()));
                kept.push(atom);
            }
        }

        for atom in &mut removed {
            atom.clear();
        }

        self.count = kept.len();
        kept.extend(removed);
        self.slots.splice(0..0, kept);
        for (index, atom) in self.slots.iter_mut().enumerate() {
            atom.index = index;
        }

        remap
    }

    /// Removes every atom.
    pub fn clear(&mut self) {
        for atom in &mut self.slots[..self.count] {
            atom.clear();
        }
        self.count = 0;
    }
}
