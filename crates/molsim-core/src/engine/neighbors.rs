use crate::core::models::atom::Atom;
use crate::core::models::bonds::BondSet;
use crate::core::models::simbox::SimulationBox;
use nalgebra::Point3;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Verlet neighbor list.
///
/// Atom `i`'s candidate partners `j > i` live in `partners[starts[i]..starts[i + 1]]`.
/// A pair is a candidate when its squared separation is below `list_ratio² · σᵢσⱼ`; bonded
/// and angle-end pairs never are. The list stays valid until some atom has moved far enough
/// from where it was at the last rebuild that a pair outside the list could have come
/// within the interaction cutoff.
#[derive(Debug)]
pub struct NeighborList {
    starts: Vec<usize>,
    partners: Vec<usize>,
    reference: Vec<Point3<f64>>,
    cutoff_ratio: f64,
    list_ratio: f64,
    stale: AtomicBool,
}

impl NeighborList {
    /// Creates an empty list that will be built on first use.
    pub fn new(cutoff_ratio: f64, list_ratio: f64) -> Self {
        Self {
            starts: vec![0],
            partners: Vec::new(),
            reference: Vec::new(),
            cutoff_ratio,
            list_ratio,
            stale: AtomicBool::new(true),
        }
    }

    pub fn cutoff_ratio(&self) -> f64 {
        self.cutoff_ratio
    }

    pub fn list_ratio(&self) -> f64 {
        self.list_ratio
    }

    /// Forces a full rebuild on the next force evaluation.
    #[inline]
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Candidate partners of atom `i`, all with larger indices.
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        match (self.starts.get(i), self.starts.get(i + 1)) {
            (Some(&start), Some(&end)) => &self.partners[start..end],
            _ => &[],
        }
    }

    pub fn pair_count(&self) -> usize {
        self.partners.len()
    }

    /// Full O(N²) pass over all pairs.
    pub fn rebuild(&mut self, atoms: &[Atom], bonds: &BondSet, sim_box: &SimulationBox) {
        let list_sq = self.list_ratio * self.list_ratio;
        let candidates_of = |i: usize| -> Vec<usize> {
            let a = &atoms[i];
            ((i + 1)..atoms.len())
                .filter(|&j| {
                    let b = &atoms[j];
                    let dist_sq = sim_box.separation(&a.position, &b.position).norm_squared();
                    dist_sq < list_sq * a.sigma * b.sigma && !bonds.is_excluded(i, j)
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<usize>> = (0..atoms.len()).map(candidates_of).collect();

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<usize>> = (0..atoms.len()).into_par_iter().map(candidates_of).collect();

        self.starts.clear();
        self.partners.clear();
        self.starts.push(0);
        for row in rows {
            self.partners.extend(row);
            self.starts.push(self.partners.len());
        }
        self.reference.clear();
        self.reference.extend(atoms.iter().map(|atom| atom.position));
        self.stale.store(false, Ordering::Release);

        debug!(
            atoms = atoms.len(),
            pairs = self.partners.len(),
            "Rebuilt neighbor list."
        );
    }

    /// Largest distance any atom has moved since the last rebuild, in units of its own σ.
    pub fn max_scaled_displacement(&self, atoms: &[Atom]) -> f64 {
        if atoms.len() != self.reference.len() {
            return f64::INFINITY;
        }

        let scaled = |(atom, reference): (&Atom, &Point3<f64>)| {
            (atom.position - reference).norm() / atom.sigma
        };

        #[cfg(not(feature = "parallel"))]
        let max = atoms
            .iter()
            .zip(self.reference.iter())
            .map(scaled)
            .fold(0.0, f64::max);

        #[cfg(feature = "parallel")]
        let max = atoms
            .par_iter()
            .zip(self.reference.par_iter())
            .map(scaled)
            .reduce(|| 0.0, f64::max);

        max
    }

    /// Marks the list stale once twice the largest scaled displacement exceeds the skin.
    /// Returns whether the list is stale afterwards.
    pub fn update_staleness(&self, atoms: &[Atom]) -> bool {
        if self.is_stale() {
            return true;
        }
        let skin = self.list_ratio - self.cutoff_ratio;
        if 2.0 * self.max_scaled_displacement(atoms) > skin {
            self.invalidate();
            return true;
        }
        false
    }
}
