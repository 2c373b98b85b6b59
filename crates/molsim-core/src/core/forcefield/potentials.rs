use super::units::COULOMB_CONSTANT;

/// Upper bound on (σ/r)²; keeps extreme overlaps finite.
pub const MAX_SR2: f64 = 2.0;

const MIN_DISTANCE_SQ: f64 = 1e-12;

/// Energy of one pair together with the scalar `F/r`.
///
/// The force on the first atom is `force_over_r * (r_i - r_j)`, so a positive value is
/// repulsive and a negative value attractive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairInteraction {
    pub energy: f64,
    pub force_over_r: f64,
}

/// Combined σ² of a pair: the arithmetic mean of the two diameters, squared once combined.
#[inline]
pub fn combined_sigma_sq(sigma_i: f64, sigma_j: f64) -> f64 {
    let sigma = 0.5 * (sigma_i + sigma_j);
    sigma * sigma
}

/// Combined well depth, `2(ε_i + ε_j)`. This is `4ε̄` for the arithmetic mean ε̄, so the
/// Lennard-Jones prefactor is already folded in.
#[inline]
pub fn combined_epsilon(epsilon_i: f64, epsilon_j: f64) -> f64 {
    2.0 * (epsilon_i + epsilon_j)
}

#[inline]
pub fn lennard_jones_12_6(dist_sq: f64, sigma_sq: f64, epsilon: f64) -> PairInteraction {
    let sr2 = (sigma_sq / dist_sq.max(MIN_DISTANCE_SQ)).min(MAX_SR2);
    let sr6 = sr2 * sr2 * sr2;
    let sr12 = sr6 * sr6;
    PairInteraction {
        energy: epsilon * (sr12 - sr6),
        // sr2 / σ² is 1/r² unless the overlap clamp is active.
        force_over_r: epsilon * (12.0 * sr12 - 6.0 * sr6) * sr2 / sigma_sq,
    }
}

#[inline]
pub fn coulomb(dist_sq: f64, q1: f64, q2: f64) -> PairInteraction {
    let dist_sq = dist_sq.max(MIN_DISTANCE_SQ);
    let energy = COULOMB_CONSTANT * q1 * q2 / dist_sq.sqrt();
    PairInteraction {
        energy,
        force_over_r: energy / dist_sq,
    }
}
