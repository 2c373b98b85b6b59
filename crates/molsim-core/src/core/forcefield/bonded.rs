//! Harmonic radial and angular bonds and the periodic torsional term.
//!
//! Every function takes positions and parameters and returns the energy in eV together
//! with the force on each participating atom in eV/Å, in the order the atoms were passed.

use nalgebra::{Point3, Vector3};

/// Smallest |sin θ| used as a divisor; smaller values keep their sign and snap to this.
pub const MIN_SIN_ANGLE: f64 = 1e-4;

const MIN_LENGTH: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondedForces<const N: usize> {
    pub energy: f64,
    pub forces: [Vector3<f64>; N],
}

#[inline]
fn clamp_sin(sin: f64) -> f64 {
    if sin.abs() < MIN_SIN_ANGLE {
        MIN_SIN_ANGLE.copysign(sin)
    } else {
        sin
    }
}

/// Lengths, unit vectors and the angle between two vectors.
struct AngleFrame {
    len_u: f64,
    len_w: f64,
    unit_u: Vector3<f64>,
    unit_w: Vector3<f64>,
    cos: f64,
    sin: f64,
    theta: f64,
}

impl AngleFrame {
    fn new(u: Vector3<f64>, w: Vector3<f64>) -> Self {
        let len_u = u.norm().max(MIN_LENGTH);
        let len_w = w.norm().max(MIN_LENGTH);
        let unit_u = u / len_u;
        let unit_w = w / len_w;
        let cos = unit_u.dot(&unit_w);
        let sin = unit_u.cross(&unit_w).norm();
        Self {
            len_u,
            len_w,
            unit_u,
            unit_w,
            cos,
            sin,
            // atan2 stays accurate near 0 and π, where acos loses precision.
            theta: sin.atan2(cos),
        }
    }

    /// -dθ/du and -dθ/dw, with the sine clamped away from zero.
    fn negative_gradients(&self) -> (Vector3<f64>, Vector3<f64>) {
        let sin = clamp_sin(self.sin);
        let grad_u = (self.unit_w - self.unit_u * self.cos) / (self.len_u * sin);
        let grad_w = (self.unit_u - self.unit_w * self.cos) / (self.len_w * sin);
        (grad_u, grad_w)
    }
}

/// Angle in radians between two vectors, computed with atan2.
pub fn angle_between(u: &Vector3<f64>, w: &Vector3<f64>) -> f64 {
    AngleFrame::new(*u, *w).theta
}

/// E = ½k(r - r₀)², with force magnitude k(r - r₀) along the bond axis.
pub fn radial(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    stiffness: f64,
    rest_length: f64,
) -> BondedForces<2> {
    let axis = p2 - p1;
    let length = axis.norm().max(MIN_LENGTH);
    let stretch = length - rest_length;
    let force_on_first = axis * (stiffness * stretch / length);
    BondedForces {
        energy: 0.5 * stiffness * stretch * stretch,
        forces: [force_on_first, -force_on_first],
    }
}

/// E = k(θ - θ₀)², θ being the angle at `vertex` between the arms to `end1` and `end2`.
///
/// Forces are returned as `[end1, vertex, end2]`.
pub fn angular(
    end1: &Point3<f64>,
    vertex: &Point3<f64>,
    end2: &Point3<f64>,
    stiffness: f64,
    equilibrium_angle: f64,
) -> BondedForces<3> {
    let frame = AngleFrame::new(end1 - vertex, end2 - vertex);
    let deviation = frame.theta - equilibrium_angle;
    let de_dtheta = 2.0 * stiffness * deviation;

    let (grad_u, grad_w) = frame.negative_gradients();
    let f1 = grad_u * de_dtheta;
    let f3 = grad_w * de_dtheta;
    BondedForces {
        energy: stiffness * deviation * deviation,
        forces: [f1, -(f1 + f3), f3],
    }
}

/// E = k(1 - cos(nθ - γ)).
///
/// θ is the angle between the 1→2 bond vector and the 3→4 bond vector, not the dihedral
/// about the 2-3 axis. Stored equilibrium angles are defined against this angle.
pub fn torsional(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
    stiffness: f64,
    periodicity: u32,
    equilibrium_angle: f64,
) -> BondedForces<4> {
    let frame = AngleFrame::new(p2 - p1, p4 - p3);
    let n = f64::from(periodicity);
    let phase = n * frame.theta - equilibrium_angle;
    let de_dtheta = stiffness * n * phase.sin();

    let (grad_u, grad_w) = frame.negative_gradients();
    let f2 = grad_u * de_dtheta;
    let f4 = grad_w * de_dtheta;
    BondedForces {
        energy: stiffness * (1.0 - phase.cos()),
        forces: [-f2, f2, -f4, f4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-9;

    fn assert_vec_near(actual: &Vector3<f64>, expected: &Vector3<f64>, tol: f64) {
        assert!(
            (actual - expected).norm() < tol,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn numeric_force<F>(positions: &[Point3<f64>], atom: usize, energy: F) -> Vector3<f64>
    where
        F: Fn(&[Point3<f64>]) -> f64,
    {
        let h = 1e-6;
        let mut gradient = Vector3::zeros();
        for axis in 0..3 {
            let mut plus = positions.to_vec();
            let mut minus = positions.to_vec();
            plus[atom][axis] += h;
            minus[atom][axis] -= h;
            gradient[axis] = (energy(&plus) - energy(&minus)) / (2.0 * h);
        }
        -gradient
    }

    #[test]
    fn radial_force_matches_stiffness_times_stretch() {
        let p1 = Point3::origin();
        let p2 = Point3::new(2.5, 0.0, 0.0);
        let result = radial(&p1, &p2, 4.5, 2.0);

        assert_vec_near(&result.forces[0], &Vector3::new(2.25, 0.0, 0.0), TOLERANCE);
        assert_vec_near(&result.forces[1], &Vector3::new(-2.25, 0.0, 0.0), TOLERANCE);
        assert!((result.energy - 0.5 * 4.5 * 0.25).abs() < TOLERANCE);
    }

    #[test]
    fn radial_at_rest_length_exerts_no_force() {
        let result = radial(&Point3::origin(), &Point3::new(0.0, 1.2, 1.6), 3.0, 2.0);
        assert!(result.forces[0].norm() < TOLERANCE);
        assert!(result.forces[1].norm() < TOLERANCE);
        assert!(result.energy.abs() < TOLERANCE);
    }

    #[test]
    fn radial_compressed_bond_pushes_atoms_apart() {
        let result = radial(&Point3::origin(), &Point3::new(1.0, 0.0, 0.0), 2.0, 2.0);
        assert!(result.forces[0].x < 0.0);
        assert!(result.forces[1].x > 0.0);
    }

    #[test]
    fn radial_with_coincident_atoms_stays_finite() {
        let result = radial(&Point3::origin(), &Point3::origin(), 2.0, 1.0);
        assert!(result.forces[0].iter().all(|c| c.is_finite()));
    }

    #[test]
    fn angle_between_is_stable_near_zero_and_pi() {
        let u = Vector3::new(1.0, 0.0, 0.0);
        assert!(angle_between(&u, &Vector3::new(1.0, 1e-9, 0.0)).abs() < 1e-8);
        assert!((angle_between(&u, &Vector3::new(-1.0, 1e-9, 0.0)) - PI).abs() < 1e-8);
        assert!((angle_between(&u, &Vector3::new(0.0, 2.0, 0.0)) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn angular_at_equilibrium_exerts_no_force() {
        let theta0 = 104.5f64.to_radians();
        let end1 = Point3::new(1.0, 0.0, 0.0);
        let vertex = Point3::origin();
        let end2 = Point3::new(1.5 * theta0.cos(), 1.5 * theta0.sin(), 0.0);

        let result = angular(&end1, &vertex, &end2, 2.0, theta0);
        for force in &result.forces {
            assert!(force.norm() < 1e-9);
        }
        assert!(result.energy.abs() < 1e-12);
    }

    #[test]
    fn angular_forces_sum_to_zero_and_carry_no_torque() {
        let positions = [
            Point3::new(1.1, 0.2, -0.1),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-0.3, 1.4, 0.5),
        ];
        let result = angular(&positions[0], &positions[1], &positions[2], 1.5, 1.2);

        let net: Vector3<f64> = result.forces.iter().sum();
        let torque: Vector3<f64> = positions
            .iter()
            .zip(result.forces.iter())
            .map(|(p, f)| p.coords.cross(f))
            .sum();
        assert!(net.norm() < 1e-12);
        assert!(torque.norm() < 1e-9);
    }

    #[test]
    fn angular_force_matches_energy_gradient() {
        let positions = vec![
            Point3::new(1.1, 0.2, -0.1),
            Point3::new(0.1, -0.1, 0.05),
            Point3::new(-0.3, 1.4, 0.5),
        ];
        let energy =
            |p: &[Point3<f64>]| angular(&p[0], &p[1], &p[2], 1.5, 1.2).energy;
        let result = angular(&positions[0], &positions[1], &positions[2], 1.5, 1.2);

        for atom in 0..3 {
            let expected = numeric_force(&positions, atom, energy);
            assert_vec_near(&result.forces[atom], &expected, 1e-6);
        }
    }

    #[test]
    fn angular_wide_angle_is_closed_by_restoring_forces() {
        let end1 = Point3::new(1.0, 0.0, 0.0);
        let vertex = Point3::origin();
        let end2 = Point3::new(0.0, 1.0, 0.0);
        let result = angular(&end1, &vertex, &end2, 1.0, 60f64.to_radians());
        assert!(result.forces[0].y > 0.0);
        assert!(result.forces[2].x > 0.0);
    }

    #[test]
    fn angular_collinear_arms_stay_finite() {
        let result = angular(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(-1.0, 0.0, 0.0),
            1.0,
            2.0,
        );
        assert!(result.forces.iter().all(|f| f.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn torsional_uses_angle_between_outer_bond_vectors() {
        // 1→2 along +x, 3→4 along +y: θ = π/2 regardless of where the 2-3 edge sits.
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let p3 = Point3::new(1.0, 0.0, 1.5);
        let p4 = Point3::new(1.0, 1.0, 1.5);

        let result = torsional(&p1, &p2, &p3, &p4, 0.7, 2, PI);
        assert!(result.energy.abs() < 1e-12);
        for force in &result.forces {
            assert!(force.norm() < 1e-9);
        }
    }

    #[test]
    fn torsional_energy_follows_periodic_form() {
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let p3 = Point3::new(1.0, 0.0, 1.5);
        let p4 = Point3::new(2.0, 0.0, 1.5);

        // θ = 0, so E = k(1 - cos(-γ)).
        let result = torsional(&p1, &p2, &p3, &p4, 0.5, 3, PI / 3.0);
        assert!((result.energy - 0.5 * (1.0 - (PI / 3.0).cos())).abs() < TOLERANCE);
    }

    #[test]
    fn torsional_forces_balance_and_match_energy_gradient() {
        let positions = vec![
            Point3::new(0.0, 0.1, -0.2),
            Point3::new(1.0, 0.3, 0.0),
            Point3::new(1.4, 1.2, 0.4),
            Point3::new(1.9, 1.0, 1.5),
        ];
        let energy = |p: &[Point3<f64>]| torsional(&p[0], &p[1], &p[2], &p[3], 0.8, 2, 0.4).energy;
        let result = torsional(
            &positions[0],
            &positions[1],
            &positions[2],
            &positions[3],
            0.8,
            2,
            0.4,
        );

        let net: Vector3<f64> = result.forces.iter().sum();
        assert!(net.norm() < 1e-12);
        for atom in 0..4 {
            let expected = numeric_force(&positions, atom, energy);
            assert_vec_near(&result.forces[atom], &expected, 1e-6);
        }
    }
}
