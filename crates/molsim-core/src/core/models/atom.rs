use crate::core::forcefield::elements::ElementParams;
use nalgebra::{Point3, Vector3};

/// A point particle and its dynamical state.
///
/// `index` always equals the atom's current slot in its [`AtomStore`](super::store::AtomStore);
/// the store rewrites it whenever atoms are removed and the survivors are compacted.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom's current slot.
    pub index: usize,
    /// Element symbol the parameters were derived from.
    pub symbol: String,
    /// Position in Å.
    pub position: Point3<f64>,
    /// Velocity in Å/fs.
    pub velocity: Vector3<f64>,
    /// Acceleration in Å/fs² from the last completed step.
    pub acceleration: Vector3<f64>,
    /// Force accumulator. During force evaluation it collects eV/Å and is then converted
    /// in place to the new acceleration (Å/fs²); the corrector rescales it by mass, leaving
    /// `mass × acceleration` for diagnostics.
    pub force: Vector3<f64>,
    /// Displacement applied by the most recent predictor step.
    pub displacement: Vector3<f64>,
    /// Mass in amu.
    pub mass: f64,
    /// Lennard-Jones diameter in Å.
    pub sigma: f64,
    /// Lennard-Jones well depth in eV.
    pub epsilon: f64,
    /// Charge in elementary charges.
    pub charge: f64,
    /// Velocity damping coefficient in 1/fs.
    pub damping: f64,
    pub movable: bool,
    pub visible: bool,
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            index: 0,
            symbol: String::new(),
            position: Point3::origin(),
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            force: Vector3::zeros(),
            displacement: Vector3::zeros(),
            mass: 1.0,
            sigma: 1.0,
            epsilon: 0.0,
            charge: 0.0,
            damping: 0.0,
            movable: true,
            visible: true,
        }
    }
}

impl Atom {
    /// Creates an atom in slot `index` from element parameters.
    pub fn new(
        index: usize,
        element: &ElementParams,
        position: Point3<f64>,
        velocity: Vector3<f64>,
        charge: f64,
    ) -> Self {
        Self {
            index,
            symbol: element.symbol.to_string(),
            position,
            velocity,
            mass: element.mass,
            sigma: element.sigma,
            epsilon: element.epsilon,
            charge,
            ..Self::default()
        }
    }

    /// Clears the mutable state of an atom that is being returned to the free slots.
    pub fn clear(&mut self) {
        self.velocity = Vector3::zeros();
        self.acceleration = Vector3::zeros();
        self.force = Vector3::zeros();
        self.displacement = Vector3::zeros();
        self.charge = 0.0;
        self.damping = 0.0;
        self.movable = true;
        self.visible = true;
    }

    /// Kinetic energy in eV.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        crate::core::forcefield::units::kinetic_energy(self.mass, self.velocity.norm_squared())
    }
}
