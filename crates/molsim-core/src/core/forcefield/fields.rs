use nalgebra::{Point3, Unit, Vector3};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kinds of uniform external field an atom can feel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Acts on mass. Intensity in eV/(Å·amu).
    Gravitational,
    /// Acts on charge. Intensity in V/Å.
    Electric,
    /// Lorentz force on moving charges. Intensity in eV·fs/(Å²·e); does no work.
    Magnetic,
}

#[derive(Debug, Error)]
#[error("Unknown field kind: '{0}'")]
pub struct ParseFieldKindError(String);

impl FromStr for FieldKind {
    type Err = ParseFieldKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gravity" | "gravitational" => Ok(Self::Gravitational),
            "electric" => Ok(Self::Electric),
            "magnetic" => Ok(Self::Magnetic),
            _ => Err(ParseFieldKindError(s.to_string())),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gravitational => "gravitational",
            Self::Electric => "electric",
            Self::Magnetic => "magnetic",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub intensity: f64,
    pub direction: Unit<Vector3<f64>>,
}

impl Field {
    #[inline]
    fn vector(&self) -> Vector3<f64> {
        self.direction.into_inner() * self.intensity
    }
}

/// Force and potential energy an atom picks up from the active fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldContribution {
    pub force: Vector3<f64>,
    pub energy: f64,
}

/// The set of uniform fields applied to every movable atom once per step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalFields {
    gravitational: Option<Field>,
    electric: Option<Field>,
    magnetic: Option<Field>,
}

impl ExternalFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a field. A zero intensity or a zero direction switches the field off.
    pub fn set(&mut self, kind: FieldKind, intensity: f64, direction: Vector3<f64>) {
        let field = Unit::try_new(direction, 1e-12)
            .filter(|_| intensity != 0.0)
            .map(|direction| Field {
                intensity,
                direction,
            });
        *self.slot_mut(kind) = field;
    }

    pub fn clear(&mut self, kind: FieldKind) {
        *self.slot_mut(kind) = None;
    }

    pub fn get(&self, kind: FieldKind) -> Option<&Field> {
        match kind {
            FieldKind::Gravitational => self.gravitational.as_ref(),
            FieldKind::Electric => self.electric.as_ref(),
            FieldKind::Magnetic => self.magnetic.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gravitational.is_none() && self.electric.is_none() && self.magnetic.is_none()
    }

    fn slot_mut(&mut self, kind: FieldKind) -> &mut Option<Field> {
        match kind {
            FieldKind::Gravitational => &mut self.gravitational,
            FieldKind::Electric => &mut self.electric,
            FieldKind::Magnetic => &mut self.magnetic,
        }
    }

    /// Sums every active field acting on one atom. Energies are measured from the origin;
    /// the magnetic term contributes none.
    pub fn contribution(
        &self,
        position: &Point3<f64>,
        velocity: &Vector3<f64>,
        mass: f64,
        charge: f64,
    ) -> FieldContribution {
        let mut force = Vector3::zeros();
        let mut energy = 0.0;

        if let Some(field) = &self.gravitational {
            let g = field.vector() * mass;
            force += g;
            energy -= g.dot(&position.coords);
        }
        if charge != 0.0 {
            if let Some(field) = &self.electric {
                let e = field.vector() * charge;
                force += e;
                energy -= e.dot(&position.coords);
            }
            if let Some(field) = &self.magnetic {
                force += velocity.cross(&field.vector()) * charge;
            }
        }

        FieldContribution { force, energy }
    }
}
