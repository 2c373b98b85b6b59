use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    /// Walls push atoms back by flipping the normal velocity component.
    #[default]
    Reflecting,
    /// Pair separations use the minimum-image convention. Coordinates are never wrapped.
    Periodic,
}

#[derive(Debug, Error)]
#[error("Unknown boundary type: '{0}'")]
pub struct ParseBoundaryTypeError(String);

impl FromStr for BoundaryType {
    type Err = ParseBoundaryTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reflecting" | "wall" => Ok(Self::Reflecting),
            "periodic" => Ok(Self::Periodic),
            _ => Err(ParseBoundaryTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reflecting => write!(f, "reflecting"),
            Self::Periodic => write!(f, "periodic"),
        }
    }
}

/// An axis-aligned box centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    /// Half of the box length along each axis, in Å.
    pub half_extents: Vector3<f64>,
    pub boundary: BoundaryType,
}

impl Default for SimulationBox {
    fn default() -> Self {
        Self::new(Vector3::new(20.0, 20.0, 20.0), BoundaryType::Reflecting)
    }
}

impl SimulationBox {
    pub fn new(half_extents: Vector3<f64>, boundary: BoundaryType) -> Self {
        Self {
            half_extents,
            boundary,
        }
    }

    pub fn lengths(&self) -> Vector3<f64> {
        self.half_extents * 2.0
    }

    pub fn is_periodic(&self) -> bool {
        self.boundary == BoundaryType::Periodic
    }

    /// Folds a separation vector into the nearest periodic image, however many box lengths
    /// apart the atoms have drifted. A no-op for reflecting boxes.
    #[inline]
    pub fn minimum_image(&self, mut separation: Vector3<f64>) -> Vector3<f64> {
        if self.boundary == BoundaryType::Periodic {
            for axis in 0..3 {
                let length = 2.0 * self.half_extents[axis];
                separation[axis] -= length * (separation[axis] / length).round();
            }
        }
        separation
    }

    /// `from - to`, folded by the minimum-image convention.
    #[inline]
    pub fn separation(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        self.minimum_image(from - to)
    }
}
