use super::atom::Atom;
use super::ids::ObstacleId;
use nalgebra::{Point3, Vector3};
use slotmap::SlotMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes spanning the plane perpendicular to this one.
    #[inline]
    fn cross_section(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }
}

/// Geometry of a static obstacle, relative to its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Cuboid {
        half_extents: Vector3<f64>,
    },
    Cylinder {
        axis: Axis,
        height: f64,
        radius: f64,
    },
}

/// A rigid body that reflects atoms entering its volume. Obstacles never move during a
/// collision pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Point3<f64>,
    pub shape: Shape,
}

/// Which surface of a cylinder an atom came through.
enum CylinderSurface {
    Cap,
    Side,
}

impl Obstacle {
    pub fn cuboid(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            center,
            shape: Shape::Cuboid { half_extents },
        }
    }

    pub fn cylinder(center: Point3<f64>, axis: Axis, height: f64, radius: f64) -> Self {
        Self {
            center,
            shape: Shape::Cylinder {
                axis,
                height,
                radius,
            },
        }
    }

    /// Broad-phase test: is the atom's centre within the obstacle grown by the atom's radius?
    pub fn contains(&self, atom: &Atom) -> bool {
        self.contains_point(&atom.position, 0.5 * atom.sigma)
    }

    fn contains_point(&self, position: &Point3<f64>, margin: f64) -> bool {
        let local = position - self.center;
        match self.shape {
            Shape::Cuboid { half_extents } => {
                (0..3).all(|k| local[k].abs() < half_extents[k] + margin)
            }
            Shape::Cylinder {
                axis,
                height,
                radius,
            } => {
                let (b, c) = axis.cross_section();
                let reach = radius + margin;
                local[axis.index()].abs() < 0.5 * height + margin
                    && local[b] * local[b] + local[c] * local[c] < reach * reach
            }
        }
    }

    /// Reflects every movable atom found inside the obstacle. Returns how many were reflected.
    pub fn collide(&self, atoms: &mut [Atom]) -> usize {
        atoms
            .iter_mut()
            .filter(|atom| atom.movable)
            .map(|atom| self.collide_atom(atom))
            .filter(|&reflected| reflected)
            .count()
    }

    /// Reflects one atom if it is inside, using its displacement over the last step to find
    /// the face it came through.
    pub fn collide_atom(&self, atom: &mut Atom) -> bool {
        if !self.contains(atom) {
            return false;
        }
        let margin = 0.5 * atom.sigma;
        let current = atom.position - self.center;
        let previous = current - atom.displacement;

        match self.shape {
            Shape::Cuboid { half_extents } => {
                reflect_cuboid(&mut atom.velocity, &previous, &current, &(half_extents.add_scalar(margin)))
            }
            Shape::Cylinder {
                axis,
                height,
                radius,
            } => reflect_cylinder(
                &mut atom.velocity,
                &previous,
                &current,
                axis,
                0.5 * height + margin,
                radius + margin,
            ),
        }
        true
    }
}

/// Outcode test against each pair of faces. When the atom was outside several slabs before
/// the step, it entered through the face it crossed last, and only that normal flips.
fn reflect_cuboid(
    velocity: &mut Vector3<f64>,
    previous: &Vector3<f64>,
    current: &Vector3<f64>,
    half: &Vector3<f64>,
) {
    let entry = (0..3)
        .filter(|&k| previous[k].abs() >= half[k])
        .map(|k| (k, crossing_fraction(previous[k].abs(), current[k].abs(), half[k])))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((k, _)) = entry {
        velocity[k] = velocity[k].abs().copysign(previous[k]);
        return;
    }

    // Already inside before the step: leave through the nearest face.
    let k = (0..3)
        .min_by(|&a, &b| {
            let depth_a = half[a] - current[a].abs();
            let depth_b = half[b] - current[b].abs();
            depth_a.total_cmp(&depth_b)
        })
        .unwrap_or(0);
    velocity[k] = velocity[k].abs().copysign(current[k]);
}

fn reflect_cylinder(
    velocity: &mut Vector3<f64>,
    previous: &Vector3<f64>,
    current: &Vector3<f64>,
    axis: Axis,
    half_height: f64,
    radius: f64,
) {
    let a = axis.index();
    let (b, c) = axis.cross_section();
    let radial_sq = |v: &Vector3<f64>| v[b] * v[b] + v[c] * v[c];

    let outside_cap = previous[a].abs() >= half_height;
    let outside_side = radial_sq(previous) >= radius * radius;

    let surface = match (outside_cap, outside_side) {
        (true, false) => CylinderSurface::Cap,
        (false, true) => CylinderSurface::Side,
        (true, true) => {
            // The atom entered when it satisfied both constraints, i.e. at the later crossing.
            let cap_time = crossing_fraction(previous[a].abs(), current[a].abs(), half_height);
            let side_time = side_contact(previous, current, b, c, radius).map_or(1.0, |(t, _)| t);
            if cap_time >= side_time {
                CylinderSurface::Cap
            } else {
                CylinderSurface::Side
            }
        }
        (false, false) => {
            let cap_depth = half_height - current[a].abs();
            let side_depth = radius - radial_sq(current).sqrt();
            if cap_depth <= side_depth {
                CylinderSurface::Cap
            } else {
                CylinderSurface::Side
            }
        }
    };

    match surface {
        CylinderSurface::Cap => {
            let outward = if outside_cap { previous[a] } else { current[a] };
            velocity[a] = velocity[a].abs().copysign(outward);
        }
        CylinderSurface::Side => {
            let contact = if outside_side {
                side_contact(previous, current, b, c, radius).map(|(_, point)| point)
            } else {
                None
            };
            let (nb, nc) = contact.unwrap_or((current[b], current[c]));
            let length = (nb * nb + nc * nc).sqrt();
            if length < f64::EPSILON {
                return;
            }
            let mut normal = Vector3::zeros();
            normal[b] = nb / length;
            normal[c] = nc / length;

            let approach = normal.dot(velocity);
            if approach < 0.0 {
                *velocity -= normal * (2.0 * approach);
            }
        }
    }
}

/// Fraction of the step at which `|x|` drops from `from` to `bound`.
fn crossing_fraction(from: f64, to: f64, bound: f64) -> f64 {
    let travel = from - to;
    if travel.abs() < f64::EPSILON {
        return 0.0;
    }
    ((from - bound) / travel).clamp(0.0, 1.0)
}

/// First intersection of the step's path, projected on the cross-section, with the circle of
/// the given radius. Returns the path fraction and the contact point.
fn side_contact(
    previous: &Vector3<f64>,
    current: &Vector3<f64>,
    b: usize,
    c: usize,
    radius: f64,
) -> Option<(f64, (f64, f64))> {
    let (pb, pc) = (previous[b], previous[c]);
    let (db, dc) = (current[b] - pb, current[c] - pc);

    let qa = db * db + dc * dc;
    let qb = 2.0 * (pb * db + pc * dc);
    let qc = pb * pb + pc * pc - radius * radius;
    if qa < f64::EPSILON {
        return None;
    }
    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }
    // The smaller root is the contact point nearer the pre-step position.
    let t = ((-qb - discriminant.sqrt()) / (2.0 * qa)).clamp(0.0, 1.0);
    Some((t, (pb + t * db, pc + t * dc)))
}

/// The static obstacles of a model, keyed by stable ids.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: SlotMap<ObstacleId, Obstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, obstacle: Obstacle) -> ObstacleId {
        self.obstacles.insert(obstacle)
    }

    /// Removes an obstacle; stale ids are ignored.
    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        self.obstacles.remove(id)
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }

    /// One collision pass over all obstacles.
    pub fn collide(&self, atoms: &mut [Atom]) -> usize {
        self.obstacles
            .values()
            .map(|obstacle| obstacle.collide(atoms))
            .sum()
    }
}
