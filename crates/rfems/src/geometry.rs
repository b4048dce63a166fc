//! Axes, triangles and axis-aligned bounding boxes of surface models

use nalgebra::Vector3;
use std::fmt;

/// A point in model units (mm).
pub type Vec3 = Vector3<f64>;

/// One facet of a triangulated surface.
pub type Triangle = [Vec3; 3];

/// Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes perpendicular to this one, in ascending order.
    pub fn orthogonal(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// numpy-style `isclose` with its default tolerances.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Axis-aligned bounding box with `min <= max` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Fold the componentwise extremes over every vertex of every facet.
    /// Returns `None` for an empty facet list.
    pub fn from_facets(facets: &[Triangle]) -> Option<Self> {
        let mut vertices = facets.iter().flat_map(|facet| facet.iter());
        let first = *vertices.next()?;
        let (min, max) = vertices.fold((first, first), |(min, max), v| {
            (min.inf(v), max.sup(v))
        });
        Some(Self { min, max })
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    /// Collapse every axis thinner than `tolerance` (or equal to it) onto
    /// its mid-plane, on both `min` and `max`.
    pub fn collapse_thin(&self, tolerance: f64) -> Self {
        let mut reduced = *self;
        for axis in 0..3 {
            let extent = self.max[axis] - self.min[axis];
            if extent < tolerance || is_close(extent, tolerance) {
                let mid = (self.min[axis] + self.max[axis]) / 2.0;
                reduced.min[axis] = mid;
                reduced.max[axis] = mid;
            }
        }
        reduced
    }

    /// True if any axis has zero thickness.
    pub fn is_degenerate(&self) -> bool {
        (0..3).any(|axis| is_close(self.max[axis] - self.min[axis], 0.0))
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn start(&self, axis: Axis) -> f64 {
        self.min[axis.index()]
    }

    pub fn stop(&self, axis: Axis) -> f64 {
        self.max[axis.index()]
    }
}
