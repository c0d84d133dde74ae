use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Material id stored in every voxel cell.
///
/// `-1` is air; `0..=15` are solid materials. Values outside that domain can
/// only be produced through [`Voxel::try_from`], which rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct Voxel(i8);

/// Raised when a raw id falls outside `[-1, 15]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("voxel id {0} outside [-1, {max}]", max = Voxel::MAX_MATERIAL)]
pub struct InvalidVoxel(pub i8);

impl Voxel {
    pub const AIR: Voxel = Voxel(-1);
    /// What lookups report for cells past the grid edge: a plain solid wall.
    pub const BOUNDARY: Voxel = Voxel(0);
    pub const MAX_MATERIAL: i8 = 15;

    /// A solid material. Returns `None` for anything outside `0..=15`.
    pub fn material(id: i8) -> Option<Self> {
        (0..=Self::MAX_MATERIAL).contains(&id).then_some(Self(id))
    }

    pub fn id(self) -> i8 {
        self.0
    }

    pub fn is_air(self) -> bool {
        self.0 < 0
    }

    pub fn is_solid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Self::AIR
    }
}

impl TryFrom<i8> for Voxel {
    type Error = InvalidVoxel;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        if (-1..=Self::MAX_MATERIAL).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(InvalidVoxel(raw))
        }
    }
}

impl From<Voxel> for i8 {
    fn from(v: Voxel) -> i8 {
        v.0
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Unit cube around a lattice point.
    pub fn voxel(center: Vec3) -> Self {
        Self::from_center(center, Vec3::splat(0.5))
    }

    /// Strict overlap test; touching faces do not count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }
}

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Build a ray; a zero direction yields a degenerate ray that never advances.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}
