use blockworld_common::Voxel;

/// The 3×3×3 block of voxels around a lattice cell.
///
/// Cells are stored x-fastest, then y, then z. Use [`Neighborhood::get`]
/// with offsets in `-1..=1` rather than raw indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    cells: [Voxel; Neighborhood::LEN],
}

impl Neighborhood {
    pub const LEN: usize = 27;

    /// Every cell air.
    pub fn empty() -> Self {
        Self {
            cells: [Voxel::AIR; Self::LEN],
        }
    }

    /// Build from a function of `(dx, dy, dz)`.
    pub fn from_fn(mut f: impl FnMut(i32, i32, i32) -> Voxel) -> Self {
        let mut cells = [Voxel::AIR; Self::LEN];
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    cells[Self::index(dx, dy, dz)] = f(dx, dy, dz);
                }
            }
        }
        Self { cells }
    }

    /// Flat index of the offset `(dx, dy, dz)`, each in `-1..=1`.
    pub const fn index(dx: i32, dy: i32, dz: i32) -> usize {
        debug_assert!(dx.abs() <= 1 && dy.abs() <= 1 && dz.abs() <= 1);
        ((dx + 1) + 3 * (dy + 1) + 9 * (dz + 1)) as usize
    }

    pub fn get(&self, dx: i32, dy: i32, dz: i32) -> Voxel {
        self.cells[Self::index(dx, dy, dz)]
    }

    pub fn set(&mut self, dx: i32, dy: i32, dz: i32, voxel: Voxel) {
        self.cells[Self::index(dx, dy, dz)] = voxel;
    }

    pub fn is_solid(&self, dx: i32, dy: i32, dz: i32) -> bool {
        self.get(dx, dy, dz).is_solid()
    }
}
