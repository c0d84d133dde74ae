//! Voxel grid: chunked storage, view-window streaming, ray traces and
//! physics broad-phase candidates.
//!
//! # Invariants
//! - `grid_size` is an exact, even multiple of `chunk_size`; construction fails otherwise.
//! - Air (`-1`) is a value, never an error sentinel: out-of-bounds lookups return `Option`.
//! - Every in-bounds position has a full 27-cell neighborhood; cells past the
//!   edge read as solid.
//! - Only voxel edits dirty a chunk's cached mesh.

mod grid;
mod mesh;
mod neighborhood;
mod stream;

pub use grid::{ChunkKey, GridConfig, VoxelGrid, snap};
pub use mesh::{ChunkMesh, TerrainVertex};
pub use neighborhood::Neighborhood;
pub use stream::{StreamConfig, StreamStats, StreamWindow};

/// Errors from grid construction.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("grid_size {grid_size} must be a non-zero multiple of chunk_size {chunk_size}")]
    ChunkSizeMismatch { grid_size: usize, chunk_size: usize },
    #[error("grid_size {0} must be even so the grid centres on the origin")]
    OddGridSize(usize),
}
