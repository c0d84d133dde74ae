use blockworld_grid::{ChunkKey, ChunkMesh};
use glam::Vec3;

/// Receives terrain geometry.
///
/// Called after any terrain edit or view-window change with the full list of
/// chunks in the current window.
pub trait GeometrySink {
    /// Upload the meshes of `keys`. `mesh` resolves a key to its cached mesh.
    fn upload_geometry<'a>(&mut self, keys: &[ChunkKey], mesh: &dyn Fn(ChunkKey) -> &'a ChunkMesh);

    /// Replace the placement preview mesh.
    fn upload_preview(&mut self, mesh: &ChunkMesh);
}

/// Receives cosmetic notifications. Nothing flows back to the simulation.
pub trait EffectSink {
    /// A block was destroyed at `point`, struck along `direction`.
    fn block_destroyed(&mut self, point: Vec3, direction: Vec3, intensity: f32);

    /// Agent positions after this frame's physics, in agent id order.
    fn agents_moved(&mut self, positions: &[Vec3]);

    /// Advance particle and animation state by `dt` seconds.
    fn advance(&mut self, dt: f32);
}

/// Discards everything. For headless runs that only care about simulation state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl GeometrySink for NullSink {
    fn upload_geometry<'a>(&mut self, _keys: &[ChunkKey], _mesh: &dyn Fn(ChunkKey) -> &'a ChunkMesh) {}

    fn upload_preview(&mut self, _mesh: &ChunkMesh) {}
}

impl EffectSink for NullSink {
    fn block_destroyed(&mut self, _point: Vec3, _direction: Vec3, _intensity: f32) {}

    fn agents_moved(&mut self, _positions: &[Vec3]) {}

    fn advance(&mut self, _dt: f32) {}
}
