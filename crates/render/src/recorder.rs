use std::fmt;

use blockworld_grid::{ChunkKey, ChunkMesh};
use glam::Vec3;

use crate::sink::{EffectSink, GeometrySink};

/// One recorded block destruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destruction {
    pub point: Vec3,
    pub direction: Vec3,
    pub intensity: f32,
}

/// Text stand-in for a GPU backend: counts uploads and remembers the last
/// state it was handed.
#[derive(Debug, Default, Clone)]
pub struct DebugRecorder {
    /// Number of `upload_geometry` calls.
    pub geometry_uploads: usize,
    /// Chunks in the last upload, in the order received.
    pub last_keys: Vec<ChunkKey>,
    /// Total faces across the last upload.
    pub last_faces: usize,
    pub preview_uploads: usize,
    pub preview_faces: usize,
    pub destructions: Vec<Destruction>,
    pub agent_positions: Vec<Vec3>,
    /// Seconds passed to `advance`.
    pub elapsed: f32,
}

impl DebugRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeometrySink for DebugRecorder {
    fn upload_geometry<'a>(&mut self, keys: &[ChunkKey], mesh: &dyn Fn(ChunkKey) -> &'a ChunkMesh) {
        self.geometry_uploads += 1;
        self.last_keys = keys.to_vec();
        self.last_faces = keys.iter().map(|&k| mesh(k).face_count()).sum();
        tracing::debug!(chunks = keys.len(), faces = self.last_faces, "geometry uploaded");
    }

    fn upload_preview(&mut self, mesh: &ChunkMesh) {
        self.preview_uploads += 1;
        self.preview_faces = mesh.face_count();
    }
}

impl EffectSink for DebugRecorder {
    fn block_destroyed(&mut self, point: Vec3, direction: Vec3, intensity: f32) {
        self.destructions.push(Destruction {
            point,
            direction,
            intensity,
        });
    }

    fn agents_moved(&mut self, positions: &[Vec3]) {
        self.agent_positions.clear();
        self.agent_positions.extend_from_slice(positions);
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }
}

impl fmt::Display for DebugRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Render Log (uploads={}, elapsed={:.2}s) ===",
            self.geometry_uploads, self.elapsed
        )?;
        writeln!(f, "View window: {} chunks, {} faces", self.last_keys.len(), self.last_faces)?;
        writeln!(f, "Preview: {} uploads, {} faces", self.preview_uploads, self.preview_faces)?;
        writeln!(f, "Destroyed blocks: {}", self.destructions.len())?;
        for (i, p) in self.agent_positions.iter().enumerate() {
            writeln!(f, "  agent[{i}] pos=({:.2}, {:.2}, {:.2})", p.x, p.y, p.z)?;
        }
        Ok(())
    }
}
