use blockworld_common::Voxel;
use blockworld_grid::ChunkKey;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::AgentId;

/// A record appended by every frame and every world mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// One frame finished.
    Stepped { frame: u64, dt: f32, substeps: u32 },
    /// The player entered a new chunk and the view window moved.
    ChunkCrossed { from: Option<ChunkKey>, to: ChunkKey },
    BlocksPlaced { origin: Vec3, material: Voxel, count: usize },
    /// Voxels erased around `point`; a destruction effect was emitted.
    BlockDestroyed { point: Vec3, count: usize },
    /// Voxels erased along a dig ray.
    Dug { count: usize },
    AgentAdded { id: AgentId, position: Vec3 },
    AgentRemoved { id: AgentId },
}
