//! Simulation kernel: owns the grid, physics and steering, and advances them
//! in a fixed per-frame order.
//!
//! # Invariants
//! - Frame order is steering, physics, streaming, then cosmetic hand-off.
//! - Agents map to bodies through an explicit id table; removing one agent
//!   never disturbs another's body.
//! - Geometry is re-uploaded only after an edit or a chunk crossing.
//! - Every mutation appends a [`SimEvent`].

mod config;
mod event;
mod sim;

pub use config::{NavConfig, SimConfig};
pub use event::SimEvent;
pub use sim::{AgentId, WorldSimulation, approach_speed};

use blockworld_grid::GridError;
use glam::Vec3;

/// Errors from building or driving a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("spawn point {0} lies outside the grid")]
    SpawnOutOfBounds(Vec3),
    #[error("no agent with id {0}")]
    UnknownAgent(AgentId),
    #[error("material id {0} is not a solid material in [0, 15]")]
    InvalidMaterial(i8),
}
