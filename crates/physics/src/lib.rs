//! Physics: fixed-substep integration of axis-aligned bodies against voxel
//! collision cells.
//!
//! # Invariants
//! - A frame always runs at least one substep.
//! - Broad-phase candidates come from the grid only and are rebuilt every substep.
//! - Body handles are generational; removing a body never re-targets another handle.

mod body;
mod world;

pub use body::{BodyShape, RigidBody};
pub use world::{BodyHandle, FrameSteps, PhysicsConfig, PhysicsWorld};
