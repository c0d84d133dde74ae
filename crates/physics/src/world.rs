use blockworld_common::Aabb;
use blockworld_grid::VoxelGrid;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::{BodyShape, RigidBody};

/// Handle to a body. Carries a generation so a handle to a removed body never
/// resolves to a body allocated later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

/// Integrator constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fraction of normal velocity kept (and reversed) on contact.
    pub elasticity: f32,
    /// Target substep length in seconds.
    pub target_substep: f32,
    /// Linear damping is `base_damping - damping_per_step * steps`, floored at 0.
    pub base_damping: f32,
    pub damping_per_step: f32,
    /// Horizontal friction coefficient is `-friction / steps`.
    pub friction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            elasticity: 0.1,
            target_substep: 1.0 / 600.0,
            base_damping: 13.25,
            damping_per_step: 0.325,
            friction: 20.0,
        }
    }
}

/// How one frame was split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSteps {
    pub steps: u32,
    pub time_step: f32,
    pub damping: f32,
    pub friction: f32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// Dynamic bodies advanced against the voxel grid with fixed substeps.
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    pub config: PhysicsConfig,
    slots: Vec<Slot>,
    free: Vec<u32>,
    cells: Vec<Aabb>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            free: Vec::new(),
            cells: Vec::with_capacity(36),
        }
    }

    /// Allocate a body. Freed slots are reused with a bumped generation.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle {
            index,
            generation: 0,
        }
    }

    /// Remove a body; its handle (and any copy of it) stops resolving.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(body)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
    }

    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    /// Set a body's velocity directly. Returns false for a stale handle.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool {
        self.get_mut(handle).map(|b| b.velocity = velocity).is_some()
    }

    /// Teleport a body. Returns false for a stale handle.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> bool {
        self.get_mut(handle).map(|b| b.position = position).is_some()
    }

    pub fn add_force(&mut self, handle: BodyHandle, force: Vec3) -> bool {
        self.get_mut(handle).map(|b| b.add_force(force)).is_some()
    }

    /// Substep count and length for a frame. Non-positive `dt` gives one
    /// zero-length substep.
    pub fn frame_steps(&self, dt: f32) -> FrameSteps {
        let steps = if dt > 0.0 {
            // slack absorbs float noise, e.g. 0.1 / (1/600) landing just above 60
            ((dt / self.config.target_substep) - 1e-3).ceil().max(1.0) as u32
        } else {
            1
        };
        let time_step = if dt > 0.0 { dt / steps as f32 } else { 0.0 };
        FrameSteps {
            steps,
            time_step,
            damping: (self.config.base_damping - self.config.damping_per_step * steps as f32).max(0.0),
            friction: -self.config.friction / steps as f32,
        }
    }

    /// Advance every body by one frame.
    ///
    /// Candidate cells are rebuilt from the grid for every body on every
    /// substep, since positions move between substeps.
    pub fn step(&mut self, grid: &VoxelGrid, dt: f32) -> FrameSteps {
        let frame = self.frame_steps(dt);
        let _span = tracing::debug_span!("physics_step", steps = frame.steps).entered();
        let Self {
            config,
            slots,
            cells,
            ..
        } = self;
        for _ in 0..frame.steps {
            for body in slots.iter_mut().filter_map(|s| s.body.as_mut()) {
                match body.shape {
                    BodyShape::Player => grid.create_player_collision_cells(body.position, cells),
                    BodyShape::Agent => grid.create_mob_collision_cells(body.position, cells),
                }
                let v = body.velocity;
                let lateral = Vec3::new(v.x, 0.0, v.z);
                let mass = body.mass();
                body.add_force(lateral * mass * frame.friction);
                body.solve_static(cells, config.gravity, config.elasticity, frame.time_step, frame.damping);
            }
        }
        tracing::trace!(
            steps = frame.steps,
            time_step = frame.time_step,
            damping = frame.damping,
            "physics frame complete"
        );
        frame
    }

    /// Live bodies in allocation-slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body.as_ref().map(|b| {
                (
                    BodyHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    b,
                )
            })
        })
    }
}
