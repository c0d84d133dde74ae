use blockworld_grid::{GridConfig, StreamConfig};
use blockworld_physics::PhysicsConfig;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Agent steering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Steer agents every frame. Toggled at runtime by `toggle_nav_mode`.
    pub enabled: bool,
    /// Shared destination for every agent.
    pub destination: Vec3,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: Vec3::ZERO,
        }
    }
}

/// Everything needed to build a [`crate::WorldSimulation`].
///
/// Every section has defaults, so a partial JSON file is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid: GridConfig,
    pub stream: StreamConfig,
    pub physics: PhysicsConfig,
    pub nav: NavConfig,
    /// Seed for the starting landscape; `None` leaves the grid empty.
    pub terrain_seed: Option<u64>,
    pub spawn: Vec3,
    /// Mass of the player and of every agent.
    pub body_mass: f32,
    /// Clear a 3×3×3 pocket at the spawn point on construction.
    pub clear_spawn: bool,
    /// Undrained events kept before the oldest are discarded.
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            stream: StreamConfig::default(),
            physics: PhysicsConfig::default(),
            nav: NavConfig::default(),
            terrain_seed: Some(1),
            spawn: Vec3::new(0.0, 1.0, 0.0),
            body_mass: 10.0,
            clear_spawn: true,
            event_capacity: 4096,
        }
    }
}
