use blockworld_grid::{Neighborhood, VoxelGrid};
use glam::Vec3;

use crate::network::{INPUTS, Network, OUTPUTS};
use crate::path::PathQuery;

/// Length of one learned step, in world units.
pub const STEP_SIZE: f32 = 0.5;
/// Remaining distance under which an agent is considered arrived.
pub const GOAL_RADIUS: f32 = 0.25;
/// Horizontal direction components above this count as movement along that axis.
const MOVING: f32 = 0.1;

/// Map a query into the network's `[0, 1]` input domain.
///
/// Destination and position are divided by `input_scale` (the world half
/// extent) and then remapped from `[-1, 1]`. The seventh input is unused.
pub fn encode_input(query: &PathQuery, input_scale: f32) -> [f32; INPUTS] {
    let scale = if input_scale > 0.0 { 1.0 / input_scale } else { 0.0 };
    let d = query.destination() * scale;
    let p = query.position() * scale;
    let remap = |v: f32| 0.5 * (1.0 + v);
    [
        remap(d.x),
        remap(d.y),
        remap(d.z),
        remap(p.x),
        remap(p.y),
        remap(p.z),
        0.0,
    ]
}

/// Map network output from `[0, 1]³` to a step in `[-STEP_SIZE, STEP_SIZE]³`.
pub fn decode_output(output: [f32; OUTPUTS]) -> Vec3 {
    Vec3::new(
        output[0] * 2.0 - 1.0,
        output[1] * 2.0 - 1.0,
        output[2] * 2.0 - 1.0,
    ) * STEP_SIZE
}

/// The raw learned step, before any collision handling.
pub fn propose(net: &Network, query: &PathQuery, input_scale: f32) -> Vec3 {
    decode_output(net.forward(&encode_input(query, input_scale)))
}

/// Deterministic collision handling on top of a learned step.
///
/// Blocking and hurdle detection follow the geometric direction to the
/// destination, not the proposal. The result is not normalized.
pub fn overlay(proposal: Vec3, query: &PathQuery, cells: &Neighborhood) -> Vec3 {
    if query.remain() < GOAL_RADIUS {
        return Vec3::ZERO;
    }

    let dir = query.direction();
    let sx = if dir.x > 0.0 { 1 } else { -1 };
    let sy = if dir.y > 0.0 { 1 } else { -1 };
    let sz = if dir.z > 0.0 { 1 } else { -1 };

    let x_blocked = (-1..=1).any(|dz| cells.is_solid(sx, 0, dz));
    let y_blocked = cells.is_solid(0, sy, 0);
    let z_blocked = (-1..=1).any(|dx| cells.is_solid(dx, 0, sz));

    let mut out = proposal;
    if x_blocked {
        out.x = 0.0;
    }
    if y_blocked {
        out.y = 0.0;
    }
    if z_blocked {
        out.z = 0.0;
    }

    // both ways forward are walled: slide along the shallower axis
    if x_blocked && z_blocked {
        if dir.x.abs() <= dir.z.abs() {
            out.x = proposal.x;
        } else {
            out.z = proposal.z;
        }
    }

    let moving_x = dir.x.abs() > MOVING;
    let moving_z = dir.z.abs() > MOVING;
    if !(moving_x && moving_z) {
        let ahead = [
            (moving_x, sx, 0),
            (moving_z, 0, sz),
        ];
        let hurdle = ahead.iter().any(|&(moving, dx, dz)| {
            moving && cells.is_solid(dx, 0, dz) && !cells.is_solid(dx, 1, dz)
        });
        if hurdle {
            out.y = 1.0;
        }
    }

    out
}

/// One inference step: learned proposal, overlay, safe-normalize.
///
/// Pure over its inputs; the zero vector stays zero.
pub fn steer(net: &Network, query: &PathQuery, cells: &Neighborhood, input_scale: f32) -> Vec3 {
    overlay(propose(net, query, input_scale), query, cells).normalize_or_zero()
}

/// Runtime steering: an immutable network plus the input scale of the world
/// it was trained for.
#[derive(Debug, Clone, Default)]
pub struct NavController {
    network: Network,
    input_scale: f32,
}

impl NavController {
    pub fn new(network: Network, input_scale: f32) -> Self {
        Self {
            network,
            input_scale,
        }
    }

    /// Controller scaled to `grid`'s half extent.
    pub fn for_grid(network: Network, grid: &VoxelGrid) -> Self {
        Self::new(network, grid.half_extent())
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn set_network(&mut self, network: Network) {
        self.network = network;
    }

    pub fn input_scale(&self) -> f32 {
        self.input_scale
    }

    /// Unit steering direction for `query`, or zero once arrived.
    pub fn step(&self, query: &PathQuery, cells: &Neighborhood) -> Vec3 {
        let dir = steer(&self.network, query, cells, self.input_scale);
        tracing::trace!(position = ?query.position(), remain = query.remain(), ?dir, "steer");
        dir
    }
}
