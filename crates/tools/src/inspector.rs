use blockworld_grid::ChunkKey;
use blockworld_kernel::{AgentId, WorldSimulation};
use blockworld_nav::{Network, PathQuery};
use glam::Vec3;

/// Simulation inspector for developer tooling.
///
/// Provides read-only queries against simulation state for debugging and
/// CLI output.
pub struct SimulationInspector;

impl SimulationInspector {
    /// Produce a summary of the simulation state.
    pub fn summary(sim: &WorldSimulation) -> SimSummary {
        SimSummary {
            frame: sim.frame(),
            agent_count: sim.agent_count(),
            body_count: sim.physics().body_count(),
            solid_voxels: sim.grid().solid_count(),
            recent_chunk: sim.stream().recent_chunk(),
            chunk_crossings: sim.stream().stats().crossings,
            player: sim.player_position(),
            nav_enabled: sim.nav_enabled(),
            edit_mode: sim.edit_mode(),
            pending_events: sim.events().len(),
        }
    }

    /// Position, velocity and distance to the shared destination of one agent.
    pub fn inspect_agent(sim: &WorldSimulation, id: AgentId) -> Option<AgentInfo> {
        let body = sim.agent_body(id)?;
        let position = body.position;
        let query = PathQuery::new(position, sim.destination());
        Some(AgentInfo {
            id,
            position,
            velocity: body.velocity,
            remain: query.remain(),
            chunk: sim.grid().chunk_key(position),
        })
    }

    /// List all agent ids in id order.
    pub fn list_agents(sim: &WorldSimulation) -> Vec<AgentId> {
        sim.agents().map(|(id, _)| id).collect()
    }

    /// Parameter statistics of a steering network.
    pub fn weights(net: &Network) -> WeightsSummary {
        let params = net.params();
        let count = params.len();
        let (min, max) = params
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        let mean = if count > 0 {
            params.iter().sum::<f32>() / count as f32
        } else {
            0.0
        };
        WeightsSummary {
            count,
            min,
            max,
            mean,
            norm: params.iter().map(|p| p * p).sum::<f32>().sqrt(),
        }
    }
}

/// Summary of simulation state for the inspector.
#[derive(Debug, Clone)]
pub struct SimSummary {
    pub frame: u64,
    pub agent_count: usize,
    pub body_count: usize,
    pub solid_voxels: usize,
    pub recent_chunk: Option<ChunkKey>,
    pub chunk_crossings: u64,
    pub player: Vec3,
    pub nav_enabled: bool,
    pub edit_mode: bool,
    pub pending_events: usize,
}

impl std::fmt::Display for SimSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chunk = self
            .recent_chunk
            .map_or_else(|| "-".to_string(), |k| k.0.to_string());
        write!(
            f,
            "Simulation: frame={} agents={} bodies={} solid={} chunk={} crossings={} \
             player=({:.2}, {:.2}, {:.2}) nav={} edit={} pending_events={}",
            self.frame,
            self.agent_count,
            self.body_count,
            self.solid_voxels,
            chunk,
            self.chunk_crossings,
            self.player.x,
            self.player.y,
            self.player.z,
            self.nav_enabled,
            self.edit_mode,
            self.pending_events
        )
    }
}

/// Detailed info about a single agent.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Straight-line distance to the destination.
    pub remain: f32,
    pub chunk: Option<ChunkKey>,
}

impl std::fmt::Display for AgentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2}) remain={:.2}",
            self.id,
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.remain
        )
    }
}

/// Parameter statistics of a network.
#[derive(Debug, Clone, Copy)]
pub struct WeightsSummary {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Euclidean norm of the parameter vector.
    pub norm: f32,
}

impl std::fmt::Display for WeightsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Weights: count={} min={:.4} max={:.4} mean={:.4} norm={:.4}",
            self.count, self.min, self.max, self.mean, self.norm
        )
    }
}
