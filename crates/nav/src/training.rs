//! Offline training: fitness scoring, supervised pretraining and a small
//! genetic search over network parameters.
//!
//! Nothing here runs in the per-frame loop.

use blockworld_grid::VoxelGrid;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::network::{Network, OUTPUTS};
use crate::path::PathQuery;
use crate::steer::{STEP_SIZE, encode_input, propose};

/// Moves simulated by [`fitness`] and waypoints used by [`pretrain`].
pub const TOTAL_MOVES: usize = 20;
const LEARNING_RATE: f32 = 0.5;
/// Largest waypoint offset from the straight line during pretraining.
const JITTER: f32 = 0.5;
/// Parameters perturbed by one [`mutate`] call.
const MUTATIONS: usize = 3;
const MUTATION_SCALE: f32 = 0.5;

/// Score a network by walking [`TOTAL_MOVES`] raw proposals from `start`.
///
/// A move into a solid voxel costs 1 and is not taken. Every move that
/// leaves the agent less than one unit from `start` costs 1. Each move then
/// earns `travel / (remain + 1)`.
pub fn fitness(net: &Network, grid: &VoxelGrid, start: Vec3, dest: Vec3) -> f32 {
    let scale = grid.half_extent();
    let mut query = PathQuery::new(start, dest);
    let mut score = 0.0;
    for _ in 0..TOTAL_MOVES {
        let dir = propose(net, &query, scale);
        let next = query.step(dir, STEP_SIZE);
        if grid.grid_value(next).is_solid() {
            score -= 1.0;
        } else {
            query.update(next);
        }
        if query.travel() < 1.0 {
            score -= 1.0;
        }
        score += query.travel() / (query.remain() + 1.0);
    }
    score
}

/// Supervised warm-up toward the straight-line direction.
///
/// Waypoints are spread along `start → dest` with uniform jitter; each gets
/// one backprop step toward its ideal direction. Returns the squared error
/// of the final waypoint after its update.
pub fn pretrain<R: Rng + ?Sized>(
    net: &mut Network,
    rng: &mut R,
    grid: &VoxelGrid,
    start: Vec3,
    dest: Vec3,
) -> f32 {
    let scale = grid.half_extent();
    let mut query = PathQuery::new(start, dest);
    let mut error = 0.0;
    for i in 0..TOTAL_MOVES {
        let jitter = Vec3::new(
            rng.random_range(-JITTER..=JITTER),
            rng.random_range(-JITTER..=JITTER),
            rng.random_range(-JITTER..=JITTER),
        );
        let t = i as f32 / TOTAL_MOVES as f32;
        query.update(start.lerp(dest, t) + jitter);

        let dir = query.direction();
        let target = [0.5 * (1.0 + dir.x), 0.5 * (1.0 + dir.y), 0.5 * (1.0 + dir.z)];
        let input = encode_input(&query, scale);
        net.backprop(&input, &target, LEARNING_RATE);

        let out = net.forward(&input);
        error = (0..OUTPUTS).map(|k| (out[k] - target[k]).powi(2)).sum();
    }
    error
}

/// Neuron-wise crossover: even neurons come from `a`, odd ones from `b`.
pub fn breed(a: &Network, b: &Network) -> Network {
    let mut child = a.clone();
    for (k, (start, len)) in Network::neuron_spans().enumerate() {
        if k % 2 == 1 {
            child.params_mut()[start..start + len].copy_from_slice(&b.params()[start..start + len]);
        }
    }
    child
}

/// Nudge a few random parameters by up to ±0.5.
pub fn mutate<R: Rng + ?Sized>(net: &mut Network, rng: &mut R) {
    let params = net.params_mut();
    for _ in 0..MUTATIONS {
        let i = rng.random_range(0..params.len());
        params[i] += rng.random_range(-MUTATION_SCALE..=MUTATION_SCALE);
    }
}

/// Replace every parameter with a uniform draw from `[-1, 1]`.
pub fn randomize<R: Rng + ?Sized>(net: &mut Network, rng: &mut R) {
    for p in net.params_mut() {
        *p = rng.random_range(-1.0..=1.0);
    }
}

/// Genetic search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub population: usize,
    /// Best members copied unchanged into the next generation.
    pub elite: usize,
    /// Pretraining passes per member before the first evaluation.
    pub pretrain_passes: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population: 16,
            elite: 2,
            pretrain_passes: 4,
        }
    }
}

/// A generation of candidate networks and their scores.
#[derive(Debug, Clone)]
pub struct Population {
    config: TrainingConfig,
    members: Vec<Network>,
    scores: Vec<Option<f32>>,
    generation: u32,
}

impl Population {
    /// Randomized members, at least one.
    pub fn new<R: Rng + ?Sized>(config: TrainingConfig, rng: &mut R) -> Self {
        let size = config.population.max(1);
        let members: Vec<Network> = (0..size)
            .map(|_| {
                let mut net = Network::zeroed();
                randomize(&mut net, rng);
                net
            })
            .collect();
        Self {
            config,
            scores: vec![None; size],
            members,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn members(&self) -> &[Network] {
        &self.members
    }

    /// Run the configured pretraining passes on every member.
    pub fn pretrain<R: Rng + ?Sized>(&mut self, rng: &mut R, grid: &VoxelGrid, scenarios: &[(Vec3, Vec3)]) {
        let _span = tracing::debug_span!("pretrain", members = self.members.len()).entered();
        for net in &mut self.members {
            for _ in 0..self.config.pretrain_passes {
                for &(start, dest) in scenarios {
                    pretrain(net, rng, grid, start, dest);
                }
            }
        }
    }

    /// Score every member as the summed fitness over `scenarios`.
    pub fn evaluate(&mut self, grid: &VoxelGrid, scenarios: &[(Vec3, Vec3)]) {
        let _span = tracing::info_span!("evaluate", generation = self.generation).entered();
        for (net, score) in self.members.iter().zip(&mut self.scores) {
            let total = scenarios
                .iter()
                .map(|&(start, dest)| fitness(net, grid, start, dest))
                .sum();
            *score = Some(total);
        }
        if let Some((_, best)) = self.best() {
            tracing::info!(generation = self.generation, best, "generation scored");
        }
    }

    /// Highest-scoring evaluated member.
    pub fn best(&self) -> Option<(&Network, f32)> {
        self.members
            .iter()
            .zip(&self.scores)
            .filter_map(|(net, score)| score.map(|s| (net, s)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Member indices, best first. Unscored members sort last.
    fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.members.len()).collect();
        order.sort_by(|&a, &b| {
            let sa = self.scores[a].unwrap_or(f32::NEG_INFINITY);
            let sb = self.scores[b].unwrap_or(f32::NEG_INFINITY);
            sb.total_cmp(&sa)
        });
        order
    }

    /// Keep the elite, fill the rest with mutated children of the top half.
    pub fn next_generation<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let order = self.ranked();
        let size = self.members.len();
        let elite = self.config.elite.min(size);
        let pool = (size / 2).max(1);

        let mut next: Vec<Network> = order[..elite]
            .iter()
            .map(|&i| self.members[i].clone())
            .collect();
        while next.len() < size {
            let a = &self.members[order[rng.random_range(0..pool)]];
            let b = &self.members[order[rng.random_range(0..pool)]];
            let mut child = breed(a, b);
            mutate(&mut child, rng);
            next.push(child);
        }

        self.members = next;
        self.scores = vec![None; size];
        self.generation += 1;
        tracing::debug!(generation = self.generation, elite, "bred next generation");
    }
}
