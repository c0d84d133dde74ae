use std::collections::BTreeMap;
use std::fmt;

use blockworld_common::{Ray, Voxel};
use blockworld_grid::{ChunkMesh, StreamWindow, VoxelGrid, snap};
use blockworld_nav::{NavController, Network, PathQuery};
use blockworld_physics::{BodyHandle, BodyShape, FrameSteps, PhysicsWorld, RigidBody};
use blockworld_render::{EffectSink, GeometrySink};
use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::config::SimConfig;
use crate::event::SimEvent;

/// Reach of block placement and removal.
const EDIT_RANGE: f32 = 6.0;
/// Reach of digging and the grappling hook.
const LONG_RANGE: f32 = 100.0;
const MAX_SCALE: u32 = 5;
const DESTROY_INTENSITY: f32 = 5.0;
const MOVE_FORCE: f32 = 100.0;
const JUMP_FORCE: f32 = 4000.0;
const GRAPPLE_FORCE: f32 = 1000.0;
/// Jumps are refused while vertical speed is at or above this.
const AIRBORNE_SPEED: f32 = 1.0;

/// Stable agent identifier. Never reused within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Agent speed for a remaining distance: slows toward the goal.
pub fn approach_speed(remain: f32) -> f32 {
    2.75 * ((remain - 3.0) / (remain + 3.0) + 1.1)
}

/// The simulation core: grid, bodies, steering and player tools.
///
/// Collaborators are passed into the calls that feed them, so the
/// simulation itself holds no renderer state beyond the preview mesh.
#[derive(Debug)]
pub struct WorldSimulation {
    config: SimConfig,
    grid: VoxelGrid,
    stream: StreamWindow,
    physics: PhysicsWorld,
    nav: NavController,
    player: BodyHandle,
    agents: BTreeMap<AgentId, BodyHandle>,
    next_agent: u64,
    destination: Vec3,
    nav_enabled: bool,
    edit_mode: bool,
    material: Voxel,
    scale: UVec3,
    /// Offset implied by the current look direction.
    cached_offset: IVec3,
    /// Offset the preview (and the next edit) was built with.
    preview_offset: IVec3,
    preview: ChunkMesh,
    frame: u64,
    events: Vec<SimEvent>,
}

impl WorldSimulation {
    /// Build the world, spawn the player and upload the first view window.
    ///
    /// With `clear_spawn` set, a 3×3×3 pocket is carved out at the spawn
    /// point so the player never starts inside terrain.
    pub fn new(
        config: SimConfig,
        network: Network,
        geometry: &mut dyn GeometrySink,
        effects: &mut dyn EffectSink,
    ) -> Result<Self, SimError> {
        let _span = tracing::info_span!("world_init").entered();
        let mut grid = VoxelGrid::new(config.grid.clone())?;
        if let Some(seed) = config.terrain_seed {
            grid.generate_terrain(seed);
        }

        let spawn = config.spawn;
        let key = grid.chunk_key(spawn).ok_or(SimError::SpawnOutOfBounds(spawn))?;
        let mut stream = StreamWindow::new(config.stream.clone());
        stream.update_chunk(key);

        let mut physics = PhysicsWorld::new(config.physics.clone());
        let player = physics.add_body(RigidBody::new(BodyShape::Player, spawn, config.body_mass));
        let nav = NavController::for_grid(network, &grid);

        let mut sim = Self {
            destination: config.nav.destination,
            nav_enabled: config.nav.enabled,
            config,
            grid,
            stream,
            physics,
            nav,
            player,
            agents: BTreeMap::new(),
            next_agent: 0,
            edit_mode: false,
            material: Voxel::material(0).unwrap_or_default(),
            scale: UVec3::ONE,
            cached_offset: IVec3::ONE,
            preview_offset: IVec3::ONE,
            preview: ChunkMesh::new(),
            frame: 0,
            events: Vec::new(),
        };
        sim.regenerate_geometry(geometry);

        if sim.config.clear_spawn {
            sim.scale = UVec3::splat(3);
            let direction = (spawn + Vec3::new(-1.0, 0.0, 0.0)).normalize_or_zero();
            sim.erase(snap(spawn), direction, geometry, effects);
            sim.scale = UVec3::ONE;
        }
        tracing::info!(?spawn, chunk = ?key, "world ready");
        Ok(sim)
    }

    /// Advance one frame of `dt` seconds.
    pub fn update(
        &mut self,
        dt: f32,
        geometry: &mut dyn GeometrySink,
        effects: &mut dyn EffectSink,
    ) -> FrameSteps {
        let _span = tracing::info_span!("frame", frame = self.frame, dt).entered();

        if self.nav_enabled {
            self.steer_agents();
        }

        let steps = self.physics.step(&self.grid, dt);

        let player = self.player_position();
        if let Some(key) = self.grid.chunk_key(player) {
            if self.stream.is_crossing(key) {
                let from = self.stream.recent_chunk();
                self.stream.update_chunk(key);
                self.regenerate_geometry(geometry);
                self.record(SimEvent::ChunkCrossed { from, to: key });
            }
        }

        let positions: Vec<Vec3> = self.agents().map(|(_, p)| p).collect();
        effects.agents_moved(&positions);
        effects.advance(dt);

        self.frame += 1;
        self.record(SimEvent::Stepped {
            frame: self.frame,
            dt,
            substeps: steps.steps,
        });
        steps
    }

    /// Append to the event log. A full log first drops its oldest half.
    fn record(&mut self, event: SimEvent) {
        let capacity = self.config.event_capacity.max(1);
        if self.events.len() >= capacity {
            let dropped = self.events.len() - capacity / 2;
            self.events.drain(..dropped);
            tracing::warn!(dropped, capacity, "event log full, oldest events dropped");
        }
        self.events.push(event);
    }

    /// Set every agent's velocity from one steering step toward the shared
    /// destination. Agents outside the grid stop.
    fn steer_agents(&mut self) {
        for (&id, &handle) in &self.agents {
            let Some(position) = self.physics.get(handle).map(|b| b.position) else {
                continue;
            };
            let query = PathQuery::new(position, self.destination);
            let velocity = match self.grid.neighbors(position) {
                Some(cells) => self.nav.step(&query, &cells) * approach_speed(query.remain()),
                None => Vec3::ZERO,
            };
            tracing::trace!(%id, ?position, ?velocity, "agent steered");
            self.physics.set_linear_velocity(handle, velocity);
        }
    }

    /// Remesh dirty chunks in the view window and hand the window to `geometry`.
    fn regenerate_geometry(&mut self, geometry: &mut dyn GeometrySink) {
        let keys = self.stream.view_chunks(&self.grid);
        let rebuilt = self.grid.rebuild_meshes(&keys);
        tracing::debug!(chunks = keys.len(), rebuilt, "view window regenerated");
        let grid = &self.grid;
        geometry.upload_geometry(&keys, &|key| grid.chunk_mesh(key));
    }

    fn generate_preview(&mut self, geometry: &mut dyn GeometrySink) {
        self.preview_offset = self.cached_offset;
        self.grid
            .atlas_preview(&mut self.preview, self.preview_offset, self.scale, self.material);
        geometry.upload_preview(&self.preview);
    }

    /// Erase a `scale` box at `point`. Emits a destruction effect when
    /// anything was removed.
    fn erase(
        &mut self,
        point: Vec3,
        direction: Vec3,
        geometry: &mut dyn GeometrySink,
        effects: &mut dyn EffectSink,
    ) -> usize {
        let removed = self
            .grid
            .set_geometry(point, self.scale, self.preview_offset, Voxel::AIR);
        if removed > 0 {
            self.regenerate_geometry(geometry);
            effects.block_destroyed(point, direction, DESTROY_INTENSITY);
            self.record(SimEvent::BlockDestroyed {
                point,
                count: removed,
            });
        }
        removed
    }

    // --- agents ---

    pub fn add_agent(&mut self, position: Vec3) -> AgentId {
        let handle = self.physics.add_body(RigidBody::new(
            BodyShape::Agent,
            position,
            self.config.body_mass,
        ));
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        self.agents.insert(id, handle);
        self.record(SimEvent::AgentAdded { id, position });
        tracing::debug!(%id, ?position, "agent added");
        id
    }

    /// Remove an agent and its body. Returns its last position.
    pub fn remove_agent(&mut self, id: AgentId) -> Result<Vec3, SimError> {
        let handle = self.agents.remove(&id).ok_or(SimError::UnknownAgent(id))?;
        let body = self
            .physics
            .remove_body(handle)
            .ok_or(SimError::UnknownAgent(id))?;
        self.record(SimEvent::AgentRemoved { id });
        tracing::debug!(%id, "agent removed");
        Ok(body.position)
    }

    pub fn agent_body(&self, id: AgentId) -> Option<&RigidBody> {
        let handle = self.agents.get(&id)?;
        self.physics.get(*handle)
    }

    pub fn agent_position(&self, id: AgentId) -> Option<Vec3> {
        self.agent_body(id).map(|b| b.position)
    }

    pub fn warp_agent(&mut self, id: AgentId, position: Vec3) -> Result<(), SimError> {
        let handle = *self.agents.get(&id).ok_or(SimError::UnknownAgent(id))?;
        if self.physics.set_position(handle, position) {
            Ok(())
        } else {
            Err(SimError::UnknownAgent(id))
        }
    }

    /// Agents and their positions in id order.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, Vec3)> + '_ {
        self.agents
            .iter()
            .filter_map(|(&id, &h)| self.physics.get(h).map(|b| (id, b.position)))
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // --- player ---

    pub fn player_body(&self) -> Option<&RigidBody> {
        self.physics.get(self.player)
    }

    pub fn player_position(&self) -> Vec3 {
        self.player_body().map_or(self.config.spawn, |b| b.position)
    }

    /// Push the player horizontally along `direction`.
    pub fn character_move(&mut self, direction: Vec3) {
        let dxz = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        let force = dxz * MOVE_FORCE * self.config.body_mass;
        self.physics.add_force(self.player, force);
    }

    /// Jump unless already rising or falling. Returns whether the jump happened.
    pub fn character_jump(&mut self, direction: Vec3) -> bool {
        let Some(body) = self.physics.get_mut(self.player) else {
            return false;
        };
        if body.velocity.y.abs() >= AIRBORNE_SPEED {
            return false;
        }
        let mass = body.mass();
        body.add_force(direction * JUMP_FORCE * mass);
        true
    }

    pub fn character_warp(&mut self, position: Vec3) {
        self.physics.set_position(self.player, position);
    }

    // --- world edits ---

    /// Place the selected material in front of the first solid voxel along
    /// `ray`, using the current scale and preview offset.
    pub fn add_block(&mut self, ray: &Ray, geometry: &mut dyn GeometrySink) -> usize {
        let origin = self.grid.ray_trace_prev(ray, EDIT_RANGE);
        let count = self
            .grid
            .set_geometry(origin, self.scale, self.preview_offset, self.material);
        self.regenerate_geometry(geometry);
        if count > 0 {
            self.record(SimEvent::BlocksPlaced {
                origin,
                material: self.material,
                count,
            });
        }
        count
    }

    /// Erase the first solid voxel along `ray` (and the rest of the scale
    /// box). Returns the material that was hit, or air.
    pub fn remove_block(
        &mut self,
        ray: &Ray,
        geometry: &mut dyn GeometrySink,
        effects: &mut dyn EffectSink,
    ) -> Voxel {
        let target = self.grid.ray_trace_last(ray, EDIT_RANGE);
        let hit = self.grid.grid_value(target);
        if hit.is_solid() {
            self.erase(target, -ray.direction(), geometry, effects);
        }
        hit
    }

    /// Erase every solid voxel along `ray`.
    pub fn dig(&mut self, ray: &Ray, geometry: &mut dyn GeometrySink) -> usize {
        let count = self.grid.ray_trace_atlas(ray, LONG_RANGE);
        self.regenerate_geometry(geometry);
        if count > 0 {
            self.record(SimEvent::Dug { count });
        }
        count
    }

    /// Pull the player toward the first solid voxel along `ray` and destroy
    /// it. Far targets and downward shots pull more weakly.
    pub fn grapple(
        &mut self,
        ray: &Ray,
        geometry: &mut dyn GeometrySink,
        effects: &mut dyn EffectSink,
    ) -> Voxel {
        let target = self.grid.ray_trace_last(ray, LONG_RANGE);
        let hit = self.grid.grid_value(target);
        if hit.is_air() {
            return hit;
        }
        let d = target - ray.origin();
        let d_factor = if d.length() < 20.0 { 1.0 } else { 0.5 };
        let y_factor = if ray.direction().y < -0.5 { 0.25 } else { 1.0 };
        let force = d * GRAPPLE_FORCE * d_factor * y_factor * self.config.body_mass;
        self.physics.add_force(self.player, force);

        self.reset_scale(geometry);
        self.erase(target, ray.direction(), geometry, effects);
        hit
    }

    /// Update the placement target from a look ray. The preview offset grows
    /// toward the side the camera faces on X and Z.
    pub fn aim(&mut self, look: &Ray) -> Vec3 {
        let forward = look.direction();
        self.cached_offset.x = if forward.x >= 0.0 { 1 } else { -1 };
        self.cached_offset.z = if forward.z >= 0.0 { 1 } else { -1 };
        self.grid.ray_trace_prev(look, EDIT_RANGE)
    }

    fn grow_scale(&mut self, axis: usize, delta: u32, geometry: &mut dyn GeometrySink) {
        if !self.edit_mode {
            return;
        }
        // a changed facing only refreshes the preview
        if self.cached_offset[axis] == self.preview_offset[axis] && self.scale[axis] < MAX_SCALE {
            self.scale[axis] = (self.scale[axis] + delta).min(MAX_SCALE);
        }
        self.generate_preview(geometry);
    }

    pub fn set_scale_x(&mut self, delta: u32, geometry: &mut dyn GeometrySink) {
        self.grow_scale(0, delta, geometry);
    }

    pub fn set_scale_y(&mut self, delta: u32, geometry: &mut dyn GeometrySink) {
        self.grow_scale(1, delta, geometry);
    }

    pub fn set_scale_z(&mut self, delta: u32, geometry: &mut dyn GeometrySink) {
        self.grow_scale(2, delta, geometry);
    }

    pub fn reset_scale(&mut self, geometry: &mut dyn GeometrySink) {
        self.scale = UVec3::ONE;
        self.generate_preview(geometry);
    }

    /// Select the material placed by [`WorldSimulation::add_block`].
    pub fn set_material(&mut self, id: i8, geometry: &mut dyn GeometrySink) -> Result<(), SimError> {
        self.material = Voxel::material(id).ok_or(SimError::InvalidMaterial(id))?;
        self.generate_preview(geometry);
        Ok(())
    }

    pub fn set_destination(&mut self, destination: Vec3) {
        self.destination = destination;
    }

    pub fn toggle_nav_mode(&mut self) -> bool {
        self.nav_enabled = !self.nav_enabled;
        self.nav_enabled
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }

    // --- read access ---

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn stream(&self) -> &StreamWindow {
        &self.stream
    }

    pub fn nav(&self) -> &NavController {
        &self.nav
    }

    pub fn destination(&self) -> Vec3 {
        self.destination
    }

    pub fn nav_enabled(&self) -> bool {
        self.nav_enabled
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn material(&self) -> Voxel {
        self.material
    }

    pub fn scale(&self) -> UVec3 {
        self.scale
    }

    pub fn preview_offset(&self) -> IVec3 {
        self.preview_offset
    }

    pub fn preview(&self) -> &ChunkMesh {
        &self.preview
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockworld_grid::GridConfig;
    use blockworld_nav::PARAM_COUNT;
    use blockworld_render::{DebugRecorder, NullSink};

    fn config() -> SimConfig {
        SimConfig {
            grid: GridConfig {
                grid_size: 32,
                chunk_size: 8,
            },
            ..SimConfig::default()
        }
    }

    fn build(config: SimConfig) -> (WorldSimulation, DebugRecorder) {
        let mut rec = DebugRecorder::new();
        let mut fx = NullSink;
        let sim = WorldSimulation::new(config, Network::zeroed(), &mut rec, &mut fx).unwrap();
        (sim, rec)
    }

    /// Network whose x output saturates high, so every proposal points +x.
    fn eastward() -> Network {
        let mut params = vec![0.0; PARAM_COUNT];
        params[PARAM_COUNT - 12 + 3] = 20.0;
        Network::from_params(params).unwrap()
    }

    #[test]
    fn speed_curve_slows_near_goal() {
        assert!((approach_speed(3.0) - 3.025).abs() < 1e-6);
        assert!(approach_speed(0.5) < approach_speed(3.0));
        assert!(approach_speed(100.0) < 2.75 * 2.1);
    }

    #[test]
    fn bad_grid_config_is_rejected() {
        let mut cfg = config();
        cfg.grid.chunk_size = 5;
        let err = WorldSimulation::new(cfg, Network::zeroed(), &mut NullSink, &mut NullSink).unwrap_err();
        assert!(matches!(err, SimError::Grid(_)));
    }

    #[test]
    fn spawn_outside_grid_is_rejected() {
        let mut cfg = config();
        cfg.spawn = Vec3::new(100.0, 0.0, 0.0);
        let err = WorldSimulation::new(cfg, Network::zeroed(), &mut NullSink, &mut NullSink).unwrap_err();
        assert!(matches!(err, SimError::SpawnOutOfBounds(_)));
    }

    #[test]
    fn construction_uploads_view_window() {
        let (sim, rec) = build(config());
        assert_eq!(rec.geometry_uploads, 1);
        assert!(!rec.last_keys.is_empty());
        assert!(rec.last_faces > 0);
        assert_eq!(sim.stream().recent_chunk(), sim.grid().chunk_key(sim.config().spawn));
    }

    #[test]
    fn first_load_clears_spawn_pocket() {
        let mut cfg = config();
        // spawn in the soil layer so the pocket has something to clear
        cfg.spawn = Vec3::new(0.0, -1.0, 0.0);
        let mut rec = DebugRecorder::new();
        let sim = WorldSimulation::new(cfg, Network::zeroed(), &mut NullSink, &mut rec).unwrap();
        assert_eq!(rec.destructions.len(), 1);
        assert_eq!(rec.destructions[0].intensity, 5.0);
        assert!(sim.grid().grid_value(Vec3::new(1.0, -1.0, 2.0)).is_air());
        assert_eq!(sim.scale(), UVec3::ONE);
        assert!(matches!(
            sim.events()[0],
            SimEvent::BlockDestroyed { count: 9, .. }
        ));
    }

    #[test]
    fn nav_moves_agents_toward_destination() {
        let mut cfg = config();
        cfg.terrain_seed = None;
        cfg.nav.enabled = true;
        cfg.nav.destination = Vec3::new(10.0, 0.0, 0.0);
        let mut sim = WorldSimulation::new(cfg, eastward(), &mut NullSink, &mut NullSink).unwrap();
        let id = sim.add_agent(Vec3::ZERO);
        sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        let p = sim.agent_position(id).unwrap();
        assert!(p.x > 0.0);
        assert!(p.z.abs() < 1e-6);
    }

    /// Network whose x output saturates low, so every proposal points -x.
    fn westward() -> Network {
        let mut params = vec![0.0; PARAM_COUNT];
        params[PARAM_COUNT - 12 + 3] = -20.0;
        Network::from_params(params).unwrap()
    }

    #[test]
    fn agents_on_the_edge_are_steered_inward() {
        let mut cfg = config();
        cfg.terrain_seed = None;
        cfg.nav.enabled = true;
        cfg.nav.destination = Vec3::new(-10.0, 0.0, 0.0);
        let mut sim = WorldSimulation::new(cfg, westward(), &mut NullSink, &mut NullSink).unwrap();
        // cell 15 is the last one on +x
        let id = sim.add_agent(Vec3::new(15.0, 0.0, 0.0));
        sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        assert!(sim.agent_position(id).unwrap().x < 15.0);
    }

    #[test]
    fn grid_edge_blocks_outward_steering() {
        let mut cfg = config();
        cfg.terrain_seed = None;
        cfg.nav.enabled = true;
        cfg.nav.destination = Vec3::new(30.0, 0.0, 0.0);
        let mut sim = WorldSimulation::new(cfg, eastward(), &mut NullSink, &mut NullSink).unwrap();
        let id = sim.add_agent(Vec3::new(15.0, 0.0, 0.0));
        sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        assert_eq!(sim.agent_position(id).unwrap().x, 15.0);
    }

    #[test]
    fn disabled_nav_leaves_agents_alone() {
        let mut cfg = config();
        cfg.terrain_seed = None;
        cfg.nav.destination = Vec3::new(10.0, 0.0, 0.0);
        let mut sim = WorldSimulation::new(cfg, eastward(), &mut NullSink, &mut NullSink).unwrap();
        let id = sim.add_agent(Vec3::ZERO);
        sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        assert_eq!(sim.agent_position(id).unwrap().x, 0.0);
        assert!(sim.toggle_nav_mode());
    }

    #[test]
    fn agents_reach_effects_in_id_order() {
        let mut cfg = config();
        cfg.terrain_seed = None;
        let (mut sim, _) = build(cfg);
        sim.add_agent(Vec3::new(3.0, 1.0, 0.0));
        sim.add_agent(Vec3::new(-3.0, 1.0, 0.0));
        let mut fx = DebugRecorder::new();
        sim.update(1.0 / 60.0, &mut NullSink, &mut fx);
        assert_eq!(fx.agent_positions.len(), 2);
        assert!(fx.agent_positions[0].x > 0.0);
        assert!(fx.agent_positions[1].x < 0.0);
        assert!((fx.elapsed - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn removing_an_agent_keeps_others_intact() {
        let (mut sim, _) = build(config());
        let a = sim.add_agent(Vec3::new(1.0, 5.0, 1.0));
        let b = sim.add_agent(Vec3::new(2.0, 5.0, 2.0));
        let c = sim.add_agent(Vec3::new(3.0, 5.0, 3.0));
        assert_eq!(sim.remove_agent(b).unwrap(), Vec3::new(2.0, 5.0, 2.0));
        let d = sim.add_agent(Vec3::new(4.0, 5.0, 4.0));
        assert_ne!(d, b);
        assert_eq!(sim.agent_position(a), Some(Vec3::new(1.0, 5.0, 1.0)));
        assert_eq!(sim.agent_position(c), Some(Vec3::new(3.0, 5.0, 3.0)));
        assert_eq!(sim.agent_position(d), Some(Vec3::new(4.0, 5.0, 4.0)));
        assert!(sim.agent_position(b).is_none());
        assert!(matches!(sim.remove_agent(b), Err(SimError::UnknownAgent(_))));
        assert!(sim.warp_agent(b, Vec3::ZERO).is_err());
        assert_eq!(sim.agent_count(), 3);
    }

    #[test]
    fn chunk_crossing_regenerates_once() {
        let (mut sim, mut rec) = build(config());
        sim.update(1.0 / 60.0, &mut rec, &mut NullSink);
        assert_eq!(rec.geometry_uploads, 1);

        sim.character_warp(Vec3::new(10.0, 1.0, 10.0));
        sim.update(1.0 / 60.0, &mut rec, &mut NullSink);
        assert_eq!(rec.geometry_uploads, 2);
        assert!(
            sim.events()
                .iter()
                .any(|e| matches!(e, SimEvent::ChunkCrossed { from: Some(_), .. }))
        );

        sim.update(1.0 / 60.0, &mut rec, &mut NullSink);
        assert_eq!(rec.geometry_uploads, 2);
    }

    #[test]
    fn place_then_remove_block() {
        let (mut sim, mut rec) = build(config());
        let mut fx = DebugRecorder::new();
        let down = Ray::new(Vec3::new(1.0, 3.0, 1.0), Vec3::NEG_Y);
        sim.set_material(4, &mut rec).unwrap();

        assert_eq!(sim.add_block(&down, &mut rec), 1);
        assert_eq!(sim.grid().grid_value(Vec3::new(1.0, 0.0, 1.0)).id(), 4);

        let hit = sim.remove_block(&down, &mut rec, &mut fx);
        assert_eq!(hit.id(), 4);
        assert!(sim.grid().grid_value(Vec3::new(1.0, 0.0, 1.0)).is_air());
        assert_eq!(fx.destructions.len(), 1);
        assert_eq!(fx.destructions[0].direction, Vec3::Y);
        assert_eq!(fx.destructions[0].intensity, 5.0);
    }

    #[test]
    fn removing_nothing_emits_nothing() {
        let (mut sim, mut rec) = build(config());
        let mut fx = DebugRecorder::new();
        let up = Ray::new(Vec3::new(1.0, 3.0, 1.0), Vec3::Y);
        assert!(sim.remove_block(&up, &mut rec, &mut fx).is_air());
        assert!(fx.destructions.is_empty());
    }

    #[test]
    fn invalid_material_is_rejected() {
        let (mut sim, mut rec) = build(config());
        assert!(matches!(sim.set_material(16, &mut rec), Err(SimError::InvalidMaterial(16))));
        assert!(sim.set_material(-1, &mut rec).is_err());
        assert_eq!(sim.material().id(), 0);
    }

    #[test]
    fn dig_erases_along_ray() {
        let (mut sim, mut rec) = build(config());
        let down = Ray::new(Vec3::new(1.0, 3.0, 1.0), Vec3::NEG_Y);
        assert_eq!(sim.dig(&down, &mut rec), 2);
        assert!(sim.grid().grid_value(Vec3::new(1.0, -2.0, 1.0)).is_air());
    }

    #[test]
    fn grapple_pulls_player_and_destroys_target() {
        let (mut sim, mut rec) = build(config());
        let mut fx = DebugRecorder::new();
        let down = Ray::new(Vec3::new(1.0, 3.0, 1.0), Vec3::NEG_Y);
        let hit = sim.grapple(&down, &mut rec, &mut fx);
        assert!(hit.is_solid());
        assert!(sim.grid().grid_value(Vec3::new(1.0, -1.0, 1.0)).is_air());
        // downward shots are weakened to a quarter
        let force = sim.player_body().unwrap().force();
        assert!((force.y - -4.0 * 1000.0 * 0.25 * 10.0).abs() < 1e-2);
        assert_eq!(fx.destructions.len(), 1);
    }

    #[test]
    fn jump_only_from_rest() {
        let mut cfg = config();
        cfg.spawn = Vec3::new(0.0, 0.45, 0.0);
        let (mut sim, _) = build(cfg);
        assert!(sim.character_jump(Vec3::Y));
        sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        assert!(sim.player_body().unwrap().velocity.y > 1.0);
        assert!(!sim.character_jump(Vec3::Y));
    }

    #[test]
    fn move_force_ignores_vertical_input() {
        let (mut sim, _) = build(config());
        sim.character_move(Vec3::new(0.0, 5.0, 2.0));
        assert_eq!(sim.player_body().unwrap().force(), Vec3::new(0.0, 0.0, 1000.0));
    }

    #[test]
    fn scale_grows_only_in_edit_mode() {
        let (mut sim, mut rec) = build(config());
        sim.set_scale_x(1, &mut rec);
        assert_eq!(sim.scale(), UVec3::ONE);

        assert!(sim.toggle_edit_mode());
        for _ in 0..10 {
            sim.set_scale_x(1, &mut rec);
        }
        assert_eq!(sim.scale().x, 5);
        assert!(rec.preview_uploads > 0);
        sim.reset_scale(&mut rec);
        assert_eq!(sim.scale(), UVec3::ONE);
    }

    #[test]
    fn turning_around_refreshes_preview_before_growing() {
        let (mut sim, mut rec) = build(config());
        sim.toggle_edit_mode();
        sim.aim(&Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)));
        sim.set_scale_x(1, &mut rec);
        assert_eq!(sim.scale().x, 1);
        assert_eq!(sim.preview_offset().x, -1);
        sim.set_scale_x(1, &mut rec);
        assert_eq!(sim.scale().x, 2);
    }

    #[test]
    fn frames_are_deterministic() {
        let run = || {
            let (mut sim, _) = build(config());
            let id = sim.add_agent(Vec3::new(4.0, 2.0, -3.0));
            sim.toggle_nav_mode();
            sim.set_destination(Vec3::new(-5.0, 0.0, 5.0));
            for _ in 0..30 {
                sim.character_move(Vec3::X);
                sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
            }
            (sim.player_position(), sim.agent_position(id))
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn drain_events_empties_log() {
        let (mut sim, _) = build(config());
        sim.add_agent(Vec3::ONE);
        sim.update(0.0, &mut NullSink, &mut NullSink);
        let events = sim.drain_events();
        assert!(matches!(events[0], SimEvent::AgentAdded { .. }));
        assert!(matches!(events[1], SimEvent::Stepped { frame: 1, substeps: 1, .. }));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn event_log_stays_bounded_without_draining() {
        let mut cfg = config();
        cfg.event_capacity = 8;
        let (mut sim, _) = build(cfg);
        for _ in 0..20 {
            sim.update(1.0 / 60.0, &mut NullSink, &mut NullSink);
        }
        assert!(sim.events().len() <= 8);
        assert_eq!(
            sim.events().last(),
            Some(&SimEvent::Stepped {
                frame: 20,
                dt: 1.0 / 60.0,
                substeps: sim.physics().frame_steps(1.0 / 60.0).steps,
            })
        );
        assert!(sim.drain_events().len() <= 8);
        assert!(sim.events().is_empty());
    }
}
