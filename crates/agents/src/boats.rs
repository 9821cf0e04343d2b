use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, BoatParams};
use crate::config::ARRIVAL_RADIUS;
use crate::grid::{BuildingKind, TileCoord, WorldGrid};
use crate::grid_query::MarinaDock;
use crate::lifecycle::{heading_to, random_in, steer_towards, AgentId, IdAllocator, SpawnTimer};
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoatPhase {
    /// Touring the waypoint list.
    Cruising,
    /// Heading back to the dock; retired on arrival.
    Returning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boat {
    pub id: AgentId,
    pub marina: TileCoord,
    pub dock: TileCoord,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
    pub age: f32,
    pub lifetime: f32,
    pub waypoints: Vec<TileCoord>,
    /// Index of the waypoint currently steered for.
    pub waypoint: usize,
    pub phase: BoatPhase,
    pub color: u8,
}

impl Boat {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// The water tile the boat is steering for.
    pub fn heading_for(&self) -> TileCoord {
        match self.phase {
            BoatPhase::Cruising => self.waypoints.get(self.waypoint).copied().unwrap_or(self.dock),
            BoatPhase::Returning => self.dock,
        }
    }
}

/// Returns `false` when the boat should be retired.
fn step_boat(boat: &mut Boat, grid: &WorldGrid, dt: f32, params: &BoatParams) -> bool {
    boat.age += dt;
    if boat.age > boat.lifetime {
        return false;
    }
    if grid.building_at(boat.marina) != BuildingKind::Marina {
        return false;
    }
    let goal = boat.heading_for();
    if !grid.is_water(goal) {
        return false;
    }

    let target = WorldGrid::grid_to_screen(goal);
    let lock = 2.0 * boat.speed / params.turn_rate.max(f32::EPSILON);
    let (pos, angle) = steer_towards(
        boat.position(),
        boat.angle,
        target,
        params.turn_rate * dt,
        boat.speed * dt,
        lock,
    );
    boat.x = pos.x;
    boat.y = pos.y;
    boat.angle = angle;

    if pos.distance(target) > ARRIVAL_RADIUS {
        return true;
    }
    match boat.phase {
        BoatPhase::Cruising => {
            boat.waypoint += 1;
            if boat.waypoint >= boat.waypoints.len() {
                boat.phase = BoatPhase::Returning;
            }
            true
        }
        BoatPhase::Returning => false,
    }
}

#[derive(Resource, Debug, Default)]
pub struct BoatPopulation {
    boats: Vec<Boat>,
    ids: IdAllocator,
    spawn_timer: SpawnTimer,
}

impl BoatPopulation {
    pub fn boats(&self) -> &[Boat] {
        &self.boats
    }

    pub fn len(&self) -> usize {
        self.boats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boats.is_empty()
    }

    pub fn next_spawn_in(&self) -> f32 {
        self.spawn_timer.remaining()
    }

    pub fn clear(&mut self) {
        self.boats.clear();
    }

    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        params: &BoatParams,
        rng: &mut impl Rng,
    ) {
        if world.zoom() < params.min_zoom {
            self.boats.clear();
            return;
        }
        let dt = world.flight_scaled(delta);
        if dt <= 0.0 {
            return;
        }
        if world.index.marinas.is_empty() || world.index.total_population < params.min_population
        {
            self.boats.clear();
            return;
        }

        let grid = world.grid;
        self.boats.retain_mut(|boat| step_boat(boat, grid, dt, params));

        if self.spawn_timer.tick(dt, params.spawn_interval, rng) {
            self.try_spawn(world, params, rng);
        }
    }

    /// Launch a boat from a random marina on a short tour of nearby water.
    pub fn try_spawn(
        &mut self,
        world: &WorldState,
        params: &BoatParams,
        rng: &mut impl Rng,
    ) -> Option<AgentId> {
        let marinas = &world.index.marinas;
        if self.boats.len() >= params.capacity(marinas.len()) {
            return None;
        }
        let MarinaDock { marina, dock } = *marinas.choose(rng)?;

        let nearby: Vec<TileCoord> = world
            .index
            .water_tiles
            .iter()
            .copied()
            .filter(|&t| t != dock && t.manhattan(marina) <= params.tour_radius)
            .collect();
        let (min, max) = params.waypoints;
        let count = rng.gen_range(min..=max.max(min));
        let mut waypoints: Vec<TileCoord> = nearby.choose_multiple(rng, count).copied().collect();
        if waypoints.is_empty() {
            // Nothing but the dock itself: bob around it once.
            waypoints.push(dock);
        }

        let start = WorldGrid::grid_to_screen(dock);
        let id = self.ids.allocate();
        self.boats.push(Boat {
            id,
            marina,
            dock,
            x: start.x,
            y: start.y,
            angle: heading_to(start, WorldGrid::grid_to_screen(waypoints[0])),
            speed: random_in(rng, params.speed),
            age: 0.0,
            lifetime: random_in(rng, params.lifetime),
            waypoints,
            waypoint: 0,
            phase: BoatPhase::Cruising,
            color: rng.gen_range(0..params.color_variants.max(1)),
        });
        Some(id)
    }
}

pub fn update_boats(
    state: WorldStateParam,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut boats: ResMut<BoatPopulation>,
) {
    let world = state.snapshot();
    boats.update(&world, state.delta(), &params.boats, &mut rng.0);
}

pub struct BoatsPlugin;

impl Plugin for BoatsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BoatPopulation>()
            .add_systems(Update, update_boats.in_set(AgentSet::Boats));
    }
}
