use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, PedestrianParams};
use crate::grid::{Direction, TileCoord, WorldGrid};
use crate::lifecycle::{random_in, AgentId, IdAllocator, Route, RouteStep, SpawnTimer};
use crate::pathfinding_sys::find_path;
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PedestrianLeg {
    /// Walking from home to the destination building.
    Outbound,
    /// Walking back home; retired on arrival.
    Returning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pedestrian {
    pub id: AgentId,
    pub home: TileCoord,
    pub destination: TileCoord,
    pub leg: PedestrianLeg,
    pub route: Route,
    pub speed: f32,
    pub age: f32,
    /// Age at which the current leg counts as stalled; pushed out again when
    /// the return leg starts.
    pub max_age: f32,
    pub skin: u8,
}

impl Pedestrian {
    pub fn tile(&self) -> TileCoord {
        self.route.tile()
    }

    pub fn direction(&self) -> Direction {
        self.route.direction
    }

    pub fn progress(&self) -> f32 {
        self.route.progress
    }
}

#[derive(Resource, Debug, Default)]
pub struct PedestrianPopulation {
    pedestrians: Vec<Pedestrian>,
    ids: IdAllocator,
    spawn_timer: SpawnTimer,
}

impl PedestrianPopulation {
    pub fn pedestrians(&self) -> &[Pedestrian] {
        &self.pedestrians
    }

    pub fn len(&self) -> usize {
        self.pedestrians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pedestrians.is_empty()
    }

    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        params: &PedestrianParams,
        rng: &mut impl Rng,
    ) {
        // Too small to see: drop the crowd and stop spawning until zoomed in.
        if world.zoom() < params.min_zoom {
            self.pedestrians.clear();
            return;
        }
        let dt = world.scaled(delta);
        if dt <= 0.0 {
            return;
        }

        let grid = world.grid;
        self.pedestrians
            .retain_mut(|ped| step_pedestrian(ped, grid, dt, params));

        if self.spawn_timer.tick(dt, params.spawn_interval, rng) {
            for _ in 0..params.spawn_batch {
                self.try_spawn(world, params, rng);
            }
        }
    }

    /// Send a resident from a random home to a random destination.
    pub fn try_spawn(
        &mut self,
        world: &WorldState,
        params: &PedestrianParams,
        rng: &mut impl Rng,
    ) -> Option<AgentId> {
        let cap = params.capacity(world.index.road_tile_count(), world.device);
        if self.pedestrians.len() >= cap {
            return None;
        }
        let home = *world.index.pedestrian_origins.choose(rng)?;
        let destination = *world.index.pedestrian_destinations.choose(rng)?;
        let speed = random_in(rng, params.speed);
        let skin = rng.gen_range(0..params.skin_variants.max(1));
        self.spawn_between(world.grid, home, destination, speed, skin, params)
    }

    /// Route a pedestrian from `home` to `destination`; `None` if the two are
    /// not connected by road.
    pub fn spawn_between(
        &mut self,
        grid: &WorldGrid,
        home: TileCoord,
        destination: TileCoord,
        speed: f32,
        skin: u8,
        params: &PedestrianParams,
    ) -> Option<AgentId> {
        let route = Route::new(find_path(grid, home, destination))?;
        let max_age = params.leg_time_limit(route.steps(), speed);
        let id = self.ids.allocate();
        self.pedestrians.push(Pedestrian {
            id,
            home,
            destination,
            leg: PedestrianLeg::Outbound,
            route,
            speed,
            age: 0.0,
            max_age,
            skin,
        });
        Some(id)
    }

    pub fn clear(&mut self) {
        self.pedestrians.clear();
    }
}

/// Returns `false` when the pedestrian should be retired.
fn step_pedestrian(
    ped: &mut Pedestrian,
    grid: &WorldGrid,
    dt: f32,
    params: &PedestrianParams,
) -> bool {
    ped.age += dt;
    if ped.age > ped.max_age {
        debug!("Pedestrian {} stalled on {:?} leg, retiring", ped.id, ped.leg);
        return false;
    }
    match ped.route.advance(grid, ped.speed * dt) {
        RouteStep::EnRoute => true,
        RouteStep::Blocked => {
            trace!("Pedestrian {} blocked at {:?}", ped.id, ped.tile());
            false
        }
        RouteStep::Arrived => match ped.leg {
            PedestrianLeg::Outbound => {
                let Some(back) = Route::new(find_path(grid, ped.destination, ped.home)) else {
                    return false;
                };
                ped.max_age = ped.age + params.leg_time_limit(back.steps(), ped.speed);
                ped.route = back;
                ped.leg = PedestrianLeg::Returning;
                true
            }
            PedestrianLeg::Returning => false,
        },
    }
}

pub fn update_pedestrians(
    state: WorldStateParam,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut pedestrians: ResMut<PedestrianPopulation>,
) {
    let world = state.snapshot();
    pedestrians.update(&world, state.delta(), &params.pedestrians, &mut rng.0);
}

pub struct PedestriansPlugin;

impl Plugin for PedestriansPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PedestrianPopulation>().add_systems(
            Update,
            update_pedestrians.in_set(AgentSet::Pedestrians),
        );
    }
}
