//! Airplanes and helicopters.
//!
//! Aircraft live in continuous screen space rather than on tiles. Both kinds
//! draw ids from one allocator, so an id names at most one aircraft. The
//! whole population only exists while the city is large enough and the camera
//! is zoomed in far enough to see it.

use std::f32::consts::PI;

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, AircraftParams};
use crate::config::ARRIVAL_RADIUS;
use crate::grid::{BuildingKind, TileCoord, WorldGrid};
use crate::lifecycle::{
    advance_along, heading_to, random_in, steer_towards, AgentId, IdAllocator, SpawnTimer,
};
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

/// Screen pixels beyond the map diamond an airplane may stray before it
/// turns for home.
const OFF_MAP_MARGIN: f32 = 128.0;

// =============================================================================
// Airplanes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AirplanePhase {
    /// Climbing out along the departure heading.
    TakingOff { elapsed: f32 },
    /// Cruising until `remaining` runs out or the plane leaves the map.
    Flying { remaining: f32 },
    /// Steering back to the home airport and descending.
    Landing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airplane {
    pub id: AgentId,
    pub airport: TileCoord,
    pub x: f32,
    pub y: f32,
    /// Heading in radians, screen space.
    pub angle: f32,
    /// 0 on the ground, 1 at cruise.
    pub altitude: f32,
    pub speed: f32,
    pub flight_time: f32,
    pub age: f32,
    pub max_age: f32,
    pub phase: AirplanePhase,
    pub color: u8,
}

impl Airplane {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn set_position(&mut self, p: Vec2) {
        self.x = p.x;
        self.y = p.y;
    }
}

/// Returns `false` when the airplane should be retired.
fn step_airplane(
    plane: &mut Airplane,
    grid: &WorldGrid,
    dt: f32,
    params: &AircraftParams,
) -> bool {
    plane.age += dt;
    if plane.age > plane.max_age {
        return false;
    }
    if grid.building_at(plane.airport) != BuildingKind::Airport {
        return false;
    }

    match plane.phase {
        AirplanePhase::TakingOff { elapsed } => {
            let elapsed = elapsed + dt;
            plane.altitude = (elapsed / params.takeoff_time.max(f32::EPSILON)).min(1.0);
            // Accelerate down the runway as it climbs.
            let speed = plane.speed * (0.4 + 0.6 * plane.altitude);
            plane.set_position(advance_along(plane.position(), plane.angle, speed * dt));
            plane.phase = if elapsed >= params.takeoff_time {
                AirplanePhase::Flying {
                    remaining: plane.flight_time,
                }
            } else {
                AirplanePhase::TakingOff { elapsed }
            };
        }
        AirplanePhase::Flying { remaining } => {
            let remaining = remaining - dt;
            plane.set_position(advance_along(plane.position(), plane.angle, plane.speed * dt));
            plane.phase = if remaining <= 0.0 || is_off_map(grid, plane.position()) {
                AirplanePhase::Landing
            } else {
                AirplanePhase::Flying { remaining }
            };
        }
        AirplanePhase::Landing => {
            let runway = WorldGrid::grid_to_screen(plane.airport);
            let (pos, angle) = steer_towards(
                plane.position(),
                plane.angle,
                runway,
                params.airplane_turn_rate * dt,
                plane.speed * dt,
                2.0 * plane.speed / params.airplane_turn_rate.max(f32::EPSILON),
            );
            plane.set_position(pos);
            plane.angle = angle;
            let distance = pos.distance(runway);
            plane.altitude = plane
                .altitude
                .min(distance / params.glide_distance.max(1.0));
            if distance <= ARRIVAL_RADIUS {
                return false;
            }
        }
    }
    true
}

fn is_off_map(grid: &WorldGrid, p: Vec2) -> bool {
    let (min, max) = grid.screen_bounds();
    p.x < min.x - OFF_MAP_MARGIN
        || p.y < min.y - OFF_MAP_MARGIN
        || p.x > max.x + OFF_MAP_MARGIN
        || p.y > max.y + OFF_MAP_MARGIN
}

// =============================================================================
// Helicopters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HelicopterPhase {
    /// Vertical climb off the pad.
    TakingOff { timer: f32 },
    /// Straight line to the destination pad.
    Flying,
    /// Vertical descent onto the pad; retired when `timer` runs out.
    Landing { timer: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Helicopter {
    pub id: AgentId,
    pub origin: TileCoord,
    pub destination: TileCoord,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub altitude: f32,
    pub speed: f32,
    pub age: f32,
    pub max_age: f32,
    pub phase: HelicopterPhase,
    pub color: u8,
}

impl Helicopter {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Returns `false` when the helicopter should be retired.
fn step_helicopter(
    heli: &mut Helicopter,
    grid: &WorldGrid,
    dt: f32,
    params: &AircraftParams,
) -> bool {
    heli.age += dt;
    if heli.age > heli.max_age {
        return false;
    }
    if !grid.building_at(heli.destination).is_heliport() {
        return false;
    }

    let hover = params.hover_time.max(f32::EPSILON);
    match heli.phase {
        HelicopterPhase::TakingOff { timer } => {
            let timer = timer - dt;
            heli.altitude = (1.0 - timer / hover).clamp(0.0, 1.0);
            heli.phase = if timer <= 0.0 {
                HelicopterPhase::Flying
            } else {
                HelicopterPhase::TakingOff { timer }
            };
        }
        HelicopterPhase::Flying => {
            let pad = WorldGrid::grid_to_screen(heli.destination);
            let here = heli.position();
            let step = heli.speed * dt;
            if here.distance(pad) <= step.max(ARRIVAL_RADIUS) {
                heli.x = pad.x;
                heli.y = pad.y;
                heli.phase = HelicopterPhase::Landing { timer: hover };
            } else {
                heli.angle = heading_to(here, pad);
                let next = advance_along(here, heli.angle, step);
                heli.x = next.x;
                heli.y = next.y;
            }
        }
        HelicopterPhase::Landing { timer } => {
            let timer = timer - dt;
            heli.altitude = (timer / hover).clamp(0.0, 1.0);
            if timer <= 0.0 {
                return false;
            }
            heli.phase = HelicopterPhase::Landing { timer };
        }
    }
    true
}

// =============================================================================
// Population
// =============================================================================

#[derive(Resource, Debug, Default)]
pub struct AircraftPopulation {
    airplanes: Vec<Airplane>,
    helicopters: Vec<Helicopter>,
    ids: IdAllocator,
    airplane_timer: SpawnTimer,
    helicopter_timer: SpawnTimer,
}

impl AircraftPopulation {
    pub fn airplanes(&self) -> &[Airplane] {
        &self.airplanes
    }

    pub fn helicopters(&self) -> &[Helicopter] {
        &self.helicopters
    }

    pub fn len(&self) -> usize {
        self.airplanes.len() + self.helicopters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seconds of scaled time until the next airplane and helicopter spawn
    /// attempts.
    pub fn next_spawns_in(&self) -> (f32, f32) {
        (
            self.airplane_timer.remaining(),
            self.helicopter_timer.remaining(),
        )
    }

    pub fn clear(&mut self) {
        self.airplanes.clear();
        self.helicopters.clear();
    }

    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        params: &AircraftParams,
        rng: &mut impl Rng,
    ) {
        if world.zoom() < params.min_zoom {
            self.clear();
            return;
        }
        let dt = world.flight_scaled(delta);
        if dt <= 0.0 {
            return;
        }
        let grid = world.grid;
        let index = world.index;

        if index.airports.is_empty() || index.total_population < params.airplane_min_population
        {
            self.airplanes.clear();
        } else {
            self.airplanes
                .retain_mut(|plane| step_airplane(plane, grid, dt, params));
            if self
                .airplane_timer
                .tick(dt, params.airplane_spawn_interval, rng)
            {
                self.spawn_airplane(world, params, rng);
            }
        }

        if index.heliports.len() < 2 || index.total_population < params.helicopter_min_population {
            self.helicopters.clear();
        } else {
            self.helicopters
                .retain_mut(|heli| step_helicopter(heli, grid, dt, params));
            if self
                .helicopter_timer
                .tick(dt, params.helicopter_spawn_interval, rng)
            {
                self.spawn_helicopter(world, params, rng);
            }
        }
    }

    /// Launch an airplane from a random airport on a random heading.
    pub fn spawn_airplane(
        &mut self,
        world: &WorldState,
        params: &AircraftParams,
        rng: &mut impl Rng,
    ) -> Option<AgentId> {
        let airports = &world.index.airports;
        if self.airplanes.len() >= params.airplane_capacity(airports.len()) {
            return None;
        }
        let airport = *airports.choose(rng)?;
        let start = WorldGrid::grid_to_screen(airport);
        let id = self.ids.allocate();
        self.airplanes.push(Airplane {
            id,
            airport,
            x: start.x,
            y: start.y,
            angle: rng.gen_range(-PI..PI),
            altitude: 0.0,
            speed: params.airplane_speed,
            flight_time: random_in(rng, params.flight_time),
            age: 0.0,
            max_age: params.airplane_max_age,
            phase: AirplanePhase::TakingOff { elapsed: 0.0 },
            color: rng.gen_range(0..params.color_variants.max(1)),
        });
        Some(id)
    }

    /// Launch a helicopter between two distinct heliport sites.
    pub fn spawn_helicopter(
        &mut self,
        world: &WorldState,
        params: &AircraftParams,
        rng: &mut impl Rng,
    ) -> Option<AgentId> {
        let sites = &world.index.heliports;
        if sites.len() < 2 || self.helicopters.len() >= params.helicopter_capacity(sites.len()) {
            return None;
        }
        let from = rng.gen_range(0..sites.len());
        // Any other site: shift past `from` so the two never coincide.
        let mut to = rng.gen_range(0..sites.len() - 1);
        if to >= from {
            to += 1;
        }
        let (origin, destination) = (sites[from], sites[to]);
        let start = WorldGrid::grid_to_screen(origin);
        let id = self.ids.allocate();
        self.helicopters.push(Helicopter {
            id,
            origin,
            destination,
            x: start.x,
            y: start.y,
            angle: heading_to(start, WorldGrid::grid_to_screen(destination)),
            altitude: 0.0,
            speed: params.helicopter_speed,
            age: 0.0,
            max_age: params.helicopter_max_age,
            phase: HelicopterPhase::TakingOff {
                timer: params.hover_time,
            },
            color: rng.gen_range(0..params.color_variants.max(1)),
        });
        Some(id)
    }
}

pub fn update_aircraft(
    state: WorldStateParam,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut aircraft: ResMut<AircraftPopulation>,
) {
    let world = state.snapshot();
    aircraft.update(&world, state.delta(), &params.aircraft, &mut rng.0);
}

pub struct AircraftPlugin;

impl Plugin for AircraftPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AircraftPopulation>()
            .add_systems(Update, update_aircraft.in_set(AgentSet::Aircraft));
    }
}
