//! Emergency dispatch: fire trucks and police cars.
//!
//! Every `detection_interval` seconds of scaled time the dispatcher looks for
//! burning tiles without a fire truck and crimes without a police car, routes
//! a vehicle from the nearest station that can actually reach the target, and
//! records the assignment in the [`IncidentRegistry`].
//!
//! A vehicle then runs `Dispatching -> Responding -> Returning -> retired`.
//! Each phase walks a freshly computed route; losing the road at any point
//! retires the vehicle and releases whatever it had claimed.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, EmergencyParams};
use crate::grid::{TileCoord, WorldGrid};
use crate::incidents::{IncidentRegistry, IncidentStats};
use crate::lifecycle::{AgentId, IdAllocator, Route, RouteStep, SpawnTimer};
use crate::pathfinding_sys::find_path;
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyKind {
    FireTruck,
    PoliceCar,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EmergencyPhase {
    /// Driving from the station to the target.
    Dispatching,
    /// On scene; `remaining` seconds of scaled time until the job is done.
    Responding { remaining: f32 },
    /// Driving back to the station; retired on arrival.
    Returning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyVehicle {
    pub id: AgentId,
    pub kind: EmergencyKind,
    pub phase: EmergencyPhase,
    pub station: TileCoord,
    pub target: TileCoord,
    pub route: Route,
    pub speed: f32,
    pub age: f32,
}

impl EmergencyVehicle {
    pub fn tile(&self) -> TileCoord {
        self.route.tile()
    }
}

/// A fire truck finished its on-scene work; the fire system may put the
/// building out.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireServiced {
    pub tile: TileCoord,
}

#[derive(Resource, Debug, Default)]
pub struct EmergencyFleet {
    vehicles: Vec<EmergencyVehicle>,
    ids: IdAllocator,
    detection_timer: SpawnTimer,
}

impl EmergencyFleet {
    pub fn vehicles(&self) -> &[EmergencyVehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn count(&self, kind: EmergencyKind) -> usize {
        self.vehicles.iter().filter(|v| v.kind == kind).count()
    }

    /// Advance every vehicle, then run a detection sweep when one is due.
    /// Returns the fires whose service finished this frame.
    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        params: &EmergencyParams,
        registry: &mut IncidentRegistry,
        stats: &mut IncidentStats,
        rng: &mut impl Rng,
    ) -> Vec<FireServiced> {
        let dt = world.scaled(delta);
        if dt <= 0.0 {
            return Vec::new();
        }

        let grid = world.grid;
        let mut serviced = Vec::new();
        self.vehicles.retain_mut(|vehicle| {
            let keep = step_vehicle(vehicle, grid, dt, params, registry, stats, &mut serviced);
            if !keep {
                trace!("{:?} {} retired at {:?}", vehicle.kind, vehicle.id, vehicle.tile());
            }
            keep
        });

        let interval = params.detection_interval;
        if self.detection_timer.tick(dt, (interval, interval), rng) {
            // The fire system only hears about these after this frame.
            let burning: Vec<TileCoord> = world
                .index
                .burning_tiles
                .iter()
                .copied()
                .filter(|tile| !serviced.iter().any(|s| s.tile == *tile))
                .collect();
            self.detect_and_dispatch(world, &burning, params, registry, stats);
        }
        serviced
    }

    /// One detection sweep: every unattended fire in `burning` gets a truck,
    /// and up to the police quota of unattended crimes get a patrol car.
    pub fn detect_and_dispatch(
        &mut self,
        world: &WorldState,
        burning: &[TileCoord],
        params: &EmergencyParams,
        registry: &mut IncidentRegistry,
        stats: &mut IncidentStats,
    ) {
        let index = world.index;

        for tile in registry.unattended_fires(burning) {
            match self.dispatch(world.grid, &index.fire_stations, tile, EmergencyKind::FireTruck, params) {
                Some(id) => {
                    registry.assign_fire(tile, id);
                    stats.fires_dispatched += 1;
                }
                None => stats.failed_dispatches += 1,
            }
        }

        let quota = params.police_quota(index.police_stations.len());
        let mut sent = 0;
        for tile in registry.unassigned_crimes() {
            if sent >= quota {
                break;
            }
            match self.dispatch(world.grid, &index.police_stations, tile, EmergencyKind::PoliceCar, params) {
                Some(id) => {
                    registry.assign_police(tile, id);
                    stats.police_dispatched += 1;
                    sent += 1;
                }
                None => stats.failed_dispatches += 1,
            }
        }
    }

    /// Send a vehicle of `kind` to `target` from the nearest station with a
    /// route. Returns the new vehicle's id.
    pub fn dispatch(
        &mut self,
        grid: &WorldGrid,
        stations: &[TileCoord],
        target: TileCoord,
        kind: EmergencyKind,
        params: &EmergencyParams,
    ) -> Option<AgentId> {
        let Some((station, route)) = route_from_nearest(grid, stations, target) else {
            trace!("No {:?} can reach {:?}", kind, target);
            return None;
        };
        let id = self.ids.allocate();
        let speed = match kind {
            EmergencyKind::FireTruck => params.fire_truck_speed,
            EmergencyKind::PoliceCar => params.police_car_speed,
        };
        debug!(
            "{:?} {} dispatched from {:?} to {:?} ({} tiles)",
            kind,
            id,
            station,
            target,
            route.tiles.len()
        );
        self.vehicles.push(EmergencyVehicle {
            id,
            kind,
            phase: EmergencyPhase::Dispatching,
            station,
            target,
            route,
            speed,
            age: 0.0,
        });
        Some(id)
    }
}

/// Stations in Manhattan-distance order (ties by tile); the first one with a
/// non-empty route wins.
fn route_from_nearest(
    grid: &WorldGrid,
    stations: &[TileCoord],
    target: TileCoord,
) -> Option<(TileCoord, Route)> {
    let mut candidates = stations.to_vec();
    candidates.sort_by_key(|s| (s.manhattan(target), *s));
    candidates
        .into_iter()
        .find_map(|station| Route::new(find_path(grid, station, target)).map(|r| (station, r)))
}

fn release_claim(vehicle: &EmergencyVehicle, registry: &mut IncidentRegistry) {
    match vehicle.kind {
        EmergencyKind::FireTruck => registry.release_fire(vehicle.target, vehicle.id),
        EmergencyKind::PoliceCar => registry.release_police(vehicle.target, vehicle.id),
    }
}

/// Returns `false` when the vehicle should be retired.
#[allow(clippy::too_many_arguments)]
fn step_vehicle(
    vehicle: &mut EmergencyVehicle,
    grid: &WorldGrid,
    dt: f32,
    params: &EmergencyParams,
    registry: &mut IncidentRegistry,
    stats: &mut IncidentStats,
    serviced: &mut Vec<FireServiced>,
) -> bool {
    vehicle.age += dt;
    match vehicle.phase {
        EmergencyPhase::Dispatching => match vehicle.route.advance(grid, vehicle.speed * dt) {
            RouteStep::EnRoute => true,
            RouteStep::Arrived => {
                let remaining = match vehicle.kind {
                    EmergencyKind::FireTruck => params.fire_service_time,
                    EmergencyKind::PoliceCar => params.police_service_time,
                };
                vehicle.phase = EmergencyPhase::Responding { remaining };
                true
            }
            RouteStep::Blocked => {
                release_claim(vehicle, registry);
                false
            }
        },
        EmergencyPhase::Responding { remaining } => {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                vehicle.phase = EmergencyPhase::Responding { remaining };
                return true;
            }
            match vehicle.kind {
                EmergencyKind::FireTruck => {
                    registry.release_fire(vehicle.target, vehicle.id);
                    serviced.push(FireServiced {
                        tile: vehicle.target,
                    });
                    stats.fires_serviced += 1;
                }
                EmergencyKind::PoliceCar => {
                    if registry.resolve_crime(vehicle.target, vehicle.id).is_some() {
                        stats.crimes_resolved += 1;
                    }
                }
            }
            let Some(back) = Route::new(find_path(grid, vehicle.target, vehicle.station)) else {
                return false;
            };
            vehicle.route = back;
            vehicle.phase = EmergencyPhase::Returning;
            true
        }
        EmergencyPhase::Returning => {
            matches!(vehicle.route.advance(grid, vehicle.speed * dt), RouteStep::EnRoute)
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn update_emergency(
    state: WorldStateParam,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut fleet: ResMut<EmergencyFleet>,
    mut registry: ResMut<IncidentRegistry>,
    mut stats: ResMut<IncidentStats>,
    mut serviced: EventWriter<FireServiced>,
) {
    let world = state.snapshot();
    let done = fleet.update(
        &world,
        state.delta(),
        &params.emergency,
        &mut registry,
        &mut stats,
        &mut rng.0,
    );
    for event in done {
        serviced.send(event);
    }
}

pub struct EmergencyPlugin;

impl Plugin for EmergencyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EmergencyFleet>()
            .add_event::<FireServiced>()
            .add_systems(Update, update_emergency.in_set(AgentSet::Emergency));
    }
}
