//! Incident registry: active crimes, fire-responder tracking and the
//! stochastic crime generator.
//!
//! Fires are not stored here. A fire is simply `Cell::on_fire` on the grid,
//! set and cleared by the external fire system; the registry only remembers
//! which fire truck, if any, is handling each burning tile. Crimes are owned
//! entirely by the registry and carry their responder on the record.
//!
//! Each tick an unattended crime's clock runs down by scaled time. A crime
//! with a responder assigned is frozen until the responder resolves it or is
//! retired. A robbery or burglary that runs out unattended may set its
//! building alight, which is reported as an [`IgnitionRequest`].

use std::collections::BTreeMap;

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, CrimeParams};
use crate::coverage::PoliceCoverage;
use crate::grid::{BuildingKind, TileCoord, WorldGrid};
use crate::lifecycle::{AgentId, SpawnTimer};
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrimeKind {
    Robbery,
    Burglary,
    Disturbance,
    Traffic,
}

impl CrimeKind {
    pub const ALL: [CrimeKind; 4] = [
        CrimeKind::Robbery,
        CrimeKind::Burglary,
        CrimeKind::Disturbance,
        CrimeKind::Traffic,
    ];

    /// Seconds of scaled time before the incident resolves on its own.
    pub fn duration(self, params: &CrimeParams) -> f32 {
        match self {
            CrimeKind::Robbery => params.robbery_duration,
            CrimeKind::Burglary => params.burglary_duration,
            CrimeKind::Disturbance => params.disturbance_duration,
            CrimeKind::Traffic => params.traffic_duration,
        }
    }

    /// Whether an unattended incident of this kind can end in arson.
    pub fn can_escalate(self) -> bool {
        matches!(self, CrimeKind::Robbery | CrimeKind::Burglary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeIncident {
    pub tile: TileCoord,
    pub kind: CrimeKind,
    pub time_remaining: f32,
    /// Id of the police car handling this incident.
    pub responder: Option<AgentId>,
    /// Report order across the registry's lifetime; lower is older.
    pub sequence: u64,
}

/// Ask the external fire system to ignite the building on `tile`.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnitionRequest {
    pub tile: TileCoord,
}

/// Running totals for the incident and dispatch pipeline.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentStats {
    pub crimes_spawned: u64,
    pub crimes_resolved: u64,
    pub crimes_escaped: u64,
    pub fires_dispatched: u64,
    pub fires_serviced: u64,
    pub police_dispatched: u64,
    /// Detections for which no station could reach the target.
    pub failed_dispatches: u64,
    pub ignitions_requested: u64,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Resource, Debug, Default)]
pub struct IncidentRegistry {
    crimes: BTreeMap<TileCoord, CrimeIncident>,
    fire_responders: BTreeMap<TileCoord, AgentId>,
    next_sequence: u64,
    spawn_timer: SpawnTimer,
}

impl IncidentRegistry {
    /// Active crimes in tile order.
    pub fn crimes(&self) -> impl Iterator<Item = &CrimeIncident> {
        self.crimes.values()
    }

    pub fn crime_at(&self, tile: TileCoord) -> Option<&CrimeIncident> {
        self.crimes.get(&tile)
    }

    pub fn crime_count(&self) -> usize {
        self.crimes.len()
    }

    /// Crimes no police car is handling yet, oldest report first.
    pub fn unassigned_crimes(&self) -> Vec<TileCoord> {
        let mut waiting: Vec<&CrimeIncident> = self
            .crimes
            .values()
            .filter(|c| c.responder.is_none())
            .collect();
        waiting.sort_by_key(|c| c.sequence);
        waiting.into_iter().map(|c| c.tile).collect()
    }

    /// Open a new incident. Refused if `tile` already hosts one.
    pub fn report_crime(&mut self, tile: TileCoord, kind: CrimeKind, params: &CrimeParams) -> bool {
        if self.crimes.contains_key(&tile) {
            return false;
        }
        self.crimes.insert(
            tile,
            CrimeIncident {
                tile,
                kind,
                time_remaining: kind.duration(params),
                responder: None,
                sequence: self.next_sequence,
            },
        );
        self.next_sequence += 1;
        true
    }

    /// Mark `vehicle` as the responder to the crime on `tile`. Fails if there
    /// is no such crime or it already has a responder.
    pub fn assign_police(&mut self, tile: TileCoord, vehicle: AgentId) -> bool {
        match self.crimes.get_mut(&tile) {
            Some(crime) if crime.responder.is_none() => {
                crime.responder = Some(vehicle);
                true
            }
            _ => false,
        }
    }

    /// Drop `vehicle`'s claim on the crime at `tile`; its clock resumes.
    pub fn release_police(&mut self, tile: TileCoord, vehicle: AgentId) {
        if let Some(crime) = self.crimes.get_mut(&tile) {
            if crime.responder == Some(vehicle) {
                crime.responder = None;
            }
        }
    }

    /// Close the crime at `tile` if `vehicle` is its responder.
    pub fn resolve_crime(&mut self, tile: TileCoord, vehicle: AgentId) -> Option<CrimeIncident> {
        if self.crimes.get(&tile)?.responder != Some(vehicle) {
            return None;
        }
        self.crimes.remove(&tile)
    }

    pub fn fire_responder(&self, tile: TileCoord) -> Option<AgentId> {
        self.fire_responders.get(&tile).copied()
    }

    pub fn fire_responder_count(&self) -> usize {
        self.fire_responders.len()
    }

    /// Claim the fire at `tile` for `vehicle`. Fails if already claimed.
    pub fn assign_fire(&mut self, tile: TileCoord, vehicle: AgentId) -> bool {
        if self.fire_responders.contains_key(&tile) {
            return false;
        }
        self.fire_responders.insert(tile, vehicle);
        true
    }

    pub fn release_fire(&mut self, tile: TileCoord, vehicle: AgentId) {
        if self.fire_responders.get(&tile) == Some(&vehicle) {
            self.fire_responders.remove(&tile);
        }
    }

    /// Burning tiles from `burning` that no fire truck is handling.
    pub fn unattended_fires(&self, burning: &[TileCoord]) -> Vec<TileCoord> {
        burning
            .iter()
            .copied()
            .filter(|tile| !self.fire_responders.contains_key(tile))
            .collect()
    }

    /// Run the unattended crime clocks down by `dt` seconds of scaled time.
    /// Returns ignition requests for escaped robberies and burglaries.
    pub fn decay(
        &mut self,
        grid: &WorldGrid,
        dt: f32,
        params: &CrimeParams,
        stats: &mut IncidentStats,
        rng: &mut impl Rng,
    ) -> Vec<IgnitionRequest> {
        let mut ignitions = Vec::new();
        self.crimes.retain(|&tile, crime| {
            if crime.responder.is_some() {
                return true;
            }
            crime.time_remaining -= dt;
            if crime.time_remaining > 0.0 {
                return true;
            }
            stats.crimes_escaped += 1;
            if crime.kind.can_escalate()
                && grid.building_at(tile) != BuildingKind::None
                && !grid.is_on_fire(tile)
                && rng.gen::<f32>() < params.escalation_fire_chance
            {
                debug!("Unattended {:?} at {:?} escalated to arson", crime.kind, tile);
                ignitions.push(IgnitionRequest { tile });
            }
            false
        });
        stats.ignitions_requested += ignitions.len() as u64;
        ignitions
    }

    /// One generator cycle: up to `spawn_attempts` new crimes, weighted
    /// towards poorly policed buildings. Returns how many were opened.
    pub fn generate(
        &mut self,
        world: &WorldState,
        coverage: &PoliceCoverage,
        params: &CrimeParams,
        stats: &mut IncidentStats,
        rng: &mut impl Rng,
    ) -> usize {
        let sites = &world.index.crime_sites;
        if sites.is_empty() {
            return 0;
        }
        let cap = params.max_active(world.index.total_population);
        let average = sites.iter().map(|&t| coverage.get(t)).sum::<f32>() / sites.len() as f32;
        let probability = params.spawn_probability(average);

        let mut opened = 0;
        for _ in 0..params.spawn_attempts {
            if self.crimes.len() >= cap {
                break;
            }
            if rng.gen::<f32>() >= probability {
                continue;
            }
            let Some(tile) = self.pick_site(sites, coverage, params, rng) else {
                continue;
            };
            let kind = CrimeKind::ALL[rng.gen_range(0..CrimeKind::ALL.len())];
            if self.report_crime(tile, kind, params) {
                trace!("Crime {:?} reported at {:?}", kind, tile);
                stats.crimes_spawned += 1;
                opened += 1;
            }
        }
        opened
    }

    /// Sample candidate sites, accepting each with probability proportional
    /// to how poorly it is policed. Occupied tiles are skipped.
    fn pick_site(
        &self,
        sites: &[TileCoord],
        coverage: &PoliceCoverage,
        params: &CrimeParams,
        rng: &mut impl Rng,
    ) -> Option<TileCoord> {
        for _ in 0..params.placement_tries {
            let tile = *sites.choose(rng)?;
            if self.crimes.contains_key(&tile) {
                continue;
            }
            if rng.gen::<f32>() < params.placement_weight(coverage.get(tile)) {
                return Some(tile);
            }
        }
        None
    }

    /// Per-frame entry point: decay, then let the generator timer run.
    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        coverage: &PoliceCoverage,
        params: &CrimeParams,
        stats: &mut IncidentStats,
        rng: &mut impl Rng,
    ) -> Vec<IgnitionRequest> {
        let dt = world.scaled(delta);
        if dt <= 0.0 {
            return Vec::new();
        }
        let ignitions = self.decay(world.grid, dt, params, stats, rng);
        if self.spawn_timer.tick(dt, params.spawn_interval, rng) {
            self.generate(world, coverage, params, stats, rng);
        }
        ignitions
    }
}

// =============================================================================
// Systems
// =============================================================================

#[allow(clippy::too_many_arguments)]
pub fn update_incidents(
    state: WorldStateParam,
    coverage: Res<PoliceCoverage>,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut registry: ResMut<IncidentRegistry>,
    mut stats: ResMut<IncidentStats>,
    mut ignitions: EventWriter<IgnitionRequest>,
) {
    let world = state.snapshot();
    let requests = registry.update(
        &world,
        state.delta(),
        &coverage,
        &params.crime,
        &mut stats,
        &mut rng.0,
    );
    for request in requests {
        ignitions.send(request);
    }
}

pub struct IncidentsPlugin;

impl Plugin for IncidentsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<IncidentRegistry>()
            .init_resource::<IncidentStats>()
            .init_resource::<PoliceCoverage>()
            .add_event::<IgnitionRequest>()
            .add_systems(Update, update_incidents.in_set(AgentSet::Incidents));
    }
}
