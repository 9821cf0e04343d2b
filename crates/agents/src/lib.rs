//! Live agent and incident simulation for an isometric city.
//!
//! Every frame the agent core spawns, moves and retires cars, pedestrians,
//! emergency vehicles, aircraft and boats on a shared [`grid::WorldGrid`],
//! and opens and resolves crime incidents through nearest-station dispatch.
//! The grid itself, the police coverage field and the fire system are owned
//! by the host; this crate only reads them and reports back through events.

use bevy::prelude::*;

pub mod agent_params;
pub mod aircraft;
pub mod boats;
pub mod cars;
pub mod config;
pub mod coverage;
pub mod emergency;
pub mod grid;
pub mod grid_query;
pub mod incidents;
pub mod lifecycle;
pub mod pathfinding_sys;
pub mod pedestrians;
pub mod sim_rng;
pub mod simulation_sets;
pub mod world_state;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use simulation_sets::AgentSet;

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Frames the agent core has run, paused frames included.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

pub fn advance_tick_counter(mut tick: ResMut<TickCounter>) {
    tick.0 = tick.0.wrapping_add(1);
}

pub struct AgentsPlugin;

impl Plugin for AgentsPlugin {
    fn build(&self, app: &mut App) {
        // Host-owned inputs get defaults unless the host inserted them first.
        app.init_resource::<grid::WorldGrid>()
            .init_resource::<world_state::SimClock>()
            .init_resource::<world_state::Viewport>()
            .init_resource::<agent_params::AgentParams>()
            .init_resource::<sim_rng::SimRng>()
            .init_resource::<grid_query::GridIndex>()
            .init_resource::<TickCounter>();

        simulation_sets::configure_agent_sets(app);

        app.add_systems(
            Update,
            (advance_tick_counter, grid_query::refresh_grid_index).in_set(AgentSet::Index),
        );

        app.add_plugins((
            cars::CarsPlugin,
            pedestrians::PedestriansPlugin,
            emergency::EmergencyPlugin,
            incidents::IncidentsPlugin,
            aircraft::AircraftPlugin,
            boats::BoatsPlugin,
        ));
    }
}
