//! Host-side systems around the agent core: the fire system, the status log
//! and the frame limit.

use bevy::prelude::*;

use agents::aircraft::AircraftPopulation;
use agents::boats::BoatPopulation;
use agents::cars::CarPopulation;
use agents::emergency::{EmergencyFleet, FireServiced};
use agents::grid::WorldGrid;
use agents::incidents::{IgnitionRequest, IncidentRegistry, IncidentStats};
use agents::pedestrians::PedestrianPopulation;
use agents::TickCounter;

/// Frames between status lines (5 s at 60 Hz).
const STATUS_INTERVAL: u64 = 300;

/// Exit after this many frames; `None` runs forever.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameLimit(pub Option<u64>);

/// Serviced fires go out; escalated crimes set their building alight.
pub fn apply_fire_events(
    mut serviced: EventReader<FireServiced>,
    mut ignitions: EventReader<IgnitionRequest>,
    mut grid: ResMut<WorldGrid>,
) {
    for event in serviced.read() {
        grid.set_on_fire(event.tile.x, event.tile.y, false);
        debug!("Fire at {:?} extinguished", event.tile);
    }
    for event in ignitions.read() {
        grid.set_on_fire(event.tile.x, event.tile.y, true);
        info!("Arson at {:?}", event.tile);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn log_status(
    tick: Res<TickCounter>,
    cars: Res<CarPopulation>,
    pedestrians: Res<PedestrianPopulation>,
    fleet: Res<EmergencyFleet>,
    aircraft: Res<AircraftPopulation>,
    boats: Res<BoatPopulation>,
    registry: Res<IncidentRegistry>,
    grid: Res<WorldGrid>,
) {
    if tick.0 % STATUS_INTERVAL != 0 {
        return;
    }
    let fires = grid.cells().filter(|(_, cell)| cell.on_fire).count();
    info!(
        "frame {}: {} cars, {} pedestrians, {} emergency, {} aircraft, {} boats | {} crimes, {} fires",
        tick.0,
        cars.len(),
        pedestrians.len(),
        fleet.len(),
        aircraft.len(),
        boats.len(),
        registry.crime_count(),
        fires,
    );
}

pub fn enforce_frame_limit(
    limit: Res<FrameLimit>,
    tick: Res<TickCounter>,
    stats: Res<IncidentStats>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(max) = limit.0 else {
        return;
    };
    if tick.0 < max {
        return;
    }
    match serde_json::to_string(&*stats) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Could not serialize incident stats: {e}"),
    }
    exit.send(AppExit::Success);
}
