//! # TestWorld: headless integration test harness for the agent core
//!
//! Provides a fluent builder that wraps `bevy::app::App` + `AgentsPlugin`
//! for running scenario tests without a window or renderer. Time advances in
//! fixed 100 ms frames, so runs are fully deterministic for a given seed.
//!
//! The harness also stands in for the host's fire system: a fire whose truck
//! reports [`FireServiced`] is put out at the end of the same frame, and
//! every serviced fire and ignition request is logged for assertions.

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::agent_params::AgentParams;
use crate::aircraft::AircraftPopulation;
use crate::boats::BoatPopulation;
use crate::cars::CarPopulation;
use crate::coverage::PoliceCoverage;
use crate::emergency::{EmergencyFleet, FireServiced};
use crate::grid::{BuildingKind, Cell, TileCoord, WorldGrid};
use crate::grid_query::GridIndex;
use crate::incidents::{IgnitionRequest, IncidentRegistry, IncidentStats};
use crate::pedestrians::PedestrianPopulation;
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{DeviceProfile, GameSpeed, SimClock, Viewport};
use crate::{AgentsPlugin, TickCounter};

/// Side length of the default test grid.
pub const TEST_GRID_SIZE: usize = 32;

/// Length of one harness frame.
pub const FRAME: Duration = Duration::from_millis(100);

/// Everything the stand-in fire system observed.
#[derive(Resource, Default, Debug)]
pub struct HostEventLog {
    pub serviced: Vec<TileCoord>,
    pub ignitions: Vec<TileCoord>,
}

/// Plays the host's fire system: serviced fires go out, ignition requests
/// are recorded but not acted on.
fn host_fire_system(
    mut serviced: EventReader<FireServiced>,
    mut ignitions: EventReader<IgnitionRequest>,
    mut grid: ResMut<WorldGrid>,
    mut log: ResMut<HostEventLog>,
) {
    for event in serviced.read() {
        grid.set_on_fire(event.tile.x, event.tile.y, false);
        log.serviced.push(event.tile);
    }
    for event in ignitions.read() {
        log.ignitions.push(event.tile);
    }
}

/// A headless Bevy App wrapping `AgentsPlugin` for integration testing.
pub struct TestWorld {
    app: App,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An empty 32x32 grass world at normal speed and zoom 1.
    pub fn new() -> Self {
        Self::with_grid_size(TEST_GRID_SIZE)
    }

    pub fn with_grid_size(size: usize) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(FRAME));

        // Host inputs go in BEFORE the plugin so its defaults don't apply.
        app.insert_resource(WorldGrid::new(size));
        app.insert_resource(PoliceCoverage::new(size));
        app.add_plugins(AgentsPlugin);

        app.init_resource::<HostEventLog>();
        app.add_systems(Update, host_fire_system.after(AgentSet::Incidents));

        // First frame has a zero delta; nothing moves.
        app.update();

        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern, consumes and returns Self)
    // -----------------------------------------------------------------------

    /// Straight road from (x0,y0) to (x1,y1), inclusive. The two ends must
    /// share a row or a column.
    pub fn with_road(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        {
            let mut grid = self.grid_mut();
            if y0 == y1 {
                for x in x0.min(x1)..=x0.max(x1) {
                    grid.set_road(x, y0);
                }
            } else if x0 == x1 {
                for y in y0.min(y1)..=y0.max(y1) {
                    grid.set_road(x0, y);
                }
            }
        }
        self
    }

    pub fn with_building(
        mut self,
        x: usize,
        y: usize,
        kind: BuildingKind,
        population: u32,
        jobs: u32,
    ) -> Self {
        self.grid_mut().set_building(x, y, kind, population, jobs);
        self
    }

    /// Fill the rectangle (x0,y0)..=(x1,y1) with water.
    pub fn with_water(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        {
            let mut grid = self.grid_mut();
            for y in y0..=y1 {
                for x in x0..=x1 {
                    grid.set_water(x, y);
                }
            }
        }
        self
    }

    pub fn with_fire(mut self, x: usize, y: usize) -> Self {
        self.grid_mut().set_on_fire(x, y, true);
        self
    }

    pub fn with_speed(mut self, speed: GameSpeed) -> Self {
        self.set_speed(speed);
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.set_zoom(zoom);
        self
    }

    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.resource_mut::<SimClock>().device = device;
        self
    }

    /// Uniform police coverage across the whole grid.
    pub fn with_coverage(mut self, value: f32) -> Self {
        let size = self.grid().size();
        self.app
            .insert_resource(PoliceCoverage::filled(size, value));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.app.insert_resource(SimRng::from_seed_u64(seed));
        self
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.app.insert_resource(params);
        self
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Run `n` frames of 100 ms each.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Run for roughly `seconds` of wall-clock time.
    pub fn run_for(&mut self, seconds: f32) {
        let frames = (seconds / FRAME.as_secs_f32()).round() as u32;
        self.tick(frames);
    }

    pub fn set_speed(&mut self, speed: GameSpeed) {
        self.resource_mut::<SimClock>().speed = speed;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.resource_mut::<Viewport>().zoom = zoom;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn resource_mut<T: Resource>(&mut self) -> Mut<'_, T> {
        self.app.world_mut().resource_mut::<T>()
    }

    pub fn grid(&self) -> &WorldGrid {
        self.resource::<WorldGrid>()
    }

    /// Mutable grid access; every mutation bumps the grid version.
    pub fn grid_mut(&mut self) -> Mut<'_, WorldGrid> {
        self.resource_mut::<WorldGrid>()
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        self.grid().get(x, y)
    }

    pub fn index(&self) -> &GridIndex {
        self.resource::<GridIndex>()
    }

    pub fn cars(&self) -> &CarPopulation {
        self.resource::<CarPopulation>()
    }

    pub fn pedestrians(&self) -> &PedestrianPopulation {
        self.resource::<PedestrianPopulation>()
    }

    pub fn fleet(&self) -> &EmergencyFleet {
        self.resource::<EmergencyFleet>()
    }

    pub fn incidents(&self) -> &IncidentRegistry {
        self.resource::<IncidentRegistry>()
    }

    pub fn incidents_mut(&mut self) -> Mut<'_, IncidentRegistry> {
        self.resource_mut::<IncidentRegistry>()
    }

    pub fn stats(&self) -> &IncidentStats {
        self.resource::<IncidentStats>()
    }

    pub fn aircraft(&self) -> &AircraftPopulation {
        self.resource::<AircraftPopulation>()
    }

    pub fn boats(&self) -> &BoatPopulation {
        self.resource::<BoatPopulation>()
    }

    pub fn host_log(&self) -> &HostEventLog {
        self.resource::<HostEventLog>()
    }

    pub fn tick_count(&self) -> u64 {
        self.resource::<TickCounter>().0
    }

    /// Agents of every kind currently alive.
    pub fn total_agents(&self) -> usize {
        self.cars().len()
            + self.pedestrians().len()
            + self.fleet().len()
            + self.aircraft().len()
            + self.boats().len()
    }
}
