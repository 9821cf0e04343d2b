//! `isocity`: runs the agent core headless on a demo map.
//!
//! Environment:
//! - `ISOCITY_FRAMES`: exit after this many frames and print the incident
//!   totals as JSON on stdout
//! - `ISOCITY_SPEED`: game speed level, 0 (paused) to 3 (very fast)
//! - `ISOCITY_SEED`: seed for the simulation RNG
//! - `RUST_LOG`: log filter, e.g. `agents=debug`

mod demo_city;
mod host;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use agents::config::DEFAULT_GRID_SIZE;
use agents::sim_rng::SimRng;
use agents::simulation_sets::AgentSet;
use agents::world_state::{DeviceProfile, GameSpeed, SimClock};
use agents::AgentsPlugin;

use host::FrameLimit;

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("ignoring {name}={raw:?}: not a number");
            None
        }
    }
}

fn main() {
    let grid = demo_city::build_grid(DEFAULT_GRID_SIZE);
    let coverage = demo_city::build_coverage(&grid);
    let speed = env_number::<u8>("ISOCITY_SPEED").map_or(GameSpeed::Normal, GameSpeed::from_level);

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
        LogPlugin::default(),
    ));

    // Host inputs go in before the plugin so its defaults don't apply.
    app.insert_resource(grid)
        .insert_resource(coverage)
        .insert_resource(SimClock {
            speed,
            device: DeviceProfile::Desktop,
        })
        .insert_resource(FrameLimit(env_number("ISOCITY_FRAMES")));
    if let Some(seed) = env_number::<u64>("ISOCITY_SEED") {
        app.insert_resource(SimRng::from_seed_u64(seed));
    }

    app.add_plugins(AgentsPlugin).add_systems(
        Update,
        (
            host::apply_fire_events,
            host::log_status,
            host::enforce_frame_limit,
        )
            .chain()
            .after(AgentSet::Incidents),
    );

    info!("isocity running at {:?} on a {}x{} grid", speed, DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE);
    app.run();
}
