use crate::grid::{BuildingKind, TileCoord};
use crate::integration_tests::{no_random_crime, small_town};
use crate::lifecycle::AgentId;
use crate::pedestrians::PedestrianLeg;
use crate::world_state::{DeviceProfile, GameSpeed};

// ---------------------------------------------------------------------------
// Cars
// ---------------------------------------------------------------------------

#[test]
fn test_cars_only_ever_occupy_roads() {
    let mut world = small_town().with_params(no_random_crime());
    for _ in 0..300 {
        world.tick(1);
        for car in world.cars().cars() {
            assert!(world.grid().is_road(car.tile), "car {} off road", car.id);
            assert!((0.0..1.0).contains(&car.progress));
        }
    }
    assert!(!world.cars().is_empty());
}

#[test]
fn test_car_population_respects_grid_capacity() {
    let mut world = small_town()
        .with_params(no_random_crime())
        .with_speed(GameSpeed::VeryFast);
    // 32-tile grid: 2 × 32 = 64 cars at most.
    for _ in 0..1500 {
        world.tick(1);
        assert!(world.cars().len() <= 64);
    }
}

#[test]
fn test_cars_age_out() {
    let mut world = small_town().with_params(no_random_crime());
    world.run_for(10.0);
    let first: Vec<AgentId> = world.cars().cars().iter().map(|c| c.id).collect();
    assert!(!first.is_empty());

    // Max age is 35 s; none of the early cars can still be around.
    world.run_for(40.0);
    assert!(world
        .cars()
        .cars()
        .iter()
        .all(|car| !first.contains(&car.id)));
}

// ---------------------------------------------------------------------------
// Pedestrians
// ---------------------------------------------------------------------------

#[test]
fn test_pedestrians_walk_between_homes_and_destinations() {
    let mut world = small_town().with_params(no_random_crime());
    world.run_for(20.0);
    let pedestrians = world.pedestrians().pedestrians();
    assert!(!pedestrians.is_empty());
    for ped in pedestrians {
        assert_eq!(world.cell(ped.home.x, ped.home.y).building, BuildingKind::Residential);
        let tile = ped.tile();
        assert!(
            world.grid().is_road(tile) || tile == ped.home || tile == ped.destination,
            "pedestrian {} at {:?}",
            ped.id,
            tile
        );
    }
}

#[test]
fn test_pedestrians_eventually_head_home() {
    let mut world = small_town().with_params(no_random_crime());
    let mut saw_returning = false;
    for _ in 0..900 {
        world.tick(1);
        saw_returning |= world
            .pedestrians()
            .pedestrians()
            .iter()
            .any(|p| p.leg == PedestrianLeg::Returning);
    }
    assert!(saw_returning);
}

#[test]
fn test_zooming_out_clears_pedestrians() {
    let mut world = small_town().with_params(no_random_crime());
    world.run_for(10.0);
    assert!(!world.pedestrians().is_empty());

    world.set_zoom(0.4);
    world.tick(1);
    assert!(world.pedestrians().is_empty());
    world.run_for(10.0);
    assert!(world.pedestrians().is_empty(), "no spawning while zoomed out");
    assert!(!world.cars().is_empty(), "cars ignore zoom");

    world.set_zoom(1.0);
    world.run_for(5.0);
    assert!(!world.pedestrians().is_empty());
}

#[test]
fn test_constrained_device_caps_pedestrians() {
    let mut world = small_town()
        .with_params(no_random_crime())
        .with_device(DeviceProfile::Constrained)
        .with_speed(GameSpeed::VeryFast);
    for y in 6..19 {
        world = world.with_building(5, y, BuildingKind::Residential, 60, 0);
    }
    world.tick(1);
    let cap = 60.max(world.index().road_tile_count());
    for _ in 0..900 {
        world.tick(1);
        assert!(world.pedestrians().len() <= cap);
    }
}

// ---------------------------------------------------------------------------
// Grid edits
// ---------------------------------------------------------------------------

#[test]
fn test_bulldozing_every_road_retires_road_agents() {
    let mut world = small_town().with_params(no_random_crime());
    world.run_for(15.0);
    assert!(!world.cars().is_empty());
    assert!(!world.pedestrians().is_empty());

    let roads: Vec<TileCoord> = world.index().road_tiles.clone();
    {
        let mut grid = world.grid_mut();
        for tile in roads {
            grid.clear(tile.x, tile.y);
        }
    }
    world.tick(1);
    assert!(world.cars().is_empty());

    world.run_for(5.0);
    assert!(world.pedestrians().is_empty());
    assert!(world.fleet().is_empty());
}
