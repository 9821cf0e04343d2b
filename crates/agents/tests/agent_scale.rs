//! Scale and property tests for the agent core, driven through the public
//! population APIs without a Bevy App.
//!
//! - Pathfinding returns either nothing or a shortest road route on random grids
//! - Road populations stay on roads and inside their caps on a 256x256 lattice
//! - A paused world changes nothing
//! - The crime generator respects its cap on a large, unpoliced city
//!
//! Run: cargo test -p agents --test agent_scale

use std::collections::VecDeque;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use agents::agent_params::{AgentParams, CarParams, CrimeParams, PedestrianParams};
use agents::cars::CarPopulation;
use agents::coverage::PoliceCoverage;
use agents::grid::{BuildingKind, Direction, TileCoord, WorldGrid};
use agents::grid_query::GridIndex;
use agents::incidents::{IncidentRegistry, IncidentStats};
use agents::pathfinding_sys::find_path;
use agents::pedestrians::PedestrianPopulation;
use agents::world_state::{DeviceProfile, GameSpeed, SimClock, Viewport, WorldState};

const DELTA: f32 = 0.1;

/// Roads every `spacing` rows and columns, homes and shops in between.
fn lattice_city(size: usize, spacing: usize) -> WorldGrid {
    let mut grid = WorldGrid::new(size);
    for y in 0..size {
        for x in 0..size {
            if x % spacing == 0 || y % spacing == 0 {
                grid.set_road(x, y);
            } else if (x + y) % 7 == 0 {
                grid.set_building(x, y, BuildingKind::Commercial, 0, 20);
            } else if (x * 3 + y) % 5 == 0 {
                grid.set_building(x, y, BuildingKind::Residential, 30, 0);
            }
        }
    }
    grid
}

// ---------------------------------------------------------------------------
// 1. Pathfinding on random grids
// ---------------------------------------------------------------------------

/// Steps from `start` to `end` by breadth-first flood over a distance table,
/// entering road tiles and `end` itself.
fn flood_distance(grid: &WorldGrid, start: TileCoord, end: TileCoord) -> Option<usize> {
    let size = grid.size();
    let mut dist = vec![usize::MAX; size * size];
    let mut queue = VecDeque::new();
    dist[start.y * size + start.x] = 0;
    queue.push_back(start);
    while let Some(tile) = queue.pop_front() {
        let d = dist[tile.y * size + tile.x];
        if tile == end {
            return Some(d);
        }
        for dir in Direction::ALL {
            let Some(next) = tile.step(dir, size) else {
                continue;
            };
            let slot = &mut dist[next.y * size + next.x];
            if *slot == usize::MAX && (next == end || grid.is_road(next)) {
                *slot = d + 1;
                queue.push_back(next);
            }
        }
    }
    None
}

#[test]
fn test_paths_on_random_grids_are_shortest_road_routes() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let size = 24;
        let mut grid = WorldGrid::new(size);
        for y in 0..size {
            for x in 0..size {
                if rng.gen_bool(0.55) {
                    grid.set_road(x, y);
                }
            }
        }
        let start = TileCoord::new(rng.gen_range(0..size), rng.gen_range(0..size));
        let end = TileCoord::new(rng.gen_range(0..size), rng.gen_range(0..size));

        let path = find_path(&grid, start, end);
        let shortest = flood_distance(&grid, start, end);
        if path.is_empty() {
            assert_eq!(shortest, None, "{start:?} -> {end:?} is reachable");
            continue;
        }
        assert_eq!(Some(path.len() - 1), shortest, "{start:?} -> {end:?} not shortest");
        assert_eq!(path[0], start);
        assert_eq!(*path.last().unwrap(), end);
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1, "path jumps at {:?}", pair);
        }
        let inner = path.len().saturating_sub(2);
        for tile in path.iter().skip(1).take(inner) {
            assert!(grid.is_road(*tile), "path crosses non-road {:?}", tile);
        }
    }
}

#[test]
fn test_path_is_symmetric_in_length() {
    let grid = lattice_city(64, 8);
    let a = TileCoord::new(0, 0);
    let b = TileCoord::new(56, 40);
    let there = find_path(&grid, a, b);
    let back = find_path(&grid, b, a);
    assert_eq!(there.len(), back.len());
    assert_eq!(there.len(), a.manhattan(b) + 1);
}

// ---------------------------------------------------------------------------
// 2. Road populations at scale
// ---------------------------------------------------------------------------

#[test]
fn test_cars_stay_on_roads_at_full_capacity() {
    let grid = lattice_city(256, 8);
    let index = GridIndex::build(&grid);
    let clock = SimClock {
        speed: GameSpeed::VeryFast,
        device: DeviceProfile::Desktop,
    };
    let viewport = Viewport::default();
    let world = WorldState::new(&grid, &index, &clock, &viewport);
    let params = CarParams::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let mut cars = CarPopulation::default();
    for i in 0..params.capacity(256) {
        let tile = index.road_tiles[i * 97 % index.road_tiles.len()];
        cars.spawn_at(tile, Direction::East, 1.0, 30.0, 0);
    }

    let start = Instant::now();
    for _ in 0..2_000 {
        cars.update(&world, DELTA, &params, &mut rng);
        assert!(cars.len() <= params.capacity(256));
        for car in cars.cars() {
            assert!(grid.is_road(car.tile));
            assert!((0.0..1.0).contains(&car.progress));
            assert!(car.age <= car.max_age);
        }
    }
    println!("2000 car ticks on a 256 grid: {:?}", start.elapsed());
}

#[test]
fn test_pedestrian_cap_on_constrained_device() {
    let grid = lattice_city(64, 8);
    let index = GridIndex::build(&grid);
    let clock = SimClock {
        speed: GameSpeed::VeryFast,
        device: DeviceProfile::Constrained,
    };
    let viewport = Viewport::default();
    let world = WorldState::new(&grid, &index, &clock, &viewport);
    let params = PedestrianParams {
        spawn_batch: 20,
        ..Default::default()
    };
    let cap = params.capacity(index.road_tile_count(), DeviceProfile::Constrained);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let mut pedestrians = PedestrianPopulation::default();
    for _ in 0..1_500 {
        pedestrians.update(&world, DELTA, &params, &mut rng);
        assert!(pedestrians.len() <= cap);
        for ped in pedestrians.pedestrians() {
            assert!((0.0..1.0).contains(&ped.progress()));
        }
    }
    assert!(!pedestrians.is_empty());
}

#[test]
fn test_paused_world_changes_nothing() {
    let grid = lattice_city(64, 8);
    let index = GridIndex::build(&grid);
    let viewport = Viewport::default();
    let params = AgentParams::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let running = SimClock::default();
    let mut cars = CarPopulation::default();
    let mut pedestrians = PedestrianPopulation::default();
    {
        let world = WorldState::new(&grid, &index, &running, &viewport);
        for _ in 0..200 {
            cars.update(&world, DELTA, &params.cars, &mut rng);
            pedestrians.update(&world, DELTA, &params.pedestrians, &mut rng);
        }
    }
    let cars_before = cars.cars().to_vec();
    let pedestrians_before = pedestrians.pedestrians().to_vec();
    assert!(!cars_before.is_empty());

    let paused = SimClock {
        speed: GameSpeed::Paused,
        ..Default::default()
    };
    let world = WorldState::new(&grid, &index, &paused, &viewport);
    for _ in 0..200 {
        cars.update(&world, DELTA, &params.cars, &mut rng);
        pedestrians.update(&world, DELTA, &params.pedestrians, &mut rng);
    }
    assert_eq!(cars.cars(), cars_before.as_slice());
    assert_eq!(pedestrians.pedestrians(), pedestrians_before.as_slice());
}

// ---------------------------------------------------------------------------
// 3. Crime generator at scale
// ---------------------------------------------------------------------------

#[test]
fn test_crime_cap_tracks_population() {
    let grid = lattice_city(128, 8);
    let index = GridIndex::build(&grid);
    let clock = SimClock::default();
    let viewport = Viewport::default();
    let world = WorldState::new(&grid, &index, &clock, &viewport);
    let coverage = PoliceCoverage::new(128);
    let params = CrimeParams::default();
    let cap = params.max_active(index.total_population);
    let mut stats = IncidentStats::default();
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let mut registry = IncidentRegistry::default();
    for _ in 0..10_000 {
        registry.update(&world, DELTA, &coverage, &params, &mut stats, &mut rng);
        assert!(registry.crime_count() <= cap);
    }
    assert!(stats.crimes_spawned > 0);
    assert!(stats.crimes_escaped > 0, "nobody answers, so crimes run out");
    for crime in registry.crimes() {
        assert!(index.crime_sites.contains(&crime.tile));
    }
}
