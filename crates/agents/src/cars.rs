use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent_params::{AgentParams, CarParams};
use crate::config::MAX_CELL_STEPS_PER_TICK;
use crate::grid::{Direction, TileCoord, WorldGrid};
use crate::grid_query::outgoing_road_directions;
use crate::lifecycle::{random_in, AgentId, IdAllocator, SpawnTimer};
use crate::sim_rng::SimRng;
use crate::simulation_sets::AgentSet;
use crate::world_state::{WorldState, WorldStateParam};

/// A free-roaming car. Membership in [`CarPopulation`] is its only state:
/// a retired car is simply dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: AgentId,
    pub tile: TileCoord,
    pub direction: Direction,
    /// Fraction of the way from `tile` to the next tile in `direction`.
    pub progress: f32,
    /// Tiles per second.
    pub speed: f32,
    pub age: f32,
    pub max_age: f32,
    pub color: u8,
}

#[derive(Resource, Debug, Default)]
pub struct CarPopulation {
    cars: Vec<Car>,
    ids: IdAllocator,
    spawn_timer: SpawnTimer,
}

impl CarPopulation {
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Advance every car by one frame, retire the ones that aged out or lost
    /// their road, then let the spawn timer place a new car.
    pub fn update(
        &mut self,
        world: &WorldState,
        delta: f32,
        params: &CarParams,
        rng: &mut impl Rng,
    ) {
        let dt = world.scaled(delta);
        if dt <= 0.0 {
            return;
        }

        let grid = world.grid;
        self.cars.retain_mut(|car| step_car(car, grid, dt, rng));

        if self.spawn_timer.tick(dt, params.spawn_interval, rng) {
            self.try_spawn(world, params, rng);
        }
    }

    /// Place a car on a random road tile with somewhere to go. Returns the
    /// new id, or `None` when at capacity or no road qualifies.
    pub fn try_spawn(
        &mut self,
        world: &WorldState,
        params: &CarParams,
        rng: &mut impl Rng,
    ) -> Option<AgentId> {
        if self.cars.len() >= params.capacity(world.grid_size()) {
            return None;
        }
        let tile = *world.index.road_tiles.choose(rng)?;
        if !world.grid.is_road(tile) {
            return None;
        }
        let (dirs, count) = outgoing_road_directions(world.grid, tile, None);
        let direction = *dirs[..count].choose(rng)?;

        let speed = random_in(rng, params.speed);
        let max_age = random_in(rng, params.max_age);
        let color = rng.gen_range(0..params.color_variants.max(1));
        Some(self.spawn_at(tile, direction, speed, max_age, color))
    }

    /// Insert a car unconditionally.
    pub fn spawn_at(
        &mut self,
        tile: TileCoord,
        direction: Direction,
        speed: f32,
        max_age: f32,
        color: u8,
    ) -> AgentId {
        let id = self.ids.allocate();
        self.cars.push(Car {
            id,
            tile,
            direction,
            progress: 0.0,
            speed,
            age: 0.0,
            max_age,
            color,
        });
        id
    }

    pub fn clear(&mut self) {
        self.cars.clear();
    }
}

/// Returns `false` when the car should be retired.
fn step_car(car: &mut Car, grid: &WorldGrid, dt: f32, rng: &mut impl Rng) -> bool {
    car.age += dt;
    if car.age > car.max_age {
        return false;
    }
    if !grid.is_road(car.tile) {
        return false;
    }

    car.progress += car.speed * dt;
    let mut steps = 0;
    while car.progress >= 1.0 {
        if steps >= MAX_CELL_STEPS_PER_TICK {
            car.progress = car.progress.fract();
            break;
        }
        steps += 1;
        car.progress -= 1.0;

        let Some(next) = car.tile.step(car.direction, grid.size()) else {
            return false;
        };
        if !grid.is_road(next) {
            return false;
        }
        car.tile = next;

        // Never U-turn; no onward road means a dead end.
        let (dirs, count) =
            outgoing_road_directions(grid, next, Some(car.direction.opposite()));
        let Some(&dir) = dirs[..count].choose(rng) else {
            return false;
        };
        car.direction = dir;
    }
    true
}

pub fn update_cars(
    state: WorldStateParam,
    params: Res<AgentParams>,
    mut rng: ResMut<SimRng>,
    mut cars: ResMut<CarPopulation>,
) {
    let world = state.snapshot();
    cars.update(&world, state.delta(), &params.cars, &mut rng.0);
}

pub struct CarsPlugin;

impl Plugin for CarsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CarPopulation>()
            .add_systems(Update, update_cars.in_set(AgentSet::Cars));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_query::GridIndex;
    use crate::world_state::{GameSpeed, SimClock, Viewport};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// A 6x6 ring road around a grass block.
    fn ring_grid() -> WorldGrid {
        let mut grid = WorldGrid::new(8);
        for i in 1..=6 {
            grid.set_road(i, 1);
            grid.set_road(i, 6);
            grid.set_road(1, i);
            grid.set_road(6, i);
        }
        grid
    }

    fn run(
        cars: &mut CarPopulation,
        grid: &WorldGrid,
        speed: GameSpeed,
        params: &CarParams,
        ticks: usize,
        delta: f32,
        rng: &mut ChaCha8Rng,
    ) {
        let index = GridIndex::build(grid);
        let viewport = Viewport::default();
        let clock = SimClock {
            speed,
            ..Default::default()
        };
        let world = WorldState::new(grid, &index, &clock, &viewport);
        for _ in 0..ticks {
            cars.update(&world, delta, params, rng);
        }
    }

    #[test]
    fn test_cars_spawn_on_roads_and_stay_on_roads() {
        let grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cars = CarPopulation::default();
        run(&mut cars, &grid, GameSpeed::Normal, &CarParams::default(), 600, 0.05, &mut rng);

        assert!(!cars.is_empty(), "ring road should host cars");
        for car in cars.cars() {
            assert!(grid.is_road(car.tile));
            assert!((0.0..1.0).contains(&car.progress));
        }
    }

    #[test]
    fn test_capacity_respected() {
        let grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let params = CarParams {
            spawn_interval: (0.01, 0.02),
            max_age: (1000.0, 1001.0),
            ..Default::default()
        };
        let cap = params.capacity(grid.size());
        let mut cars = CarPopulation::default();
        for _ in 0..50 {
            run(&mut cars, &grid, GameSpeed::Fast, &params, 20, 0.1, &mut rng);
            assert!(cars.len() <= cap);
        }
        assert_eq!(cars.len(), cap);
    }

    #[test]
    fn test_no_roads_no_cars() {
        let grid = WorldGrid::new(16);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cars = CarPopulation::default();
        run(&mut cars, &grid, GameSpeed::VeryFast, &CarParams::default(), 500, 0.1, &mut rng);
        assert!(cars.is_empty());
    }

    #[test]
    fn test_age_out() {
        let grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut cars = CarPopulation::default();
        let id = cars.spawn_at(TileCoord::new(1, 1), Direction::East, 0.5, 1.0, 0);
        let params = CarParams {
            spawn_interval: (1000.0, 1001.0),
            ..Default::default()
        };
        // First tick fires the timer immediately; block it with a fresh one.
        cars.spawn_timer = SpawnTimer::new(1000.0);
        run(&mut cars, &grid, GameSpeed::Normal, &params, 1, 0.5, &mut rng);
        assert!(cars.cars().iter().any(|c| c.id == id));
        run(&mut cars, &grid, GameSpeed::Normal, &params, 1, 0.6, &mut rng);
        assert!(cars.cars().iter().all(|c| c.id != id));
    }

    #[test]
    fn test_bulldozed_road_retires_car() {
        let mut grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut cars = CarPopulation {
            spawn_timer: SpawnTimer::new(1000.0),
            ..Default::default()
        };
        cars.spawn_at(TileCoord::new(3, 1), Direction::East, 0.5, 100.0, 0);
        grid.clear(3, 1);
        run(&mut cars, &grid, GameSpeed::Normal, &CarParams::default(), 1, 0.1, &mut rng);
        assert!(cars.is_empty());
    }

    #[test]
    fn test_dead_end_retires_car() {
        let mut grid = WorldGrid::new(8);
        grid.set_road(0, 0);
        grid.set_road(1, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut cars = CarPopulation {
            spawn_timer: SpawnTimer::new(1000.0),
            ..Default::default()
        };
        cars.spawn_at(TileCoord::new(0, 0), Direction::East, 1.0, 100.0, 0);
        run(&mut cars, &grid, GameSpeed::Normal, &CarParams::default(), 1, 1.0, &mut rng);
        assert!(cars.is_empty(), "no onward road from (1,0) without a U-turn");
    }

    #[test]
    fn test_huge_delta_keeps_progress_invariant() {
        let grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut cars = CarPopulation {
            spawn_timer: SpawnTimer::new(1_000_000.0),
            ..Default::default()
        };
        for _ in 0..10 {
            cars.spawn_at(TileCoord::new(1, 1), Direction::East, 1.0, 1_000_000.0, 0);
        }
        run(&mut cars, &grid, GameSpeed::VeryFast, &CarParams::default(), 1, 5_000.0, &mut rng);
        assert_eq!(cars.len(), 10, "the ring has no dead ends");
        for car in cars.cars() {
            assert!(grid.is_road(car.tile));
            assert!(car.progress >= 0.0 && car.progress < 1.0);
        }
    }

    #[test]
    fn test_paused_freezes_cars() {
        let grid = ring_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut cars = CarPopulation::default();
        run(&mut cars, &grid, GameSpeed::Normal, &CarParams::default(), 200, 0.05, &mut rng);
        let before = cars.cars().to_vec();
        run(&mut cars, &grid, GameSpeed::Paused, &CarParams::default(), 200, 0.05, &mut rng);
        assert_eq!(cars.cars(), before.as_slice());
    }
}
