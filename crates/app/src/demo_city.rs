//! The demo map the headless driver runs on.
//!
//! A road lattice with alternating residential, commercial and industrial
//! lots, stations in the corners, an airport, and a lake with a marina.
//! Police coverage falls off linearly with distance from each station.

use agents::coverage::PoliceCoverage;
use agents::grid::{BuildingKind, TileCoord, WorldGrid};

const BLOCK: usize = 6;
/// Coverage lost per tile of Manhattan distance from a police station.
const COVERAGE_FALLOFF: f32 = 6.0;

pub fn build_grid(size: usize) -> WorldGrid {
    let mut grid = WorldGrid::new(size);
    for y in 0..size {
        for x in 0..size {
            if x % BLOCK == 0 || y % BLOCK == 0 {
                grid.set_road(x, y);
                continue;
            }
            match (x / BLOCK + 2 * (y / BLOCK)) % 4 {
                0 | 1 => grid.set_building(x, y, BuildingKind::Residential, 30, 0),
                2 => grid.set_building(x, y, BuildingKind::Commercial, 0, 15),
                _ if (x + y) % 3 == 0 => grid.set_building(x, y, BuildingKind::Park, 0, 0),
                _ => grid.set_building(x, y, BuildingKind::Industrial, 0, 25),
            }
        }
    }

    let far = size - 2;
    grid.set_building(1, 1, BuildingKind::FireStation, 0, 12);
    grid.set_building(far, far, BuildingKind::FireStation, 0, 12);
    grid.set_building(far, 1, BuildingKind::PoliceStation, 0, 12);
    grid.set_building(1, far, BuildingKind::PoliceStation, 0, 12);
    grid.set_building(size / 2 + 1, size / 2 + 1, BuildingKind::Hospital, 0, 30);
    grid.set_building(size / 2 - 5, 2, BuildingKind::Airport, 0, 60);

    // Lake in the south-west quarter, marina on its east shore.
    let (lake_x, lake_y) = (BLOCK + 1, size / 2 + 1);
    for y in lake_y..lake_y + 9 {
        for x in lake_x..lake_x + 9 {
            grid.set_water(x, y);
        }
    }
    grid.set_building(lake_x + 9, lake_y + 4, BuildingKind::Marina, 0, 4);

    // One fire so the first sweep has something to dispatch to.
    grid.set_on_fire(13, 13, true);

    grid
}

pub fn build_coverage(grid: &WorldGrid) -> PoliceCoverage {
    let size = grid.size();
    let stations: Vec<TileCoord> = grid
        .cells()
        .filter(|(_, cell)| cell.building == BuildingKind::PoliceStation)
        .map(|(tile, _)| tile)
        .collect();

    let mut coverage = PoliceCoverage::new(size);
    for (tile, _) in grid.cells() {
        let best = stations
            .iter()
            .map(|s| 100.0 - COVERAGE_FALLOFF * s.manhattan(tile) as f32)
            .fold(0.0_f32, f32::max);
        coverage.set(tile, best);
    }
    coverage
}
