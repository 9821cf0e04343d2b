//! Read-only scans over the terrain/building grid.
//!
//! The predicates here are pure functions of a cell or a tile. [`GridIndex`]
//! runs them over the whole grid in one pass and caches the result until
//! `WorldGrid::version()` changes, so populations can ask "where are the
//! roads / stations / fires" every frame without rescanning.

use bevy::prelude::*;

use crate::grid::{BuildingKind, Cell, CellType, Direction, TileCoord, WorldGrid};

/// Residential buildings with residents send pedestrians out.
pub fn is_pedestrian_origin(cell: &Cell) -> bool {
    cell.building == BuildingKind::Residential && cell.population > 0
}

/// Shops and workplaces with jobs, and parks, attract pedestrians.
pub fn is_pedestrian_destination(cell: &Cell) -> bool {
    (cell.building.is_workplace() && cell.jobs > 0) || cell.building == BuildingKind::Park
}

/// Occupied buildings where a crime can happen.
pub fn is_crime_site(cell: &Cell) -> bool {
    cell.building != BuildingKind::None && (cell.population > 0 || cell.jobs > 0)
}

/// Road directions leaving `tile`, optionally excluding one (the way we came).
/// Returns a fixed array and the count of valid entries.
pub fn outgoing_road_directions(
    grid: &WorldGrid,
    tile: TileCoord,
    exclude: Option<Direction>,
) -> ([Direction; 4], usize) {
    let mut result = [Direction::North; 4];
    let mut count = 0;
    for dir in Direction::ALL {
        if Some(dir) == exclude {
            continue;
        }
        if let Some(next) = tile.step(dir, grid.size()) {
            if grid.is_road(next) {
                result[count] = dir;
                count += 1;
            }
        }
    }
    (result, count)
}

/// The water tile a marina launches boats from, if it touches water at all.
pub fn marina_dock(grid: &WorldGrid, marina: TileCoord) -> Option<TileCoord> {
    let (neighbors, count) = grid.neighbors4(marina);
    neighbors[..count]
        .iter()
        .copied()
        .find(|&n| grid.is_water(n))
}

/// A marina together with the water tile its boats use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarinaDock {
    pub marina: TileCoord,
    pub dock: TileCoord,
}

/// Cached whole-grid scan, valid for exactly one grid version.
#[derive(Resource, Debug, Default, Clone)]
pub struct GridIndex {
    version: Option<u64>,
    scans: u64,
    pub road_tiles: Vec<TileCoord>,
    pub water_tiles: Vec<TileCoord>,
    pub fire_stations: Vec<TileCoord>,
    pub police_stations: Vec<TileCoord>,
    pub airports: Vec<TileCoord>,
    pub heliports: Vec<TileCoord>,
    pub marinas: Vec<MarinaDock>,
    pub burning_tiles: Vec<TileCoord>,
    pub pedestrian_origins: Vec<TileCoord>,
    pub pedestrian_destinations: Vec<TileCoord>,
    pub crime_sites: Vec<TileCoord>,
    pub total_population: u64,
}

impl GridIndex {
    /// Scan `grid` into a fresh index.
    pub fn build(grid: &WorldGrid) -> Self {
        let mut index = Self::default();
        index.rescan(grid);
        index
    }

    pub fn is_current(&self, grid: &WorldGrid) -> bool {
        self.version == Some(grid.version())
    }

    /// Rescan if the grid changed since the last scan. Returns whether a
    /// rescan happened.
    pub fn refresh(&mut self, grid: &WorldGrid) -> bool {
        if self.is_current(grid) {
            return false;
        }
        self.rescan(grid);
        true
    }

    /// Number of full-grid scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn road_tile_count(&self) -> usize {
        self.road_tiles.len()
    }

    fn rescan(&mut self, grid: &WorldGrid) {
        let scans = self.scans + 1;
        *self = Self {
            version: Some(grid.version()),
            scans,
            ..Self::default()
        };

        for (tile, cell) in grid.cells() {
            match cell.cell_type {
                CellType::Road => self.road_tiles.push(tile),
                CellType::Water => self.water_tiles.push(tile),
                CellType::Grass => {}
            }
            if cell.on_fire {
                self.burning_tiles.push(tile);
            }
            self.total_population += u64::from(cell.population);
            if is_pedestrian_origin(cell) {
                self.pedestrian_origins.push(tile);
            }
            if is_pedestrian_destination(cell) {
                self.pedestrian_destinations.push(tile);
            }
            if is_crime_site(cell) {
                self.crime_sites.push(tile);
            }
            if cell.building.is_heliport() {
                self.heliports.push(tile);
            }
            match cell.building {
                BuildingKind::FireStation => self.fire_stations.push(tile),
                BuildingKind::PoliceStation => self.police_stations.push(tile),
                BuildingKind::Airport => self.airports.push(tile),
                BuildingKind::Marina => {
                    if let Some(dock) = marina_dock(grid, tile) {
                        self.marinas.push(MarinaDock { marina: tile, dock });
                    }
                }
                _ => {}
            }
        }
    }
}

/// Keeps `GridIndex` in step with `WorldGrid`. Runs first in the agent chain.
pub fn refresh_grid_index(grid: Res<WorldGrid>, mut index: ResMut<GridIndex>) {
    if index.is_current(&grid) {
        return;
    }
    index.refresh(&grid);
    trace!(
        "GridIndex: rescanned grid v{} ({} roads, {} burning)",
        grid.version(),
        index.road_tile_count(),
        index.burning_tiles.len()
    );
}
