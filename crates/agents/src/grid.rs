use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{TILE_HEIGHT, TILE_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellType {
    #[default]
    Grass,
    Water,
    Road,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BuildingKind {
    #[default]
    None,
    Residential,
    Commercial,
    Industrial,
    Park,
    FireStation,
    PoliceStation,
    Hospital,
    Airport,
    Marina,
}

impl BuildingKind {
    /// Sites a helicopter may take off from or land on.
    pub fn is_heliport(self) -> bool {
        matches!(
            self,
            BuildingKind::Hospital
                | BuildingKind::FireStation
                | BuildingKind::PoliceStation
                | BuildingKind::Airport
        )
    }

    pub fn is_workplace(self) -> bool {
        matches!(self, BuildingKind::Commercial | BuildingKind::Industrial)
    }
}

/// Grid coordinate used as the key for every per-tile lookup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TileCoord {
    pub x: usize,
    pub y: usize,
}

impl TileCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: TileCoord) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The neighbouring coordinate in `dir`, or `None` when it would leave a
    /// `size`×`size` grid.
    pub fn step(self, dir: Direction, size: usize) -> Option<TileCoord> {
        let (dx, dy) = dir.offset();
        let nx = self.x as i64 + dx as i64;
        let ny = self.y as i64 + dy as i64;
        if nx < 0 || ny < 0 || nx >= size as i64 || ny >= size as i64 {
            return None;
        }
        Some(TileCoord::new(nx as usize, ny as usize))
    }
}

impl From<(usize, usize)> for TileCoord {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Grid offset; north is towards y = 0.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction of travel from `from` to an orthogonally adjacent `to`.
    pub fn between(from: TileCoord, to: TileCoord) -> Option<Direction> {
        let dx = to.x as i64 - from.x as i64;
        let dy = to.y as i64 - from.y as i64;
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    pub building: BuildingKind,
    pub population: u32,
    pub jobs: u32,
    pub on_fire: bool,
}

/// Square terrain/building grid shared by every population.
///
/// The agent core only reads it. Every mutation goes through `get_mut` (or a
/// setter built on it) which bumps `version`, so derived scans can be cached
/// until the terrain actually changes.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct WorldGrid {
    cells: Vec<Cell>,
    size: usize,
    version: u64,
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GRID_SIZE)
    }
}

impl WorldGrid {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![Cell::default(); size * size],
            size,
            version: 0,
        }
    }

    /// Side length of the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    #[inline]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.in_bounds(tile.x, tile.y)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &Cell {
        &self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn cell(&self, tile: TileCoord) -> Option<&Cell> {
        self.contains(tile).then(|| self.get(tile.x, tile.y))
    }

    /// Mutable cell access. Always counts as a grid change.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        self.version += 1;
        let idx = self.index(x, y);
        &mut self.cells[idx]
    }

    pub fn cells(&self) -> impl Iterator<Item = (TileCoord, &Cell)> {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (TileCoord::new(i % size, i / size), c))
    }

    // -----------------------------------------------------------------------
    // Predicates (out of bounds is never a road, never on fire, ...)
    // -----------------------------------------------------------------------

    pub fn is_road(&self, tile: TileCoord) -> bool {
        self.cell(tile)
            .is_some_and(|c| c.cell_type == CellType::Road)
    }

    pub fn is_water(&self, tile: TileCoord) -> bool {
        self.cell(tile)
            .is_some_and(|c| c.cell_type == CellType::Water)
    }

    pub fn is_on_fire(&self, tile: TileCoord) -> bool {
        self.cell(tile).is_some_and(|c| c.on_fire)
    }

    pub fn has_population(&self, tile: TileCoord) -> bool {
        self.cell(tile).is_some_and(|c| c.population > 0)
    }

    pub fn has_jobs(&self, tile: TileCoord) -> bool {
        self.cell(tile).is_some_and(|c| c.jobs > 0)
    }

    pub fn building_at(&self, tile: TileCoord) -> BuildingKind {
        self.cell(tile).map_or(BuildingKind::None, |c| c.building)
    }

    // -----------------------------------------------------------------------
    // Mutation (used by hosts and tests; out-of-bounds writes are ignored)
    // -----------------------------------------------------------------------

    pub fn set_road(&mut self, x: usize, y: usize) {
        if !self.in_bounds(x, y) {
            return;
        }
        *self.get_mut(x, y) = Cell {
            cell_type: CellType::Road,
            ..Cell::default()
        };
    }

    pub fn set_water(&mut self, x: usize, y: usize) {
        if !self.in_bounds(x, y) {
            return;
        }
        *self.get_mut(x, y) = Cell {
            cell_type: CellType::Water,
            ..Cell::default()
        };
    }

    pub fn set_building(
        &mut self,
        x: usize,
        y: usize,
        building: BuildingKind,
        population: u32,
        jobs: u32,
    ) {
        if !self.in_bounds(x, y) {
            return;
        }
        *self.get_mut(x, y) = Cell {
            cell_type: CellType::Grass,
            building,
            population,
            jobs,
            on_fire: false,
        };
    }

    /// Bulldoze back to empty grass.
    pub fn clear(&mut self, x: usize, y: usize) {
        if !self.in_bounds(x, y) {
            return;
        }
        *self.get_mut(x, y) = Cell::default();
    }

    pub fn set_on_fire(&mut self, x: usize, y: usize, on_fire: bool) {
        if !self.in_bounds(x, y) {
            return;
        }
        self.get_mut(x, y).on_fire = on_fire;
    }

    /// Returns up to 4 cardinal neighbors and the count of valid entries.
    /// Use `&result[..count]` to iterate over valid neighbors.
    pub fn neighbors4(&self, tile: TileCoord) -> ([TileCoord; 4], usize) {
        let mut result = [TileCoord::default(); 4];
        let mut count = 0;
        for dir in Direction::ALL {
            if let Some(n) = tile.step(dir, self.size) {
                result[count] = n;
                count += 1;
            }
        }
        (result, count)
    }

    /// Screen-space centre of a tile in unscaled isometric coordinates.
    pub fn grid_to_screen(tile: TileCoord) -> Vec2 {
        let x = tile.x as f32;
        let y = tile.y as f32;
        Vec2::new(
            (x - y) * TILE_WIDTH * 0.5,
            (x + y) * TILE_HEIGHT * 0.5 + TILE_HEIGHT * 0.5,
        )
    }

    /// Axis-aligned screen-space box enclosing the whole map diamond.
    pub fn screen_bounds(&self) -> (Vec2, Vec2) {
        let n = self.size as f32;
        let min = Vec2::new(-n * TILE_WIDTH * 0.5, 0.0);
        let max = Vec2::new(n * TILE_WIDTH * 0.5, n * TILE_HEIGHT);
        (min, max)
    }
}
