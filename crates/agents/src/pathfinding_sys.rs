use pathfinding::prelude::bfs;

use crate::grid::{TileCoord, WorldGrid};

/// Shortest road route from `start` to `end`, both ends included.
///
/// Expands only onto orthogonal road tiles, except that `end` itself is
/// always enterable so routes can finish at a building doorway. The start
/// tile may be a building too. Returns an empty route when either end is
/// out of bounds or the two are not road-connected; callers treat that as
/// "cannot travel now".
pub fn find_path(grid: &WorldGrid, start: TileCoord, end: TileCoord) -> Vec<TileCoord> {
    if !grid.contains(start) || !grid.contains(end) {
        return Vec::new();
    }
    if start == end {
        return vec![start];
    }

    bfs(
        &start,
        |&tile| {
            let (neighbors, count) = grid.neighbors4(tile);
            neighbors[..count]
                .iter()
                .copied()
                .filter(|&n| n == end || grid.is_road(n))
                .collect::<Vec<_>>()
        },
        |&tile| tile == end,
    )
    .unwrap_or_default()
}

/// Number of steps in a route (tiles minus one), `None` for an empty route.
pub fn route_steps(route: &[TileCoord]) -> Option<usize> {
    route.len().checked_sub(1)
}
