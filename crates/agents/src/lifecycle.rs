//! Lifecycle building blocks shared by every population: id allocation,
//! randomized spawn timers, route walking for road-bound agents and heading
//! math for free-moving ones.

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MAX_CELL_STEPS_PER_TICK;
use crate::grid::{Direction, TileCoord, WorldGrid};

/// Uniform sample from an inclusive-exclusive `(min, max)` range; collapses
/// to `min` when the range is empty.
pub fn random_in(rng: &mut impl Rng, (min, max): (f32, f32)) -> f32 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..max)
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Agent identifier, unique within its population.
pub type AgentId = u64;

/// Monotonic id source; ids are never reused within a population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: AgentId,
}

impl IdAllocator {
    /// Hands out the next id. At `AgentId::MAX` the counter stops rather than
    /// wrap back onto live ids.
    pub fn allocate(&mut self) -> AgentId {
        let id = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => warn!("IdAllocator exhausted, repeating id {id}"),
        }
        id
    }

    /// The id the next allocation will return.
    pub fn peek(&self) -> AgentId {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Spawn timers
// ---------------------------------------------------------------------------

/// Countdown that fires once per randomized interval of scaled time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnTimer {
    remaining: f32,
}

impl SpawnTimer {
    pub fn new(first_delay: f32) -> Self {
        Self {
            remaining: first_delay,
        }
    }

    /// Advance by `scaled_delta`; returns `true` when the timer fires, in
    /// which case it re-arms with a fresh interval. A zero delta (paused)
    /// never fires.
    pub fn tick(&mut self, scaled_delta: f32, interval: (f32, f32), rng: &mut impl Rng) -> bool {
        if scaled_delta <= 0.0 {
            return false;
        }
        self.remaining -= scaled_delta;
        if self.remaining > 0.0 {
            return false;
        }
        self.remaining = random_in(rng, interval);
        true
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

// ---------------------------------------------------------------------------
// Route walking
// ---------------------------------------------------------------------------

/// Result of advancing a [`Route`] for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStep {
    EnRoute,
    /// Standing on the last tile of the route.
    Arrived,
    /// The current tile is no longer passable (bulldozed, out of bounds).
    Blocked,
}

/// Discrete position on a precomputed tile route: `progress` of the way from
/// `tiles[index]` towards `tiles[index + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub tiles: Vec<TileCoord>,
    pub index: usize,
    pub direction: Direction,
    pub progress: f32,
}

impl Route {
    /// Start walking `tiles` from its first entry. `None` for an empty route.
    pub fn new(tiles: Vec<TileCoord>) -> Option<Self> {
        let first = *tiles.first()?;
        let direction = tiles
            .get(1)
            .and_then(|&next| Direction::between(first, next))
            .unwrap_or(Direction::North);
        Some(Self {
            tiles,
            index: 0,
            direction,
            progress: 0.0,
        })
    }

    pub fn tile(&self) -> TileCoord {
        self.tiles[self.index]
    }

    pub fn origin(&self) -> TileCoord {
        self.tiles[0]
    }

    pub fn destination(&self) -> TileCoord {
        self.tiles[self.tiles.len() - 1]
    }

    /// Tile-to-tile moves from the first tile to the last.
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    pub fn is_at_end(&self) -> bool {
        self.index + 1 >= self.tiles.len()
    }

    /// Roads are passable; so are the route's own endpoints, which may be
    /// building doorways.
    pub fn is_passable(&self, grid: &WorldGrid, tile: TileCoord) -> bool {
        grid.contains(tile)
            && (grid.is_road(tile) || tile == self.origin() || tile == self.destination())
    }

    /// Move `distance` tiles along the route.
    ///
    /// Crossing a tile boundary re-checks passability, so an agent on a road
    /// that was bulldozed since the last tick is reported `Blocked` rather
    /// than walking through it. At most `MAX_CELL_STEPS_PER_TICK` tiles are
    /// crossed per call; progress beyond that is dropped.
    pub fn advance(&mut self, grid: &WorldGrid, distance: f32) -> RouteStep {
        if !self.is_passable(grid, self.tile()) {
            return RouteStep::Blocked;
        }
        if self.is_at_end() {
            self.progress = 0.0;
            return RouteStep::Arrived;
        }

        self.progress += distance;
        let mut steps = 0;
        while self.progress >= 1.0 {
            if steps >= MAX_CELL_STEPS_PER_TICK {
                self.progress = self.progress.fract();
                break;
            }
            steps += 1;
            self.progress -= 1.0;
            self.index += 1;

            let tile = self.tile();
            if !self.is_passable(grid, tile) {
                return RouteStep::Blocked;
            }
            if self.is_at_end() {
                self.progress = 0.0;
                return RouteStep::Arrived;
            }
            if let Some(dir) = Direction::between(tile, self.tiles[self.index + 1]) {
                self.direction = dir;
            }
        }
        RouteStep::EnRoute
    }
}

// ---------------------------------------------------------------------------
// Heading math for aircraft and boats
// ---------------------------------------------------------------------------

/// Wrap an angle into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Heading (radians, screen space) from `from` towards `to`.
pub fn heading_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Rotate `angle` towards `target` by at most `max_turn` radians.
pub fn turn_towards(angle: f32, target: f32, max_turn: f32) -> f32 {
    let diff = wrap_angle(target - angle);
    wrap_angle(angle + diff.clamp(-max_turn, max_turn))
}

/// Position after travelling `distance` along `angle`.
pub fn advance_along(position: Vec2, angle: f32, distance: f32) -> Vec2 {
    position + Vec2::from_angle(angle) * distance
}

/// Turn towards `target` by at most `max_turn` and travel up to `distance`
/// without overshooting it. Inside `lock_radius` the heading snaps straight
/// onto the target, otherwise a slow turner could circle it forever.
pub fn steer_towards(
    position: Vec2,
    angle: f32,
    target: Vec2,
    max_turn: f32,
    distance: f32,
    lock_radius: f32,
) -> (Vec2, f32) {
    let remaining = position.distance(target);
    let desired = heading_to(position, target);
    let angle = if remaining <= lock_radius {
        desired
    } else {
        turn_towards(angle, desired, max_turn)
    };
    (advance_along(position, angle, distance.min(remaining)), angle)
}
