//! Per-frame input to every population update: game speed, viewport and the
//! grid snapshot.
//!
//! The tick driver (the host app) writes `SimClock` and `Viewport`; the grid
//! is owned by construction/demolition/fire systems outside this crate. Each
//! population update receives a borrowed [`WorldState`] and treats it as
//! immutable for that frame.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::WorldGrid;
use crate::grid_query::GridIndex;

/// The four discrete game speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GameSpeed {
    Paused,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl GameSpeed {
    /// Map the UI speed level (0..=3) to a speed; anything above 3 is `VeryFast`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => GameSpeed::Paused,
            1 => GameSpeed::Normal,
            2 => GameSpeed::Fast,
            _ => GameSpeed::VeryFast,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            GameSpeed::Paused => 0,
            GameSpeed::Normal => 1,
            GameSpeed::Fast => 2,
            GameSpeed::VeryFast => 3,
        }
    }

    /// Time multiplier for road-bound agents, incident clocks and timers.
    pub fn multiplier(self) -> f32 {
        match self {
            GameSpeed::Paused => 0.0,
            GameSpeed::Normal => 1.0,
            GameSpeed::Fast => 2.5,
            GameSpeed::VeryFast => 4.0,
        }
    }

    /// Gentler multiplier for aircraft and boats, which cover large screen
    /// distances and would otherwise leave the map within a few frames.
    pub fn flight_multiplier(self) -> f32 {
        match self {
            GameSpeed::Paused => 0.0,
            GameSpeed::Normal => 1.0,
            GameSpeed::Fast => 2.0,
            GameSpeed::VeryFast => 3.0,
        }
    }

    pub fn is_paused(self) -> bool {
        self == GameSpeed::Paused
    }
}

/// Hardware class; constrained devices run a smaller pedestrian population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceProfile {
    #[default]
    Desktop,
    Constrained,
}

/// Speed and device settings supplied by the tick driver.
#[derive(Resource, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimClock {
    pub speed: GameSpeed,
    pub device: DeviceProfile,
}

/// Camera state supplied by the tick driver.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            canvas_width: 1280.0,
            canvas_height: 720.0,
        }
    }
}

impl Viewport {
    pub fn with_zoom(zoom: f32) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    /// Unscaled isometric screen coordinates to canvas pixels.
    pub fn to_canvas(&self, screen: Vec2) -> Vec2 {
        screen * self.zoom + Vec2::new(self.offset_x, self.offset_y)
    }

    /// Whether a screen-space point lands on the canvas (with `margin` pixels
    /// of slack on every side).
    pub fn is_visible(&self, screen: Vec2, margin: f32) -> bool {
        let p = self.to_canvas(screen);
        p.x >= -margin
            && p.y >= -margin
            && p.x <= self.canvas_width + margin
            && p.y <= self.canvas_height + margin
    }
}

/// Immutable per-frame snapshot handed to every population update.
#[derive(Clone, Copy)]
pub struct WorldState<'a> {
    pub grid: &'a WorldGrid,
    pub index: &'a GridIndex,
    pub speed: GameSpeed,
    pub device: DeviceProfile,
    pub viewport: &'a Viewport,
}

impl<'a> WorldState<'a> {
    pub fn new(
        grid: &'a WorldGrid,
        index: &'a GridIndex,
        clock: &SimClock,
        viewport: &'a Viewport,
    ) -> Self {
        Self {
            grid,
            index,
            speed: clock.speed,
            device: clock.device,
            viewport,
        }
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.grid.size()
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.viewport.zoom
    }

    /// Wall-clock `delta` scaled for road-bound agents and incident clocks.
    #[inline]
    pub fn scaled(&self, delta: f32) -> f32 {
        delta * self.speed.multiplier()
    }

    /// Wall-clock `delta` scaled for aircraft and boats.
    #[inline]
    pub fn flight_scaled(&self, delta: f32) -> f32 {
        delta * self.speed.flight_multiplier()
    }
}

/// System parameter bundling everything needed to build a [`WorldState`].
#[derive(SystemParam)]
pub struct WorldStateParam<'w> {
    time: Res<'w, Time>,
    grid: Res<'w, WorldGrid>,
    index: Res<'w, GridIndex>,
    clock: Res<'w, SimClock>,
    viewport: Res<'w, Viewport>,
}

impl WorldStateParam<'_> {
    pub fn snapshot(&self) -> WorldState<'_> {
        WorldState::new(&self.grid, &self.index, &self.clock, &self.viewport)
    }

    /// Wall-clock seconds since the previous frame.
    pub fn delta(&self) -> f32 {
        self.time.delta_secs()
    }
}
