pub const DEFAULT_GRID_SIZE: usize = 64;

/// Width of one isometric tile diamond in screen pixels.
pub const TILE_WIDTH: f32 = 64.0;
/// Height of one isometric tile diamond in screen pixels.
pub const TILE_HEIGHT: f32 = 32.0;

/// Upper bound on cell transitions a road-bound entity may make in one tick.
/// Keeps fast-forward frames with huge deltas bounded in time.
pub const MAX_CELL_STEPS_PER_TICK: u32 = 16;

/// Radius (screen pixels) within which a free-moving entity counts as arrived.
pub const ARRIVAL_RADIUS: f32 = 6.0;
