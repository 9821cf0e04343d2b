use bevy::prelude::*;

use crate::grid::TileCoord;

/// Police coverage per tile (0 = unserved, 100 = fully covered).
///
/// Computed by an external coverage system and indexed like `WorldGrid`.
/// Tiles outside the stored field read as zero coverage.
#[derive(Resource, Debug, Clone, Default)]
pub struct PoliceCoverage {
    pub values: Vec<f32>,
    pub size: usize,
}

impl PoliceCoverage {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0.0; size * size],
            size,
        }
    }

    /// Uniform coverage everywhere.
    pub fn filled(size: usize, value: f32) -> Self {
        Self {
            values: vec![value.clamp(0.0, 100.0); size * size],
            size,
        }
    }

    pub fn get(&self, tile: TileCoord) -> f32 {
        if tile.x >= self.size || tile.y >= self.size {
            return 0.0;
        }
        self.values
            .get(tile.y * self.size + tile.x)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, tile: TileCoord, value: f32) {
        if tile.x >= self.size || tile.y >= self.size {
            return;
        }
        let idx = tile.y * self.size + tile.x;
        if let Some(v) = self.values.get_mut(idx) {
            *v = value.clamp(0.0, 100.0);
        }
    }
}
