//! Endless scrolling floor made of two tiles.

use serde::{Deserialize, Serialize};

/// Width of one floor tile in pixels
pub const FLOOR_TILE_WIDTH: f32 = 672.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Floor {
    /// Top edge of the floor
    pub y: f32,
    /// Left edges of the two tiles
    pub x1: f32,
    pub x2: f32,
    speed: f32,
    tile_width: f32,
}

impl Floor {
    pub fn new(y: f32, speed: f32) -> Self {
        Self::with_tile_width(y, speed, FLOOR_TILE_WIDTH)
    }

    pub fn with_tile_width(y: f32, speed: f32, tile_width: f32) -> Self {
        Self {
            y,
            x1: 0.0,
            x2: tile_width,
            speed,
            tile_width,
        }
    }

    /// Scroll one tick; a tile that leaves the screen jumps behind the other
    pub fn advance(&mut self) {
        self.x1 -= self.speed;
        self.x2 -= self.speed;

        if self.x1 + self.tile_width < 0.0 {
            self.x1 = self.x2 + self.tile_width;
        }
        if self.x2 + self.tile_width < 0.0 {
            self.x2 = self.x1 + self.tile_width;
        }
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    /// The collision line
    pub fn line(&self) -> f32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_stay_adjacent() {
        let mut floor = Floor::new(730.0, 5.0);
        for _ in 0..1000 {
            floor.advance();
            assert_eq!((floor.x1 - floor.x2).abs(), FLOOR_TILE_WIDTH);
            assert!(floor.x1.min(floor.x2) <= 0.0);
            assert!(floor.x1.min(floor.x2) >= -FLOOR_TILE_WIDTH);
        }
    }

    #[test]
    fn test_wraps() {
        let mut floor = Floor::with_tile_width(730.0, 10.0, 20.0);
        floor.advance();
        floor.advance();
        floor.advance();
        // First tile went past the border and now trails the second
        assert_eq!(floor.x2, -10.0);
        assert_eq!(floor.x1, 10.0);
    }
}
