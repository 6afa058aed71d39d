//! Scrolling pipe pairs.

use crate::bird::Bird;
use crate::config::PipeConfig;
use crate::mask::{self, PIPE_HEIGHT, PIPE_WIDTH};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A top and bottom pipe separated by a gap
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pipe {
    /// Left edge
    pub x: f32,
    /// Lower edge of the top pipe
    pub gap_top: f32,
    /// Upper edge of the bottom pipe
    pub gap_bottom: f32,
    /// Set once, when the leading bird gets past the left edge
    pub passed: bool,
    speed: f32,
}

impl Pipe {
    /// Spawn a pipe at `x` with a random gap height
    pub fn spawn<R: Rng>(x: f32, config: &PipeConfig, rng: &mut R) -> Self {
        let min = config.gap_top_min.floor() as i32;
        let max = config.gap_top_max.floor() as i32;
        let gap_top = if max > min { rng.gen_range(min..max) } else { min };
        Self::with_gap(x, gap_top as f32, config)
    }

    /// Spawn a pipe with a known gap height
    pub fn with_gap(x: f32, gap_top: f32, config: &PipeConfig) -> Self {
        Self {
            x,
            gap_top,
            gap_bottom: gap_top + config.gap,
            passed: false,
            speed: config.scroll_speed,
        }
    }

    /// Scroll one tick to the left
    pub fn advance(&mut self) {
        self.x -= self.speed;
    }

    /// Pipe width in pixels
    pub fn width(&self) -> f32 {
        PIPE_WIDTH as f32
    }

    /// Top edge of the upper pipe sprite (usually above the screen)
    pub fn top_sprite_y(&self) -> f32 {
        self.gap_top - PIPE_HEIGHT as f32
    }

    /// Right edge
    pub fn trailing_edge(&self) -> f32 {
        self.x + self.width()
    }

    /// Whether the pipe has scrolled fully past the left border
    pub fn is_off_screen(&self) -> bool {
        self.trailing_edge() < 0.0
    }

    /// Pixel-accurate collision test against either pipe
    pub fn collides_with(&self, bird: &Bird) -> bool {
        let (bx, by) = bird.pixel_pos();
        let px = self.x.round() as i32;
        let bird_mask = bird.mask();

        let top_offset = (px - bx, self.top_sprite_y().round() as i32 - by);
        let bottom_offset = (px - bx, self.gap_bottom.round() as i32 - by);

        bird_mask.overlaps(mask::pipe_top_mask(), top_offset)
            || bird_mask.overlaps(mask::pipe_bottom_mask(), bottom_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bird_at(x: f32, y: f32) -> Bird {
        Bird::new(0, x, y, PhysicsConfig::default())
    }

    #[test]
    fn test_spawn_gap_in_range() {
        let config = PipeConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let pipe = Pipe::spawn(600.0, &config, &mut rng);
            assert!(pipe.gap_top >= 50.0 && pipe.gap_top < 450.0);
            assert_eq!(pipe.gap_bottom - pipe.gap_top, 200.0);
            assert!(!pipe.passed);
        }
    }

    #[test]
    fn test_advance_and_retire() {
        let config = PipeConfig::default();
        let mut pipe = Pipe::with_gap(0.0, 200.0, &config);
        pipe.advance();
        assert_eq!(pipe.x, -5.0);
        assert!(!pipe.is_off_screen());
        pipe.x = -104.5;
        assert!(pipe.is_off_screen());
    }

    #[test]
    fn test_inside_gap_no_collision() {
        let pipe = Pipe::with_gap(230.0, 100.0, &PipeConfig::default());
        assert!(!pipe.collides_with(&bird_at(230.0, 200.0)));
    }

    #[test]
    fn test_hits_top_and_bottom() {
        let pipe = Pipe::with_gap(230.0, 100.0, &PipeConfig::default());
        assert!(pipe.collides_with(&bird_at(230.0, 50.0)));
        assert!(pipe.collides_with(&bird_at(230.0, 280.0)));
    }

    #[test]
    fn test_corner_graze_is_not_a_hit() {
        let pipe = Pipe::with_gap(300.0, 100.0, &PipeConfig::default());
        // Bounding boxes overlap by a few pixels at the bird's lower-right corner
        let bird = bird_at(300.0 - 64.0, 300.0 - 45.0);
        assert!(!pipe.collides_with(&bird));
    }

    #[test]
    fn test_far_away_no_collision() {
        let pipe = Pipe::with_gap(600.0, 100.0, &PipeConfig::default());
        assert!(!pipe.collides_with(&bird_at(230.0, 10.0)));
    }
}
