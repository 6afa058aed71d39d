//! The bird: vertical motion law, tilt and wing animation.

use crate::config::PhysicsConfig;
use crate::mask::{self, Mask};
use serde::{Deserialize, Serialize};

/// A single bird in an episode
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bird {
    /// Index of the controller driving this bird
    pub id: usize,
    /// Horizontal position, fixed for the whole episode
    pub x: f32,
    /// Vertical position of the sprite's top edge (grows downward)
    pub y: f32,
    /// Velocity set by the last jump
    pub velocity: f32,
    /// Ticks since the last jump
    pub tick_count: u32,
    /// Height at the last jump, used by the tilt rule
    pub jump_height: f32,
    /// Presentation angle in degrees (positive is nose up)
    pub tilt: f32,
    /// False once eliminated; never flips back
    pub alive: bool,
    /// Accumulated fitness
    pub fitness: f32,
    /// Ticks survived this episode
    pub ticks_alive: u64,
    /// Ticks since the flap cycle restarted
    flap_count: u32,
    physics: PhysicsConfig,
}

impl Bird {
    pub fn new(id: usize, x: f32, y: f32, physics: PhysicsConfig) -> Self {
        Self {
            id,
            x,
            y,
            velocity: 0.0,
            tick_count: 0,
            jump_height: y,
            tilt: 0.0,
            alive: true,
            fitness: 0.0,
            ticks_alive: 0,
            flap_count: 0,
            physics,
        }
    }

    /// Give the bird an upward impulse
    pub fn jump(&mut self) {
        self.velocity = self.physics.jump_velocity;
        self.tick_count = 0;
        self.jump_height = self.y;
    }

    /// Integrate one tick of motion; returns the displacement applied
    pub fn advance(&mut self) -> f32 {
        let p = &self.physics;
        self.tick_count += 1;
        let t = self.tick_count as f32;

        let mut d = self.velocity * t + p.gravity * t * t;
        if d >= p.max_drop {
            d = p.max_drop;
        }
        if d < 0.0 {
            d -= p.rise_boost;
        }
        self.y += d;

        if d < 0.0 || self.y < self.jump_height + p.tilt_hold {
            if self.tilt < p.max_tilt {
                self.tilt = p.max_tilt;
            }
        } else if self.tilt > p.min_tilt {
            self.tilt = (self.tilt - p.tilt_step).max(p.min_tilt);
        }

        self.flap_count += 1;
        if self.flap_count > self.physics.flap_ticks * 4 {
            self.flap_count = 0;
        }
        d
    }

    /// Wing frame to draw (0 = up, 1 = level, 2 = down)
    pub fn wing_frame(&self) -> usize {
        // Gliding while diving
        if self.tilt <= -80.0 {
            return 1;
        }
        let phase = self.flap_count / self.physics.flap_ticks.max(1);
        match phase {
            0 => 0,
            1 => 1,
            2 => 2,
            3 => 1,
            _ => 0,
        }
    }

    /// Collision silhouette
    pub fn mask(&self) -> &'static Mask {
        mask::bird_mask()
    }

    /// Sprite height used for the floor test
    pub fn height(&self) -> f32 {
        self.mask().height() as f32
    }

    /// Sprite width
    pub fn width(&self) -> f32 {
        self.mask().width() as f32
    }

    /// Pixel position used for collision tests
    pub fn pixel_pos(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }

    /// Whether the bird touches the floor or left the top of the screen
    pub fn is_out_of_bounds(&self, floor_y: f32) -> bool {
        self.y + self.height() >= floor_y || self.y < 0.0
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bird() -> Bird {
        Bird::new(0, 230.0, 350.0, PhysicsConfig::default())
    }

    #[test]
    fn test_free_fall_clamped() {
        let mut bird = test_bird();
        for _ in 0..200 {
            let d = bird.advance();
            assert!(d.abs() <= 16.0);
        }
        assert_eq!(bird.advance(), 16.0);
    }

    #[test]
    fn test_jump_moves_up() {
        let mut bird = test_bird();
        for _ in 0..10 {
            bird.advance();
        }
        let before = bird.y;
        bird.jump();
        bird.advance();
        // -10.5 + 1.5 = -9, plus the rise boost
        assert!((bird.y - (before - 11.0)).abs() < 1e-4);
        assert_eq!(bird.jump_height, before);
        assert_eq!(bird.tick_count, 1);
    }

    #[test]
    fn test_jump_every_tick() {
        let mut bird = test_bird();
        let start = bird.y;
        for _ in 0..5 {
            bird.jump();
            bird.advance();
        }
        assert!(bird.y < start);
    }

    #[test]
    fn test_tilt_dives_and_clamps() {
        let mut bird = test_bird();
        for _ in 0..100 {
            bird.advance();
        }
        assert_eq!(bird.tilt, -90.0);
        assert_eq!(bird.wing_frame(), 1);
    }

    #[test]
    fn test_tilt_climbs_on_jump() {
        let mut bird = test_bird();
        for _ in 0..30 {
            bird.advance();
        }
        assert!(bird.tilt < 0.0);
        bird.jump();
        bird.advance();
        assert_eq!(bird.tilt, 25.0);
    }

    #[test]
    fn test_wing_cycle() {
        let mut bird = test_bird();
        let frames: Vec<usize> = (0..21)
            .map(|_| {
                let f = bird.wing_frame();
                bird.jump();
                bird.advance();
                f
            })
            .collect();
        assert_eq!(&frames[0..5], &[0, 0, 0, 0, 0]);
        assert_eq!(&frames[5..10], &[1, 1, 1, 1, 1]);
        assert_eq!(&frames[10..15], &[2, 2, 2, 2, 2]);
        assert_eq!(&frames[15..20], &[1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut bird = test_bird();
        assert!(!bird.is_out_of_bounds(730.0));
        bird.y = 730.0 - bird.height();
        assert!(bird.is_out_of_bounds(730.0));
        bird.y = -0.5;
        assert!(bird.is_out_of_bounds(730.0));
    }
}
