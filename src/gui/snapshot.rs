//! Owned copies of a rendered tick, safe to send across threads.

use crate::bird::Bird;
use crate::pipe::Pipe;
use crate::render::Frame;
use crate::session::Mode;

/// Lightweight bird view for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct BirdView {
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, positive is nose up
    pub tilt: f32,
    /// 0, 1 or 2
    pub wing_frame: usize,
}

impl BirdView {
    fn from_bird(bird: &Bird) -> Self {
        Self {
            id: bird.id,
            x: bird.x,
            y: bird.y,
            width: bird.width(),
            height: bird.height(),
            tilt: bird.tilt,
            wing_frame: bird.wing_frame(),
        }
    }
}

/// Lightweight pipe view for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct PipeView {
    pub x: f32,
    pub width: f32,
    pub gap_top: f32,
    pub gap_bottom: f32,
    pub passed: bool,
}

impl PipeView {
    fn from_pipe(pipe: &Pipe) -> Self {
        Self {
            x: pipe.x,
            width: pipe.width(),
            gap_top: pipe.gap_top,
            gap_bottom: pipe.gap_bottom,
            passed: pipe.passed,
        }
    }
}

/// One tick as the GUI sees it
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub mode: Mode,
    pub time: u64,
    pub generation: usize,
    pub score: u32,
    pub alive: usize,
    pub population: usize,
    /// Living birds only
    pub birds: Vec<BirdView>,
    pub pipes: Vec<PipeView>,
    pub floor_y: f32,
    /// Left edges of the two floor tiles
    pub floor_x: [f32; 2],
    pub floor_tile_width: f32,
}

impl FrameSnapshot {
    pub fn from_frame(frame: &Frame<'_>, mode: Mode) -> Self {
        Self {
            mode,
            time: frame.time,
            generation: frame.generation,
            score: frame.score,
            alive: frame.alive_count(),
            population: frame.birds.len(),
            birds: frame.living().map(BirdView::from_bird).collect(),
            pipes: frame.pipes.iter().map(PipeView::from_pipe).collect(),
            floor_y: frame.floor.line(),
            floor_x: [frame.floor.x1, frame.floor.x2],
            floor_tile_width: frame.floor.tile_width(),
        }
    }
}
