//! Presentation seams: renderers, input sources and tick pacing.
//!
//! The simulation never depends on how (or whether) it is drawn. Each tick
//! it hands a borrowed [`Frame`] to a [`Renderer`] and asks an
//! [`InputSource`] for any pending events.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use crate::bird::Bird;
use crate::floor::Floor;
use crate::pipe::Pipe;
use crate::session::Mode;

/// Everything a renderer may draw for one tick
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub birds: &'a [Bird],
    pub active: &'a [usize],
    pub pipes: &'a [Pipe],
    pub floor: &'a Floor,
    pub score: u32,
    pub generation: usize,
    pub time: u64,
}

impl<'a> Frame<'a> {
    /// Birds still in play, in spawn order
    pub fn living(&self) -> impl Iterator<Item = &'a Bird> {
        let birds = self.birds;
        self.active.iter().map(move |&i| &birds[i])
    }

    pub fn alive_count(&self) -> usize {
        self.active.len()
    }
}

/// Output collaborator
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &Frame<'_>) {}
}

/// Writes a trace line every `interval` frames
#[derive(Debug)]
pub struct LogRenderer {
    interval: u64,
}

impl LogRenderer {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    fn is_due(&self, time: u64) -> bool {
        time % self.interval == 0
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        if self.is_due(frame.time) {
            log::trace!(
                "gen {} t {} | alive {} | score {} | pipes {}",
                frame.generation,
                frame.time,
                frame.alive_count(),
                frame.score,
                frame.pipes.len()
            );
        }
    }
}

/// Discrete input events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Jump,
    Select(Mode),
}

/// Input collaborator, polled once per tick
pub trait InputSource {
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Never produces events
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        Vec::new()
    }
}

/// Replays a fixed list of per-tick event batches, then goes quiet
#[derive(Debug, Default)]
pub struct ScriptedInput {
    ticks: VecDeque<Vec<InputEvent>>,
}

impl ScriptedInput {
    pub fn new(ticks: Vec<Vec<InputEvent>>) -> Self {
        Self {
            ticks: ticks.into(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.ticks.pop_front().unwrap_or_default()
    }
}

/// Sleeps so ticks happen at a fixed real-time rate
#[derive(Debug)]
pub struct TickPacer {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl TickPacer {
    /// Pace at `fps` ticks per second; 0 disables pacing
    pub fn new(fps: u32) -> Self {
        let interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        Self {
            interval,
            last: None,
        }
    }

    pub fn unpaced() -> Self {
        Self::new(0)
    }

    /// Block until the next tick is due
    pub fn wait(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Renderer, input and pacing used by an episode loop
pub struct Presenter {
    pub renderer: Box<dyn Renderer>,
    pub input: Box<dyn InputSource>,
    pub pacer: TickPacer,
}

impl Presenter {
    pub fn new(renderer: Box<dyn Renderer>, input: Box<dyn InputSource>, pacer: TickPacer) -> Self {
        Self {
            renderer,
            input,
            pacer,
        }
    }

    /// No drawing, no input, no sleeping
    pub fn headless() -> Self {
        Self::new(Box::new(NullRenderer), Box::new(NoInput), TickPacer::unpaced())
    }

    /// Trace-level frame logging, no input, no sleeping
    pub fn logging(interval: u64) -> Self {
        Self::new(
            Box::new(LogRenderer::new(interval)),
            Box::new(NoInput),
            TickPacer::unpaced(),
        )
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::headless()
    }
}
