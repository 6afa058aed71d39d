//! World simulation engine - one episode of flying birds through pipes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bird::Bird;
use crate::config::{Config, FitnessConfig, TerminalFitness};
use crate::controller::{Controller, Observation};
use crate::floor::Floor;
use crate::pipe::Pipe;
use crate::render::{Frame, InputEvent, Presenter};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Shared flag asking a running episode to stop
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Why an episode ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// Every bird was eliminated
    Extinct,
    /// The score cap was reached
    StopScore,
    /// The safety tick limit was reached
    TickLimit,
    /// A stop signal or quit event aborted the episode
    Cancelled,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::Extinct => "all birds eliminated",
            EndReason::StopScore => "score cap reached",
            EndReason::TickLimit => "tick limit reached",
            EndReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Episode state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeState {
    Running,
    Ended(EndReason),
}

/// Errors that abort an episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Fewer controllers than birds were supplied
    ControllerCount { birds: usize, controllers: usize },
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::ControllerCount { birds, controllers } => write!(
                f,
                "{} birds need a controller each, got {}",
                birds, controllers
            ),
        }
    }
}

impl std::error::Error for WorldError {}

/// What happened during one tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Birds that hit a pipe
    pub collided: Vec<usize>,
    /// Birds that touched the floor or left the screen
    pub out_of_bounds: Vec<usize>,
    /// Pipes passed this tick
    pub passed: u32,
    /// Set on the tick the episode ended
    pub ended: Option<EndReason>,
}

/// Result of a finished episode
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub ticks: u64,
    pub score: u32,
    pub reason: EndReason,
    /// Final fitness of every bird, indexed by controller id
    pub fitness: Vec<f32>,
}

impl EpisodeSummary {
    pub fn best_fitness(&self) -> f32 {
        self.fitness.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn avg_fitness(&self) -> f32 {
        if self.fitness.is_empty() {
            return 0.0;
        }
        self.fitness.iter().sum::<f32>() / self.fitness.len() as f32
    }
}

/// The simulation world
pub struct World {
    // Population
    pub birds: Vec<Bird>,
    active: Vec<usize>,

    // Environment
    pub pipes: Vec<Pipe>,
    pub floor: Floor,

    // State
    pub time: u64,
    pub score: u32,
    pub state: EpisodeState,
    /// Generation label shown by renderers
    pub generation: usize,

    // Configuration
    pub config: Config,
    rules: FitnessConfig,
    stop_score: Option<u32>,
    stop: StopSignal,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl World {
    /// Create a new world with `population` birds
    pub fn new(config: Config, population: usize) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, population, seed)
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, population: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let w = &config.world;
        let birds = (0..population)
            .map(|id| Bird::new(id, w.spawn_x, w.spawn_y, config.physics.clone()))
            .collect();
        let first_pipe = Pipe::spawn(config.pipes.first_spawn_x, &config.pipes, &mut rng);
        let floor = Floor::new(w.floor_y, config.pipes.scroll_speed);

        log::debug!("World created: birds={}, seed={}", population, seed);

        Self {
            birds,
            active: (0..population).collect(),
            pipes: vec![first_pipe],
            floor,
            time: 0,
            score: 0,
            state: EpisodeState::Running,
            generation: 0,
            rules: config.fitness.clone(),
            stop_score: config.evolution.stop_score,
            stop: StopSignal::new(),
            config,
            rng,
            seed,
        }
    }

    /// Replace the fitness shaping rules
    pub fn with_rules(mut self, rules: FitnessConfig) -> Self {
        self.rules = rules;
        self
    }

    /// End the episode once the score reaches `stop_score`
    pub fn with_stop_score(mut self, stop_score: Option<u32>) -> Self {
        self.stop_score = stop_score;
        self
    }

    /// Watch an external stop flag
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_generation(mut self, generation: usize) -> Self {
        self.generation = generation;
        self
    }

    /// Replace the pipe list (used to stage specific layouts)
    pub fn set_pipes(&mut self, pipes: Vec<Pipe>) {
        self.pipes = pipes;
    }

    /// Jump a living bird directly (manual play)
    pub fn jump(&mut self, id: usize) -> bool {
        match self.birds.get_mut(id) {
            Some(bird) if bird.alive && self.state == EpisodeState::Running => {
                bird.jump();
                true
            }
            _ => false,
        }
    }

    /// Advance the episode by one tick
    pub fn step<C: Controller>(&mut self, controllers: &mut [C]) -> Result<TickReport, WorldError> {
        let mut report = TickReport::default();
        if self.is_ended() {
            return Ok(report);
        }
        if controllers.len() < self.birds.len() {
            return Err(WorldError::ControllerCount {
                birds: self.birds.len(),
                controllers: controllers.len(),
            });
        }
        if self.stop.is_stopped() {
            self.state = EpisodeState::Ended(EndReason::Cancelled);
            report.ended = Some(EndReason::Cancelled);
            return Ok(report);
        }
        if self.pipes.is_empty() {
            let pipe = Pipe::spawn(self.config.pipes.spawn_x, &self.config.pipes, &mut self.rng);
            self.pipes.push(pipe);
        }

        // Phase 1: Pick the pipe every bird looks at
        let target = self.active_pipe_index();

        // Phase 2: Decide, jump, move, reward survival
        self.think_and_move(controllers, target);

        // Phase 3: Pipe collisions
        self.handle_collisions(&mut report);

        // Phase 4: Score passed pipes
        self.handle_passes(&mut report);

        // Phase 5: Retire and scroll pipes
        self.pipes.retain(|p| !p.is_off_screen());
        for pipe in &mut self.pipes {
            pipe.advance();
        }

        // Phase 6: Floor and ceiling
        self.handle_bounds(&mut report);

        // Phase 7: Scroll the floor
        self.floor.advance();

        // Phase 8: End conditions
        self.time += 1;
        report.ended = self.check_end();

        Ok(report)
    }

    /// Index of the first pipe whose trailing edge is not behind the leading bird
    pub fn active_pipe_index(&self) -> usize {
        let Some(&leader) = self.active.first() else {
            return 0;
        };
        let x = self.birds[leader].x;
        self.pipes
            .iter()
            .position(|p| p.trailing_edge() >= x)
            .unwrap_or(self.pipes.len().saturating_sub(1))
    }

    fn think_and_move<C: Controller>(&mut self, controllers: &mut [C], target: usize) {
        let pipe = &self.pipes[target];
        let reward = self.rules.survival_reward;
        for &i in &self.active {
            let bird = &mut self.birds[i];
            let observation = Observation::new(bird, pipe);
            if controllers[bird.id].decide(&observation) {
                bird.jump();
            }
            bird.advance();
            bird.fitness += reward;
            bird.ticks_alive += 1;
        }
    }

    fn handle_collisions(&mut self, report: &mut TickReport) {
        let penalty = self.rules.collision_penalty;
        for pipe in &self.pipes {
            for &i in &self.active {
                let bird = &mut self.birds[i];
                if bird.alive && pipe.collides_with(bird) {
                    bird.alive = false;
                    bird.fitness -= penalty;
                    report.collided.push(bird.id);
                }
            }
        }
        self.compact();
    }

    fn handle_passes(&mut self, report: &mut TickReport) {
        let Some(&leader) = self.active.first() else {
            return;
        };
        let leader_x = self.birds[leader].x;

        let mut passed = 0;
        for pipe in &mut self.pipes {
            if !pipe.passed && pipe.x < leader_x {
                pipe.passed = true;
                passed += 1;
            }
        }

        for _ in 0..passed {
            self.score += 1;
            let pipe = Pipe::spawn(self.config.pipes.spawn_x, &self.config.pipes, &mut self.rng);
            self.pipes.push(pipe);
            for &i in &self.active {
                self.birds[i].fitness += self.rules.pass_bonus;
            }
        }
        report.passed = passed;
    }

    fn handle_bounds(&mut self, report: &mut TickReport) {
        let floor_y = self.floor.line();
        let terminal = self.rules.terminal;
        let score = self.score;
        for &i in &self.active {
            let bird = &mut self.birds[i];
            if bird.is_out_of_bounds(floor_y) {
                bird.alive = false;
                finalize(bird, terminal, score);
                report.out_of_bounds.push(bird.id);
            }
        }
        self.compact();
    }

    fn check_end(&mut self) -> Option<EndReason> {
        let reason = if self.active.is_empty() {
            EndReason::Extinct
        } else if self.stop_score.is_some_and(|cap| self.score >= cap) {
            EndReason::StopScore
        } else if self.time >= self.config.safety.max_ticks_per_episode {
            EndReason::TickLimit
        } else {
            return None;
        };

        // Survivors of a stopped episode get their terminal fitness now
        for &i in &self.active {
            finalize(&mut self.birds[i], self.rules.terminal, self.score);
        }
        self.state = EpisodeState::Ended(reason);
        Some(reason)
    }

    /// Drop eliminated birds from the active set
    fn compact(&mut self) {
        let birds = &self.birds;
        self.active.retain(|&i| birds[i].alive);
    }

    /// Run until the episode ends, drawing and polling input every tick
    pub fn run_episode<C: Controller>(
        &mut self,
        controllers: &mut [C],
        presenter: &mut Presenter,
    ) -> Result<EpisodeSummary, WorldError> {
        while !self.is_ended() {
            for event in presenter.input.poll() {
                if event == InputEvent::Quit {
                    self.stop.stop();
                }
            }
            self.step(controllers)?;
            presenter.renderer.render(&self.frame());
            presenter.pacer.wait();
        }
        Ok(self.summary())
    }

    /// Run until the episode ends, calling `callback` after each tick
    pub fn run_with_callback<C, F>(
        &mut self,
        controllers: &mut [C],
        mut callback: F,
    ) -> Result<EpisodeSummary, WorldError>
    where
        C: Controller,
        F: FnMut(&World, &TickReport),
    {
        while !self.is_ended() {
            let report = self.step(controllers)?;
            callback(self, &report);
        }
        Ok(self.summary())
    }

    /// Borrowed view for renderers
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            birds: &self.birds,
            active: &self.active,
            pipes: &self.pipes,
            floor: &self.floor,
            score: self.score,
            generation: self.generation,
            time: self.time,
        }
    }

    pub fn summary(&self) -> EpisodeSummary {
        let reason = match self.state {
            EpisodeState::Ended(reason) => reason,
            EpisodeState::Running => EndReason::Cancelled,
        };
        EpisodeSummary {
            ticks: self.time,
            score: self.score,
            reason,
            fitness: self.birds.iter().map(|b| b.fitness).collect(),
        }
    }

    /// Ids of the birds still in play
    pub fn living(&self) -> &[usize] {
        &self.active
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.active.len()
    }

    /// Check if every bird is gone
    pub fn is_extinct(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, EpisodeState::Ended(_))
    }

    /// Get the seed used for this world
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn finalize(bird: &mut Bird, terminal: TerminalFitness, score: u32) {
    if terminal == TerminalFitness::Score {
        bird.fitness = score as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ManualController;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.safety.max_ticks_per_episode = 5_000;
        config
    }

    fn never(_: &Observation) -> bool {
        false
    }

    /// Jump whenever the bird sinks below the middle of the gap
    fn follow_gap(o: &Observation) -> bool {
        o.dist_to_gap_bottom < o.dist_to_gap_top + 40.0
    }

    #[test]
    fn test_world_creation() {
        let world = World::new_with_seed(test_config(), 5, 42);
        assert_eq!(world.population(), 5);
        assert_eq!(world.pipes.len(), 1);
        assert_eq!(world.pipes[0].x, 600.0);
        assert_eq!(world.state, EpisodeState::Running);
        assert_eq!(world.seed(), 42);
    }

    #[test]
    fn test_same_seed_same_pipes() {
        let a = World::new_with_seed(test_config(), 1, 9);
        let b = World::new_with_seed(test_config(), 1, 9);
        assert_eq!(a.pipes[0].gap_top, b.pipes[0].gap_top);
    }

    #[test]
    fn test_missing_controllers_rejected() {
        let mut world = World::new_with_seed(test_config(), 3, 1);
        let mut controllers = vec![never as fn(&Observation) -> bool; 2];
        let err = world.step(&mut controllers).unwrap_err();
        assert_eq!(err, WorldError::ControllerCount { birds: 3, controllers: 2 });
        assert_eq!(world.time, 0);
    }

    #[test]
    fn test_fall_to_floor() {
        let mut world = World::new_with_seed(test_config(), 4, 3);
        let mut controllers = vec![never as fn(&Observation) -> bool; 4];
        let summary = world.run_with_callback(&mut controllers, |_, _| {}).unwrap();
        assert_eq!(summary.reason, EndReason::Extinct);
        assert_eq!(summary.score, 0);
        assert!(summary.ticks < 50);
        // Ground contact overwrites fitness with the score
        assert!(summary.fitness.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_collision_removed_same_tick() {
        let mut world = World::new_with_seed(test_config(), 1, 5);
        let config = world.config.pipes.clone();
        // Gap far above the bird: the bottom pipe is right on top of it
        world.set_pipes(vec![Pipe::with_gap(230.0, 50.0, &config)]);
        let mut controllers = vec![ManualController];
        let report = world.step(&mut controllers).unwrap();
        assert_eq!(report.collided, vec![0]);
        assert!(world.is_extinct());
        let y = world.birds[0].y;
        let _ = world.step(&mut controllers).unwrap();
        assert_eq!(world.birds[0].y, y);
    }

    #[test]
    fn test_pass_scores_and_spawns() {
        let mut world = World::new_with_seed(test_config(), 1, 11);
        let config = world.config.pipes.clone();
        world.set_pipes(vec![Pipe::with_gap(228.0, 300.0, &config)]);
        let mut controllers = vec![ManualController];
        let report = world.step(&mut controllers).unwrap();
        assert_eq!(report.passed, 1);
        assert_eq!(world.score, 1);
        assert_eq!(world.pipes.len(), 2);
        assert!(world.pipes[0].passed);
        assert_eq!(world.pipes[1].x, 595.0);

        // Already passed: no second score
        let report = world.step(&mut controllers).unwrap();
        assert_eq!(report.passed, 0);
        assert_eq!(world.score, 1);
    }

    #[test]
    fn test_active_pipe_skips_pipe_behind_leader() {
        let mut world = World::new_with_seed(test_config(), 1, 6);
        let config = world.config.pipes.clone();
        let behind = Pipe::with_gap(100.0, 300.0, &config);
        assert!(behind.trailing_edge() < world.birds[0].x);
        world.set_pipes(vec![behind, Pipe::with_gap(400.0, 150.0, &config)]);
        assert_eq!(world.active_pipe_index(), 1);

        let mut seen = Vec::new();
        {
            let mut controllers = vec![|o: &Observation| {
                seen.push(*o);
                false
            }];
            world.step(&mut controllers).unwrap();
        }
        assert_eq!(seen.len(), 1);
        // Bird at y = 350 reads the second pipe: gap 150..350
        assert_eq!(seen[0].dist_to_gap_top, 200.0);
        assert_eq!(seen[0].dist_to_gap_bottom, 0.0);
    }

    #[test]
    fn test_active_pipe_defaults() {
        let mut world = World::new_with_seed(test_config(), 1, 6);
        let config = world.config.pipes.clone();
        // Every pipe behind the leader: fall back to the last one
        world.set_pipes(vec![
            Pipe::with_gap(0.0, 200.0, &config),
            Pipe::with_gap(50.0, 200.0, &config),
        ]);
        assert_eq!(world.active_pipe_index(), 1);

        world.birds[0].alive = false;
        world.compact();
        assert_eq!(world.active_pipe_index(), 0);
    }

    #[test]
    fn test_stop_score() {
        let mut config = test_config();
        config.fitness.terminal = TerminalFitness::Score;
        let mut world = World::new_with_seed(config, 3, 21).with_stop_score(Some(1));
        let mut controllers = vec![follow_gap as fn(&Observation) -> bool; 3];
        let summary = world.run_with_callback(&mut controllers, |_, _| {}).unwrap();
        if summary.reason == EndReason::StopScore {
            assert_eq!(summary.score, 1);
            // Survivors carry the score as fitness
            for &i in world.living() {
                assert_eq!(world.birds[i].fitness, 1.0);
            }
        } else {
            assert_eq!(summary.reason, EndReason::Extinct);
        }
    }

    #[test]
    fn test_stop_signal_cancels_cleanly() {
        let stop = StopSignal::new();
        let mut world = World::new_with_seed(test_config(), 2, 4).with_stop_signal(stop.clone());
        let mut controllers = vec![never as fn(&Observation) -> bool; 2];
        world.step(&mut controllers).unwrap();
        stop.stop();
        let before: Vec<f32> = world.birds.iter().map(|b| b.y).collect();
        let report = world.step(&mut controllers).unwrap();
        assert_eq!(report.ended, Some(EndReason::Cancelled));
        assert_eq!(world.population(), 2);
        let after: Vec<f32> = world.birds.iter().map(|b| b.y).collect();
        assert_eq!(before, after);
        assert_eq!(world.summary().reason, EndReason::Cancelled);
    }

    #[test]
    fn test_quit_event_cancels_episode() {
        use crate::render::{NullRenderer, ScriptedInput, TickPacer};

        let mut presenter = Presenter::new(
            Box::new(NullRenderer),
            Box::new(ScriptedInput::new(vec![vec![], vec![InputEvent::Quit]])),
            TickPacer::unpaced(),
        );
        let mut world = World::new_with_seed(test_config(), 2, 8);
        let mut controllers = vec![never as fn(&Observation) -> bool; 2];
        let summary = world.run_episode(&mut controllers, &mut presenter).unwrap();
        assert_eq!(summary.reason, EndReason::Cancelled);
        assert_eq!(summary.ticks, 1);
    }

    #[test]
    fn test_manual_jump_only_when_alive() {
        let mut world = World::new_with_seed(test_config(), 1, 2);
        assert!(world.jump(0));
        assert!(!world.jump(5));
        world.birds[0].alive = false;
        assert!(!world.jump(0));
    }

    #[test]
    fn test_tick_limit() {
        let mut config = test_config();
        config.safety.max_ticks_per_episode = 3;
        let mut world = World::new_with_seed(config, 1, 2);
        let mut controllers = vec![ManualController];
        let summary = world.run_with_callback(&mut controllers, |_, _| {}).unwrap();
        assert_eq!(summary.reason, EndReason::TickLimit);
        assert_eq!(summary.ticks, 3);
    }
}
