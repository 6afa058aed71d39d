//! Generational evolution of linear controllers.
//!
//! Each generation flies together through one shared episode, so every
//! controller faces exactly the same pipes. After the episode the population
//! is ranked, the best two survive unchanged and the rest are bred from the
//! top five.

use std::fmt;
use std::time::Instant;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::{Config, ConfigError};
use crate::controller::LinearController;
use crate::records::CsvLog;
use crate::render::Presenter;
use crate::stats::{GenerationStats, StatsHistory};
use crate::world::{EndReason, EpisodeSummary, StopSignal, World, WorldError};

/// Errors raised by the population manager
#[derive(Debug)]
pub enum EvolutionError {
    Config(ConfigError),
    /// There is nobody left to evaluate or breed
    EmptyPopulation,
    /// A controller's weight vector has the wrong length
    WeightLengthMismatch { expected: usize, found: usize },
    /// The episode was stopped from outside
    Cancelled,
    /// The episode failed
    Episode(WorldError),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolutionError::Config(e) => write!(f, "{}", e),
            EvolutionError::EmptyPopulation => write!(f, "population is empty"),
            EvolutionError::WeightLengthMismatch { expected, found } => write!(
                f,
                "controller has {} weights, expected {}",
                found, expected
            ),
            EvolutionError::Cancelled => write!(f, "run cancelled"),
            EvolutionError::Episode(e) => write!(f, "episode failed: {}", e),
        }
    }
}

impl std::error::Error for EvolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvolutionError::Config(e) => Some(e),
            EvolutionError::Episode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EvolutionError {
    fn from(e: ConfigError) -> Self {
        EvolutionError::Config(e)
    }
}

impl From<WorldError> for EvolutionError {
    fn from(e: WorldError) -> Self {
        EvolutionError::Episode(e)
    }
}

/// How a run finished
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
    Aborted(String),
}

/// Outcome of [`Population::run`]
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub generations: usize,
    pub best_fitness: f32,
    pub best_score: u32,
    pub status: RunStatus,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            RunStatus::Completed => writeln!(f, "Simulation complete.")?,
            RunStatus::Cancelled => writeln!(f, "Simulation cancelled.")?,
            RunStatus::Aborted(reason) => writeln!(f, "Run aborted: {}", reason)?,
        }
        writeln!(f, "Run: {}", self.run_id)?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Best score: {}", self.best_score)?;
        write!(f, "Best fitness: {:.2}", self.best_fitness)
    }
}

/// A generation of linear controllers
pub struct Population {
    /// Ordered by fitness rank after each reproduction
    pub controllers: Vec<LinearController>,
    pub generation: usize,
    pub history: StatsHistory,
    config: Config,
    presenter: Presenter,
    log: Option<CsvLog>,
    stop: StopSignal,
    run_id: String,
    rng: ChaCha8Rng,
    seed: u64,
}

impl Population {
    /// Create a random population
    pub fn new(config: Config) -> Result<Self, EvolutionError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a random population with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, EvolutionError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let e = &config.evolution;
        let controllers = (0..e.population_size)
            .map(|_| {
                LinearController::random(
                    e.weight_count,
                    e.initial_weight_range,
                    config.world.height,
                    &mut rng,
                )
            })
            .collect();
        Ok(Self::assemble(config, controllers, rng, seed))
    }

    /// Start from existing controllers
    pub fn from_controllers(
        config: Config,
        controllers: Vec<LinearController>,
        seed: u64,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let expected = config.evolution.weight_count;
        if let Some(bad) = controllers.iter().find(|c| c.weights.len() != expected) {
            return Err(EvolutionError::WeightLengthMismatch {
                expected,
                found: bad.weights.len(),
            });
        }
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(Self::assemble(config, controllers, rng, seed))
    }

    fn assemble(config: Config, controllers: Vec<LinearController>, rng: ChaCha8Rng, seed: u64) -> Self {
        let run_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self {
            controllers,
            generation: 0,
            history: StatsHistory::new(),
            config,
            presenter: Presenter::headless(),
            log: None,
            stop: StopSignal::new(),
            run_id,
            rng,
            seed,
        }
    }

    /// Draw and pace episodes through `presenter`
    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// Append one row per generation to `log`
    pub fn with_log(mut self, log: CsvLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Best controller of the last evaluation
    pub fn best(&self) -> Option<&LinearController> {
        self.controllers
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// Fly every controller through one shared episode and store its fitness
    pub fn evaluate_generation(&mut self) -> Result<EpisodeSummary, EvolutionError> {
        if self.controllers.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        for c in &mut self.controllers {
            c.fitness = 0.0;
        }

        let episode_seed = self.rng.gen();
        let mut world = World::new_with_seed(self.config.clone(), self.controllers.len(), episode_seed)
            .with_rules(self.config.fitness.clone())
            .with_stop_score(self.config.evolution.stop_score)
            .with_stop_signal(self.stop.clone())
            .with_generation(self.generation);

        let start = Instant::now();
        let episode = world.run_episode(&mut self.controllers, &mut self.presenter)?;
        let duration = start.elapsed().as_secs_f64();

        if episode.reason == EndReason::Cancelled {
            return Err(EvolutionError::Cancelled);
        }

        for (controller, &fitness) in self.controllers.iter_mut().zip(&episode.fitness) {
            controller.fitness = fitness;
        }

        let stats = GenerationStats::from_episode(self.generation, duration, &episode);
        log::info!("{}", stats.summary());
        if let Some(log) = &mut self.log {
            log.append_or_warn(std::slice::from_ref(&stats));
        }
        self.history.record(stats);

        Ok(episode)
    }

    /// Replace the population with the next generation
    pub fn reproduce(&mut self) -> Result<(), EvolutionError> {
        if self.controllers.is_empty() {
            log::warn!("Generation {}: population is empty, nothing to breed", self.generation);
            return Err(EvolutionError::EmptyPopulation);
        }

        let e = &self.config.evolution;
        let size = e.population_size;

        // Stable sort keeps the original order between equal fitness values
        let mut ranked = std::mem::take(&mut self.controllers);
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let mut next: Vec<LinearController> = Vec::with_capacity(size);
        next.extend(ranked.iter().take(e.elitism.min(size)).cloned());

        let pool = &ranked[..e.parent_pool.min(ranked.len())];
        while next.len() < size {
            let (Some(a), Some(b)) = (pool.choose(&mut self.rng), pool.choose(&mut self.rng)) else {
                break;
            };
            let mut child = a.crossover(b, &mut self.rng);
            child.mutate(e.mutation_rate, e.mutation_power, &mut self.rng);
            next.push(child);
        }

        log::debug!(
            "Generation {} bred: {} elites, {} children from a pool of {}",
            self.generation,
            e.elitism.min(size),
            next.len() - e.elitism.min(size),
            pool.len()
        );

        self.controllers = next;
        self.generation += 1;
        Ok(())
    }

    /// Evaluate and breed for `max_generations` generations
    pub fn run(&mut self, max_generations: usize) -> RunSummary {
        log::info!(
            "Run {}: {} controllers, {} generations, seed {}",
            self.run_id,
            self.controllers.len(),
            max_generations,
            self.seed
        );

        let mut status = RunStatus::Completed;
        let mut completed = 0;
        for _ in 0..max_generations {
            let result = self.evaluate_generation().and_then(|_| self.reproduce());
            match result {
                Ok(()) => completed += 1,
                Err(EvolutionError::Cancelled) => {
                    log::warn!("Generation {} cancelled", self.generation);
                    status = RunStatus::Cancelled;
                    break;
                }
                Err(e) => {
                    log::error!("Generation {} failed: {}", self.generation, e);
                    status = RunStatus::Aborted(e.to_string());
                    break;
                }
            }
        }

        RunSummary {
            run_id: self.run_id.clone(),
            generations: completed,
            best_fitness: self.history.best_fitness(),
            best_score: self.history.best_score(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(size: usize) -> Config {
        let mut config = Config::default();
        config.evolution.population_size = size;
        config.evolution.elitism = 2.min(size);
        config.safety.max_ticks_per_episode = 3_000;
        config
    }

    fn ranked(fitness: &[f32]) -> Vec<LinearController> {
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut c = LinearController::new(vec![i as f32, -(i as f32), 0.5], 800.0);
                c.fitness = f;
                c
            })
            .collect()
    }

    #[test]
    fn test_random_population() {
        let pop = Population::new_with_seed(test_config(10), 1).unwrap();
        assert_eq!(pop.len(), 10);
        assert!(pop.controllers.iter().all(|c| c.weights.len() == 3));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = test_config(10);
        config.evolution.population_size = 0;
        assert!(matches!(
            Population::new_with_seed(config, 1),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_wrong_weight_length_rejected() {
        let controllers = vec![LinearController::new(vec![1.0], 800.0)];
        let result = Population::from_controllers(test_config(1), controllers, 1);
        assert!(matches!(
            result,
            Err(EvolutionError::WeightLengthMismatch { expected: 3, found: 1 })
        ));
    }

    #[test]
    fn test_elites_survive() {
        let mut pop = Population::from_controllers(test_config(5), ranked(&[4.0, 10.0, 2.0, 8.0, 6.0]), 3).unwrap();
        pop.reproduce().unwrap();
        assert_eq!(pop.len(), 5);
        assert_eq!(pop.controllers[0].weights, vec![1.0, -1.0, 0.5]);
        assert_eq!(pop.controllers[1].weights, vec![3.0, -3.0, 0.5]);
        assert_eq!(pop.generation, 1);
    }

    #[test]
    fn test_ties_keep_order() {
        let mut pop = Population::from_controllers(test_config(4), ranked(&[1.0, 1.0, 1.0, 1.0]), 3).unwrap();
        pop.reproduce().unwrap();
        assert_eq!(pop.controllers[0].weights[0], 0.0);
        assert_eq!(pop.controllers[1].weights[0], 1.0);
    }

    #[test]
    fn test_size_restored_from_small_pool() {
        let mut config = test_config(12);
        config.evolution.elitism = 2;
        let mut pop = Population::from_controllers(config, ranked(&[3.0, 1.0]), 5).unwrap();
        pop.reproduce().unwrap();
        assert_eq!(pop.len(), 12);
    }

    #[test]
    fn test_size_one() {
        let mut pop = Population::from_controllers(test_config(1), ranked(&[7.0]), 5).unwrap();
        pop.reproduce().unwrap();
        assert_eq!(pop.len(), 1);
        assert_eq!(pop.controllers[0].weights, vec![0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_empty_population_skips() {
        let mut pop = Population::from_controllers(test_config(3), Vec::new(), 5).unwrap();
        assert!(matches!(pop.reproduce(), Err(EvolutionError::EmptyPopulation)));
        assert!(matches!(pop.evaluate_generation(), Err(EvolutionError::EmptyPopulation)));
        assert_eq!(pop.generation, 0);
    }

    #[test]
    fn test_children_come_from_top_five() {
        let mut config = test_config(20);
        config.evolution.mutation_rate = 0.0;
        let fitness: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let mut pop = Population::from_controllers(config, ranked(&fitness), 9).unwrap();
        pop.reproduce().unwrap();
        // Top five are the controllers built with indices 5..=9
        for child in &pop.controllers {
            assert!(child.weights[0] >= 5.0);
            assert!(child.weights[1] <= -5.0);
        }
    }

    #[test]
    fn test_evaluate_assigns_fitness() {
        let mut pop = Population::new_with_seed(test_config(6), 11).unwrap();
        let episode = pop.evaluate_generation().unwrap();
        assert_eq!(episode.fitness.len(), 6);
        for (c, f) in pop.controllers.iter().zip(&episode.fitness) {
            assert_eq!(c.fitness, *f);
        }
        assert_eq!(pop.history.snapshots.len(), 1);
    }

    #[test]
    fn test_run_completes() {
        let mut pop = Population::new_with_seed(test_config(6), 12).unwrap();
        let summary = pop.run(3);
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.generations, 3);
        assert_eq!(pop.generation, 3);
        assert_eq!(pop.len(), 6);
        assert!(summary.to_string().starts_with("Simulation complete."));
    }

    #[test]
    fn test_cancelled_run_keeps_population() {
        let stop = StopSignal::new();
        stop.stop();
        let mut pop = Population::new_with_seed(test_config(4), 13)
            .unwrap()
            .with_stop_signal(stop);
        let before: Vec<Vec<f32>> = pop.controllers.iter().map(|c| c.weights.clone()).collect();
        let summary = pop.run(5);
        assert_eq!(summary.status, RunStatus::Cancelled);
        assert_eq!(summary.generations, 0);
        let after: Vec<Vec<f32>> = pop.controllers.iter().map(|c| c.weights.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = Population::new_with_seed(test_config(5), 77).unwrap();
        let mut b = Population::new_with_seed(test_config(5), 77).unwrap();
        a.run(2);
        b.run(2);
        assert_eq!(a.controllers, b.controllers);
    }
}
