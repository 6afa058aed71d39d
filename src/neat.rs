//! NEAT networks flying through the world.
//!
//! Topology evolution is left entirely to `oxineat`. This module owns the
//! evaluation side: every generation, one network per genome flies through
//! a shared episode and the resulting fitness is written back to the genomes
//! in the order the population lists them.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;

use oxineat::{Genome, Population as NeatPopulation, PopulationConfig};
use oxineat_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::{Config, ConfigError, NeatConfig};
use crate::controller::{NetworkController, INPUT_COUNT};
use crate::records::{CsvLog, GenomeRecord};
use crate::render::Presenter;
use crate::stats::{GenerationStats, StatsHistory};
use crate::world::{EndReason, EpisodeSummary, StopSignal, World, WorldError};

/// The `oxineat` population type used here
pub type GenomePopulation =
    NeatPopulation<GeneticConfig, <NNGenome as Genome>::InnovationHistory, NNGenome>;

/// Errors raised by the NEAT driver
#[derive(Debug)]
pub enum NeatError {
    Config(ConfigError),
    Episode(WorldError),
    Cancelled,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for NeatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeatError::Config(e) => write!(f, "{}", e),
            NeatError::Episode(e) => write!(f, "episode failed: {}", e),
            NeatError::Cancelled => write!(f, "run cancelled"),
            NeatError::Io(e) => write!(f, "IO error: {}", e),
            NeatError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for NeatError {}

impl From<ConfigError> for NeatError {
    fn from(e: ConfigError) -> Self {
        NeatError::Config(e)
    }
}

impl From<WorldError> for NeatError {
    fn from(e: WorldError) -> Self {
        NeatError::Episode(e)
    }
}

impl From<std::io::Error> for NeatError {
    fn from(e: std::io::Error) -> Self {
        NeatError::Io(e)
    }
}

impl From<serde_json::Error> for NeatError {
    fn from(e: serde_json::Error) -> Self {
        NeatError::Json(e)
    }
}

/// Genome parameters: a bias input plus the observation, one sigmoid output
pub fn genetic_config(neat: &NeatConfig) -> GeneticConfig {
    GeneticConfig {
        input_count: NonZeroUsize::new(INPUT_COUNT + 1).unwrap_or(NonZeroUsize::MIN),
        output_count: NonZeroUsize::MIN,
        activation_types: vec![ActivationType::Sigmoid],
        output_activation_types: vec![ActivationType::Sigmoid],
        child_mutation_chance: neat.child_mutation_chance,
        mate_by_averaging_chance: neat.mate_by_averaging_chance,
        suppression_reset_chance: 1.0,
        initial_expression_chance: 1.0,
        weight_bound: neat.weight_bound,
        weight_reset_chance: neat.weight_reset_chance,
        weight_nudge_chance: neat.weight_nudge_chance,
        weight_mutation_power: neat.weight_mutation_power,
        node_addition_mutation_chance: neat.node_addition_mutation_chance,
        gene_addition_mutation_chance: neat.gene_addition_mutation_chance,
        max_gene_addition_mutation_attempts: neat.max_gene_addition_mutation_attempts,
        recursion_chance: 0.0,
        excess_gene_factor: neat.excess_gene_factor,
        disjoint_gene_factor: neat.disjoint_gene_factor,
        common_weight_factor: neat.common_weight_factor,
        ..GeneticConfig::zero()
    }
}

/// Speciation and reproduction parameters
pub fn population_config(neat: &NeatConfig) -> Result<PopulationConfig, ConfigError> {
    let size = NonZeroUsize::new(neat.population_size)
        .ok_or_else(|| ConfigError::Invalid("neat population_size must be > 0".to_string()))?;
    let stagnation_threshold = NonZeroUsize::new(neat.stagnation_threshold)
        .ok_or_else(|| ConfigError::Invalid("neat stagnation_threshold must be > 0".to_string()))?;
    Ok(PopulationConfig {
        size,
        distance_threshold: neat.distance_threshold,
        elitism: neat.elitism,
        survival_threshold: neat.survival_threshold,
        adoption_rate: neat.adoption_rate,
        sexual_reproduction_chance: neat.sexual_reproduction_chance,
        interspecies_mating_chance: neat.interspecies_mating_chance,
        stagnation_threshold,
        stagnation_penalty: neat.stagnation_penalty,
    })
}

/// Fly one network per genome through a shared episode.
///
/// The summary's `fitness` holds every genome's raw fitness in iteration
/// order. It may be negative; clamp before handing it to `oxineat`.
pub fn evaluate_genomes<'a, I>(
    genomes: I,
    config: &Config,
    seed: u64,
    generation: usize,
    presenter: &mut Presenter,
    stop: &StopSignal,
) -> Result<EpisodeSummary, WorldError>
where
    I: IntoIterator<Item = &'a NNGenome>,
{
    let neat = &config.neat;
    let mut controllers: Vec<NetworkController> = genomes
        .into_iter()
        .map(|g| NetworkController::new(g, neat.jump_threshold, config.world.height))
        .collect();

    let mut world = World::new_with_seed(config.clone(), controllers.len(), seed)
        .with_rules(neat.fitness.clone())
        .with_stop_score(neat.stop_score)
        .with_stop_signal(stop.clone())
        .with_generation(generation);
    world.run_episode(&mut controllers, presenter)
}

/// How a NEAT run finished
#[derive(Clone, Debug, PartialEq)]
pub enum NeatStatus {
    /// A genome reached the score cap
    Solved,
    /// All generations were used up
    Exhausted,
    Cancelled,
    Aborted(String),
}

/// Outcome of [`NeatRunner::run`]
#[derive(Clone, Debug)]
pub struct NeatSummary {
    pub generations: usize,
    pub best_fitness: f32,
    pub best_score: u32,
    pub resets: usize,
    pub status: NeatStatus,
}

impl fmt::Display for NeatSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            NeatStatus::Solved => writeln!(f, "Score cap reached. Simulation complete.")?,
            NeatStatus::Exhausted => writeln!(f, "Simulation complete.")?,
            NeatStatus::Cancelled => writeln!(f, "Simulation cancelled.")?,
            NeatStatus::Aborted(reason) => writeln!(f, "Run aborted: {}", reason)?,
        }
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population resets: {}", self.resets)?;
        writeln!(f, "Best score: {}", self.best_score)?;
        write!(f, "Best fitness: {:.2}", self.best_fitness)
    }
}

/// Drives an `oxineat` population through the world
pub struct NeatRunner {
    population: GenomePopulation,
    config: Config,
    presenter: Presenter,
    log: Option<CsvLog>,
    stop: StopSignal,
    rng: ChaCha8Rng,
    seed: u64,
    resets: usize,
    /// Counts across resets, unlike `oxineat`'s own counter
    generation: usize,
    pub history: StatsHistory,
}

impl NeatRunner {
    pub fn new(config: Config) -> Result<Self, NeatError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// `seed` drives the pipe layout; genome mutation uses `oxineat`'s own randomness
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, NeatError> {
        config.validate()?;
        let population = NeatPopulation::new(population_config(&config.neat)?, genetic_config(&config.neat));
        Ok(Self {
            population,
            config,
            presenter: Presenter::headless(),
            log: None,
            stop: StopSignal::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            resets: 0,
            generation: 0,
            history: StatsHistory::new(),
        })
    }

    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// Append one row per genome per generation to `log`
    pub fn with_log(mut self, log: CsvLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn genome_count(&self) -> usize {
        self.population.genomes().count()
    }

    /// Best genome of the last evaluation
    pub fn champion(&self) -> &NNGenome {
        self.population.champion()
    }

    /// Evaluation callback: fly every genome and store its fitness in place
    pub fn evaluate_generation(&mut self) -> Result<EpisodeSummary, NeatError> {
        let generation = self.generation;
        let episode_seed = self.rng.gen();

        let start = std::time::Instant::now();
        let episode = evaluate_genomes(
            self.population.genomes(),
            &self.config,
            episode_seed,
            generation,
            &mut self.presenter,
            &self.stop,
        )?;
        let duration = start.elapsed().as_secs_f64();

        if episode.reason == EndReason::Cancelled {
            return Err(NeatError::Cancelled);
        }

        // oxineat rejects negative fitness
        let mut fitness = episode.fitness.iter().map(|f| f.max(0.0));
        self.population.evaluate_fitness(|_| fitness.next().unwrap_or(0.0));

        if let Some(log) = &mut self.log {
            let rows: Vec<GenomeRecord> = episode
                .fitness
                .iter()
                .enumerate()
                .map(|(genome_id, &fitness)| GenomeRecord {
                    generation,
                    genome_id,
                    fitness,
                })
                .collect();
            log.append_or_warn(&rows);
        }

        let stats = GenerationStats::from_episode(generation, duration, &episode);
        log::info!("NEAT {}", stats.summary());
        self.history.record(stats);

        Ok(episode)
    }

    /// Breed the next generation, restarting from scratch if the population degenerated
    pub fn evolve(&mut self) {
        if let Err(e) = self.population.evolve() {
            log::warn!("Generation {}: {}; resetting population", self.generation, e);
            self.restart();
        }
        self.generation += 1;
    }

    /// Fresh random genomes; the generation count carries on
    fn restart(&mut self) {
        self.population.reset();
        self.resets += 1;
    }

    /// Evaluate and evolve until a genome reaches the score cap or generations run out
    pub fn run(&mut self, max_generations: usize) -> NeatSummary {
        log::info!(
            "NEAT run: {} genomes, {} generations, seed {}",
            self.genome_count(),
            max_generations,
            self.seed
        );

        let mut status = NeatStatus::Exhausted;
        let mut completed = 0;
        for _ in 0..max_generations {
            match self.evaluate_generation() {
                Ok(episode) => {
                    completed += 1;
                    if episode.reason == EndReason::StopScore {
                        log::info!(
                            "Score cap {} reached; champion fitness {:.2}",
                            episode.score,
                            self.champion().fitness()
                        );
                        status = NeatStatus::Solved;
                        break;
                    }
                    self.evolve();
                }
                Err(NeatError::Cancelled) => {
                    status = NeatStatus::Cancelled;
                    break;
                }
                Err(e) => {
                    log::error!("NEAT generation failed: {}", e);
                    status = NeatStatus::Aborted(e.to_string());
                    break;
                }
            }
        }

        NeatSummary {
            generations: completed,
            best_fitness: self.history.best_fitness(),
            best_score: self.history.best_score(),
            resets: self.resets,
            status,
        }
    }

    /// Write the champion genome as JSON
    pub fn save_champion<P: AsRef<Path>>(&self, path: P) -> Result<(), NeatError> {
        let json = serde_json::to_string_pretty(self.champion())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.neat.population_size = 12;
        config.safety.max_ticks_per_episode = 2_000;
        config
    }

    #[test]
    fn test_population_config() {
        let config = test_config();
        let pc = population_config(&config.neat).unwrap();
        assert_eq!(pc.size.get(), 12);

        let mut bad = config.neat.clone();
        bad.population_size = 0;
        assert!(population_config(&bad).is_err());
    }

    #[test]
    fn test_genetic_config_shape() {
        let gc = genetic_config(&NeatConfig::default());
        assert_eq!(gc.input_count.get(), 4);
        assert_eq!(gc.output_count.get(), 1);
    }

    #[test]
    fn test_one_controller_per_genome() {
        let config = test_config();
        let runner = NeatRunner::new_with_seed(config.clone(), 3).unwrap();
        let mut presenter = Presenter::headless();
        let episode = evaluate_genomes(
            runner.population.genomes(),
            &config,
            5,
            0,
            &mut presenter,
            &StopSignal::new(),
        )
        .unwrap();
        assert_eq!(episode.fitness.len(), runner.genome_count());
        assert_ne!(episode.reason, EndReason::Cancelled);
    }

    #[test]
    fn test_evaluate_sets_fitness() {
        let mut runner = NeatRunner::new_with_seed(test_config(), 4).unwrap();
        let episode = runner.evaluate_generation().unwrap();
        let best = episode.fitness.iter().copied().fold(0.0, f32::max);
        assert!((runner.champion().fitness() - best).abs() < 1e-4);
        assert!(runner.population.genomes().all(|g| g.fitness() >= 0.0));
    }

    #[test]
    fn test_run_reports_generations() {
        let mut runner = NeatRunner::new_with_seed(test_config(), 6).unwrap();
        let summary = runner.run(2);
        assert!(summary.generations >= 1 && summary.generations <= 2);
        assert!(matches!(summary.status, NeatStatus::Exhausted | NeatStatus::Solved));
    }

    #[test]
    fn test_generations_keep_counting_after_reset() {
        let dir = std::env::temp_dir().join(format!("flappy_evo_neat_reset_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut config = test_config();
        config.neat.population_size = 6;
        let mut runner = NeatRunner::new_with_seed(config, 8)
            .unwrap()
            .with_log(CsvLog::in_dir(&dir, "NEAT.csv"));

        runner.evaluate_generation().unwrap();
        runner.evolve();
        runner.restart();
        runner.evaluate_generation().unwrap();
        runner.evolve();
        assert!(runner.resets() >= 1);
        assert_eq!(runner.generation(), 2);

        let generations: Vec<usize> = runner.history.snapshots.iter().map(|s| s.generation).collect();
        assert_eq!(generations, vec![0, 1]);

        let contents = std::fs::read_to_string(dir.join("NEAT.csv")).unwrap();
        let mut seen: Vec<&str> = contents
            .lines()
            .skip(1)
            .filter_map(|row| row.split(',').next())
            .collect();
        seen.dedup();
        assert_eq!(seen, vec!["0", "1"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cancelled_before_start() {
        let stop = StopSignal::new();
        stop.stop();
        let mut runner = NeatRunner::new_with_seed(test_config(), 7)
            .unwrap()
            .with_stop_signal(stop);
        let summary = runner.run(3);
        assert_eq!(summary.status, NeatStatus::Cancelled);
        assert_eq!(summary.generations, 0);
    }
}
