//! Configuration system for the flappy simulation.
//!
//! Every tuning constant of the game (gravity, gap size, scroll speed, fitness
//! rewards, population parameters) lives here. Supports YAML configuration
//! files with defaults matching the classic game.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub pipes: PipeConfig,
    pub fitness: FitnessConfig,
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub neat: NeatConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    pub logging: LoggingConfig,
}

/// Playfield geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Playfield width in pixels
    pub width: f32,
    /// Playfield height in pixels, also the input normalization range
    pub height: f32,
    /// Fixed horizontal position of every bird
    pub spawn_x: f32,
    /// Starting height of every bird
    pub spawn_y: f32,
    /// Top edge of the floor; touching it eliminates a bird
    pub floor_y: f32,
}

/// Bird motion law
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Velocity set by a jump (negative is upward)
    pub jump_velocity: f32,
    /// Quadratic coefficient of the displacement curve
    pub gravity: f32,
    /// Largest downward step per tick
    pub max_drop: f32,
    /// Extra upward push applied when displacement is negative
    pub rise_boost: f32,
    /// Nose-up angle while climbing
    pub max_tilt: f32,
    /// Degrees lost per tick while diving
    pub tilt_step: f32,
    /// Steepest nose-down angle
    pub min_tilt: f32,
    /// Distance below the jump height before the nose starts to drop
    pub tilt_hold: f32,
    /// Ticks per wing-flap frame
    pub flap_ticks: u32,
}

/// Pipe geometry and spawning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Vertical opening between the top and bottom pipe
    pub gap: f32,
    /// Pixels scrolled per tick (pipes and floor)
    pub scroll_speed: f32,
    /// Lowest possible top edge of the gap (inclusive)
    pub gap_top_min: f32,
    /// Highest possible top edge of the gap (exclusive)
    pub gap_top_max: f32,
    /// Where a replacement pipe appears after a pass
    pub spawn_x: f32,
    /// Where the first pipe of an episode appears
    pub first_spawn_x: f32,
}

/// How an eliminated or surviving bird's fitness is finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalFitness {
    /// Overwrite with the episode score
    Score,
    /// Keep the fitness accumulated so far
    Accumulated,
}

/// Fitness shaping rules applied by the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Added every tick a bird stays alive
    pub survival_reward: f32,
    /// Added to every living bird when a pipe is passed
    pub pass_bonus: f32,
    /// Subtracted when a bird hits a pipe
    pub collision_penalty: f32,
    /// Applied on floor/ceiling contact and to survivors of a stopped episode
    pub terminal: TerminalFitness,
}

/// Generational algorithm for linear controllers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Controllers per generation
    pub population_size: usize,
    /// Length of every weight vector
    pub weight_count: usize,
    /// Probability of mutating each weight
    pub mutation_rate: f32,
    /// Mutations add a value drawn from [-power, +power]
    pub mutation_power: f32,
    /// Best controllers copied unchanged
    pub elitism: usize,
    /// Parents are sampled uniformly from this many top controllers
    pub parent_pool: usize,
    /// Generations per run
    pub max_generations: usize,
    /// Initial weights are drawn from [-range, +range]
    pub initial_weight_range: f32,
    /// Stop an episode once this score is reached
    pub stop_score: Option<u32>,
}

/// NEAT collaborator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeatConfig {
    pub population_size: usize,
    pub max_generations: usize,
    /// Episode stops and the run ends once a genome reaches this score
    pub stop_score: Option<u32>,
    /// Network output above this value means jump
    pub jump_threshold: f32,
    pub fitness: FitnessConfig,
    // Speciation and reproduction
    pub distance_threshold: f32,
    pub elitism: usize,
    pub survival_threshold: f32,
    pub adoption_rate: f32,
    pub sexual_reproduction_chance: f32,
    pub interspecies_mating_chance: f32,
    pub stagnation_threshold: usize,
    pub stagnation_penalty: f32,
    // Genome mutation
    pub child_mutation_chance: f32,
    pub mate_by_averaging_chance: f32,
    pub weight_bound: f32,
    pub weight_reset_chance: f32,
    pub weight_nudge_chance: f32,
    pub weight_mutation_power: f32,
    pub node_addition_mutation_chance: f32,
    pub gene_addition_mutation_chance: f32,
    pub max_gene_addition_mutation_attempts: usize,
    pub excess_gene_factor: f32,
    pub disjoint_gene_factor: f32,
    pub common_weight_factor: f32,
}

/// Limits that keep runaway episodes bounded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Hard stop for an episode nobody loses
    pub max_ticks_per_episode: u64,
}

/// Logging and presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory holding the CSV logs
    pub log_dir: String,
    /// Per-generation log of the evolutionary path
    pub evolve_file: String,
    /// Per-genome log of the NEAT path
    pub neat_file: String,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Frames per second for rendered runs (0 = as fast as possible)
    pub fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            physics: PhysicsConfig::default(),
            pipes: PipeConfig::default(),
            fitness: FitnessConfig::default(),
            evolution: EvolutionConfig::default(),
            neat: NeatConfig::default(),
            safety: SafetyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 800.0,
            spawn_x: 230.0,
            spawn_y: 350.0,
            floor_y: 730.0,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            jump_velocity: -10.5,
            gravity: 1.5,
            max_drop: 16.0,
            rise_boost: 2.0,
            max_tilt: 25.0,
            tilt_step: 20.0,
            min_tilt: -90.0,
            tilt_hold: 50.0,
            flap_ticks: 5,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            gap: 200.0,
            scroll_speed: 5.0,
            gap_top_min: 50.0,
            gap_top_max: 450.0,
            spawn_x: 600.0,
            first_spawn_x: 600.0,
        }
    }
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            survival_reward: 0.1,
            pass_bonus: 0.0,
            collision_penalty: 0.0,
            terminal: TerminalFitness::Score,
        }
    }
}

impl FitnessConfig {
    /// Rules used when NEAT genomes are evaluated
    pub fn neat() -> Self {
        Self {
            survival_reward: 0.1,
            pass_bonus: 5.0,
            collision_penalty: 1.0,
            terminal: TerminalFitness::Accumulated,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            weight_count: 3,
            mutation_rate: 0.1,
            mutation_power: 0.5,
            elitism: 2,
            parent_pool: 5,
            max_generations: 10,
            initial_weight_range: 1.0,
            stop_score: None,
        }
    }
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 50,
            stop_score: Some(10),
            jump_threshold: 0.5,
            fitness: FitnessConfig::neat(),
            distance_threshold: 3.0,
            elitism: 1,
            survival_threshold: 0.2,
            adoption_rate: 1.0,
            sexual_reproduction_chance: 0.6,
            interspecies_mating_chance: 0.001,
            stagnation_threshold: 15,
            stagnation_penalty: 1.0,
            child_mutation_chance: 0.65,
            mate_by_averaging_chance: 0.4,
            weight_bound: 5.0,
            weight_reset_chance: 0.2,
            weight_nudge_chance: 0.9,
            weight_mutation_power: 2.5,
            node_addition_mutation_chance: 0.03,
            gene_addition_mutation_chance: 0.05,
            max_gene_addition_mutation_attempts: 20,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_episode: 20_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "csv".to_string(),
            evolve_file: "evolve.csv".to_string(),
            neat_file: "NEAT.csv".to_string(),
            log_level: "info".to_string(),
            fps: 30,
        }
    }
}

/// Errors raised while loading or validating a configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "YAML error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(msg.to_string()))
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// First of `paths` that loads and validates. Missing files are skipped;
    /// files that exist but fail go to `rejected`.
    pub fn load_first<'a, P: AsRef<Path>>(
        paths: &'a [P],
        mut rejected: impl FnMut(&Path, ConfigError),
    ) -> Option<(&'a Path, Self)> {
        for path in paths.iter().map(|p| p.as_ref()) {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return Some((path, config)),
                Err(e) => rejected(path, e),
            }
        }
        None
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        if w.width <= 0.0 || w.height <= 0.0 {
            return invalid("world width and height must be > 0");
        }
        if w.floor_y <= 0.0 || w.floor_y > w.height {
            return invalid("floor_y must lie inside the playfield");
        }
        if w.spawn_y < 0.0 || w.spawn_y >= w.floor_y {
            return invalid("spawn_y must be between the ceiling and the floor");
        }

        let p = &self.pipes;
        if p.gap <= 0.0 {
            return invalid("pipe gap must be > 0");
        }
        if p.scroll_speed <= 0.0 {
            return invalid("scroll_speed must be > 0");
        }
        if p.gap_top_min < 0.0 || p.gap_top_min >= p.gap_top_max {
            return invalid("gap_top_min must be >= 0 and below gap_top_max");
        }
        // Gap heights are drawn from whole pixels in [min, max)
        if p.gap_top_max.floor() <= p.gap_top_min.floor() {
            return invalid("gap_top_min and gap_top_max must span at least one whole pixel");
        }
        if p.gap_top_max + p.gap > w.floor_y {
            return invalid("gap_top_max + gap must not reach below the floor");
        }

        if self.physics.max_drop <= 0.0 {
            return invalid("max_drop must be > 0");
        }

        let e = &self.evolution;
        if e.population_size == 0 {
            return invalid("population_size must be > 0");
        }
        if e.weight_count == 0 {
            return invalid("weight_count must be > 0");
        }
        if e.weight_count != crate::controller::INPUT_COUNT {
            return invalid("weight_count must match the observation size");
        }
        if e.elitism > e.population_size {
            return invalid("elitism cannot exceed population_size");
        }
        if e.parent_pool == 0 {
            return invalid("parent_pool must be > 0");
        }
        if !(0.0..=1.0).contains(&e.mutation_rate) {
            return invalid("mutation_rate must be between 0 and 1");
        }
        if !e.mutation_power.is_finite() || e.mutation_power < 0.0 {
            return invalid("mutation_power must be a finite value >= 0");
        }
        if !e.initial_weight_range.is_finite() || e.initial_weight_range < 0.0 {
            return invalid("initial_weight_range must be a finite value >= 0");
        }

        let n = &self.neat;
        if n.population_size == 0 {
            return invalid("neat population_size must be > 0");
        }
        if n.stagnation_threshold == 0 {
            return invalid("neat stagnation_threshold must be > 0");
        }

        if self.safety.max_ticks_per_episode == 0 {
            return invalid("max_ticks_per_episode must be > 0");
        }
        Ok(())
    }
}
