//! # FLAPPY-EVO
//!
//! Side-scrolling flappy-bird simulation where whole populations learn to fly.
//!
//! ## Features
//!
//! - **Pixel-exact**: bit-mask collision between birds and pipes
//! - **Evolvable**: generational linear controllers or NEAT networks
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation
//! - **Headless**: rendering and input are optional collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flappy_evo::{Config, Population};
//!
//! // Evolve linear controllers with the default config
//! let config = Config::default();
//! let mut population = Population::new(config).unwrap();
//!
//! let summary = population.run(10);
//! println!("{}", summary);
//! ```
//!
//! ## Single episode
//!
//! ```rust
//! use flappy_evo::{Config, Observation, World};
//!
//! let mut world = World::new_with_seed(Config::default(), 3, 42);
//! let mut controllers = vec![|o: &Observation| o.dist_to_gap_bottom < 60.0; 3];
//! let summary = world.run_with_callback(&mut controllers, |_, _| {}).unwrap();
//! println!("score {} after {} ticks", summary.score, summary.ticks);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use flappy_evo::Config;
//!
//! let mut config = Config::default();
//! config.evolution.population_size = 20;
//! config.evolution.mutation_rate = 0.2;
//! assert!(config.validate().is_ok());
//! ```

pub mod bird;
pub mod config;
pub mod controller;
pub mod evolution;
pub mod floor;
pub mod mask;
pub mod neat;
pub mod pipe;
pub mod records;
pub mod render;
pub mod session;
pub mod stats;
pub mod world;

#[cfg(feature = "gui")]
pub mod gui;

// Re-export main types
pub use bird::Bird;
pub use config::Config;
pub use controller::{Controller, LinearController, ManualController, NetworkController, Observation};
pub use evolution::Population;
pub use neat::NeatRunner;
pub use pipe::Pipe;
pub use session::Mode;
pub use world::{StopSignal, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick headless benchmark of the evolutionary algorithm
pub fn benchmark(generations: usize, population: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.evolution.population_size = population;
    config.evolution.elitism = config.evolution.elitism.min(population);

    let start = Instant::now();
    let (ticks, best_score, completed) = match Population::new_with_seed(config, 42) {
        Ok(mut pop) => {
            let summary = pop.run(generations);
            let ticks = pop.history.snapshots.iter().map(|s| s.ticks).sum();
            (ticks, summary.best_score, summary.generations)
        }
        Err(e) => {
            log::error!("Benchmark setup failed: {}", e);
            (0, 0, 0)
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    BenchmarkResult {
        generations: completed,
        population,
        ticks,
        elapsed_secs: elapsed,
        ticks_per_second: if elapsed > 0.0 { ticks as f64 / elapsed } else { 0.0 },
        best_score,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub generations: usize,
    pub population: usize,
    pub ticks: u64,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
    pub best_score: u32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        writeln!(f, "Best score: {}", self.best_score)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_episode() {
        let mut world = World::new_with_seed(Config::default(), 2, 7);
        let mut controllers = vec![ManualController, ManualController];
        let summary = world.run_with_callback(&mut controllers, |_, _| {}).unwrap();
        assert!(world.is_extinct());
        assert_eq!(summary.fitness.len(), 2);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(2, 5);

        assert_eq!(result.generations, 2);
        assert_eq!(result.population, 5);
        assert!(result.ticks > 0);
        assert!(result.to_string().contains("Generations: 2"));
    }
}
