//! Per-generation statistics.

use crate::records::CsvRecord;
use crate::world::EpisodeSummary;
use serde::{Deserialize, Serialize};

/// Statistics for one evaluated generation
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationStats {
    /// Generation number (0-based)
    pub generation: usize,
    /// Wall-clock time of the evaluation episode
    pub duration_secs: f64,
    /// Mean fitness across the population
    pub avg_fitness: f32,
    /// Highest fitness in the population
    pub best_fitness: f32,
    /// Pipes passed during the episode
    pub score: u32,
    /// Ticks the episode lasted
    pub ticks: u64,
    /// Controllers evaluated
    pub population: usize,
}

impl GenerationStats {
    pub fn from_episode(generation: usize, duration_secs: f64, episode: &EpisodeSummary) -> Self {
        Self {
            generation,
            duration_secs,
            avg_fitness: episode.avg_fitness(),
            best_fitness: if episode.fitness.is_empty() {
                0.0
            } else {
                episode.best_fitness()
            },
            score: episode.score,
            ticks: episode.ticks,
            population: episode.fitness.len(),
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Gen:{:4} | Pop:{:4} | Score:{:4} | Best:{:8.2} | Avg:{:8.2} | Ticks:{:6} | {:.2}s",
            self.generation,
            self.population,
            self.score,
            self.best_fitness,
            self.avg_fitness,
            self.ticks,
            self.duration_secs
        )
    }
}

impl CsvRecord for GenerationStats {
    fn csv_header() -> &'static str {
        "generation,duration,avg_fitness,best_fitness,score"
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{},{:.3},{:.2},{:.2},{}",
            self.generation, self.duration_secs, self.avg_fitness, self.best_fitness, self.score
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded generations
    pub snapshots: Vec<GenerationStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation
    pub fn record(&mut self, stats: GenerationStats) {
        self.snapshots.push(stats);
    }

    pub fn latest(&self) -> Option<&GenerationStats> {
        self.snapshots.last()
    }

    /// Best score over the whole run
    pub fn best_score(&self) -> u32 {
        self.snapshots.iter().map(|s| s.score).max().unwrap_or(0)
    }

    /// Best fitness over the whole run
    pub fn best_fitness(&self) -> f32 {
        self.snapshots
            .iter()
            .map(|s| s.best_fitness)
            .fold(0.0, f32::max)
    }

    /// Get best fitness over generations
    pub fn best_fitness_series(&self) -> Vec<(usize, f32)> {
        self.snapshots
            .iter()
            .map(|s| (s.generation, s.best_fitness))
            .collect()
    }

    /// Get score over generations
    pub fn score_series(&self) -> Vec<(usize, u32)> {
        self.snapshots.iter().map(|s| (s.generation, s.score)).collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
