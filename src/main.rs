//! FLAPPY-EVO - CLI Entry Point
//!
//! Headless evolution runs. Manual play lives in `flappy-gui`.

use clap::{Parser, Subcommand};
use flappy_evo::records::CsvLog;
use flappy_evo::render::Presenter;
use flappy_evo::stats::StatsHistory;
use flappy_evo::{benchmark, Config, NeatRunner, Population, StopSignal};
use rand::Rng;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flappy-evo")]
#[command(version)]
#[command(about = "Flappy-bird populations that learn to fly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve linear controllers with the generational algorithm
    Evolve {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations (overrides the config)
        #[arg(short, long)]
        generations: Option<usize>,

        /// Population size (overrides the config)
        #[arg(short, long)]
        population: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Save the stats history as JSON
        #[arg(long)]
        history: Option<PathBuf>,

        /// Trace a status line every N ticks (enables trace logging)
        #[arg(long, value_name = "TICKS")]
        trace_frames: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Evolve NEAT networks until one reaches the score cap
    Neat {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations (overrides the config)
        #[arg(short, long)]
        generations: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write the champion genome as JSON
        #[arg(long)]
        champion: Option<PathBuf>,

        /// Trace a status line every N ticks (enables trace logging)
        #[arg(long, value_name = "TICKS")]
        trace_frames: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Play by hand (needs the GUI build)
    Play,

    /// Run performance benchmark
    Benchmark {
        /// Number of generations
        #[arg(short, long, default_value = "5")]
        generations: usize,

        /// Population size
        #[arg(short, long, default_value = "50")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evolve {
            config,
            generations,
            population,
            seed,
            history,
            trace_frames,
            quiet,
        } => {
            let mut config = load_config(&config, quiet)?;
            if let Some(p) = population {
                config.evolution.population_size = p;
                config.evolution.elitism = config.evolution.elitism.min(p);
            }
            init_logging(&config, quiet, trace_frames.is_some());
            run_evolve(config, generations, seed, history, trace_frames)
        }

        Commands::Neat {
            config,
            generations,
            seed,
            champion,
            trace_frames,
            quiet,
        } => {
            let config = load_config(&config, quiet)?;
            init_logging(&config, quiet, trace_frames.is_some());
            run_neat(config, generations, seed, champion, trace_frames)
        }

        Commands::Play => {
            println!("Manual play needs a window: cargo run --features gui --bin flappy-gui");
            Ok(())
        }

        Commands::Benchmark {
            generations,
            population,
        } => {
            init_logging(&Config::default(), true, false);
            run_benchmark(generations, population)
        }

        Commands::Init { output } => generate_config(output),
    }
}

/// Log level comes from the config unless RUST_LOG overrides it
fn init_logging(config: &Config, quiet: bool, trace_frames: bool) {
    let base = if quiet { "warn" } else { config.logging.log_level.as_str() };
    let level = if trace_frames {
        format!("{},flappy_evo=trace", base)
    } else {
        base.to_string()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn presenter(trace_frames: Option<u64>) -> Presenter {
    match trace_frames {
        Some(interval) => Presenter::logging(interval),
        None => Presenter::headless(),
    }
}

/// Last generation and the best-fitness trend, at most ten points
fn print_progress(history: &StatsHistory) {
    let Some(latest) = history.latest() else {
        return;
    };
    println!("Last generation: {}", latest.summary());

    let series = history.best_fitness_series();
    let step = series.len().div_ceil(10).max(1);
    let trend: Vec<String> = series
        .iter()
        .step_by(step)
        .map(|(generation, fitness)| format!("{}:{:.1}", generation, fitness))
        .collect();
    println!("Best fitness trend: {}", trend.join(" "));
}

fn load_config(path: &Path, quiet: bool) -> Result<Config, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        if !quiet {
            println!("Loading config from: {:?}", path);
        }
        Config::from_file(path)?
    } else {
        if !quiet {
            println!("Using default configuration");
        }
        Config::default()
    };
    Ok(config)
}

fn run_evolve(
    config: Config,
    generations: Option<usize>,
    seed: Option<u64>,
    history: Option<PathBuf>,
    trace_frames: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let generations = generations.unwrap_or(config.evolution.max_generations);
    let log = CsvLog::in_dir(&config.logging.log_dir, &config.logging.evolve_file);

    println!("Starting evolution");
    println!("  Population: {}", config.evolution.population_size);
    println!("  Generations: {}", generations);
    println!("  Seed: {}", seed);
    println!("  Log: {:?}", log.path());
    println!();

    let mut population = Population::new_with_seed(config, seed)?
        .with_presenter(presenter(trace_frames))
        .with_log(log)
        .with_stop_signal(StopSignal::new());
    let summary = population.run(generations);

    println!();
    println!("{}", summary);
    print_progress(&population.history);
    if let Some(best) = population.best() {
        println!("Best weights: {:?}", best.weights);
    }

    if let Some(path) = history {
        population.history.save(&path.to_string_lossy())?;
        println!("Stats history: {:?}", path);
    }

    Ok(())
}

fn run_neat(
    config: Config,
    generations: Option<usize>,
    seed: Option<u64>,
    champion: Option<PathBuf>,
    trace_frames: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let generations = generations.unwrap_or(config.neat.max_generations);
    let log = CsvLog::in_dir(&config.logging.log_dir, &config.logging.neat_file);

    println!("Starting NEAT");
    println!("  Genomes: {}", config.neat.population_size);
    println!("  Generations: {}", generations);
    println!("  Score cap: {:?}", config.neat.stop_score);
    println!("  Seed: {}", seed);
    println!();

    let mut runner = NeatRunner::new_with_seed(config, seed)?
        .with_presenter(presenter(trace_frames))
        .with_log(log);
    let summary = runner.run(generations);

    println!();
    println!("{}", summary);
    print_progress(&runner.history);

    if let Some(path) = champion {
        runner.save_champion(&path)?;
        println!("Champion genome: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(generations: usize, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== FLAPPY-EVO Benchmark ===");
    println!("Generations: {}", generations);
    println!("Population: {}", population);
    println!();

    let result = benchmark(generations, population);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
