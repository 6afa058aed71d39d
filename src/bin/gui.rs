//! FLAPPY-EVO GUI Entry Point
//!
//! Run with: `cargo run --features gui --bin flappy-gui`

use flappy_evo::config::Config;
use flappy_evo::gui::run_gui;

fn main() -> eframe::Result<()> {
    // Load config or use default
    let config = load_config();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()),
    )
    .init();

    log::info!("Starting FLAPPY-EVO GUI");
    log::info!("Window: {}x{}", config.world.width, config.world.height);
    log::info!("CSV logs: {}", config.logging.log_dir);

    run_gui(config)
}

/// Load configuration from file or use default
fn load_config() -> Config {
    // Try to load from common locations
    let paths = ["config.yaml", "flappy.yaml", "../config.yaml"];

    match Config::load_first(&paths, |path, e| eprintln!("Ignoring {}: {}", path.display(), e)) {
        Some((path, config)) => {
            eprintln!("Loaded config from: {}", path.display());
            config
        }
        None => Config::default(),
    }
}
