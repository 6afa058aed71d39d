//! GUI module for FLAPPY-EVO.
//!
//! Provides a window for watching evolution and for manual play using
//! egui + eframe.
//!
//! ## Architecture
//!
//! The GUI runs in a separate thread from the game:
//! - **Game Thread**: runs one session at a time, paced at `logging.fps`
//! - **Render Thread**: runs egui and paints the latest frame
//!
//! Communication is done via channels:
//! - Commands (start, jump, quit) flow from GUI to the game thread
//! - Frame snapshots and session reports flow back
//!
//! ## Usage
//!
//! ```no_run
//! use flappy_evo::Config;
//! use flappy_evo::gui::run_gui;
//!
//! let config = Config::default();
//! run_gui(config).unwrap();
//! ```

mod app;
mod commands;
mod sim_thread;
mod snapshot;
mod views;

pub use app::{run_gui, FlappyApp};
pub use commands::{GameCommand, GameMessage, GameState};
pub use sim_thread::{ChannelInput, ChannelRenderer, SimulationHandle};
pub use snapshot::{BirdView, FrameSnapshot, PipeView};
