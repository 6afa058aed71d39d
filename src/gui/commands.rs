//! Commands and messages exchanged with the game thread.

use crate::session::Mode;

use super::snapshot::FrameSnapshot;

/// Commands sent from the GUI to the game thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    /// Start a session in the given mode
    Start(Mode),
    /// Flap the manual bird
    Jump,
    /// Abort the running session and return to the menu
    Quit,
    /// Shutdown the game thread
    Shutdown,
}

/// Messages sent from the game thread to the GUI
#[derive(Debug, Clone)]
pub enum GameMessage {
    /// A rendered tick
    Frame(FrameSnapshot),
    /// The session ended; carries the printable report
    Finished(String),
}

/// What the game thread is doing, as seen from the GUI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    /// Waiting on the menu
    #[default]
    Menu,
    /// A session is running
    Playing(Mode),
    /// The thread has exited
    Stopped,
}
