//! Game thread that runs sessions independently from the GUI.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::render::{Frame, InputEvent, InputSource, Presenter, Renderer, TickPacer};
use crate::session::{self, Mode};
use crate::world::StopSignal;

use super::commands::{GameCommand, GameMessage, GameState};
use super::snapshot::FrameSnapshot;

/// Handle for controlling the game thread
pub struct SimulationHandle {
    /// Thread handle
    thread: Option<JoinHandle<()>>,
    /// Channel to send commands to the game thread
    command_tx: Sender<GameCommand>,
    /// Channel to receive frames and reports
    message_rx: Receiver<GameMessage>,
    /// Aborts a running session without waiting for the next poll
    stop: StopSignal,
    /// Current state
    pub state: GameState,
}

impl SimulationHandle {
    /// Spawn a new game thread
    pub fn spawn(config: Config) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (message_tx, message_rx) = mpsc::channel();
        let stop = StopSignal::new();

        let thread_stop = stop.clone();
        let thread = thread::spawn(move || {
            run_games(config, command_rx, message_tx, thread_stop);
        });

        Self {
            thread: Some(thread),
            command_tx,
            message_rx,
            stop,
            state: GameState::Menu,
        }
    }

    /// Send a command to the game thread
    pub fn send(&mut self, command: GameCommand) {
        match command {
            GameCommand::Start(mode) if self.state == GameState::Menu => {
                self.state = GameState::Playing(mode)
            }
            GameCommand::Start(_) => return,
            GameCommand::Shutdown => {
                self.stop.stop();
                self.state = GameState::Stopped;
            }
            GameCommand::Jump | GameCommand::Quit => {}
        }
        let _ = self.command_tx.send(command);
    }

    /// Drain pending messages: the latest frame, plus the report if a session ended
    pub fn poll(&mut self) -> (Option<FrameSnapshot>, Option<String>) {
        let mut latest = None;
        let mut report = None;
        loop {
            match self.message_rx.try_recv() {
                Ok(GameMessage::Frame(snapshot)) => latest = Some(snapshot),
                Ok(GameMessage::Finished(text)) => {
                    report = Some(text);
                    latest = None;
                    if self.state != GameState::Stopped {
                        self.state = GameState::Menu;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.state = GameState::Stopped;
                    break;
                }
            }
        }
        (latest, report)
    }

    /// Check if a session is running
    pub fn is_playing(&self) -> bool {
        matches!(self.state, GameState::Playing(_))
    }

    /// Shutdown the game thread
    pub fn shutdown(&mut self) {
        self.send(GameCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sends every rendered tick to the GUI
pub struct ChannelRenderer {
    tx: Sender<GameMessage>,
    mode: Mode,
}

impl ChannelRenderer {
    pub fn new(tx: Sender<GameMessage>, mode: Mode) -> Self {
        Self { tx, mode }
    }
}

impl Renderer for ChannelRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        let _ = self.tx.send(GameMessage::Frame(FrameSnapshot::from_frame(frame, self.mode)));
    }
}

/// Turns GUI commands into input events during a session
pub struct ChannelInput {
    commands: Rc<Receiver<GameCommand>>,
    shutdown: Rc<Cell<bool>>,
}

impl ChannelInput {
    pub fn new(commands: Rc<Receiver<GameCommand>>, shutdown: Rc<Cell<bool>>) -> Self {
        Self { commands, shutdown }
    }
}

impl InputSource for ChannelInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        loop {
            match self.commands.try_recv() {
                Ok(GameCommand::Jump) => events.push(InputEvent::Jump),
                Ok(GameCommand::Quit) => events.push(InputEvent::Quit),
                Ok(GameCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    self.shutdown.set(true);
                    events.push(InputEvent::Quit);
                    break;
                }
                Ok(GameCommand::Start(mode)) => {
                    log::debug!("Ignoring start of {} while a session runs", mode)
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        events
    }
}

/// Main loop of the game thread: wait on the menu, run one session, repeat
fn run_games(
    config: Config,
    command_rx: Receiver<GameCommand>,
    message_tx: Sender<GameMessage>,
    stop: StopSignal,
) {
    let commands = Rc::new(command_rx);
    let shutdown = Rc::new(Cell::new(false));

    while !shutdown.get() {
        let mode = match commands.recv() {
            Ok(GameCommand::Start(mode)) => mode,
            Ok(GameCommand::Shutdown) | Err(_) => return,
            Ok(GameCommand::Jump) | Ok(GameCommand::Quit) => continue,
        };

        stop.reset();
        let presenter = Presenter::new(
            Box::new(ChannelRenderer::new(message_tx.clone(), mode)),
            Box::new(ChannelInput::new(Rc::clone(&commands), Rc::clone(&shutdown))),
            TickPacer::new(config.logging.fps),
        );

        let text = match session::run_mode(mode, &config, None, presenter, stop.clone()) {
            Ok(report) => {
                log::info!("{} finished", mode);
                report.to_string()
            }
            Err(e) => {
                log::error!("{} failed: {}", mode, e);
                format!("Run aborted: {}", e)
            }
        };
        if message_tx.send(GameMessage::Finished(text)).is_err() {
            return;
        }
    }
}
