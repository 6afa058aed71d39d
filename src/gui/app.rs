//! Main GUI application.

use eframe::egui;

use crate::config::Config;
use crate::session::{menu_choice, MenuChoice};

use super::commands::{GameCommand, GameState};
use super::sim_thread::SimulationHandle;
use super::snapshot::FrameSnapshot;
use super::views::{GameView, MenuView};

/// Menu keys and the characters the menu understands
const MENU_KEYS: [(egui::Key, char); 4] = [
    (egui::Key::Num1, '1'),
    (egui::Key::Num2, '2'),
    (egui::Key::Num3, '3'),
    (egui::Key::Q, 'q'),
];

/// Main application state
pub struct FlappyApp {
    /// Game thread handle
    sim_handle: SimulationHandle,
    /// Latest rendered tick
    snapshot: Option<FrameSnapshot>,
    game_view: GameView,
    menu_view: MenuView,
}

impl FlappyApp {
    /// Create a new application with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            game_view: GameView::new(&config),
            menu_view: MenuView::new(),
            sim_handle: SimulationHandle::spawn(config),
            snapshot: None,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    fn apply_choice(&mut self, ctx: &egui::Context, choice: MenuChoice) {
        match choice {
            MenuChoice::Start(mode) => {
                self.snapshot = None;
                self.sim_handle.send(GameCommand::Start(mode));
            }
            MenuChoice::Quit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
        }
    }
}

impl eframe::App for FlappyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll for new frames and finished sessions
        let (frame, report) = self.sim_handle.poll();
        if let Some(frame) = frame {
            self.snapshot = Some(frame);
        }
        if let Some(report) = report {
            self.snapshot = None;
            self.menu_view.set_report(report);
        }

        // Keyboard
        let (jump, escape, menu_key) = ctx.input(|i| {
            let menu_key = MENU_KEYS
                .iter()
                .find(|(key, _)| i.key_pressed(*key))
                .map(|&(_, c)| c);
            (i.key_pressed(egui::Key::Space), i.key_pressed(egui::Key::Escape), menu_key)
        });

        match self.sim_handle.state {
            GameState::Playing(_) => {
                if jump {
                    self.sim_handle.send(GameCommand::Jump);
                }
                if escape {
                    self.sim_handle.send(GameCommand::Quit);
                }
            }
            GameState::Menu => {
                if let Some(choice) = menu_key.and_then(menu_choice) {
                    self.apply_choice(ctx, choice);
                }
            }
            GameState::Stopped => {}
        }

        // Request repaint while a session runs
        if self.sim_handle.is_playing() {
            ctx.request_repaint();
        }

        let state = self.sim_handle.state;
        egui::CentralPanel::default().show(ctx, |ui| match state {
            GameState::Menu => {
                if let Some(choice) = self.menu_view.show(ui) {
                    self.apply_choice(ctx, choice);
                }
            }
            GameState::Playing(_) => {
                if let Some(ref snapshot) = self.snapshot {
                    // Clicking the playfield flaps too
                    if self.game_view.show(ui, snapshot) {
                        self.sim_handle.send(GameCommand::Jump);
                    }
                } else {
                    ui.centered_and_justified(|ui| {
                        ui.label("Loading...");
                    });
                }
            }
            GameState::Stopped => {
                ui.centered_and_justified(|ui| {
                    ui.label("Game thread stopped.");
                });
            }
        });

        // Bottom status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match (&self.snapshot, state) {
                    (Some(snapshot), GameState::Playing(mode)) => {
                        ui.label(format!(
                            "{} | Tick: {} | Gen: {} | Score: {} | Alive: {}",
                            mode, snapshot.time, snapshot.generation, snapshot.score, snapshot.alive
                        ));
                    }
                    (_, state) => {
                        ui.label(format!("State: {:?}", state));
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label("FLAPPY-EVO");
                });
            });
        });
    }
}

/// Run the GUI application
pub fn run_gui(config: Config) -> eframe::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.world.width, config.world.height + 30.0])
            .with_min_inner_size([250.0, 400.0])
            .with_title("FLAPPY-EVO"),
        ..Default::default()
    };

    eframe::run_native(
        "FLAPPY-EVO",
        native_options,
        Box::new(|_cc| Box::new(FlappyApp::new(config))),
    )
}
