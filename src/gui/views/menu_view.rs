//! Start menu.

use egui::{RichText, Ui};

use crate::session::{MenuChoice, Mode};

/// Mode picker with the last session's report underneath
#[derive(Default)]
pub struct MenuView {
    last_report: Option<String>,
}

impl MenuView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_report(&mut self, report: String) {
        self.last_report = Some(report);
    }

    /// Render the menu and return the clicked choice, if any
    pub fn show(&mut self, ui: &mut Ui) -> Option<MenuChoice> {
        let mut choice = None;

        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading(RichText::new("FLAPPY-EVO").size(40.0));
            ui.add_space(30.0);

            for mode in Mode::ALL {
                let label = format!("[{}]  {}", mode.key(), mode.label());
                if ui.button(RichText::new(label).size(20.0)).clicked() {
                    choice = Some(MenuChoice::Start(mode));
                }
                ui.add_space(8.0);
            }
            if ui.button(RichText::new("[Q]  Quit").size(20.0)).clicked() {
                choice = Some(MenuChoice::Quit);
            }

            ui.add_space(20.0);
            ui.label("Space flaps in manual play. Esc returns to this menu.");

            if let Some(report) = &self.last_report {
                ui.add_space(30.0);
                ui.separator();
                ui.label(RichText::new(report).monospace());
            }
        });

        choice
    }
}
