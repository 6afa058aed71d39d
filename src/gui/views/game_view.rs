//! Side-scrolling playfield painter.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};

use crate::config::Config;
use crate::gui::snapshot::{BirdView, FrameSnapshot, PipeView};
use crate::session::Mode;

const SKY: Color32 = Color32::from_rgb(112, 197, 206);
const PIPE: Color32 = Color32::from_rgb(115, 191, 46);
const PIPE_EDGE: Color32 = Color32::from_rgb(84, 56, 71);
const GROUND: Color32 = Color32::from_rgb(222, 216, 149);
const GRASS: Color32 = Color32::from_rgb(94, 226, 112);
const BIRD: Color32 = Color32::from_rgb(250, 200, 40);
const BEAK: Color32 = Color32::from_rgb(245, 105, 40);

/// Pipe lip height in world pixels
const LIP: f32 = 48.0;
const STRIPE: f32 = 24.0;

/// Draws a [`FrameSnapshot`] scaled to the available space
pub struct GameView {
    width: f32,
    height: f32,
    /// Outline pipes that were already scored
    pub highlight_passed: bool,
}

impl GameView {
    pub fn new(config: &Config) -> Self {
        Self {
            width: config.world.width,
            height: config.world.height,
            highlight_passed: false,
        }
    }

    /// Paint the playfield and return whether it was clicked
    pub fn show(&mut self, ui: &mut Ui, snapshot: &FrameSnapshot) -> bool {
        let available = ui.available_size();
        let scale = (available.x / self.width).min(available.y / self.height).max(0.1);
        let size = Vec2::new(self.width * scale, self.height * scale);

        let (response, painter) = ui.allocate_painter(available, Sense::click());
        let origin = response.rect.center() - size / 2.0;
        let view = Projection { origin, scale };

        painter.rect_filled(Rect::from_min_size(origin, size), 0.0, SKY);

        for pipe in &snapshot.pipes {
            self.draw_pipe(&painter, &view, pipe, snapshot.floor_y);
        }
        self.draw_floor(&painter, &view, snapshot);
        for bird in &snapshot.birds {
            draw_bird(&painter, &view, bird);
        }

        // Score
        painter.text(
            view.point(self.width / 2.0, 40.0),
            Align2::CENTER_CENTER,
            snapshot.score.to_string(),
            FontId::proportional(48.0 * scale),
            Color32::WHITE,
        );

        if snapshot.mode != Mode::Manual {
            painter.text(
                view.point(10.0, self.height - 20.0),
                Align2::LEFT_CENTER,
                format!(
                    "Gen {}  Alive {}/{}",
                    snapshot.generation, snapshot.alive, snapshot.population
                ),
                FontId::monospace(22.0 * scale),
                Color32::BLACK,
            );
        }

        response.clicked()
    }

    fn draw_pipe(&self, painter: &egui::Painter, view: &Projection, pipe: &PipeView, floor_y: f32) {
        let stroke = if self.highlight_passed && pipe.passed {
            Stroke::new(2.0, Color32::WHITE)
        } else {
            Stroke::new(1.0, PIPE_EDGE)
        };

        let top = view.rect(pipe.x + 4.0, 0.0, pipe.x + pipe.width - 4.0, pipe.gap_top);
        let bottom = view.rect(pipe.x + 4.0, pipe.gap_bottom, pipe.x + pipe.width - 4.0, floor_y);
        let top_lip = view.rect(pipe.x, pipe.gap_top - LIP, pipe.x + pipe.width, pipe.gap_top);
        let bottom_lip = view.rect(pipe.x, pipe.gap_bottom, pipe.x + pipe.width, pipe.gap_bottom + LIP);

        for rect in [top, bottom, top_lip, bottom_lip] {
            painter.rect_filled(rect, 0.0, PIPE);
            painter.rect_stroke(rect, 0.0, stroke);
        }
    }

    fn draw_floor(&self, painter: &egui::Painter, view: &Projection, snapshot: &FrameSnapshot) {
        let y = snapshot.floor_y;
        painter.rect_filled(view.rect(0.0, y, self.width, self.height), 0.0, GROUND);
        painter.rect_filled(view.rect(0.0, y, self.width, y + 6.0), 0.0, GRASS);

        // Stripes scroll with both tiles
        let stripe = Stroke::new(3.0 * view.scale, Color32::from_rgb(160, 210, 80));
        for &tile_x in &snapshot.floor_x {
            let mut x = tile_x;
            while x < tile_x + snapshot.floor_tile_width {
                if x > -STRIPE && x < self.width {
                    painter.line_segment([view.point(x, y + 14.0), view.point(x + STRIPE / 2.0, y + 6.0)], stripe);
                }
                x += STRIPE;
            }
        }
    }
}

/// World to screen mapping
struct Projection {
    origin: Pos2,
    scale: f32,
}

impl Projection {
    fn point(&self, x: f32, y: f32) -> Pos2 {
        self.origin + Vec2::new(x, y) * self.scale
    }

    fn rect(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        Rect::from_min_max(self.point(x0, y0), self.point(x1, y1))
    }
}

fn draw_bird(painter: &egui::Painter, view: &Projection, bird: &BirdView) {
    let center = view.point(bird.x + bird.width / 2.0, bird.y + bird.height / 2.0);
    let radius = bird.height / 2.0 * view.scale;

    // Nose up is a positive tilt; screen y grows downwards
    let angle = bird.tilt.to_radians();
    let forward = Vec2::new(angle.cos(), -angle.sin());
    let up = Vec2::new(forward.y, -forward.x);

    painter.circle_filled(center, radius, BIRD);
    painter.circle_stroke(center, radius, Stroke::new(1.5, Color32::BLACK));

    painter.line_segment(
        [center + forward * radius * 0.7, center + forward * radius * 1.4],
        Stroke::new(radius * 0.35, BEAK),
    );

    let eye = center + forward * radius * 0.45 + up * radius * 0.35;
    painter.circle_filled(eye, radius * 0.18, Color32::WHITE);
    painter.circle_filled(eye + forward * radius * 0.06, radius * 0.08, Color32::BLACK);

    let wing_lift = match bird.wing_frame {
        0 => 0.35,
        1 => 0.0,
        _ => -0.35,
    };
    let wing = center - forward * radius * 0.35 + up * radius * wing_lift;
    painter.circle_filled(wing, radius * 0.32, Color32::from_rgb(255, 240, 200));
}
