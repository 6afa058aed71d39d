//! GUI view components.

mod game_view;
mod menu_view;

pub use game_view::GameView;
pub use menu_view::MenuView;
