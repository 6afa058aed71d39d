//! Game modes and the manual play loop.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::controller::ManualController;
use crate::evolution::{Population, RunSummary};
use crate::neat::{NeatRunner, NeatSummary};
use crate::records::CsvLog;
use crate::render::{InputEvent, Presenter};
use crate::world::{EndReason, StopSignal, World, WorldError};

/// What the player chose to watch or play
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// NEAT networks
    Neat,
    /// Evolved linear controllers
    Evolve,
    /// A human with the jump key
    Manual,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Neat, Mode::Evolve, Mode::Manual];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Neat => "NEAT",
            Mode::Evolve => "Evolutionary algorithm",
            Mode::Manual => "Manual play",
        }
    }

    /// Menu key that selects this mode
    pub fn key(&self) -> char {
        match self {
            Mode::Neat => '1',
            Mode::Evolve => '2',
            Mode::Manual => '3',
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A menu selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    Start(Mode),
    Quit,
}

/// Map a menu key press to a choice
pub fn menu_choice(key: char) -> Option<MenuChoice> {
    match key.to_ascii_lowercase() {
        'q' => Some(MenuChoice::Quit),
        k => Mode::ALL
            .into_iter()
            .find(|m| m.key() == k)
            .map(MenuChoice::Start),
    }
}

/// Result of a manual game
#[derive(Clone, Debug, PartialEq)]
pub struct ManualSummary {
    pub score: u32,
    pub ticks: u64,
    pub jumps: u32,
    pub reason: EndReason,
}

impl fmt::Display for ManualSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game over ({}): score {} after {} ticks, {} jumps",
            self.reason, self.score, self.ticks, self.jumps
        )
    }
}

/// Play one game with a single human-controlled bird.
///
/// Every `Jump` event makes the bird jump once, even if several arrive in
/// the same tick. `Quit` ends the game before the next tick.
pub fn run_manual(
    config: &Config,
    seed: u64,
    presenter: &mut Presenter,
    stop: &StopSignal,
) -> Result<ManualSummary, WorldError> {
    let mut world = World::new_with_seed(config.clone(), 1, seed)
        .with_stop_score(None)
        .with_stop_signal(stop.clone());
    let mut controllers = [ManualController];
    let mut jumps = 0;

    while !world.is_ended() {
        for event in presenter.input.poll() {
            match event {
                InputEvent::Jump => {
                    if world.jump(0) {
                        jumps += 1;
                    }
                }
                InputEvent::Quit => stop.stop(),
                InputEvent::Select(_) => {}
            }
        }
        world.step(&mut controllers)?;
        presenter.renderer.render(&world.frame());
        presenter.pacer.wait();
    }

    let summary = world.summary();
    Ok(ManualSummary {
        score: summary.score,
        ticks: summary.ticks,
        jumps,
        reason: summary.reason,
    })
}

/// Outcome of any mode
#[derive(Clone, Debug)]
pub enum SessionReport {
    Neat(NeatSummary),
    Evolve(RunSummary),
    Manual(ManualSummary),
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionReport::Neat(s) => write!(f, "{}", s),
            SessionReport::Evolve(s) => write!(f, "{}", s),
            SessionReport::Manual(s) => write!(f, "{}", s),
        }
    }
}

/// Run `mode` to completion with CSV logging into `config.logging.log_dir`
pub fn run_mode(
    mode: Mode,
    config: &Config,
    seed: Option<u64>,
    mut presenter: Presenter,
    stop: StopSignal,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let logging = &config.logging;
    log::info!("Starting {} (seed {})", mode, seed);

    let report = match mode {
        Mode::Evolve => {
            let mut population = Population::new_with_seed(config.clone(), seed)?
                .with_presenter(presenter)
                .with_log(CsvLog::in_dir(&logging.log_dir, &logging.evolve_file))
                .with_stop_signal(stop);
            SessionReport::Evolve(population.run(config.evolution.max_generations))
        }
        Mode::Neat => {
            let mut runner = NeatRunner::new_with_seed(config.clone(), seed)?
                .with_presenter(presenter)
                .with_log(CsvLog::in_dir(&logging.log_dir, &logging.neat_file))
                .with_stop_signal(stop);
            SessionReport::Neat(runner.run(config.neat.max_generations))
        }
        Mode::Manual => SessionReport::Manual(run_manual(config, seed, &mut presenter, &stop)?),
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{NullRenderer, ScriptedInput, TickPacer};

    fn scripted(ticks: Vec<Vec<InputEvent>>) -> Presenter {
        Presenter::new(
            Box::new(NullRenderer),
            Box::new(ScriptedInput::new(ticks)),
            TickPacer::unpaced(),
        )
    }

    #[test]
    fn test_menu_keys() {
        assert_eq!(menu_choice('1'), Some(MenuChoice::Start(Mode::Neat)));
        assert_eq!(menu_choice('2'), Some(MenuChoice::Start(Mode::Evolve)));
        assert_eq!(menu_choice('3'), Some(MenuChoice::Start(Mode::Manual)));
        assert_eq!(menu_choice('Q'), Some(MenuChoice::Quit));
        assert_eq!(menu_choice('q'), Some(MenuChoice::Quit));
        assert_eq!(menu_choice('x'), None);
    }

    #[test]
    fn test_idle_player_hits_floor() {
        let mut presenter = scripted(vec![]);
        let summary = run_manual(&Config::default(), 1, &mut presenter, &StopSignal::new()).unwrap();
        assert_eq!(summary.reason, EndReason::Extinct);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.jumps, 0);
    }

    #[test]
    fn test_every_jump_event_counts() {
        let mut presenter = scripted(vec![
            vec![InputEvent::Jump, InputEvent::Jump],
            vec![],
            vec![InputEvent::Jump],
        ]);
        let summary = run_manual(&Config::default(), 1, &mut presenter, &StopSignal::new()).unwrap();
        assert_eq!(summary.jumps, 3);
    }

    #[test]
    fn test_quit_ends_game() {
        let mut presenter = scripted(vec![vec![], vec![], vec![InputEvent::Quit]]);
        let summary = run_manual(&Config::default(), 1, &mut presenter, &StopSignal::new()).unwrap();
        assert_eq!(summary.reason, EndReason::Cancelled);
        assert_eq!(summary.ticks, 2);
    }
}
