use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Result, anyhow};
use log::{info, warn};
use rand::Rng;
use twenty48_core::engine::Move;
use twenty48_core::session::{Game, GameSettings, TurnReport};
use twenty48_core::store::{KeyValueStore, Persistence};

const HELP: &str = "moves: w/a/s/d or up/left/down/right; u = undo, r = new game, q = quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Move(Move),
    Undo,
    Reset,
    Quit,
    Help,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u" | "undo" => Ok(Command::Undo),
            "r" | "reset" | "new" => Ok(Command::Reset),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            "h" | "help" | "?" => Ok(Command::Help),
            other => other
                .parse::<Move>()
                .map(Command::Move)
                .map_err(|_| anyhow!("unknown command {other:?}")),
        }
    }
}

/// Totals for one interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaySummary {
    pub moves: u64,
    pub undos: u64,
    pub final_score: u64,
}

/// Drive a game from line-oriented `input`, echoing the board to `out` and
/// keeping `persistence` in step with every accepted change.
pub fn run<S, I, W, R>(
    settings: GameSettings,
    persistence: &mut Persistence<S>,
    rng: &mut R,
    input: I,
    out: &mut W,
) -> Result<PlaySummary>
where
    S: KeyValueStore,
    I: BufRead,
    W: Write,
    R: Rng + ?Sized,
{
    let records = persistence.load_records();
    let mut game = match persistence.load_game_state() {
        Some(saved) if saved.grid.size() >= 2 => {
            info!("resuming saved game (score {})", saved.score);
            Game::resume(settings, records, saved)
        }
        _ => Game::new(settings, records, rng),
    };
    let mut summary = PlaySummary::default();

    writeln!(out, "{HELP}")?;
    render(&game, out)?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(err) => {
                writeln!(out, "{err}; {HELP}")?;
                continue;
            }
        };
        match command {
            Command::Move(dir) => {
                let report = game.apply_move(dir, rng);
                if report.changed {
                    summary.moves += 1;
                    persist(&game, &report, persistence);
                }
                announce(&game, &report, out)?;
            }
            Command::Undo => {
                if game.undo() {
                    summary.undos += 1;
                    persistence.save_game_state(&game.saved());
                } else {
                    writeln!(out, "nothing to undo")?;
                }
            }
            Command::Reset => {
                game.reset(rng);
                persistence.save_game_state(&game.saved());
            }
            Command::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            Command::Quit => break,
        }
        render(&game, out)?;
    }

    if !persistence.save_records(&game.records()) || !persistence.save_game_state(&game.saved()) {
        warn!("progress could not be saved");
    }
    summary.final_score = game.score();
    Ok(summary)
}

fn persist<S: KeyValueStore>(game: &Game, report: &TurnReport, persistence: &mut Persistence<S>) {
    let records = game.records();
    if report.new_high_score {
        persistence.save_high_score(records.high_score);
    }
    if report.best_tile_raised {
        persistence.save_best_tile(records.best_tile);
    }
    if report.level_up.is_some() {
        persistence.save_current_level(records.level);
    }
    persistence.save_game_state(&game.saved());
}

fn announce<W: Write>(game: &Game, report: &TurnReport, out: &mut W) -> Result<()> {
    if let Some(level) = report.level_up {
        writeln!(out, "Congratulations! You advanced to level {level}!")?;
    }
    if report.game_over {
        writeln!(
            out,
            "Game over. Your score: {}. Type r for a new game or u to undo.",
            game.score()
        )?;
    }
    Ok(())
}

fn render<W: Write>(game: &Game, out: &mut W) -> Result<()> {
    let records = game.records();
    writeln!(
        out,
        "Score {} | Best {} | Level {} | Target {} | Best tile {}",
        game.score(),
        records.high_score,
        records.level,
        game.target(),
        records.best_tile
    )?;
    write!(out, "{}", game.grid())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use twenty48_core::engine::Grid;
    use twenty48_core::session::SavedGame;
    use twenty48_core::store::MemoryStore;

    #[test]
    fn parses_commands() {
        assert_eq!("u".parse::<Command>().unwrap(), Command::Undo);
        assert_eq!("R".parse::<Command>().unwrap(), Command::Reset);
        assert_eq!("a".parse::<Command>().unwrap(), Command::Move(Move::Left));
        assert_eq!("down".parse::<Command>().unwrap(), Command::Move(Move::Down));
        assert!("jump".parse::<Command>().is_err());
    }

    #[test]
    fn resumes_plays_and_saves() {
        let mut persistence = Persistence::new(MemoryStore::new());
        let saved = SavedGame {
            grid: Grid::from_rows(vec![
                vec![512, 512, 0, 0],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0],
            ])
            .unwrap(),
            score: 100,
            level: 1,
        };
        assert!(persistence.save_game_state(&saved));

        let mut rng = StdRng::seed_from_u64(8);
        let mut out = Vec::new();
        let input = "a\nbogus\nu\na\nq\nd\n".as_bytes();
        let summary = run(
            GameSettings::default(),
            &mut persistence,
            &mut rng,
            input,
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.moves, 2);
        assert_eq!(summary.undos, 1);
        assert_eq!(summary.final_score, 1124);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("advanced to level 2"));
        assert!(text.contains("unknown command"));

        assert_eq!(persistence.load_high_score(), 1124);
        assert_eq!(persistence.load_best_tile(), 1024);
        assert_eq!(persistence.load_current_level(), 2);
        let stored = persistence.load_game_state().unwrap();
        assert_eq!(stored.score, 1124);
        assert_eq!(stored.grid.get(0, 0), Some(1024));
    }
}
