//! Caller-side game state: the current grid and score, level progression,
//! best results and an undo history of immutable snapshots.
//!
//! The engine itself never keeps state between calls; `Game` is the one place
//! that sequences moves, spawns and bookkeeping for a single player.

use std::collections::VecDeque;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{self as GameEngine, DEFAULT_SIZE, Grid, Level, Move, Score, Tile};

/// Knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub grid_size: usize,
    /// Maximum number of undo snapshots kept; `None` keeps everything.
    pub undo_limit: Option<usize>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_SIZE,
            undo_limit: None,
        }
    }
}

/// Results that outlive a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Records {
    pub high_score: Score,
    pub best_tile: Tile,
    pub level: Level,
}

impl Default for Records {
    fn default() -> Self {
        Self {
            high_score: 0,
            best_tile: 2,
            level: 1,
        }
    }
}

/// Pre-move state kept for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Grid,
    pub score: Score,
}

/// Whole-game state as handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub grid: Grid,
    pub score: Score,
    pub level: Level,
}

/// What happened during one call to [`Game::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnReport {
    pub changed: bool,
    /// Score earned by merges during this move.
    pub gained: Score,
    pub new_high_score: bool,
    pub best_tile_raised: bool,
    /// New level when the target tile was reached on this move.
    pub level_up: Option<Level>,
    pub game_over: bool,
}

#[derive(Debug, Clone)]
pub struct Game {
    settings: GameSettings,
    grid: Grid,
    score: Score,
    records: Records,
    history: VecDeque<Snapshot>,
    over: bool,
}

impl Game {
    /// Start a fresh game carrying over `records` from earlier play.
    pub fn new<R: Rng + ?Sized>(settings: GameSettings, records: Records, rng: &mut R) -> Self {
        let grid = GameEngine::initialize_grid(settings.grid_size, rng);
        let over = grid.is_game_over();
        Self {
            settings,
            grid,
            score: 0,
            records: Records {
                level: records.level.max(1),
                ..records
            },
            history: VecDeque::new(),
            over,
        }
    }

    /// Continue a previously saved game. The saved level wins over the one in
    /// `records`, and records are raised to cover the saved grid and score.
    pub fn resume(settings: GameSettings, records: Records, saved: SavedGame) -> Self {
        let records = Records {
            high_score: records.high_score.max(saved.score),
            best_tile: records.best_tile.max(saved.grid.highest_tile()),
            level: saved.level.max(1),
        };
        let over = saved.grid.is_game_over();
        Self {
            settings: GameSettings {
                grid_size: saved.grid.size(),
                ..settings
            },
            grid: saved.grid,
            score: saved.score,
            records,
            history: VecDeque::new(),
            over,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn level(&self) -> Level {
        self.records.level
    }

    /// Tile needed to clear the current level.
    pub fn target(&self) -> Tile {
        GameEngine::get_target_for_level(self.records.level)
    }

    pub fn records(&self) -> Records {
        self.records
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Apply one player move. Unchanged moves spawn nothing and leave the
    /// history alone; a finished game ignores input until undo or reset.
    pub fn apply_move<R: Rng + ?Sized>(&mut self, direction: Move, rng: &mut R) -> TurnReport {
        if self.over {
            return TurnReport {
                game_over: true,
                ..TurnReport::default()
            };
        }
        let outcome = GameEngine::move_grid(&self.grid, direction, self.score);
        if !outcome.changed {
            debug!("move {direction} left the grid unchanged");
            return TurnReport::default();
        }

        let previous = std::mem::replace(&mut self.grid, outcome.grid.with_random_tile(rng));
        self.push_history(Snapshot {
            grid: previous,
            score: self.score,
        });
        let gained = outcome.score - self.score;
        self.score = outcome.score;
        debug!("move {direction}: +{gained} (score {})", self.score);

        let mut report = TurnReport {
            changed: true,
            gained,
            ..TurnReport::default()
        };

        if self.score > self.records.high_score {
            self.records.high_score = self.score;
            report.new_high_score = true;
        }
        let highest = self.grid.highest_tile();
        if highest > self.records.best_tile {
            self.records.best_tile = highest;
            report.best_tile_raised = true;
        }

        let target = self.target();
        if GameEngine::has_reached_target(&self.grid, target) {
            self.records.level += 1;
            info!("reached {target}, advancing to level {}", self.records.level);
            report.level_up = Some(self.records.level);
        }

        if self.grid.is_game_over() {
            self.over = true;
            info!("game over with score {}", self.score);
            report.game_over = true;
        }
        report
    }

    /// Restore the state before the last accepted move. Returns false when
    /// there is nothing to undo. Level and records stay where they are.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(snapshot) => {
                self.grid = snapshot.grid;
                self.score = snapshot.score;
                self.over = false;
                true
            }
            None => false,
        }
    }

    /// Begin a new game on a fresh grid, keeping level and records.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid = GameEngine::initialize_grid(self.settings.grid_size, rng);
        self.score = 0;
        self.history.clear();
        self.over = self.grid.is_game_over();
    }

    pub fn saved(&self) -> SavedGame {
        SavedGame {
            grid: self.grid.clone(),
            score: self.score,
            level: self.records.level,
        }
    }

    fn push_history(&mut self, snapshot: Snapshot) {
        if self.settings.undo_limit == Some(0) {
            return;
        }
        self.history.push_back(snapshot);
        if let Some(limit) = self.settings.undo_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }
}
