//! Engine module: the square tile grid, line compaction/merge, directional
//! moves, random spawning and the level/target math.
//!
//! - `Grid` is the immutable-in/immutable-out board value.
//! - Free functions are the primary API; `Grid` methods mirror the common ones.
//! - Randomness always comes from a caller-supplied `rand::Rng`.

mod level;
mod ops;
pub mod state;

pub use state::{DEFAULT_SIZE, Grid, Level, Move, Score, Tile};

pub use level::{BASE_TARGET, get_target_for_level};
pub use ops::{
    LineOutcome, MoveOutcome, count_empty, get_highest_tile, has_reached_target, initialize_grid,
    is_game_over, legal_moves, move_grid, process_line, spawn_tile,
};
