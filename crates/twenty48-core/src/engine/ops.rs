use rand::Rng;

use super::state::{Grid, Move, Score, Tile};

/// Result of compacting/merging a single row or column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub line: Vec<Tile>,
    pub score: Score,
    pub changed: bool,
}

/// Result of applying one move to the whole grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub grid: Grid,
    pub score: Score,
    pub changed: bool,
}

/// Fresh `size` x `size` grid holding two spawned tiles.
///
/// ```
/// use twenty48_core::engine::{self as GameEngine, DEFAULT_SIZE};
/// use rand::{SeedableRng, rngs::StdRng};
/// let mut rng = StdRng::seed_from_u64(7);
/// let g = GameEngine::initialize_grid(DEFAULT_SIZE, &mut rng);
/// assert_eq!(g.cells().filter(|&v| v != 0).count(), 2);
/// ```
pub fn initialize_grid<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Grid {
    let grid = Grid::empty(size);
    let grid = spawn_tile(grid, rng);
    spawn_tile(grid, rng)
}

/// Place a 2 (90%) or 4 (10%) into an empty cell chosen uniformly among the
/// empty cells in row-major order. A full grid is returned as is.
pub fn spawn_tile<R: Rng + ?Sized>(mut grid: Grid, rng: &mut R) -> Grid {
    let empty: Vec<(usize, usize)> = grid
        .0
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v == 0)
                .map(move |(c, _)| (r, c))
        })
        .collect();
    if empty.is_empty() {
        return grid;
    }
    let (r, c) = empty[rng.gen_range(0..empty.len())];
    grid.0[r][c] = generate_random_tile(rng);
    grid
}

pub(crate) fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile {
    if rng.gen_range(0..10) < 9 { 2 } else { 4 }
}

/// Slide a line toward index 0 and merge equal neighbours in one pass.
///
/// Zeros are dropped first, then the compacted tiles are scanned left to
/// right; a tile equal to the next compacted tile merges with it and both are
/// consumed. Merged tiles are never reconsidered, so `[2, 2, 2, 2]` gives
/// `[4, 4, 0, 0]` rather than `[8, 0, 0, 0]`.
///
/// ```
/// use twenty48_core::engine::process_line;
/// let out = process_line(&[2, 2, 2, 2], 0);
/// assert_eq!(out.line, vec![4, 4, 0, 0]);
/// assert_eq!(out.score, 8);
/// assert!(out.changed);
/// ```
pub fn process_line(line: &[Tile], score: Score) -> LineOutcome {
    let non_zero: Vec<Tile> = line.iter().copied().filter(|&v| v != 0).collect();
    let mut merged = Vec::with_capacity(line.len());
    let mut score = score;
    let mut changed = false;

    let mut i = 0;
    while i < non_zero.len() {
        let tile = non_zero[i];
        // A pair whose double does not fit in a tile stays unmerged.
        let doubled = (non_zero.get(i + 1) == Some(&tile))
            .then(|| tile.checked_mul(2))
            .flatten();
        if let Some(doubled) = doubled {
            merged.push(doubled);
            score = score.saturating_add(doubled);
            changed = true;
            i += 2;
        } else {
            merged.push(tile);
            i += 1;
        }
    }
    merged.resize(line.len(), 0);

    if merged.as_slice() != line {
        changed = true;
    }
    LineOutcome {
        line: merged,
        score,
        changed,
    }
}

/// Slide/merge every row or column in `direction`, accumulating onto `score`.
///
/// The input grid is left untouched. No tile is spawned; callers do that
/// themselves when `changed` is set.
pub fn move_grid(grid: &Grid, direction: Move, score: Score) -> MoveOutcome {
    match direction {
        Move::Left | Move::Right => shift_rows(grid, direction, score),
        Move::Up | Move::Down => shift_cols(grid, direction, score),
    }
}

fn shift_rows(grid: &Grid, direction: Move, score: Score) -> MoveOutcome {
    let reverse = match direction {
        Move::Left => false,
        Move::Right => true,
        _ => unreachable!("shift_rows only handles left/right"),
    };
    let mut rows = Vec::with_capacity(grid.size());
    let mut score = score;
    let mut changed = false;
    for row in grid.rows() {
        let out = process_oriented(row.clone(), reverse, score);
        score = out.score;
        changed |= out.changed;
        rows.push(out.line);
    }
    MoveOutcome {
        grid: Grid(rows),
        score,
        changed,
    }
}

fn shift_cols(grid: &Grid, direction: Move, score: Score) -> MoveOutcome {
    let reverse = match direction {
        Move::Up => false,
        Move::Down => true,
        _ => unreachable!("shift_cols only handles up/down"),
    };
    let size = grid.size();
    let mut new_grid = Grid::empty(size);
    let mut score = score;
    let mut changed = false;
    for col in 0..size {
        let column: Vec<Tile> = grid.rows().iter().map(|row| row[col]).collect();
        let out = process_oriented(column, reverse, score);
        score = out.score;
        changed |= out.changed;
        for (row, value) in out.line.into_iter().enumerate() {
            new_grid.0[row][col] = value;
        }
    }
    MoveOutcome {
        grid: new_grid,
        score,
        changed,
    }
}

/// Run `process_line` with the line flipped when the move heads toward the
/// far end, flipping the result back afterwards.
fn process_oriented(mut line: Vec<Tile>, reverse: bool, score: Score) -> LineOutcome {
    if reverse {
        line.reverse();
    }
    let mut out = process_line(&line, score);
    if reverse {
        out.line.reverse();
    }
    out
}

/// True when the grid is full and no two orthogonal neighbours are equal.
pub fn is_game_over(grid: &Grid) -> bool {
    if grid.cells().any(|v| v == 0) {
        return false;
    }
    let rows = grid.rows();
    let horizontal = rows
        .iter()
        .any(|row| row.windows(2).any(|pair| pair[0] == pair[1]));
    if horizontal {
        return false;
    }
    let vertical = rows.windows(2).any(|pair| {
        pair[0]
            .iter()
            .zip(pair[1].iter())
            .any(|(above, below)| above == below)
    });
    !vertical
}

/// Directions that would change the grid.
pub fn legal_moves(grid: &Grid) -> Vec<Move> {
    Move::ALL
        .into_iter()
        .filter(|&m| move_grid(grid, m, 0).changed)
        .collect()
}

/// Highest tile value on the grid, 0 when every cell is empty.
pub fn get_highest_tile(grid: &Grid) -> Tile {
    grid.cells().max().unwrap_or(0)
}

/// True when any cell holds `target` or more.
pub fn has_reached_target(grid: &Grid, target: Tile) -> bool {
    grid.cells().any(|v| v >= target)
}

/// Count the number of zero tiles.
pub fn count_empty(grid: &Grid) -> usize {
    grid.cells().filter(|&v| v == 0).count()
}
