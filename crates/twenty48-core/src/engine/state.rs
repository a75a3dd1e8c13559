use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ops;

/// Value held by a single cell: 0 for empty, otherwise a power of two.
pub type Tile = u64;
/// Running score, increased by the value of every merged tile.
pub type Score = u64;
/// Level number, starting at 1.
pub type Level = u32;

/// Side length used when the caller does not ask for anything else.
pub const DEFAULT_SIZE: usize = 4;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn opposite(self) -> Self {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Move {
    type Err = anyhow::Error;

    /// Accepts full names as well as the usual `w/a/s/d` keys.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Move::Up),
            "down" | "s" => Ok(Move::Down),
            "left" | "a" => Ok(Move::Left),
            "right" | "d" => Ok(Move::Right),
            other => Err(anyhow!("unknown direction {other:?}")),
        }
    }
}

/// Square grid of tiles stored as rows, top to bottom.
///
/// A `Grid` is a plain value: every engine operation returns a new grid and
/// leaves its input untouched, so callers can keep old grids around for undo.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Tile>>", into = "Vec<Vec<Tile>>")]
pub struct Grid(pub(crate) Vec<Vec<Tile>>);

impl Grid {
    /// An all-empty `size` x `size` grid.
    pub fn empty(size: usize) -> Self {
        Grid(vec![vec![0; size]; size])
    }

    /// Build a grid from explicit rows, rejecting anything that is not square
    /// or holds a value that is neither 0 nor a power of two.
    ///
    /// ```
    /// use twenty48_core::engine::Grid;
    /// let g = Grid::from_rows(vec![vec![2, 0], vec![0, 4]]).unwrap();
    /// assert_eq!(g.size(), 2);
    /// assert!(Grid::from_rows(vec![vec![2, 0]]).is_err());
    /// ```
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Result<Self> {
        let size = rows.len();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                bail!("row {r} has {} cells, expected {size}", row.len());
            }
            if let Some(v) = row.iter().find(|&&v| v != 0 && !v.is_power_of_two()) {
                bail!("row {r} holds {v}, which is not a power of two");
            }
        }
        Ok(Grid(rows))
    }

    /// Side length.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Borrow the rows, top to bottom.
    #[inline]
    pub fn rows(&self) -> &[Vec<Tile>] {
        &self.0
    }

    /// Consume the grid, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<Tile>> {
        self.0
    }

    /// Value at (`row`, `col`), or `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Iterate over every cell value in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Tile> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a random empty cell,
    /// using the provided RNG. A full grid comes back unchanged.
    ///
    /// ```
    /// use twenty48_core::engine::Grid;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let g = Grid::empty(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(g.count_empty(), 14);
    /// ```
    #[inline]
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        ops::spawn_tile(self, rng)
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        ops::is_game_over(self)
    }

    /// Highest tile value on the grid, 0 when empty.
    #[inline]
    pub fn highest_tile(&self) -> Tile {
        ops::get_highest_tile(self)
    }

    #[inline]
    pub fn count_empty(&self) -> usize {
        ops::count_empty(self)
    }
}

impl TryFrom<Vec<Vec<Tile>>> for Grid {
    type Error = anyhow::Error;

    fn try_from(rows: Vec<Vec<Tile>>) -> Result<Self> {
        Grid::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Tile>> {
    fn from(g: Grid) -> Self {
        g.into_rows()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid({:?})", self.0)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1)
            .max(4)
            + 2;
        let separator = "-".repeat((width + 1) * self.size());
        for (r, row) in self.0.iter().enumerate() {
            if r > 0 {
                writeln!(f, "{separator}")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v, width)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

fn format_val(val: Tile, width: usize) -> String {
    match val {
        0 => " ".repeat(width),
        x => format!("{x:^width$}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_moves() {
        assert_eq!("w".parse::<Move>().unwrap(), Move::Up);
        assert_eq!("Left".parse::<Move>().unwrap(), Move::Left);
        assert_eq!(" s ".parse::<Move>().unwrap(), Move::Down);
        assert_eq!("d".parse::<Move>().unwrap(), Move::Right);
        assert!("sideways".parse::<Move>().is_err());
    }

    #[test]
    fn it_pairs_opposites() {
        for m in Move::ALL {
            assert_ne!(m, m.opposite());
            assert_eq!(m, m.opposite().opposite());
        }
    }

    #[test]
    fn it_rejects_malformed_rows() {
        assert!(Grid::from_rows(vec![vec![2, 2], vec![2]]).is_err());
        assert!(Grid::from_rows(vec![vec![3, 0], vec![0, 0]]).is_err());
        assert!(Grid::from_rows(vec![]).is_ok());
    }

    #[test]
    fn it_roundtrips_through_json() {
        let g = Grid::from_rows(vec![vec![2, 0], vec![4, 1024]]).unwrap();
        let s = serde_json::to_string(&g).unwrap();
        assert_eq!(s, "[[2,0],[4,1024]]");
        let back: Grid = serde_json::from_str(&s).unwrap();
        assert_eq!(back, g);
        assert!(serde_json::from_str::<Grid>("[[2,0]]").is_err());
    }

    #[test]
    fn it_displays_every_row() {
        let g = Grid::from_rows(vec![vec![2, 0], vec![0, 2048]]).unwrap();
        let text = g.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("2048"));
    }
}
