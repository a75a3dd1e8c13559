use super::state::{Level, Tile};

/// Tile value that has to appear on the grid to clear level 1.
pub const BASE_TARGET: Tile = 1024;

/// Target tile for `level`: 1024 at level 1, doubling with every level after.
///
/// Levels below 1 are treated as level 1. Targets saturate at `Tile::MAX`.
///
/// ```
/// use twenty48_core::engine::get_target_for_level;
/// assert_eq!(get_target_for_level(1), 1024);
/// assert_eq!(get_target_for_level(3), 4096);
/// ```
pub fn get_target_for_level(level: Level) -> Tile {
    let shift = level.saturating_sub(1);
    BASE_TARGET
        .checked_shl(shift)
        .filter(|&t| t >> shift == BASE_TARGET)
        .unwrap_or(Tile::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_doubles_per_level() {
        assert_eq!(get_target_for_level(1), 1024);
        assert_eq!(get_target_for_level(2), 2048);
        assert_eq!(get_target_for_level(3), 4096);
        assert_eq!(get_target_for_level(7), 65_536);
    }

    #[test]
    fn it_clamps_out_of_range_levels() {
        assert_eq!(get_target_for_level(0), 1024);
        assert_eq!(get_target_for_level(200), Tile::MAX);
    }
}
