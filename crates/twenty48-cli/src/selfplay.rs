use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::Serialize;
use twenty48_core::engine::{self as GameEngine, Level, Score, Tile};
use twenty48_core::session::{Game, GameSettings, Records};

/// Summary for a completed self-play game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub id: u32,
    pub seed: u64,
    pub steps: u64,
    pub score: Score,
    pub highest_tile: Tile,
    pub level: Level,
    /// False when the step cap ended the game before the grid locked up.
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub games: usize,
    pub mean_score: f64,
    pub max_score: Score,
    pub max_tile: Tile,
    /// Number of games ending at each level.
    pub levels: BTreeMap<Level, usize>,
}

/// Play one game to completion with a uniformly random legal-move policy.
pub fn play_one(id: u32, seed: u64, settings: GameSettings, max_steps: u64) -> RunSummary {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = Game::new(settings, Records::default(), &mut rng);
    let mut steps = 0;
    while !game.is_over() && steps < max_steps {
        let legal = GameEngine::legal_moves(game.grid());
        let Some(&dir) = legal.choose(&mut rng) else {
            break;
        };
        game.apply_move(dir, &mut rng);
        steps += 1;
    }
    RunSummary {
        id,
        seed,
        steps,
        score: game.score(),
        highest_tile: game.grid().highest_tile(),
        level: game.level(),
        finished: game.is_over(),
    }
}

/// Play `games` seeded games in parallel; game `i` uses `base_seed + i`.
pub fn run_batch(
    games: u32,
    base_seed: u64,
    settings: GameSettings,
    max_steps: u64,
) -> Vec<RunSummary> {
    (0..games)
        .into_par_iter()
        .map(|id| play_one(id, base_seed.wrapping_add(id as u64), settings, max_steps))
        .collect()
}

pub fn summarize(runs: &[RunSummary]) -> BatchSummary {
    let mut levels = BTreeMap::new();
    for r in runs {
        *levels.entry(r.level).or_insert(0) += 1;
    }
    let total: f64 = runs.iter().map(|r| r.score as f64).sum();
    BatchSummary {
        games: runs.len(),
        mean_score: if runs.is_empty() { 0.0 } else { total / runs.len() as f64 },
        max_score: runs.iter().map(|r| r.score).max().unwrap_or(0),
        max_tile: runs.iter().map(|r| r.highest_tile).max().unwrap_or(0),
        levels,
    }
}

/// Write one JSON object per line.
pub fn write_results(runs: &[RunSummary], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for r in runs {
        serde_json::to_writer(&mut writer, r)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("wrote {} run(s) to {}", runs.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::tempdir;

    #[test]
    fn same_seed_same_game() {
        let settings = GameSettings::default();
        let a = play_one(0, 17, settings, 10_000);
        let b = play_one(5, 17, settings, 10_000);
        assert_eq!((a.steps, a.score, a.highest_tile), (b.steps, b.score, b.highest_tile));
        assert!(a.finished);
        assert!(a.steps > 0);
    }

    #[test]
    fn step_cap_stops_early() {
        let run = play_one(0, 3, GameSettings::default(), 5);
        assert_eq!(run.steps, 5);
        assert!(!run.finished);
    }

    #[test]
    fn batch_is_ordered_and_summarized() {
        let runs = run_batch(6, 100, GameSettings::default(), 10_000);
        assert_eq!(runs.len(), 6);
        for (i, r) in runs.iter().enumerate() {
            assert_eq!(r.id as usize, i);
            assert_eq!(r.seed, 100 + i as u64);
        }
        let summary = summarize(&runs);
        assert_eq!(summary.games, 6);
        assert_eq!(summary.levels.values().sum::<usize>(), 6);
        assert_eq!(summary.max_score, runs.iter().map(|r| r.score).max().unwrap());
        assert!(summary.max_tile >= 4);
    }

    #[test]
    fn results_are_json_lines() {
        let td = tempdir().unwrap();
        let path = td.path().join("runs.jsonl");
        let runs = run_batch(3, 0, GameSettings::default(), 50);
        write_results(&runs, &path).unwrap();
        let reader = std::io::BufReader::new(File::open(&path).unwrap());
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["id"], 0);
        assert_eq!(first["seed"], 0);
        assert!(first["steps"].as_u64().unwrap() <= 50);
    }
}
