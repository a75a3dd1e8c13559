use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use twenty48_core::session::GameSettings;

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default = "defaults::grid_size")]
    pub grid_size: usize,

    /// Cap on undo snapshots. Omit for an unbounded history.
    #[serde(default)]
    pub undo_limit: Option<usize>,

    #[serde(default)]
    pub store: Store,

    #[serde(default)]
    pub selfplay: Selfplay,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, Default)]
pub struct Store {
    /// SQLite file for saved slots; in-memory when omitted.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Selfplay {
    #[serde(default = "defaults::games")]
    pub games: u32,
    /// Base seed; game `i` uses `seed + i`.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "defaults::max_steps")]
    pub max_steps: u64,
    /// Optional JSON-lines file receiving one summary per game.
    #[serde(default)]
    pub results_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: defaults::grid_size(),
            undo_limit: None,
            store: Store::default(),
            selfplay: Selfplay::default(),
        }
    }
}

impl Default for Selfplay {
    fn default() -> Self {
        Self {
            games: defaults::games(),
            seed: 0,
            max_steps: defaults::max_steps(),
            results_file: None,
        }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_toml(p),
            None => Ok(Self::default()),
        }
    }

    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            grid_size: self.grid_size,
            undo_limit: self.undo_limit,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            bail!("grid_size must be at least 2, got {}", self.grid_size);
        }
        Ok(())
    }
}

mod defaults {
    pub fn grid_size() -> usize { twenty48_core::engine::DEFAULT_SIZE }
    pub fn games() -> u32 { 100 }
    pub fn max_steps() -> u64 { 100_000 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f).unwrap();
        let cfg = Config::from_toml(f.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.game_settings(), GameSettings::default());
    }

    #[test]
    fn parses_nested_tables() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
grid_size = 5
undo_limit = 10

[store]
path = "saves/game.db"

[selfplay]
games = 8
seed = 42
results_file = "runs.jsonl"
"#
        )
        .unwrap();
        let cfg = Config::from_toml(f.path()).unwrap();
        assert_eq!(cfg.grid_size, 5);
        assert_eq!(cfg.undo_limit, Some(10));
        assert_eq!(cfg.store.path, Some(PathBuf::from("saves/game.db")));
        assert_eq!(cfg.selfplay.games, 8);
        assert_eq!(cfg.selfplay.seed, 42);
        assert_eq!(cfg.selfplay.max_steps, 100_000);
        assert_eq!(cfg.selfplay.results_file, Some(PathBuf::from("runs.jsonl")));
    }

    #[test]
    fn rejects_tiny_grids() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "grid_size = 1").unwrap();
        assert!(Config::from_toml(f.path()).is_err());
        assert!(Config::load(None).is_ok());
    }
}
