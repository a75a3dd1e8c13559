//! Fail-soft persistence for the four saved slots: high score, best tile,
//! current level and the whole-game blob.
//!
//! Backends implement [`KeyValueStore`] and are free to fail; [`Persistence`]
//! catches every error at this boundary, logs it and hands back a default
//! (for loads) or `false` (for saves) so gameplay never sees a storage fault.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use log::{error, warn};
use rusqlite::{Connection, OptionalExtension, params};

use crate::engine::{Level, Score, Tile};
use crate::session::{Records, SavedGame};

pub mod keys {
    pub const HIGH_SCORE: &str = "high_score";
    pub const BEST_TILE: &str = "best_tile";
    pub const CURRENT_LEVEL: &str = "current_level";
    pub const GAME_STATE: &str = "game_state";

    pub const ALL: [&str; 4] = [HIGH_SCORE, BEST_TILE, CURRENT_LEVEL, GAME_STATE];
}

/// Plain string key/value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, keys: &[&str]) -> Result<()>;
}

/// SQLite-backed store keeping everything in one `kv` table.
///
/// Schema:
/// - kv(key TEXT PRIMARY KEY, value TEXT)
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Create or open the database at `path`, creating parent directories and
    /// the schema if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { path, conn })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, keys: &[&str]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-process store. `set_failing(true)` makes every call error, which is
/// handy for exercising the fail-soft paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            bail!("memory store is unavailable");
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, keys: &[&str]) -> Result<()> {
        self.check()?;
        for key in keys {
            self.values.remove(*key);
        }
        Ok(())
    }
}

/// Typed, fail-soft access to the saved slots on top of any store.
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn save_high_score(&mut self, score: Score) -> bool {
        self.save_value(keys::HIGH_SCORE, &score.to_string())
    }

    /// Saved high score, 0 when missing.
    pub fn load_high_score(&self) -> Score {
        self.load_number(keys::HIGH_SCORE, 0)
    }

    pub fn save_best_tile(&mut self, tile: Tile) -> bool {
        self.save_value(keys::BEST_TILE, &tile.to_string())
    }

    /// Saved best tile, 2 when missing.
    pub fn load_best_tile(&self) -> Tile {
        self.load_number(keys::BEST_TILE, 2)
    }

    pub fn save_current_level(&mut self, level: Level) -> bool {
        self.save_value(keys::CURRENT_LEVEL, &level.to_string())
    }

    /// Saved level, 1 when missing or below 1.
    pub fn load_current_level(&self) -> Level {
        match self.load_number(keys::CURRENT_LEVEL, 1) {
            0 => {
                warn!("ignoring stored level 0");
                1
            }
            level => level,
        }
    }

    pub fn save_game_state(&mut self, game: &SavedGame) -> bool {
        match serde_json::to_string(game) {
            Ok(json) => self.save_value(keys::GAME_STATE, &json),
            Err(err) => {
                error!("error encoding game state: {err}");
                false
            }
        }
    }

    /// Saved game, `None` when missing or unreadable.
    pub fn load_game_state(&self) -> Option<SavedGame> {
        let json = self.load_value(keys::GAME_STATE)?;
        match serde_json::from_str(&json) {
            Ok(game) => Some(game),
            Err(err) => {
                error!("error decoding game state: {err}");
                None
            }
        }
    }

    /// Load high score, best tile and level in one go.
    pub fn load_records(&self) -> Records {
        Records {
            high_score: self.load_high_score(),
            best_tile: self.load_best_tile(),
            level: self.load_current_level(),
        }
    }

    /// Save all three record slots; true only when every write succeeded.
    pub fn save_records(&mut self, records: &Records) -> bool {
        let score = self.save_high_score(records.high_score);
        let tile = self.save_best_tile(records.best_tile);
        let level = self.save_current_level(records.level);
        score && tile && level
    }

    /// Forget every saved slot.
    pub fn clear_all(&mut self) -> bool {
        match self.store.remove(&keys::ALL) {
            Ok(()) => true,
            Err(err) => {
                error!("error clearing data: {err:#}");
                false
            }
        }
    }

    fn save_value(&mut self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(err) => {
                error!("error saving {key}: {err:#}");
                false
            }
        }
    }

    fn load_value(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                error!("error loading {key}: {err:#}");
                None
            }
        }
    }

    fn load_number<T: FromStr>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.load_value(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("ignoring unparsable {key} value {raw:?}");
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Grid;
    use tempfile::tempdir;

    fn sample_game() -> SavedGame {
        SavedGame {
            grid: Grid::from_rows(vec![vec![2, 0], vec![8, 1024]]).unwrap(),
            score: 4321,
            level: 2,
        }
    }

    #[test]
    fn defaults_when_empty() {
        let p = Persistence::new(MemoryStore::new());
        assert_eq!(p.load_high_score(), 0);
        assert_eq!(p.load_best_tile(), 2);
        assert_eq!(p.load_current_level(), 1);
        assert_eq!(p.load_game_state(), None);
        assert_eq!(p.load_records(), Records::default());
    }

    #[test]
    fn memory_roundtrip() {
        let mut p = Persistence::new(MemoryStore::new());
        assert!(p.save_high_score(9000));
        assert!(p.save_best_tile(512));
        assert!(p.save_current_level(3));
        assert!(p.save_game_state(&sample_game()));
        assert_eq!(p.load_high_score(), 9000);
        assert_eq!(p.load_best_tile(), 512);
        assert_eq!(p.load_current_level(), 3);
        assert_eq!(p.load_game_state(), Some(sample_game()));

        assert!(p.clear_all());
        assert_eq!(p.load_high_score(), 0);
        assert_eq!(p.load_game_state(), None);
    }

    #[test]
    fn failures_degrade_to_defaults() {
        let mut p = Persistence::new(MemoryStore::new());
        assert!(p.save_high_score(77));
        p.store_mut().set_failing(true);
        assert!(!p.save_high_score(100));
        assert!(!p.save_game_state(&sample_game()));
        assert!(!p.save_records(&Records::default()));
        assert!(!p.clear_all());
        assert_eq!(p.load_high_score(), 0);
        assert_eq!(p.load_best_tile(), 2);
        assert_eq!(p.load_game_state(), None);

        p.store_mut().set_failing(false);
        assert_eq!(p.load_high_score(), 77);
    }

    #[test]
    fn garbage_values_fall_back() {
        let mut store = MemoryStore::new();
        store.set(keys::CURRENT_LEVEL, "not a number").unwrap();
        store.set(keys::GAME_STATE, "{\"grid\":[[2]]").unwrap();
        let p = Persistence::new(store);
        assert_eq!(p.load_current_level(), 1);
        assert_eq!(p.load_game_state(), None);
    }

    #[test]
    fn level_zero_falls_back_to_one() {
        let mut store = MemoryStore::new();
        store.set(keys::CURRENT_LEVEL, "0").unwrap();
        let p = Persistence::new(store);
        assert_eq!(p.load_current_level(), 1);
        assert_eq!(p.load_records().level, 1);
    }

    #[test]
    fn sqlite_roundtrip() {
        let td = tempdir().unwrap();
        let path = td.path().join("nested").join("save.db");
        {
            let store = SqliteStore::open(&path).expect("open store");
            assert!(store.path().exists());
            let mut p = Persistence::new(store);
            let records = Records {
                high_score: 12_345,
                best_tile: 2048,
                level: 2,
            };
            assert!(p.save_records(&records));
            assert!(p.save_game_state(&sample_game()));
            assert!(p.save_high_score(13_000));
        }
        let p = Persistence::new(SqliteStore::open(&path).expect("reopen store"));
        assert_eq!(p.load_high_score(), 13_000);
        assert_eq!(p.load_best_tile(), 2048);
        assert_eq!(p.load_current_level(), 2);
        assert_eq!(p.load_game_state(), Some(sample_game()));
    }
}
