//! Per-learner star counters behind a small key-value port.
//!
//! The record is stored as JSON under `minigames_stats_<learnerId>`. Anything unreadable
//! counts as a fresh record; gameplay never waits on or fails because of storage.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "minigames_stats_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// String key-value backend.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<HashMap<String, String>>,
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside `dir`. Bytes outside `[A-Za-z0-9-]` are written
/// as `_xx` hex, so distinct keys never share a file.
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

fn file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("_{b:02x}"));
        }
    }
    out
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub total_stars: u64,
    pub games_played: u64,
}

impl StatsRecord {
    pub fn record_round(&mut self, stars_earned: u32) {
        self.total_stars += u64::from(stars_earned);
        self.games_played += 1;
    }
}

#[derive(Clone)]
pub struct StatsStore {
    kv: Arc<dyn KvStore>,
}

impl StatsStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::default()))
    }

    pub fn key(learner_id: &str) -> String {
        format!("{KEY_PREFIX}{learner_id}")
    }

    pub fn load(&self, learner_id: &str) -> StatsRecord {
        let key = Self::key(learner_id);
        match self.kv.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(target: "stats", %learner_id, error = %e, "Corrupt stats record; starting from zero");
                StatsRecord::default()
            }),
            Ok(None) => StatsRecord::default(),
            Err(e) => {
                warn!(target: "stats", %learner_id, error = %e, "Stats read failed; starting from zero");
                StatsRecord::default()
            }
        }
    }

    pub fn save(&self, learner_id: &str, record: StatsRecord) -> Result<(), StoreError> {
        // Serializing two integers can't fail.
        let raw = serde_json::to_string(&record).unwrap_or_default();
        self.kv.set(&Self::key(learner_id), &raw)?;
        debug!(target: "stats", %learner_id, total_stars = record.total_stars, games_played = record.games_played, "Stats saved");
        Ok(())
    }
}
