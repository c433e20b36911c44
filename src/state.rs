//! Application state: engine config, the optional remote game service, the stats store,
//! and one session controller per learner.
//!
//! A learner's controller is created ("mounted") on the first command or WebSocket connect
//! and dropped again once it is back in the menu with nobody watching. Read-only requests
//! never mount. Every controller shares the same remote client and stats backend.

use std::{collections::HashMap, sync::Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::config::{load_engine_config_from_env, EngineConfig};
use crate::remote::HttpGameService;
use crate::session::{menu_view, SessionController, SessionView};
use crate::stats::{FileKv, StatsRecord, StatsStore};

pub type Session = SessionController<HttpGameService>;

pub struct AppState {
    pub config: EngineConfig,
    pub remote: Option<Arc<HttpGameService>>,
    pub stats: StatsStore,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    /// Seeds each new session's generator.
    seeder: Mutex<StdRng>,
}

impl AppState {
    /// Build state from env: load config, pick the stats backend, init the remote client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        Self::from_config(load_engine_config_from_env())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        let stats = match &config.stats_dir {
            Some(dir) => {
                info!(target: "minigames", dir = %dir.display(), "Stats persisted to disk");
                StatsStore::new(Arc::new(FileKv::new(dir)))
            }
            None => {
                info!(target: "minigames", "No stats_dir configured; stats kept in memory");
                StatsStore::in_memory()
            }
        };

        let remote = HttpGameService::from_config(&config.remote).map(Arc::new);
        if let Some(r) = &remote {
            info!(target: "minigames", base_url = %r.base_url, timeout_secs = config.remote.timeout_secs, "Remote game service enabled.");
        } else {
            info!(target: "minigames", "Remote game service disabled (no base_url). Every round is generated locally.");
        }

        let seeder = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self { config, remote, stats, sessions: RwLock::new(HashMap::new()), seeder: Mutex::new(seeder) }
    }

    /// The learner's session, mounting it on first use.
    #[instrument(level = "debug", skip(self))]
    pub async fn session(&self, learner: &str) -> Arc<Session> {
        if let Some(s) = self.sessions.read().await.get(learner) {
            return s.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(s) = sessions.get(learner) {
            return s.clone();
        }
        let rng = StdRng::seed_from_u64(self.seeder.lock().await.gen());
        let session = SessionController::new(learner.to_string(), self.remote.clone(), self.stats.clone(), rng);
        info!(target: "session", %learner, "Session mounted");
        sessions.insert(learner.to_string(), session.clone());
        session
    }

    pub async fn mounted(&self, learner: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(learner).cloned()
    }

    /// Current view without mounting: unmounted learners are in the menu.
    pub async fn view(&self, learner: &str) -> SessionView {
        match self.mounted(learner).await {
            Some(s) => s.view().await,
            None => menu_view(learner, self.stats.load(learner)),
        }
    }

    /// Stats without mounting. A mounted session's counters are the freshest copy.
    pub async fn learner_stats(&self, learner: &str) -> StatsRecord {
        match self.mounted(learner).await {
            Some(s) => s.stats().await,
            None => self.stats.load(learner),
        }
    }

    /// Unmount the learner's session if it is idle (menu phase, no watchers).
    #[instrument(level = "debug", skip(self))]
    pub async fn release(&self, learner: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let idle = match sessions.get(learner) {
            Some(s) => s.is_idle().await,
            None => return false,
        };
        if idle {
            sessions.remove(learner);
            debug!(target: "session", %learner, "Session unmounted");
        }
        idle
    }

    #[cfg(test)]
    pub async fn mounted_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
