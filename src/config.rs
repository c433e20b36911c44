//! Loading engine configuration from TOML plus env overrides.
//!
//! See `EngineConfig` and `RemoteConfig` for expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Level;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub port: u16,
  /// Directory for per-learner stats files. None keeps stats in memory.
  pub stats_dir: Option<PathBuf>,
  /// Fixed seed for local generation (reproducible sessions). None uses OS entropy.
  pub rng_seed: Option<u64>,
  pub default_level: Level,
  pub remote: RemoteConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { port: 3000, stats_dir: None, rng_seed: None, default_level: Level::Beginner, remote: RemoteConfig::default() }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
  /// Remote game service root. None means local authority for every round.
  pub base_url: Option<String>,
  pub timeout_secs: u64,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self { base_url: None, timeout_secs: 8 }
  }
}

impl EngineConfig {
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(s)
  }

  /// Env wins over the file: PORT, GAME_SERVICE_URL, STATS_DIR.
  fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
    if let Some(port) = var("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.port = port;
    }
    if let Some(url) = var("GAME_SERVICE_URL") {
      self.remote.base_url = Some(url);
    }
    if let Some(dir) = var("STATS_DIR") {
      self.stats_dir = Some(PathBuf::from(dir));
    }
  }
}

/// Load from MINIGAMES_CONFIG_PATH (if set), then apply env overrides.
/// On any read/parse error the defaults are used.
pub fn load_engine_config_from_env() -> EngineConfig {
  let mut cfg = match std::env::var("MINIGAMES_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match EngineConfig::from_toml_str(&s) {
        Ok(cfg) => {
          info!(target: "minigames", %path, "Loaded engine config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "minigames", %path, error = %e, "Failed to parse TOML config");
          EngineConfig::default()
        }
      },
      Err(e) => {
        error!(target: "minigames", %path, error = %e, "Failed to read TOML config file");
        EngineConfig::default()
      }
    },
    Err(_) => EngineConfig::default(),
  };
  cfg.apply_env(|k| std::env::var(k).ok());
  cfg
}
