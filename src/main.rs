//! Mini-games backend: timed vocabulary games for Czech learners.
//!
//! - Axum HTTP + WebSocket API over per-learner game sessions
//! - Optional remote game service; every round falls back to local generation/grading
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   GAME_SERVICE_URL      : remote game service root; unset means local rounds only
//!   STATS_DIR             : directory for per-learner stats files (default: in memory)
//!   MINIGAMES_CONFIG_PATH : path to TOML config (see config.rs)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod domain;
mod config;
mod vocab;
mod generator;
mod logic;
mod stats;
mod remote;
mod protocol;
mod session;
mod state;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));

  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "minigames", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
