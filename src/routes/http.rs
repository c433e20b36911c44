//! HTTP endpoint handlers. Thin wrappers that resolve the learner's session and forward.
//! Each handler is instrumented with the learner id; typed answers are never logged.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use super::{resolve_start, ApiError};
use crate::domain::MINI_GAMES;
use crate::protocol::*;
use crate::session::{SessionError, SessionView};
use crate::state::{AppState, Session};

type ViewResult = Result<Json<SessionView>, ApiError>;

/// Commands that only make sense mid-game never mount a session.
async fn mounted_or(state: &AppState, learner: &str, missing: SessionError) -> Result<Arc<Session>, ApiError> {
  state.mounted(learner).await.ok_or(ApiError::Session(missing))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info")]
pub async fn http_list_minigames() -> impl IntoResponse {
  Json(&MINI_GAMES[..])
}

#[instrument(level = "info", skip(state), fields(learner = %q.learner))]
pub async fn http_get_stats(State(state): State<Arc<AppState>>, Query(q): Query<LearnerQuery>) -> impl IntoResponse {
  Json(state.learner_stats(&q.learner).await)
}

#[instrument(level = "info", skip(state), fields(learner = %q.learner))]
pub async fn http_get_session(State(state): State<Arc<AppState>>, Query(q): Query<LearnerQuery>) -> impl IntoResponse {
  Json(state.view(&q.learner).await)
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner, game = %body.game_id))]
pub async fn http_post_start(State(state): State<Arc<AppState>>, Json(body): Json<StartIn>) -> ViewResult {
  let (game, level) = resolve_start(&state, &body.game_id, body.level.as_deref())?;
  let session = state.session(&body.learner).await;
  let view = session.start(game, level).await;
  info!(target: "session", learner = %body.learner, game = game.id(), level = level.as_str(), "HTTP start served");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner, answer_len = body.answer.len()))]
pub async fn http_post_answer(State(state): State<Arc<AppState>>, Json(body): Json<AnswerIn>) -> ViewResult {
  let session = mounted_or(&state, &body.learner, SessionError::NotPlaying).await?;
  Ok(Json(session.set_answer(body.answer).await?))
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner))]
pub async fn http_post_select(State(state): State<Arc<AppState>>, Json(body): Json<SelectIn>) -> ViewResult {
  let session = mounted_or(&state, &body.learner, SessionError::NotPlaying).await?;
  Ok(Json(session.select_option(body.option).await?))
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner, explicit = body.answer.is_some()))]
pub async fn http_post_submit(State(state): State<Arc<AppState>>, Json(body): Json<SubmitIn>) -> ViewResult {
  let session = mounted_or(&state, &body.learner, SessionError::NotPlaying).await?;
  Ok(Json(session.submit(body.answer).await?))
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner))]
pub async fn http_post_again(State(state): State<Arc<AppState>>, Json(body): Json<LearnerIn>) -> ViewResult {
  let session = mounted_or(&state, &body.learner, SessionError::NothingToReplay).await?;
  Ok(Json(session.play_again().await?))
}

#[instrument(level = "info", skip(state, body), fields(learner = %body.learner))]
pub async fn http_post_back(State(state): State<Arc<AppState>>, Json(body): Json<LearnerIn>) -> impl IntoResponse {
  let Some(session) = state.mounted(&body.learner).await else {
    return Json(state.view(&body.learner).await);
  };
  let view = session.back().await;
  drop(session);
  state.release(&body.learner).await;
  Json(view)
}
