//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level as TraceLevel;

use crate::domain::{ChallengeArchetype, Level};
use crate::protocol::ErrorOut;
use crate::session::SessionError;
use crate::state::AppState;

pub mod http;
pub mod ws;

/// Rejected commands, shared by the HTTP and WebSocket surfaces.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownGame(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(SessionError::NoOptions | SessionError::UnknownOption(_)) => StatusCode::BAD_REQUEST,
            ApiError::Session(SessionError::NotPlaying | SessionError::NothingToReplay) => StatusCode::CONFLICT,
        };
        (status, Json(ErrorOut { message: self.to_string() })).into_response()
    }
}

/// Resolve a start command's game id and optional level (config default when absent).
pub(crate) fn resolve_start(
    state: &AppState,
    game_id: &str,
    level: Option<&str>,
) -> Result<(ChallengeArchetype, Level), ApiError> {
    let game = ChallengeArchetype::parse(game_id).ok_or_else(|| ApiError::UnknownGame(game_id.to_string()))?;
    let level = level.map(Level::parse_or_default).unwrap_or(state.config.default_level);
    Ok((game, level))
}

/// Build the application router with:
/// - WebSocket at `/ws?learner=`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/minigames", get(http::http_list_minigames))
        .route("/api/v1/stats", get(http::http_get_stats))
        .route("/api/v1/session", get(http::http_get_session))
        .route("/api/v1/session/start", post(http::http_post_start))
        .route("/api/v1/session/answer", post(http::http_post_answer))
        .route("/api/v1/session/select", post(http::http_post_select))
        .route("/api/v1/session/submit", post(http::http_post_submit))
        .route("/api/v1/session/again", post(http::http_post_again))
        .route("/api/v1/session/back", post(http::http_post_back))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(TraceLevel::INFO))
                .on_request(DefaultOnRequest::new().level(TraceLevel::INFO))
                .on_response(DefaultOnResponse::new().level(TraceLevel::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(Arc::new(AppState::from_config(EngineConfig::default())))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_and_menu() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let (_, body) = call(&app, Method::GET, "/api/v1/minigames", None).await;
        let games = body.as_array().expect("array");
        assert_eq!(games.len(), 5);
        assert_eq!(games[0]["id"], "guess-word");
        assert_eq!(games[3]["reward"], 8);
    }

    #[tokio::test]
    async fn start_then_submit_reaches_result() {
        let app = app();
        let (status, view) = call(
            &app,
            Method::POST,
            "/api/v1/session/start",
            Some(json!({"learner": "anna", "gameId": "fill-letter", "level": "advanced"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "playing");
        assert_eq!(view["authority"], "local");
        assert_eq!(view["remaining_seconds"], 20);
        assert_eq!(view["question"]["question"]["kind"], "fill-letter");

        let (status, view) =
            call(&app, Method::POST, "/api/v1/session/submit", Some(json!({"learner": "anna", "answer": "q"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "result");
        assert_eq!(view["stats"]["gamesPlayed"], 1);

        let (_, stats) = call(&app, Method::GET, "/api/v1/stats?learner=anna", None).await;
        assert_eq!(stats["gamesPlayed"], 1);

        let (_, view) = call(&app, Method::POST, "/api/v1/session/back", Some(json!({"learner": "anna"}))).await;
        assert_eq!(view["phase"], "menu");
    }

    #[tokio::test]
    async fn rejected_commands_map_to_client_errors() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/session/start",
            Some(json!({"learner": "ben", "gameId": "snake"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("snake"));

        let (status, _) = call(&app, Method::POST, "/api/v1/session/submit", Some(json!({"learner": "ben"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, Method::POST, "/api/v1/session/again", Some(json!({"learner": "ben"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        call(&app, Method::POST, "/api/v1/session/start", Some(json!({"learner": "ben", "gameId": "guess-word"}))).await;
        let (status, _) =
            call(&app, Method::POST, "/api/v1/session/select", Some(json!({"learner": "ben", "option": "pes"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reads_leave_no_sessions_behind() {
        let state = Arc::new(AppState::from_config(EngineConfig::default()));
        let app = build_router(state.clone());
        for i in 0..50 {
            let (status, stats) = call(&app, Method::GET, &format!("/api/v1/stats?learner=l{i}"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(stats, json!({"totalStars": 0, "gamesPlayed": 0}));
            let (_, view) = call(&app, Method::GET, &format!("/api/v1/session?learner=l{i}"), None).await;
            assert_eq!(view["phase"], "menu");
        }
        assert_eq!(state.mounted_count().await, 0);

        call(&app, Method::POST, "/api/v1/session/start", Some(json!({"learner": "eva", "gameId": "guess-word"}))).await;
        assert_eq!(state.mounted_count().await, 1);
        call(&app, Method::POST, "/api/v1/session/back", Some(json!({"learner": "eva"}))).await;
        assert_eq!(state.mounted_count().await, 0);

        let (status, _) = call(&app, Method::POST, "/api/v1/session/submit", Some(json!({"learner": "zoe"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = call(&app, Method::POST, "/api/v1/session/again", Some(json!({"learner": "zoe"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, view) = call(&app, Method::POST, "/api/v1/session/back", Some(json!({"learner": "zoe"}))).await;
        assert_eq!(view["phase"], "menu");
        assert_eq!(state.mounted_count().await, 0);
    }

    #[tokio::test]
    async fn session_view_is_per_learner() {
        let app = app();
        call(&app, Method::POST, "/api/v1/session/start", Some(json!({"learner": "cyril", "gameId": "quick-answer"}))).await;
        let (_, cyril) = call(&app, Method::GET, "/api/v1/session?learner=cyril", None).await;
        let (_, dana) = call(&app, Method::GET, "/api/v1/session?learner=dana", None).await;
        assert_eq!(cyril["phase"], "playing");
        assert_eq!(cyril["question"]["question"]["options"].as_array().map(|o| o.len()), Some(4));
        assert_eq!(dana["phase"], "menu");
        assert_eq!(dana["learner"], "dana");
    }
}
