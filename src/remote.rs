//! Client for the remote game/scoring service.
//!
//! Three JSON-over-HTTP calls: start, submit, cancel. Any failure (transport, status,
//! unexpected body) surfaces as `RemoteError`; the session controller treats all of them
//! the same way and falls back to local generation/grading.
//!
//! NOTE: learner answers are never logged, only their lengths.

use std::{future::Future, time::Duration};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::RemoteConfig;
use crate::domain::{ChallengeArchetype, GameQuestion, GameResult, Level};
use crate::protocol::{CancelRoundReq, GameQuestionWire, StartRoundReq, SubmitRoundReq};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("game service HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed game service response: {0}")]
    Malformed(String),
}

/// The remote authority as seen by the session controller.
pub trait GameService: Send + Sync + 'static {
    fn start(
        &self,
        game: ChallengeArchetype,
        learner_id: &str,
        level: Level,
    ) -> impl Future<Output = Result<GameQuestion, RemoteError>> + Send;

    fn submit(&self, learner_id: &str, answer: &str) -> impl Future<Output = Result<GameResult, RemoteError>> + Send;

    fn cancel(&self, learner_id: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

#[derive(Clone)]
pub struct HttpGameService {
    client: reqwest::Client,
    pub base_url: String,
}

impl HttpGameService {
    /// Build the client when a base URL is configured; otherwise every round is local.
    pub fn from_config(cfg: &RemoteConfig) -> Option<Self> {
        let base_url = cfg.base_url.as_deref()?.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .ok()?;
        Some(Self { client, base_url })
    }

    #[instrument(level = "debug", skip(self, body))]
    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "minigames-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, message: trunc_for_log(&body, 200) });
        }

        let text = res.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

impl GameService for HttpGameService {
    #[instrument(level = "info", skip(self, game, level), fields(game = game.id(), level = level.as_str()))]
    async fn start(&self, game: ChallengeArchetype, learner_id: &str, level: Level) -> Result<GameQuestion, RemoteError> {
        let req = StartRoundReq { game_id: game, user_id: learner_id, level };
        let wire: GameQuestionWire = self.post_json("minigames/start", &req).await?;
        let question = GameQuestion::try_from(wire).map_err(RemoteError::Malformed)?;
        if question.game != game {
            return Err(RemoteError::Malformed(format!("asked for {}, got {}", game.id(), question.game.id())));
        }
        debug!(target: "minigames", game = game.id(), time_limit = question.time_limit, "Remote round started");
        Ok(question)
    }

    #[instrument(level = "info", skip(self, answer), fields(answer_len = answer.len()))]
    async fn submit(&self, learner_id: &str, answer: &str) -> Result<GameResult, RemoteError> {
        let req = SubmitRoundReq { user_id: learner_id, answer };
        self.post_json("minigames/submit", &req).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn cancel(&self, learner_id: &str) -> Result<(), RemoteError> {
        let req = CancelRoundReq { user_id: learner_id };
        self.post_json::<_, serde_json::Value>("minigames/cancel", &req).await?;
        Ok(())
    }
}

/// Log-safe truncation for error bodies.
fn trunc_for_log(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        s.to_string()
    } else {
        format!("{}… ({} chars total)", s.chars().take(max_chars).collect::<String>(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_base_url_means_no_client() {
        assert!(HttpGameService::from_config(&RemoteConfig::default()).is_none());
        let blank = RemoteConfig { base_url: Some("  ".into()), ..RemoteConfig::default() };
        assert!(HttpGameService::from_config(&blank).is_none());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let cfg = RemoteConfig { base_url: Some("http://games.local/api/".into()), ..RemoteConfig::default() };
        let svc = HttpGameService::from_config(&cfg).expect("client");
        assert_eq!(svc.base_url, "http://games.local/api");
    }

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Runs `app` on an ephemeral local port and returns a client pointed at it.
    async fn serve(app: Router) -> HttpGameService {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        let cfg = RemoteConfig { base_url: Some(format!("http://{addr}/")), timeout_secs: 2 };
        HttpGameService::from_config(&cfg).expect("client")
    }

    fn question_for(game: &str, body: &Value) -> Value {
        json!({
            "game_id": game,
            "name": "Served",
            "time_limit": 25,
            "reward": 5,
            "question": {
                "prompt": format!("for {} at {}", body["user_id"].as_str().unwrap_or(""), body["level"].as_str().unwrap_or("")),
                "hint": "barks",
                "masked_word": "p · e · s"
            }
        })
    }

    #[tokio::test]
    async fn start_submit_and_cancel_round_trip() {
        let app = Router::new()
            .route(
                "/minigames/start",
                post(|Json(body): Json<Value>| async move {
                    let game = body["game_id"].as_str().unwrap_or("").to_string();
                    Json(question_for(&game, &body))
                }),
            )
            .route(
                "/minigames/submit",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "correct": body["answer"] == "pes",
                        "correct_answer": "pes",
                        "user_answer": body["answer"],
                        "base_stars": 5,
                        "time_bonus": 2,
                        "stars_earned": 7,
                        "elapsed_seconds": 3.5,
                        "time_bonus_percent": 88
                    }))
                }),
            )
            .route("/minigames/cancel", post(|| async { Json(json!({"ok": true})) }));
        let svc = serve(app).await;

        let q = svc.start(ChallengeArchetype::GuessWord, "anna", Level::Intermediate).await.expect("start");
        assert_eq!(q.game, ChallengeArchetype::GuessWord);
        assert_eq!(q.time_limit, 25);
        assert!(matches!(q.question, crate::domain::QuestionPayload::GuessWord { ref prompt, .. } if prompt == "for anna at intermediate"));

        let r = svc.submit("anna", "pes").await.expect("submit");
        assert!(r.correct);
        assert_eq!(r.stars_earned, 7);
        assert_eq!(r.user_answer, "pes");

        svc.cancel("anna").await.expect("cancel");
    }

    #[tokio::test]
    async fn error_status_becomes_status_error() {
        let app = Router::new().route(
            "/minigames/start",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        );
        let svc = serve(app).await;
        match svc.start(ChallengeArchetype::QuickAnswer, "anna", Level::Beginner).await {
            Err(RemoteError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("maintenance"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let app = Router::new()
            .route("/minigames/start", post(|| async { "not json at all" }))
            .route("/minigames/submit", post(|| async { Json(json!({"correct": true})) }));
        let svc = serve(app).await;
        assert!(matches!(
            svc.start(ChallengeArchetype::GuessWord, "anna", Level::Beginner).await,
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(svc.submit("anna", "pes").await, Err(RemoteError::Malformed(_))));
    }

    #[tokio::test]
    async fn other_game_in_reply_is_malformed() {
        let app = Router::new().route(
            "/minigames/start",
            post(|Json(body): Json<Value>| async move { Json(question_for("listen-write", &body)) }),
        );
        let svc = serve(app).await;
        match svc.start(ChallengeArchetype::GuessWord, "anna", Level::Beginner).await {
            Err(RemoteError::Malformed(msg)) => assert!(msg.contains("listen-write")),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let cfg = RemoteConfig { base_url: Some(format!("http://{addr}")), timeout_secs: 2 };
        let svc = HttpGameService::from_config(&cfg).expect("client");
        assert!(matches!(svc.cancel("anna").await, Err(RemoteError::Transport(_))));
    }

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(trunc_for_log("ahoj", 10), "ahoj");
        assert_eq!(trunc_for_log("příležitost", 3), "pří… (11 chars total)");
    }
}
