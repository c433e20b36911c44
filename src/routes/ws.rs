//! WebSocket upgrade + message loop for one learner's session.
//!
//! Commands come in as tagged JSON. The session's view is pushed on every change
//! (countdown ticks included); rejected commands get an `error` message.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use super::{resolve_start, ApiError};
use crate::protocol::{ClientWsMessage, LearnerQuery, ServerWsMessage};
use crate::state::{AppState, Session};

#[instrument(level = "info", skip(state, ws), fields(learner = %q.learner))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<LearnerQuery>,
) -> impl IntoResponse {
  info!(target: "minigames", learner = %q.learner, "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, q.learner))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, learner: String) {
  let session = state.session(&learner).await;
  let mut views = session.subscribe();
  info!(target: "minigames", %learner, "WebSocket connected");

  let initial = ServerWsMessage::View { view: views.borrow_and_update().clone() };
  if send(&mut socket, &initial).await.is_ok() {
    loop {
      tokio::select! {
        incoming = socket.recv() => {
          let Some(Ok(msg)) = incoming else { break };
          match msg {
            Message::Text(txt) => {
              let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
                Ok(cmd) => {
                  debug!(target: "minigames", command = cmd.name(), "WS received");
                  handle_client_ws(cmd, &state, &session).await
                }
                Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
              };
              if let Some(reply) = reply {
                if send(&mut socket, &reply).await.is_err() {
                  break;
                }
              }
            }
            Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
            Message::Close(_) => break,
            _ => {}
          }
        }
        changed = views.changed() => {
          if changed.is_err() {
            break;
          }
          let view = views.borrow_and_update().clone();
          if send(&mut socket, &ServerWsMessage::View { view }).await.is_err() {
            break;
          }
        }
      }
    }
  }
  drop(views);
  drop(session);
  state.release(&learner).await;
  info!(target: "minigames", %learner, "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  let sent = socket.send(Message::Text(out)).await;
  if let Err(e) = &sent {
    error!(target: "minigames", error = %e, "WS send error");
  }
  sent
}

/// Run one command. State changes reach the client through the view channel,
/// so only pongs and rejections produce a direct reply.
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &Arc<Session>) -> Option<ServerWsMessage> {
  let outcome: Result<(), ApiError> = match msg {
    ClientWsMessage::Ping => return Some(ServerWsMessage::Pong),
    ClientWsMessage::Start { game_id, level } => match resolve_start(state, &game_id, level.as_deref()) {
      Ok((game, level)) => {
        session.start(game, level).await;
        Ok(())
      }
      Err(e) => Err(e),
    },
    ClientWsMessage::Answer { answer } => session.set_answer(answer).await.map(drop).map_err(ApiError::from),
    ClientWsMessage::Select { option } => session.select_option(option).await.map(drop).map_err(ApiError::from),
    ClientWsMessage::Submit { answer } => session.submit(answer).await.map(drop).map_err(ApiError::from),
    ClientWsMessage::Again => session.play_again().await.map(drop).map_err(ApiError::from),
    ClientWsMessage::Back => {
      session.back().await;
      Ok(())
    }
  };
  outcome.err().map(|e| ServerWsMessage::Error { message: e.to_string() })
}
