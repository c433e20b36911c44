//! Public protocol structs: HTTP/WebSocket DTOs for the UI, plus the wire format of the
//! remote game service. Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeArchetype, GameQuestion, Level, QuestionPayload};
use crate::session::SessionView;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Start {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(default)]
        level: Option<String>,
    },
    Answer {
        answer: String,
    },
    Select {
        option: String,
    },
    Submit {
        #[serde(default)]
        answer: Option<String>,
    },
    Again,
    Back,
}

impl ClientWsMessage {
    /// Command name for logs; payloads may carry answers and stay out of them.
    pub fn name(&self) -> &'static str {
        match self {
            ClientWsMessage::Ping => "ping",
            ClientWsMessage::Start { .. } => "start",
            ClientWsMessage::Answer { .. } => "answer",
            ClientWsMessage::Select { .. } => "select",
            ClientWsMessage::Submit { .. } => "submit",
            ClientWsMessage::Again => "again",
            ClientWsMessage::Back => "back",
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View { view: SessionView },
    Error { message: String },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct LearnerQuery {
    pub learner: String,
}

#[derive(Debug, Deserialize)]
pub struct StartIn {
    pub learner: String,
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub learner: String,
    pub answer: String,
}

#[derive(Deserialize)]
pub struct SelectIn {
    pub learner: String,
    pub option: String,
}

#[derive(Deserialize)]
pub struct SubmitIn {
    pub learner: String,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LearnerIn {
    pub learner: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

//
// Remote game service wire format
//

#[derive(Serialize)]
pub struct StartRoundReq<'a> {
    pub game_id: ChallengeArchetype,
    pub user_id: &'a str,
    pub level: Level,
}

#[derive(Serialize)]
pub struct SubmitRoundReq<'a> {
    pub user_id: &'a str,
    pub answer: &'a str,
}

#[derive(Serialize)]
pub struct CancelRoundReq<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GameQuestionWire {
    pub game_id: String,
    pub name: String,
    pub time_limit: u32,
    pub reward: u32,
    pub question: QuestionWire,
}

/// Flat question object; which optional fields are present depends on the game.
/// listen-write sends its spelled-out word in `masked_word`.
#[derive(Debug, Deserialize)]
pub struct QuestionWire {
    pub prompt: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub masked_word: Option<String>,
    #[serde(default)]
    pub tokens: Option<Vec<String>>,
}

impl TryFrom<GameQuestionWire> for GameQuestion {
    type Error = String;

    fn try_from(w: GameQuestionWire) -> Result<Self, Self::Error> {
        let game = ChallengeArchetype::parse(&w.game_id).ok_or_else(|| format!("unknown game_id '{}'", w.game_id))?;
        let q = w.question;
        let missing = |field: &str| format!("{} question without {}", game.id(), field);
        let question = match game {
            ChallengeArchetype::GuessWord => QuestionPayload::GuessWord {
                prompt: q.prompt,
                hint: q.hint.unwrap_or_default(),
            },
            ChallengeArchetype::FillLetter => QuestionPayload::FillLetter {
                prompt: q.prompt,
                masked_word: q.masked_word.ok_or_else(|| missing("masked_word"))?,
                hint: q.hint.unwrap_or_default(),
            },
            ChallengeArchetype::QuickAnswer => QuestionPayload::QuickAnswer {
                prompt: q.prompt,
                options: q.options.filter(|o| !o.is_empty()).ok_or_else(|| missing("options"))?,
            },
            ChallengeArchetype::BuildSentence => QuestionPayload::BuildSentence {
                prompt: q.prompt,
                tokens: q.tokens.filter(|t| !t.is_empty()).ok_or_else(|| missing("tokens"))?,
            },
            ChallengeArchetype::ListenWrite => QuestionPayload::ListenWrite {
                prompt: q.prompt,
                spelled: q.masked_word.ok_or_else(|| missing("masked_word"))?,
                hint: q.hint.unwrap_or_default(),
            },
        };
        Ok(GameQuestion { game, name: w.name, time_limit: w.time_limit, reward: w.reward, question })
    }
}
