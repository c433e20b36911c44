//! Domain models: archetypes, levels, mini-game definitions, questions and results.

use serde::{Deserialize, Deserializer, Serialize};

/// The five fixed challenge types. Every grading/generation path matches on this exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeArchetype {
  GuessWord,
  FillLetter,
  QuickAnswer,
  BuildSentence,
  ListenWrite,
}

impl ChallengeArchetype {
  pub const ALL: [ChallengeArchetype; 5] = [
    ChallengeArchetype::GuessWord,
    ChallengeArchetype::FillLetter,
    ChallengeArchetype::QuickAnswer,
    ChallengeArchetype::BuildSentence,
    ChallengeArchetype::ListenWrite,
  ];

  pub fn id(self) -> &'static str {
    match self {
      ChallengeArchetype::GuessWord => "guess-word",
      ChallengeArchetype::FillLetter => "fill-letter",
      ChallengeArchetype::QuickAnswer => "quick-answer",
      ChallengeArchetype::BuildSentence => "build-sentence",
      ChallengeArchetype::ListenWrite => "listen-write",
    }
  }

  pub fn parse(id: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|a| a.id() == id.trim())
  }

  pub fn mini_game(self) -> &'static MiniGame {
    match self {
      ChallengeArchetype::GuessWord => &MINI_GAMES[0],
      ChallengeArchetype::FillLetter => &MINI_GAMES[1],
      ChallengeArchetype::QuickAnswer => &MINI_GAMES[2],
      ChallengeArchetype::BuildSentence => &MINI_GAMES[3],
      ChallengeArchetype::ListenWrite => &MINI_GAMES[4],
    }
  }

  /// Fixed option set: picking an option submits right away.
  pub fn submits_on_select(self) -> bool {
    matches!(self, ChallengeArchetype::QuickAnswer)
  }
}

/// Learner proficiency. Unknown strings fall back to beginner, when parsed or deserialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Level {
  pub fn as_str(self) -> &'static str {
    match self {
      Level::Beginner => "beginner",
      Level::Intermediate => "intermediate",
      Level::Advanced => "advanced",
    }
  }

  pub fn parse_or_default(s: &str) -> Self {
    match s.trim().to_lowercase().as_str() {
      "intermediate" => Level::Intermediate,
      "advanced" => Level::Advanced,
      _ => Level::Beginner,
    }
  }
}

impl<'de> Deserialize<'de> for Level {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Level::parse_or_default(&raw))
  }
}

/// Archetype metadata shown on the menu.
#[derive(Debug, Serialize)]
pub struct MiniGame {
  pub id: ChallengeArchetype,
  pub name: &'static str,
  pub description: &'static str,
  /// Base reward in stars.
  pub reward: u32,
  /// Seconds.
  pub time_limit: u32,
}

pub static MINI_GAMES: [MiniGame; 5] = [
  MiniGame {
    id: ChallengeArchetype::GuessWord,
    name: "Guess the Word",
    description: "Read the hint and type the word.",
    reward: 5,
    time_limit: 30,
  },
  MiniGame {
    id: ChallengeArchetype::FillLetter,
    name: "Missing Letter",
    description: "One letter is hidden. Which one?",
    reward: 3,
    time_limit: 20,
  },
  MiniGame {
    id: ChallengeArchetype::QuickAnswer,
    name: "Quick Answer",
    description: "Pick the right option before time runs out.",
    reward: 2,
    time_limit: 10,
  },
  MiniGame {
    id: ChallengeArchetype::BuildSentence,
    name: "Sentence Builder",
    description: "Put the words back in order.",
    reward: 8,
    time_limit: 45,
  },
  MiniGame {
    id: ChallengeArchetype::ListenWrite,
    name: "Listen & Write",
    description: "Write the word you hear, letter by letter.",
    reward: 6,
    time_limit: 30,
  },
];

/// Archetype-specific content shown to the learner. Never carries the answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionPayload {
  GuessWord { prompt: String, hint: String },
  FillLetter { prompt: String, masked_word: String, hint: String },
  QuickAnswer { prompt: String, options: Vec<String> },
  BuildSentence { prompt: String, tokens: Vec<String> },
  ListenWrite { prompt: String, spelled: String, hint: String },
}

impl QuestionPayload {
  pub fn archetype(&self) -> ChallengeArchetype {
    match self {
      QuestionPayload::GuessWord { .. } => ChallengeArchetype::GuessWord,
      QuestionPayload::FillLetter { .. } => ChallengeArchetype::FillLetter,
      QuestionPayload::QuickAnswer { .. } => ChallengeArchetype::QuickAnswer,
      QuestionPayload::BuildSentence { .. } => ChallengeArchetype::BuildSentence,
      QuestionPayload::ListenWrite { .. } => ChallengeArchetype::ListenWrite,
    }
  }

  pub fn options(&self) -> Option<&[String]> {
    match self {
      QuestionPayload::QuickAnswer { options, .. } => Some(options),
      _ => None,
    }
  }

  /// Readable text fields (prompt, hint, displayed word, options). Tokens are excluded.
  #[cfg(test)]
  pub fn visible_text(&self) -> Vec<&str> {
    match self {
      QuestionPayload::GuessWord { prompt, hint } => vec![prompt.as_str(), hint.as_str()],
      QuestionPayload::FillLetter { prompt, masked_word, hint } => {
        vec![prompt.as_str(), masked_word.as_str(), hint.as_str()]
      }
      QuestionPayload::QuickAnswer { prompt, options } => {
        let mut out = vec![prompt.as_str()];
        out.extend(options.iter().map(String::as_str));
        out
      }
      QuestionPayload::BuildSentence { prompt, .. } => vec![prompt.as_str()],
      QuestionPayload::ListenWrite { prompt, spelled, hint } => {
        vec![prompt.as_str(), spelled.as_str(), hint.as_str()]
      }
    }
  }
}

/// What the view layer renders while playing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameQuestion {
  pub game: ChallengeArchetype,
  pub name: String,
  pub time_limit: u32,
  pub reward: u32,
  pub question: QuestionPayload,
}

/// Outcome of one round. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
  pub correct: bool,
  pub correct_answer: String,
  pub user_answer: String,
  pub base_stars: u32,
  pub time_bonus: u32,
  pub stars_earned: u32,
  pub elapsed_seconds: f64,
  pub time_bonus_percent: u32,
}

/// Who produced the question and who grades it. Public label only; the hidden
/// answer lives with the session controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityMode {
  Remote,
  Local,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mini_game_table_matches_archetypes() {
    for a in ChallengeArchetype::ALL {
      assert_eq!(a.mini_game().id, a);
      assert_eq!(ChallengeArchetype::parse(a.id()), Some(a));
    }
    assert_eq!(ChallengeArchetype::parse("memory-match"), None);
  }

  #[test]
  fn unknown_level_falls_back_to_beginner() {
    assert_eq!(Level::parse_or_default("Advanced"), Level::Advanced);
    assert_eq!(Level::parse_or_default("expert"), Level::Beginner);
    assert_eq!(Level::parse_or_default(""), Level::Beginner);
  }

  #[test]
  fn level_deserializes_leniently() {
    let levels: Vec<Level> = serde_json::from_str(r#"["advanced", "Intermediate", "expert"]"#).expect("json");
    assert_eq!(levels, vec![Level::Advanced, Level::Intermediate, Level::Beginner]);
    assert_eq!(serde_json::to_value(Level::Advanced).expect("json"), "advanced");
  }

  #[test]
  fn payload_serializes_with_kind_tag() {
    let p = QuestionPayload::FillLetter { prompt: "p".into(), masked_word: "k_čka".into(), hint: "h".into() };
    let v = serde_json::to_value(&p).expect("json");
    assert_eq!(v["kind"], "fill-letter");
    assert_eq!(v["masked_word"], "k_čka");
  }
}
