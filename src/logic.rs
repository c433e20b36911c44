//! Local grading and scoring, shared by the session controller's local-authority path.
//!
//! This includes:
//!   - Answer grading (binary, per-archetype normalization)
//!   - The star formula (base reward + linear time bonus capped at 50%)
//!   - Building a `GameResult` locally, or a zero-score one when remote grading fails

use crate::domain::{ChallengeArchetype, GameQuestion, GameResult};

/// Share of the base reward paid as bonus when answering instantly.
const TIME_BONUS_CAP: f64 = 0.5;

pub fn grade(raw_answer: &str, correct_answer: &str, game: ChallengeArchetype) -> bool {
  match game {
    ChallengeArchetype::GuessWord
    | ChallengeArchetype::FillLetter
    | ChallengeArchetype::QuickAnswer
    | ChallengeArchetype::ListenWrite => fold(raw_answer) == fold(correct_answer),
    ChallengeArchetype::BuildSentence => {
      fold(&reattach_punctuation(raw_answer)) == fold(&reattach_punctuation(correct_answer))
    }
  }
}

fn fold(s: &str) -> String {
  s.trim().to_lowercase()
}

// Tokens are joined with single spaces, so "máš ?" has to become "máš?" again.
fn reattach_punctuation(s: &str) -> String {
  s.replace(" ?", "?").replace(" .", ".").replace(" ,", ",")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Score {
  pub base_stars: u32,
  pub time_bonus: u32,
  pub stars_earned: u32,
  pub time_bonus_percent: u32,
}

pub fn score(base_reward: u32, elapsed_seconds: f64, time_limit: u32, correct: bool) -> Score {
  let time_fraction = if time_limit == 0 {
    0.0
  } else {
    (1.0 - elapsed_seconds.max(0.0) / f64::from(time_limit)).max(0.0)
  };
  let time_bonus_percent = (time_fraction * 100.0).round() as u32;

  if !correct {
    return Score { base_stars: 0, time_bonus: 0, stars_earned: 0, time_bonus_percent };
  }
  let base_stars = base_reward;
  let time_bonus = (f64::from(base_reward) * time_fraction * TIME_BONUS_CAP).round() as u32;
  Score { base_stars, time_bonus, stars_earned: base_stars + time_bonus, time_bonus_percent }
}

/// Grade and score a round entirely on this side.
pub fn local_result(question: &GameQuestion, correct_answer: &str, user_answer: &str, elapsed_seconds: f64) -> GameResult {
  let correct = grade(user_answer, correct_answer, question.game);
  let s = score(question.reward, elapsed_seconds, question.time_limit, correct);
  GameResult {
    correct,
    correct_answer: correct_answer.to_string(),
    user_answer: user_answer.to_string(),
    base_stars: s.base_stars,
    time_bonus: s.time_bonus,
    stars_earned: s.stars_earned,
    elapsed_seconds,
    time_bonus_percent: s.time_bonus_percent,
  }
}

/// Stand-in result when the remote service accepted the round but failed to grade it.
pub fn unscored_result(cached_answer: Option<&str>, user_answer: &str, elapsed_seconds: f64) -> GameResult {
  GameResult {
    correct: false,
    correct_answer: cached_answer.unwrap_or_default().to_string(),
    user_answer: user_answer.to_string(),
    base_stars: 0,
    time_bonus: 0,
    stars_earned: 0,
    elapsed_seconds,
    time_bonus_percent: 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::QuestionPayload;

  #[test]
  fn grading_ignores_case_and_outer_whitespace() {
    assert!(grade("Ahoj", "ahoj", ChallengeArchetype::GuessWord));
    assert!(grade("  KOČKA ", "kočka", ChallengeArchetype::ListenWrite));
    assert!(grade("Č", "č", ChallengeArchetype::FillLetter));
    assert!(grade("Šel jsem", "šel jsem", ChallengeArchetype::QuickAnswer));
    assert!(!grade("kocka", "kočka", ChallengeArchetype::GuessWord));
    assert!(!grade("", "pes", ChallengeArchetype::GuessWord));
  }

  #[test]
  fn sentence_grading_reattaches_punctuation() {
    assert!(grade("jak se máš ?", "Jak se máš?", ChallengeArchetype::BuildSentence));
    assert!(grade("Dobrý den , jsem Petr .", "Dobrý den, jsem Petr.", ChallengeArchetype::BuildSentence));
    assert!(!grade("se jak máš ?", "Jak se máš?", ChallengeArchetype::BuildSentence));
  }

  #[test]
  fn default_rule_keeps_punctuation_spacing() {
    assert!(!grade("pes .", "pes.", ChallengeArchetype::GuessWord));
  }

  #[test]
  fn instant_answer_earns_half_again() {
    let s = score(5, 0.0, 10, true);
    assert_eq!(s, Score { base_stars: 5, time_bonus: 3, stars_earned: 8, time_bonus_percent: 100 });
  }

  #[test]
  fn full_time_earns_base_only() {
    let s = score(5, 10.0, 10, true);
    assert_eq!((s.base_stars, s.time_bonus, s.stars_earned, s.time_bonus_percent), (5, 0, 5, 0));
    let late = score(5, 14.2, 10, true);
    assert_eq!(late.stars_earned, 5);
  }

  #[test]
  fn wrong_answer_earns_nothing() {
    for elapsed in [0.0, 3.3, 10.0, 99.0] {
      assert_eq!(score(5, elapsed, 10, false).stars_earned, 0);
    }
  }

  #[test]
  fn bonus_decays_linearly() {
    let s = score(8, 22.5, 45, true);
    assert_eq!(s.time_bonus_percent, 50);
    assert_eq!(s.time_bonus, 2);
    assert_eq!(s.stars_earned, 10);
  }

  #[test]
  fn zero_time_limit_gives_no_bonus() {
    assert_eq!(score(4, 0.0, 0, true).stars_earned, 4);
  }

  #[test]
  fn local_result_reveals_answer() {
    let q = GameQuestion {
      game: ChallengeArchetype::GuessWord,
      name: "Guess the Word".into(),
      time_limit: 30,
      reward: 5,
      question: QuestionPayload::GuessWord { prompt: "Guess the word (3 letters)".into(), hint: "barks".into() },
    };
    let r = local_result(&q, "pes", "PES", 15.0);
    assert!(r.correct);
    assert_eq!(r.correct_answer, "pes");
    assert_eq!(r.user_answer, "PES");
    assert_eq!(r.stars_earned, 5 + 1);
  }

  #[test]
  fn unscored_result_is_zero() {
    let r = unscored_result(None, "(no answer)", 4.0);
    assert!(!r.correct);
    assert_eq!(r.stars_earned, 0);
    assert_eq!(r.correct_answer, "");
  }
}
