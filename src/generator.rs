//! Local challenge generation: (archetype, level) -> (question shown, hidden answer).
//!
//! Used whenever the remote game service can't start a round. Given the same RNG state
//! the output is identical, so tests run against seeded `StdRng`.

use rand::Rng;

use crate::domain::{ChallengeArchetype, GameQuestion, Level, QuestionPayload};
use crate::vocab::{bank, pick, shuffled};

pub const MASK: char = '_';
pub const SPELL_SEPARATOR: &str = " · ";

/// A freshly generated round. `answer` must stay with the caller.
#[derive(Debug)]
pub struct Generated {
  pub question: GameQuestion,
  pub answer: String,
}

pub fn generate<R: Rng + ?Sized>(game: ChallengeArchetype, level: Level, rng: &mut R) -> Generated {
  let b = bank(level);
  let (question, answer) = match game {
    ChallengeArchetype::GuessWord => {
      let w = pick(b.words, rng);
      let payload = QuestionPayload::GuessWord {
        prompt: format!("Guess the word ({} letters)", w.word.chars().count()),
        hint: w.hint.to_string(),
      };
      (payload, w.word.to_string())
    }
    ChallengeArchetype::FillLetter => {
      let w = pick(b.words, rng);
      let chars: Vec<char> = w.word.chars().collect();
      let idx = rng.gen_range(0..chars.len());
      let masked_word: String = chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i == idx { MASK } else { *c })
        .collect();
      let payload = QuestionPayload::FillLetter {
        prompt: "Which letter is missing?".into(),
        masked_word,
        hint: w.hint.to_string(),
      };
      (payload, chars[idx].to_string())
    }
    ChallengeArchetype::QuickAnswer => {
      let item = pick(b.quick, rng);
      let options = shuffled(item.options, rng).into_iter().map(String::from).collect();
      let payload = QuestionPayload::QuickAnswer { prompt: item.question.to_string(), options };
      (payload, item.answer.to_string())
    }
    ChallengeArchetype::BuildSentence => {
      let s = pick(b.sentences, rng);
      let tokens = shuffled(&tokenize_sentence(s.sentence), rng);
      let payload = QuestionPayload::BuildSentence { prompt: s.translation.to_string(), tokens };
      (payload, s.sentence.to_string())
    }
    ChallengeArchetype::ListenWrite => {
      let w = pick(b.words, rng);
      let payload = QuestionPayload::ListenWrite {
        prompt: "Listen and write the word".into(),
        spelled: spell_out(w.word),
        hint: w.hint.to_string(),
      };
      (payload, w.word.to_string())
    }
  };

  debug_assert_eq!(question.archetype(), game);
  let meta = game.mini_game();
  Generated {
    question: GameQuestion {
      game,
      name: meta.name.to_string(),
      time_limit: meta.time_limit,
      reward: meta.reward,
      question,
    },
    answer,
  }
}

/// Splits on whitespace after detaching `?`, `.` and `,` so each becomes its own token.
pub fn tokenize_sentence(sentence: &str) -> Vec<String> {
  sentence
    .replace('?', " ?")
    .replace('.', " .")
    .replace(',', " ,")
    .split_whitespace()
    .map(String::from)
    .collect()
}

/// "pes" -> "p · e · s"
pub fn spell_out(word: &str) -> String {
  word.chars().map(String::from).collect::<Vec<_>>().join(SPELL_SEPARATOR)
}
