//! Built-in Czech vocabulary bank, partitioned by level, plus the two random helpers
//! used by the challenge generator.
//!
//! Content is static: no I/O, no mutation. Every partition holds at least one entry
//! of each kind (checked by tests), which `pick` relies on.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::Level;

#[derive(Debug)]
pub struct WordEntry {
  pub word: &'static str,
  pub hint: &'static str,
  pub category: &'static str,
}

#[derive(Debug)]
pub struct SentenceEntry {
  pub sentence: &'static str,
  pub translation: &'static str,
}

/// `options` includes `answer`.
#[derive(Debug)]
pub struct QuickItem {
  pub question: &'static str,
  pub answer: &'static str,
  pub options: &'static [&'static str],
}

#[derive(Debug)]
pub struct LevelBank {
  pub words: &'static [WordEntry],
  pub sentences: &'static [SentenceEntry],
  pub quick: &'static [QuickItem],
}

macro_rules! word {
  ($w:expr, $h:expr, $c:expr) => {
    WordEntry { word: $w, hint: $h, category: $c }
  };
}

macro_rules! sentence {
  ($s:expr, $t:expr) => {
    SentenceEntry { sentence: $s, translation: $t }
  };
}

macro_rules! quick {
  ($q:expr, $a:expr, [$($o:expr),+ $(,)?]) => {
    QuickItem { question: $q, answer: $a, options: &[$($o),+] }
  };
}

static BEGINNER: LevelBank = LevelBank {
  words: &[
    word!("pes", "A loyal animal that barks", "animals"),
    word!("kočka", "A pet that purrs", "animals"),
    word!("voda", "You drink it when thirsty", "food"),
    word!("chléb", "Baked from flour and sliced for sandwiches", "food"),
    word!("dům", "A building where a family lives", "home"),
    word!("slunce", "It shines in the sky during the day", "nature"),
    word!("mléko", "White drink that comes from a cow", "food"),
    word!("auto", "Four wheels and an engine", "transport"),
  ],
  sentences: &[
    sentence!("Jak se máš?", "How are you?"),
    sentence!("Mám rád kávu.", "I like coffee."),
    sentence!("To je můj pes.", "That is my dog."),
    sentence!("Dobrý den, jsem Petr.", "Good day, I am Petr."),
  ],
  quick: &[
    quick!("How do you say 'dog' in Czech?", "pes", ["pes", "kočka", "kůň", "ryba"]),
    quick!("What does 'voda' mean?", "water", ["water", "bread", "milk", "fire"]),
    quick!("Which word means 'thank you'?", "děkuji", ["děkuji", "prosím", "ahoj", "promiňte"]),
    quick!("Opposite of 'velký' (big)?", "malý", ["malý", "starý", "nový", "dlouhý"]),
  ],
};

static INTERMEDIATE: LevelBank = LevelBank {
  words: &[
    word!("nádraží", "Where you catch a train", "travel"),
    word!("knihovna", "A quiet place full of books to borrow", "places"),
    word!("počasí", "Sunny, rainy or snowy conditions outside", "nature"),
    word!("zelenina", "Carrots, peppers and cabbage", "food"),
    word!("nemocnice", "Doctors and nurses work here", "places"),
    word!("letadlo", "It flies passengers between cities", "transport"),
  ],
  sentences: &[
    sentence!("Kde je nejbližší nádraží?", "Where is the nearest train station?"),
    sentence!("Včera jsem byl v kině.", "Yesterday I was at the cinema."),
    sentence!("Můžete mi pomoct, prosím?", "Can you help me, please?"),
  ],
  quick: &[
    quick!("Past tense of 'jít' (I went, masculine)?", "šel jsem", ["šel jsem", "jdu", "půjdu", "chodím"]),
    quick!("What does 'nádraží' mean?", "station", ["station", "library", "hospital", "airport"]),
    quick!("Which word means 'tomorrow'?", "zítra", ["zítra", "včera", "dnes", "pozítří"]),
    quick!("Instrumental of 'auto' (with the car)?", "autem", ["autem", "autu", "auta", "auto"]),
  ],
};

static ADVANCED: LevelBank = LevelBank {
  words: &[
    word!("spravedlnost", "What courts are supposed to deliver", "society"),
    word!("zodpovědnost", "Being accountable for your duties", "society"),
    word!("příležitost", "A favourable chance to do something", "abstract"),
    word!("vzdělání", "What schools and universities provide", "society"),
    word!("prostředí", "Your surroundings, natural or social", "abstract"),
    word!("sebevědomí", "Trust in your own abilities", "abstract"),
  ],
  sentences: &[
    sentence!("Kdybych měl čas, jel bych na hory.", "If I had time, I would go to the mountains."),
    sentence!("Přestože pršelo, šli jsme ven.", "Even though it rained, we went out."),
    sentence!("Rozhodnutí bylo přijato po dlouhé diskusi.", "The decision was made after a long discussion."),
  ],
  quick: &[
    quick!("What does 'přestože' mean?", "although", ["although", "because", "unless", "therefore"]),
    quick!("Which verb means 'to decide' (perfective)?", "rozhodnout", ["rozhodnout", "rozhodovat", "rozhodnutí", "rozhodně"]),
    quick!("What does 'nicméně' mean?", "nevertheless", ["nevertheless", "meanwhile", "otherwise", "moreover"]),
    quick!("Which word means 'sustainable'?", "udržitelný", ["udržitelný", "nevyhnutelný", "spolehlivý", "přiměřený"]),
  ],
};

pub fn bank(level: Level) -> &'static LevelBank {
  match level {
    Level::Beginner => &BEGINNER,
    Level::Intermediate => &INTERMEDIATE,
    Level::Advanced => &ADVANCED,
  }
}

/// Uniform pick. Panics on an empty slice; bank partitions are never empty.
pub fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
  &items[rng.gen_range(0..items.len())]
}

/// Fisher–Yates shuffle into a fresh vector.
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
  let mut out = items.to_vec();
  out.shuffle(rng);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  const LEVELS: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

  #[test]
  fn every_partition_is_populated() {
    for level in LEVELS {
      let b = bank(level);
      assert!(!b.words.is_empty() && !b.sentences.is_empty() && !b.quick.is_empty(), "{level:?}");
    }
  }

  #[test]
  fn quick_items_offer_their_answer_exactly_once() {
    for level in LEVELS {
      for item in bank(level).quick {
        let hits = item.options.iter().filter(|o| **o == item.answer).count();
        assert_eq!(hits, 1, "{}", item.question);
        assert!(!item.question.to_lowercase().contains(&item.answer.to_lowercase()), "{}", item.question);
      }
    }
  }

  #[test]
  fn hints_do_not_spell_the_word() {
    for level in LEVELS {
      for w in bank(level).words {
        assert!(w.word.chars().count() >= 3, "{}", w.word);
        assert!(!w.hint.to_lowercase().contains(w.word), "{}", w.word);
        assert!(!w.category.is_empty());
      }
    }
  }

  #[test]
  fn shuffled_keeps_every_element() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut out = shuffled(&["a", "b", "c", "d"], &mut rng);
    out.sort();
    assert_eq!(out, vec!["a", "b", "c", "d"]);
    assert!(["x", "y"].contains(pick(&["x", "y"], &mut rng)));
  }
}
