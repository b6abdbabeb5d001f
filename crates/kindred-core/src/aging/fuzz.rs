//! Textual degradation of memory content as it decays.
//!
//! The tier is a pure function of the decay factor. Wording within a tier is
//! sampled per word from the supplied RNG, so callers pass a seeded
//! [`rand::rngs::StdRng`] when they need repeatable output.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const LIGHT_HEDGE: &str = "something like";
pub const MEDIUM_LEAD_INS: [&str; 3] = ["I think", "As I recall,", "If I remember right,"];
pub const HEAVY_OPENING: &str = "I vaguely remember";
pub const HEAVY_CLOSING: &str = "it's all quite fuzzy now.";
pub const PLACEHOLDERS: [&str; 2] = ["something", "someone"];

const LIGHT_WORD_PROBABILITY: f64 = 0.25;
const MEDIUM_WORD_PROBABILITY: f64 = 0.3;
const HEAVY_WORD_PROBABILITY: f64 = 0.75;
const CONTENT_WORD_MIN_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzinessTier {
    Verbatim,
    Light,
    Medium,
    Heavy,
}

impl FuzzinessTier {
    pub fn from_decay(decay: f32) -> Self {
        if decay > 0.8 {
            FuzzinessTier::Verbatim
        } else if decay > 0.7 {
            FuzzinessTier::Light
        } else if decay > 0.5 {
            FuzzinessTier::Medium
        } else {
            FuzzinessTier::Heavy
        }
    }
}

impl fmt::Display for FuzzinessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuzzinessTier::Verbatim => write!(f, "verbatim"),
            FuzzinessTier::Light => write!(f, "light"),
            FuzzinessTier::Medium => write!(f, "medium"),
            FuzzinessTier::Heavy => write!(f, "heavy"),
        }
    }
}

/// Degrade `content` according to `tier`.
pub fn apply<R: Rng>(content: &str, tier: FuzzinessTier, rng: &mut R) -> String {
    match tier {
        FuzzinessTier::Verbatim => content.to_string(),
        FuzzinessTier::Light => light(content, rng),
        FuzzinessTier::Medium => medium(content, rng),
        FuzzinessTier::Heavy => heavy(content, rng),
    }
}

fn light<R: Rng>(content: &str, rng: &mut R) -> String {
    let mut words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return content.to_string();
    }

    let mut picked: Vec<usize> = (0..words.len())
        .filter(|_| rng.gen_bool(LIGHT_WORD_PROBABILITY))
        .collect();
    if picked.is_empty() {
        picked.push(rng.gen_range(0..words.len()));
    }
    for i in picked {
        words[i] = format!("{LIGHT_HEDGE} {}", words[i]);
    }
    words.join(" ")
}

fn medium<R: Rng>(content: &str, rng: &mut R) -> String {
    let mut words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    if !words.is_empty() {
        let mut picked: Vec<usize> = (0..words.len())
            .filter(|_| rng.gen_bool(MEDIUM_WORD_PROBABILITY))
            .collect();
        if picked.is_empty() {
            picked.push(rng.gen_range(0..words.len()));
        }
        for i in picked {
            words[i] = format!("...{}...", words[i]);
        }
    }

    let lead_in = MEDIUM_LEAD_INS.choose(rng).copied().unwrap_or(MEDIUM_LEAD_INS[0]);
    format!("{lead_in} {}", words.join(" "))
}

fn heavy<R: Rng>(content: &str, rng: &mut R) -> String {
    let mut words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    let content_words: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| core_len(w) >= CONTENT_WORD_MIN_LEN)
        .map(|(i, _)| i)
        .collect();

    let mut picked: Vec<usize> = content_words
        .iter()
        .copied()
        .filter(|_| rng.gen_bool(HEAVY_WORD_PROBABILITY))
        .collect();
    if picked.is_empty() {
        if let Some(&first) = content_words.first() {
            picked.push(first);
        }
    }

    for i in picked {
        let (core, trailing) = split_trailing_punctuation(&words[i]);
        let placeholder = if core.chars().next().is_some_and(char::is_uppercase) {
            PLACEHOLDERS[1]
        } else {
            PLACEHOLDERS[0]
        };
        words[i] = format!("{placeholder}{trailing}");
    }

    let body = words.join(" ");
    let body = body.trim_end_matches(['.', '!', '?']);
    format!("{HEAVY_OPENING} {body}... {HEAVY_CLOSING}")
}

fn core_len(word: &str) -> usize {
    word.chars().filter(|c| c.is_alphanumeric()).count()
}

fn split_trailing_punctuation(word: &str) -> (&str, &str) {
    let core = word.trim_end_matches(|c: char| !c.is_alphanumeric());
    (core, &word[core.len()..])
}
