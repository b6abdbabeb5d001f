//! Types produced by the conversational fact extractor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryType;

/// Who spoke an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    User,
    Companion,
}

/// Fixed topic taxonomy used for conversation summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Work,
    Family,
    Hobbies,
    Health,
    Travel,
    Technology,
    Emotions,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::Work,
        Topic::Family,
        Topic::Hobbies,
        Topic::Health,
        Topic::Travel,
        Topic::Technology,
        Topic::Emotions,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Work => write!(f, "work"),
            Topic::Family => write!(f, "family"),
            Topic::Hobbies => write!(f, "hobbies"),
            Topic::Health => write!(f, "health"),
            Topic::Travel => write!(f, "travel"),
            Topic::Technology => write!(f, "technology"),
            Topic::Emotions => write!(f, "emotions"),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.to_string() == s.to_lowercase())
            .ok_or_else(|| format!("invalid topic: '{s}'"))
    }
}

/// The cue-phrase rule that produced a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactRule {
    Name,
    Residence,
    Like,
    Dislike,
    Occupation,
    Family,
    Goal,
    Feeling,
    ExchangeSummary,
}

impl FactRule {
    /// Memory type assigned to facts captured by this rule.
    pub fn memory_type(&self) -> MemoryType {
        match self {
            FactRule::Name | FactRule::Residence | FactRule::Occupation | FactRule::Goal => {
                MemoryType::Personal
            }
            FactRule::Like | FactRule::Dislike => MemoryType::Preference,
            FactRule::Family => MemoryType::Relationship,
            FactRule::Feeling => MemoryType::EmotionalState,
            FactRule::ExchangeSummary => MemoryType::Experience,
        }
    }

    /// Extraction confidence assigned to facts captured by this rule.
    pub fn confidence(&self) -> f32 {
        match self {
            FactRule::Name => 0.95,
            FactRule::Occupation => 0.9,
            FactRule::Residence | FactRule::Family => 0.85,
            FactRule::Like | FactRule::Dislike => 0.8,
            FactRule::Goal => 0.75,
            FactRule::Feeling => 0.7,
            FactRule::ExchangeSummary => 0.6,
        }
    }
}

/// A candidate fact proposed by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFact {
    /// Natural-language statement of the fact.
    pub statement: String,
    pub memory_type: MemoryType,
    /// Confidence in `(0, 1]`.
    pub confidence: f32,
    pub rule: FactRule,
    pub tags: Vec<String>,
    /// Valence in `[-1, 1]`; non-zero only for likes, dislikes and feelings.
    #[serde(default)]
    pub emotional_impact: f32,
}
