//! Keyword-theme clustering of memories.
//!
//! Clusters are a read-time view recomputed from current memories; nothing
//! here is persisted.

use std::collections::BTreeMap;

use kindred_types::memory::Memory;
use kindred_types::network::{MemoryCluster, Theme};
use uuid::Uuid;

const THEME_KEYWORDS: [(Theme, &[&str]); 4] = [
    (
        Theme::Joy,
        &[
            "happy", "joy", "love", "excited", "fun", "celebrat", "wonderful", "glad", "enjoy",
            "proud",
        ],
    ),
    (
        Theme::Difficulty,
        &[
            "sad", "hard", "difficult", "struggl", "stress", "anxious", "worried", "problem",
            "hate", "tired", "lonely", "dislike",
        ],
    ),
    (
        Theme::Learning,
        &[
            "learn", "study", "read", "course", "skill", "discover", "understand", "teach",
            "book", "class",
        ],
    ),
    (
        Theme::Relationships,
        &[
            "friend", "family", "sister", "brother", "mother", "father", "partner", "wife",
            "husband", "relationship", "mom", "dad", "son", "daughter",
        ],
    ),
];

/// Theme of a single memory: the first theme whose keywords appear in its
/// content or tags, else `General`.
pub fn theme_of(memory: &Memory) -> Theme {
    let mut haystack = memory.original_content.to_lowercase();
    for tag in &memory.tags {
        haystack.push(' ');
        haystack.push_str(&tag.to_lowercase());
    }

    THEME_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
        .map(|(theme, _)| *theme)
        .unwrap_or(Theme::General)
}

pub fn label_for(theme: Theme) -> &'static str {
    match theme {
        Theme::Joy => "Moments of joy",
        Theme::Difficulty => "Difficult times",
        Theme::Learning => "Things learned",
        Theme::Relationships => "People in their life",
        Theme::General => "Everyday moments",
    }
}

/// Group memories by theme, dropping clusters whose share of the total is
/// below `min_significance`. Largest clusters first.
pub fn cluster_memories(memories: &[Memory], min_significance: f32) -> Vec<MemoryCluster> {
    if memories.is_empty() {
        return Vec::new();
    }

    let mut groups: BTreeMap<Theme, Vec<Uuid>> = BTreeMap::new();
    for memory in memories {
        groups.entry(theme_of(memory)).or_default().push(memory.id);
    }

    let total = memories.len() as f32;
    let mut clusters: Vec<MemoryCluster> = groups
        .into_iter()
        .map(|(theme, memory_ids)| MemoryCluster {
            theme,
            label: label_for(theme).to_string(),
            significance: memory_ids.len() as f32 / total,
            memory_ids,
        })
        .filter(|c| c.significance >= min_significance)
        .collect();

    clusters.sort_by(|a, b| {
        b.memory_ids
            .len()
            .cmp(&a.memory_ids.len())
            .then(a.theme.cmp(&b.theme))
    });
    clusters
}
