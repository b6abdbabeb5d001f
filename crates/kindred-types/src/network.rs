//! Shared memory network types.
//!
//! Persona relationships gate cross-persona sharing. Clusters and insights
//! are derived views, always regenerable from current memories. The
//! `NetworkNode` tree is the export/import format consumed by UI surfaces.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::{Memory, SharedMemory};

/// Relationship between two personas.
///
/// Stored with `persona_a < persona_b` so each pair has exactly one record.
/// Strength and trust are externally supplied signals; sharing and connection
/// events only bump the counters and `last_interaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRelationship {
    pub persona_a: Uuid,
    pub persona_b: Uuid,
    pub relationship_strength: f32,
    pub trust_level: f32,
    pub shared_memory_count: u32,
    pub connection_count: u32,
    pub last_interaction: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PersonaRelationship {
    /// Create a relationship record for a pair, normalizing the id order.
    pub fn new(a: Uuid, b: Uuid, strength: f32, trust: f32, now: DateTime<Utc>) -> Self {
        let (persona_a, persona_b) = Self::canonical_pair(a, b);
        Self {
            persona_a,
            persona_b,
            relationship_strength: strength.clamp(0.0, 1.0),
            trust_level: trust.clamp(0.0, 1.0),
            shared_memory_count: 0,
            connection_count: 0,
            last_interaction: now,
            created_at: now,
        }
    }

    pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// The other end of the relationship, if `persona` is part of it.
    pub fn other(&self, persona: &Uuid) -> Option<Uuid> {
        if &self.persona_a == persona {
            Some(self.persona_b)
        } else if &self.persona_b == persona {
            Some(self.persona_a)
        } else {
            None
        }
    }

    pub fn involves(&self, persona: &Uuid) -> bool {
        self.other(persona).is_some()
    }
}

/// Dominant theme of a memory cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Joy,
    Difficulty,
    Learning,
    Relationships,
    General,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Joy => write!(f, "joy"),
            Theme::Difficulty => write!(f, "difficulty"),
            Theme::Learning => write!(f, "learning"),
            Theme::Relationships => write!(f, "relationships"),
            Theme::General => write!(f, "general"),
        }
    }
}

/// A themed grouping of memories. A view, not a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCluster {
    pub theme: Theme,
    pub label: String,
    pub memory_ids: Vec<Uuid>,
    /// Share of the total memory count, in `[0, 1]`.
    pub significance: f32,
}

/// Kind of a derived network observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    StrongConnections,
    DominantTheme,
    EmotionalTrend,
}

/// A derived, non-authoritative observation about a persona's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInsight {
    pub kind: InsightKind,
    pub description: String,
    pub confidence: f32,
    pub generated_at: DateTime<Utc>,
}

/// A memory visible to a persona: its own, or one shared with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AccessibleMemory {
    Own(Memory),
    Shared(SharedMemory),
}

impl AccessibleMemory {
    pub fn id(&self) -> Uuid {
        match self {
            AccessibleMemory::Own(m) => m.id,
            AccessibleMemory::Shared(s) => s.id,
        }
    }

    /// Id of the memory this entry ultimately derives from.
    pub fn source_id(&self) -> Uuid {
        match self {
            AccessibleMemory::Own(m) => m.id,
            AccessibleMemory::Shared(s) => s.original_memory_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            AccessibleMemory::Own(m) => m.display_content(),
            AccessibleMemory::Shared(s) => &s.content,
        }
    }

    pub fn last_referenced(&self) -> DateTime<Utc> {
        match self {
            AccessibleMemory::Own(m) => m.last_accessed,
            AccessibleMemory::Shared(s) => s.last_referenced,
        }
    }
}

/// Per-batch result of automatic sharing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoShareReport {
    pub candidates: usize,
    pub shared: Vec<Uuid>,
    pub skipped: usize,
}

/// Display hints for an exported node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Rendered opacity; tracks the memory's decay factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Rendered size; tracks the memory's importance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

/// A labeled tree node of the exported network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub children: Vec<NetworkNode>,
    #[serde(default)]
    pub style: Option<NodeStyle>,
}

/// Structured outcome of importing an exported tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}
