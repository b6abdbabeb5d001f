//! Memory types for Kindred.
//!
//! These types model a persona's long-term memory of its user: extracted
//! facts with their embeddings, strength signals, lifecycle flags, typed
//! connections to other memories, and the sharing metadata that controls
//! which other personas may see them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::Topic;

/// Classification of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Personal,
    Preference,
    Experience,
    Relationship,
    Knowledge,
    EmotionalState,
    SharedExperience,
}

impl MemoryType {
    pub const ALL: [MemoryType; 7] = [
        MemoryType::Personal,
        MemoryType::Preference,
        MemoryType::Experience,
        MemoryType::Relationship,
        MemoryType::Knowledge,
        MemoryType::EmotionalState,
        MemoryType::SharedExperience,
    ];
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Personal => write!(f, "personal"),
            MemoryType::Preference => write!(f, "preference"),
            MemoryType::Experience => write!(f, "experience"),
            MemoryType::Relationship => write!(f, "relationship"),
            MemoryType::Knowledge => write!(f, "knowledge"),
            MemoryType::EmotionalState => write!(f, "emotional_state"),
            MemoryType::SharedExperience => write!(f, "shared_experience"),
        }
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "personal" => Ok(MemoryType::Personal),
            "preference" => Ok(MemoryType::Preference),
            "experience" => Ok(MemoryType::Experience),
            "relationship" => Ok(MemoryType::Relationship),
            "knowledge" => Ok(MemoryType::Knowledge),
            "emotional_state" => Ok(MemoryType::EmotionalState),
            "shared_experience" => Ok(MemoryType::SharedExperience),
            other => Err(format!("invalid memory type: '{other}'")),
        }
    }
}

/// Kind of a typed edge between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Similar,
    Related,
    Contrasting,
    Sequential,
    Causal,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Similar => write!(f, "similar"),
            ConnectionKind::Related => write!(f, "related"),
            ConnectionKind::Contrasting => write!(f, "contrasting"),
            ConnectionKind::Sequential => write!(f, "sequential"),
            ConnectionKind::Causal => write!(f, "causal"),
        }
    }
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "similar" => Ok(ConnectionKind::Similar),
            "related" => Ok(ConnectionKind::Related),
            "contrasting" => Ok(ConnectionKind::Contrasting),
            "sequential" => Ok(ConnectionKind::Sequential),
            "causal" => Ok(ConnectionKind::Causal),
            other => Err(format!("invalid connection kind: '{other}'")),
        }
    }
}

/// Access level a persona holds on a memory.
///
/// Ordered: `Read < Write < Admin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Read,
    Write,
    Admin,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Read => write!(f, "read"),
            PermissionLevel::Write => write!(f, "write"),
            PermissionLevel::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(format!("invalid permission level: '{other}'")),
        }
    }
}

/// A typed edge from one memory to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConnection {
    pub target_memory_id: Uuid,
    pub kind: ConnectionKind,
    /// Edge strength in `[0, 1]`.
    pub strength: f32,
    pub description: String,
    /// Persona that authored the edge.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Participants and topics of the interaction a memory came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    /// User and persona ids present in the originating interaction.
    pub participants: Vec<Uuid>,
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// The owning user/persona pair of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryOwner {
    pub user_id: Uuid,
    pub persona_id: Uuid,
}

impl MemoryOwner {
    pub fn new(user_id: Uuid, persona_id: Uuid) -> Self {
        Self { user_id, persona_id }
    }

    pub fn scope(&self) -> OwnerScope {
        OwnerScope::Persona {
            user_id: self.user_id,
            persona_id: self.persona_id,
        }
    }
}

/// Ownership scope of a similarity search or scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerScope {
    /// Only memories of one persona for one user.
    Persona { user_id: Uuid, persona_id: Uuid },
    /// Memories of every persona for one user.
    User { user_id: Uuid },
}

impl OwnerScope {
    pub fn user_id(&self) -> Uuid {
        match self {
            OwnerScope::Persona { user_id, .. } | OwnerScope::User { user_id } => *user_id,
        }
    }

    pub fn persona_id(&self) -> Option<Uuid> {
        match self {
            OwnerScope::Persona { persona_id, .. } => Some(*persona_id),
            OwnerScope::User { .. } => None,
        }
    }
}

/// The inputs of the decay function, detached from the rest of a memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySignals {
    pub created_at: DateTime<Utc>,
    pub consolidation_count: u32,
    pub importance_score: f32,
}

/// A single long-term memory owned by a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub persona_id: Uuid,
    /// Canonical text. Never modified by aging.
    pub original_content: String,
    /// Degraded rendering written by the consolidation pass.
    pub fuzzy_content: Option<String>,
    /// Semantic embedding; `None` if embedding failed or for imported memories.
    pub embedding: Option<Vec<f32>>,
    pub memory_type: MemoryType,
    pub tags: Vec<String>,
    /// Importance in `[0, 1]`.
    pub importance_score: f32,
    /// Emotional valence in `[-1, 1]`.
    pub emotional_impact: f32,
    /// Snapshot of the last computed decay factor. Decisions always recompute it.
    pub decay_factor: f32,
    pub consolidation_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_archived: bool,
    pub connections: Vec<MemoryConnection>,
    pub access_permissions: BTreeMap<Uuid, PermissionLevel>,
    pub shared_with_companions: Vec<Uuid>,
    pub context: InteractionContext,
}

impl Memory {
    /// Build a fresh memory owned by `owner`, created at `now`.
    ///
    /// The owning persona holds `Admin` permission and is recorded as a
    /// participant alongside the user.
    pub fn new(
        owner: MemoryOwner,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance_score: f32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut access_permissions = BTreeMap::new();
        access_permissions.insert(owner.persona_id, PermissionLevel::Admin);

        Self {
            id: Uuid::now_v7(),
            user_id: owner.user_id,
            persona_id: owner.persona_id,
            original_content: content.into(),
            fuzzy_content: None,
            embedding: None,
            memory_type,
            tags: Vec::new(),
            importance_score: importance_score.clamp(0.0, 1.0),
            emotional_impact: 0.0,
            decay_factor: 1.0,
            consolidation_count: 0,
            created_at: now,
            last_accessed: now,
            last_updated: now,
            is_archived: false,
            connections: Vec::new(),
            access_permissions,
            shared_with_companions: Vec::new(),
            context: InteractionContext {
                participants: vec![owner.user_id, owner.persona_id],
                session_id: None,
                topics: Vec::new(),
            },
        }
    }

    pub fn owner(&self) -> MemoryOwner {
        MemoryOwner::new(self.user_id, self.persona_id)
    }

    pub fn signals(&self) -> DecaySignals {
        DecaySignals {
            created_at: self.created_at,
            consolidation_count: self.consolidation_count,
            importance_score: self.importance_score,
        }
    }

    /// Text to show for this memory: the fuzzy rendering when one exists.
    pub fn display_content(&self) -> &str {
        self.fuzzy_content
            .as_deref()
            .unwrap_or(&self.original_content)
    }
}

/// A copy of a memory exposed to other personas.
///
/// Sharing never mutates the original; it creates one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMemory {
    pub id: Uuid,
    pub original_memory_id: Uuid,
    pub origin_persona_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub memory_type: MemoryType,
    pub tags: Vec<String>,
    pub importance_score: f32,
    pub emotional_impact: f32,
    pub access_permissions: BTreeMap<Uuid, PermissionLevel>,
    pub shared_with_companions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_referenced: DateTime<Utc>,
}

impl SharedMemory {
    pub fn permission_for(&self, persona_id: &Uuid) -> Option<PermissionLevel> {
        self.access_permissions.get(persona_id).copied()
    }
}

/// A memory returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMemory {
    pub memory: Memory,
    /// `1 - cosine_distance` to the query embedding.
    pub similarity: f32,
}

/// Lifecycle state of a memory, ordered by decreasing decay factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryState {
    Fresh,
    Consolidated,
    Archived,
    Deleted,
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryState::Fresh => write!(f, "fresh"),
            MemoryState::Consolidated => write!(f, "consolidated"),
            MemoryState::Archived => write!(f, "archived"),
            MemoryState::Deleted => write!(f, "deleted"),
        }
    }
}

/// Outcome of consolidating one memory, applied as a single store write.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationUpdate {
    pub decay_factor: f32,
    pub fuzzy_content: Option<String>,
    pub archive: bool,
    pub updated_at: DateTime<Utc>,
}

/// Summary of one consolidation pass over an owner scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub examined: usize,
    pub consolidated: usize,
    pub archived: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
