use thiserror::Error;
use uuid::Uuid;

/// Errors from repository operations (used by trait definitions in kindred-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the external embedding function.
///
/// None of these reach the conversation flow; the retriever records them as
/// skipped items or empty results.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider error: {0}")]
    Provider(String),

    #[error("embedding provider returned an empty vector")]
    Empty,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from cross-persona sharing.
#[derive(Debug, Error)]
pub enum SharingError {
    /// No recipient meets the relationship and trust thresholds.
    /// An expected business outcome, not a system fault.
    #[error("no eligible recipients")]
    NoEligibleRecipients,

    #[error("memory {0} not found")]
    MemoryNotFound(Uuid),

    #[error("memory {memory_id} is not owned by persona {persona_id}")]
    NotOwner { memory_id: Uuid, persona_id: Uuid },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from creating memory-to-memory connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("memory {0} not found")]
    MemoryNotFound(Uuid),

    #[error("a memory cannot be connected to itself")]
    SelfConnection,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from the consolidation pass as a whole.
///
/// Failures on individual memories are counted in the report instead.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("consolidation already running for user {user_id} persona {persona_id}")]
    AlreadyRunning { user_id: Uuid, persona_id: Uuid },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
