//! MemoryRepository trait definition.
//!
//! Provides CRUD, similarity search and consolidation scans for persona
//! memories. Every mutation of a single memory is one repository call so
//! implementations can apply it as one atomic write.

use chrono::{DateTime, Utc};
use kindred_types::error::RepositoryError;
use kindred_types::memory::{
    ConsolidationUpdate, Memory, MemoryConnection, MemoryOwner, OwnerScope, RankedMemory,
};
use uuid::Uuid;

/// Repository trait for persona long-term memory persistence.
///
/// Implementations live in kindred-infra (e.g., `SqliteMemoryRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait MemoryRepository: Send + Sync {
    /// Save a new memory.
    fn save_memory(
        &self,
        memory: &Memory,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Save several new memories as one unit: either all are stored or none.
    fn save_memories(
        &self,
        memories: &[Memory],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a memory by ID, archived or not.
    fn get_memory(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Memory>, RepositoryError>> + Send;

    /// List a persona's memories, newest first.
    fn list_memories(
        &self,
        owner: &MemoryOwner,
        include_archived: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// List only archived memories (explicit archive access).
    fn list_archived(
        &self,
        owner: &MemoryOwner,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Nearest-neighbor search over non-archived memories in `scope`.
    ///
    /// Returns results ordered by similarity descending, ties broken by
    /// `last_accessed` descending. Memories without an embedding are skipped.
    fn similarity_search(
        &self,
        scope: &OwnerScope,
        query_embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RankedMemory>, RepositoryError>> + Send;

    /// Next chunk of non-archived memories for a consolidation pass.
    ///
    /// Ordered by id ascending, starting strictly after `after` when given.
    fn due_for_consolidation(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Next chunk of archived memories, rechecked for deletion.
    ///
    /// Same ordering and cursor as [`Self::due_for_consolidation`].
    fn archived_for_review(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Increment `consolidation_count` by one and set `last_accessed`.
    ///
    /// Returns the updated memory, or `NotFound`.
    fn record_access(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Memory, RepositoryError>> + Send;

    /// Persist a consolidation outcome (decay snapshot, fuzzy content,
    /// archive flag) in one write.
    fn apply_consolidation(
        &self,
        id: &Uuid,
        update: &ConsolidationUpdate,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a connection to a memory.
    fn add_connection(
        &self,
        id: &Uuid,
        connection: &MemoryConnection,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Physically remove a memory.
    fn delete_memory(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every (user, persona) pair that owns at least one memory.
    fn owner_scopes(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MemoryOwner>, RepositoryError>> + Send;
}
