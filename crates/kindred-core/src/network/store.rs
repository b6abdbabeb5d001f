//! Repository traits for shared memories and persona relationships.

use chrono::{DateTime, Utc};
use kindred_types::error::RepositoryError;
use kindred_types::memory::SharedMemory;
use kindred_types::network::PersonaRelationship;
use uuid::Uuid;

/// Persistence for shared memory copies.
pub trait SharedMemoryRepository: Send + Sync {
    fn save_shared(
        &self,
        shared: &SharedMemory,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_shared(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SharedMemory>, RepositoryError>> + Send;

    /// Shared memories whose recipients include `persona_id`.
    fn list_for_recipient(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SharedMemory>, RepositoryError>> + Send;

    /// Shared memories that `persona_id` shared out.
    fn list_by_origin(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SharedMemory>, RepositoryError>> + Send;

    /// Set `last_referenced`.
    fn touch_shared(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Persistence for pairwise persona relationships.
///
/// Keys are the canonical `(persona_a, persona_b)` pair; writes are
/// last-writer-wins.
pub trait RelationshipRepository: Send + Sync {
    fn get_relationship(
        &self,
        a: &Uuid,
        b: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<PersonaRelationship>, RepositoryError>> + Send;

    fn upsert_relationship(
        &self,
        relationship: &PersonaRelationship,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn list_for_persona(
        &self,
        persona_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<PersonaRelationship>, RepositoryError>> + Send;

    fn list_relationships(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<PersonaRelationship>, RepositoryError>> + Send;
}
