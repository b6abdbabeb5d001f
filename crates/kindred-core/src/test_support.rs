//! In-memory test doubles for the repository and embedder ports.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use kindred_types::error::{EmbeddingError, RepositoryError};
use kindred_types::memory::{
    ConsolidationUpdate, Memory, MemoryConnection, MemoryOwner, OwnerScope, RankedMemory,
    SharedMemory,
};
use kindred_types::network::PersonaRelationship;
use uuid::Uuid;

use crate::memory::embedder::Embedder;
use crate::memory::store::MemoryRepository;
use crate::memory::vector::rank_by_similarity;
use crate::network::store::{RelationshipRepository, SharedMemoryRepository};

/// Embedder that answers from a fixed text -> vector table.
pub struct StubEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Provider(format!("no stub vector for '{text}'")))
    }

    fn model_name(&self) -> &str {
        "stub"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Default)]
pub struct MockMemoryRepository {
    memories: Mutex<HashMap<Uuid, Memory>>,
    failing: Mutex<HashSet<Uuid>>,
    fail_saves: Mutex<HashSet<String>>,
    pub consolidation_writes: AtomicUsize,
}

impl MockMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, memory: Memory) {
        self.memories.lock().unwrap().insert(memory.id, memory);
    }

    pub fn snapshot(&self, id: &Uuid) -> Option<Memory> {
        self.memories.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.memories.lock().unwrap().len()
    }

    /// Make every write to `id` fail with a query error.
    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing.lock().unwrap().insert(id);
    }

    /// Make saves of memories with this content fail.
    pub fn fail_saves_of(&self, content: &str) {
        self.fail_saves.lock().unwrap().insert(content.to_string());
    }

    fn chunk(&self, owner: &MemoryOwner, archived: bool, after: Option<Uuid>, limit: usize) -> Vec<Memory> {
        let mut out: Vec<Memory> = self
            .memories
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner() == *owner && m.is_archived == archived)
            .filter(|m| after.is_none_or(|a| m.id > a))
            .cloned()
            .collect();
        out.sort_by_key(|m| m.id);
        out.truncate(limit);
        out
    }

    fn check_writable(&self, id: &Uuid) -> Result<(), RepositoryError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(RepositoryError::Query("injected failure".to_string()));
        }
        Ok(())
    }
}

impl MemoryRepository for MockMemoryRepository {
    async fn save_memory(&self, memory: &Memory) -> Result<(), RepositoryError> {
        if self.fail_saves.lock().unwrap().contains(&memory.original_content) {
            return Err(RepositoryError::Query("injected save failure".to_string()));
        }
        self.insert(memory.clone());
        Ok(())
    }

    async fn save_memories(&self, memories: &[Memory]) -> Result<(), RepositoryError> {
        let fail_saves = self.fail_saves.lock().unwrap();
        if memories.iter().any(|m| fail_saves.contains(&m.original_content)) {
            return Err(RepositoryError::Query("injected save failure".to_string()));
        }
        drop(fail_saves);
        for memory in memories {
            self.insert(memory.clone());
        }
        Ok(())
    }

    async fn get_memory(&self, id: &Uuid) -> Result<Option<Memory>, RepositoryError> {
        Ok(self.snapshot(id))
    }

    async fn list_memories(
        &self,
        owner: &MemoryOwner,
        include_archived: bool,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let mut out: Vec<Memory> = self
            .memories
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner() == *owner && (include_archived || !m.is_archived))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_archived(&self, owner: &MemoryOwner) -> Result<Vec<Memory>, RepositoryError> {
        Ok(self
            .memories
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.owner() == *owner && m.is_archived)
            .cloned()
            .collect())
    }

    async fn similarity_search(
        &self,
        scope: &OwnerScope,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RankedMemory>, RepositoryError> {
        let candidates: Vec<Memory> = self
            .memories
            .lock()
            .unwrap()
            .values()
            .filter(|m| {
                !m.is_archived
                    && m.user_id == scope.user_id()
                    && scope.persona_id().is_none_or(|p| p == m.persona_id)
            })
            .cloned()
            .collect();
        Ok(rank_by_similarity(candidates, query_embedding, limit))
    }

    async fn due_for_consolidation(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        Ok(self.chunk(owner, false, after, limit))
    }

    async fn archived_for_review(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        Ok(self.chunk(owner, true, after, limit))
    }

    async fn record_access(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Memory, RepositoryError> {
        self.check_writable(id)?;
        let mut guard = self.memories.lock().unwrap();
        let memory = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        memory.consolidation_count += 1;
        memory.last_accessed = at;
        Ok(memory.clone())
    }

    async fn apply_consolidation(
        &self,
        id: &Uuid,
        update: &ConsolidationUpdate,
    ) -> Result<(), RepositoryError> {
        self.check_writable(id)?;
        self.consolidation_writes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.memories.lock().unwrap();
        let memory = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        memory.decay_factor = update.decay_factor;
        memory.fuzzy_content = update.fuzzy_content.clone();
        memory.is_archived = memory.is_archived || update.archive;
        memory.last_updated = update.updated_at;
        Ok(())
    }

    async fn add_connection(
        &self,
        id: &Uuid,
        connection: &MemoryConnection,
    ) -> Result<(), RepositoryError> {
        self.check_writable(id)?;
        let mut guard = self.memories.lock().unwrap();
        let memory = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        memory.connections.push(connection.clone());
        Ok(())
    }

    async fn delete_memory(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.check_writable(id)?;
        self.memories.lock().unwrap().remove(id);
        Ok(())
    }

    async fn owner_scopes(&self) -> Result<Vec<MemoryOwner>, RepositoryError> {
        let mut owners: Vec<MemoryOwner> = self
            .memories
            .lock()
            .unwrap()
            .values()
            .map(Memory::owner)
            .collect();
        owners.sort_by_key(|o| (o.user_id, o.persona_id));
        owners.dedup();
        Ok(owners)
    }
}

#[derive(Default)]
pub struct MockSharedRepository {
    shared: Mutex<HashMap<Uuid, SharedMemory>>,
}

impl MockSharedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().unwrap().len()
    }
}

impl SharedMemoryRepository for MockSharedRepository {
    async fn save_shared(&self, shared: &SharedMemory) -> Result<(), RepositoryError> {
        self.shared.lock().unwrap().insert(shared.id, shared.clone());
        Ok(())
    }

    async fn get_shared(&self, id: &Uuid) -> Result<Option<SharedMemory>, RepositoryError> {
        Ok(self.shared.lock().unwrap().get(id).cloned())
    }

    async fn list_for_recipient(
        &self,
        persona_id: &Uuid,
    ) -> Result<Vec<SharedMemory>, RepositoryError> {
        Ok(self
            .shared
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.shared_with_companions.contains(persona_id))
            .cloned()
            .collect())
    }

    async fn list_by_origin(
        &self,
        persona_id: &Uuid,
    ) -> Result<Vec<SharedMemory>, RepositoryError> {
        Ok(self
            .shared
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.origin_persona_id == *persona_id)
            .cloned()
            .collect())
    }

    async fn touch_shared(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut guard = self.shared.lock().unwrap();
        let shared = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        shared.last_referenced = at;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRelationshipRepository {
    relationships: Mutex<HashMap<(Uuid, Uuid), PersonaRelationship>>,
}

impl MockRelationshipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, relationship: PersonaRelationship) -> Self {
        self.relationships.lock().unwrap().insert(
            (relationship.persona_a, relationship.persona_b),
            relationship,
        );
        self
    }
}

impl RelationshipRepository for MockRelationshipRepository {
    async fn get_relationship(
        &self,
        a: &Uuid,
        b: &Uuid,
    ) -> Result<Option<PersonaRelationship>, RepositoryError> {
        let key = PersonaRelationship::canonical_pair(*a, *b);
        Ok(self.relationships.lock().unwrap().get(&key).cloned())
    }

    async fn upsert_relationship(
        &self,
        relationship: &PersonaRelationship,
    ) -> Result<(), RepositoryError> {
        self.relationships.lock().unwrap().insert(
            (relationship.persona_a, relationship.persona_b),
            relationship.clone(),
        );
        Ok(())
    }

    async fn list_for_persona(
        &self,
        persona_id: &Uuid,
    ) -> Result<Vec<PersonaRelationship>, RepositoryError> {
        Ok(self
            .relationships
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.involves(persona_id))
            .cloned()
            .collect())
    }

    async fn list_relationships(&self) -> Result<Vec<PersonaRelationship>, RepositoryError> {
        Ok(self.relationships.lock().unwrap().values().cloned().collect())
    }
}
