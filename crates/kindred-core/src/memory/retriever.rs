//! Embedding-backed storage and recall of extracted facts.
//!
//! Storing embeds each fact once and skips the ones that fail; recall embeds
//! the query once and degrades to an empty result on any failure. Neither
//! path surfaces an error to the conversation flow.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kindred_types::config::{MemoryConfig, RetrievalConfig};
use kindred_types::error::EmbeddingError;
use kindred_types::extraction::ExtractedFact;
use kindred_types::memory::{InteractionContext, Memory, MemoryOwner, OwnerScope, RankedMemory};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::embedder::Embedder;
use super::extractor::FactExtractor;
use super::store::MemoryRepository;
use crate::aging::decay::DecayPolicy;

/// A fact that was not persisted, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFact {
    pub statement: String,
    pub reason: String,
}

/// Result of storing a batch of facts. Partial success is normal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreOutcome {
    pub stored: Vec<Uuid>,
    pub skipped: Vec<SkippedFact>,
}

pub struct EmbeddingRetriever<M: MemoryRepository, E: Embedder> {
    repo: Arc<M>,
    embedder: Arc<E>,
    extractor: FactExtractor,
    config: RetrievalConfig,
    policy: DecayPolicy,
}

impl<M: MemoryRepository, E: Embedder> EmbeddingRetriever<M, E> {
    pub fn new(repo: Arc<M>, embedder: Arc<E>, config: &MemoryConfig) -> Self {
        Self {
            repo,
            embedder,
            extractor: FactExtractor::new(&config.extraction),
            config: config.retrieval.clone(),
            policy: DecayPolicy::new(&config.aging),
        }
    }

    pub fn extractor(&self) -> &FactExtractor {
        &self.extractor
    }

    /// Embed and persist each fact as a memory owned by `owner`.
    ///
    /// Each fact gets exactly one embedding attempt. Embedding failures,
    /// empty or wrongly sized vectors, and save errors skip that fact only.
    #[tracing::instrument(
        skip(self, facts, owner, context),
        fields(user_id = %owner.user_id, persona_id = %owner.persona_id, facts = facts.len())
    )]
    pub async fn store_facts(
        &self,
        facts: &[ExtractedFact],
        owner: &MemoryOwner,
        context: &InteractionContext,
        now: DateTime<Utc>,
    ) -> StoreOutcome {
        let mut outcome = StoreOutcome::default();

        for fact in facts {
            let embedding = match self.embed_checked(&fact.statement).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(statement = %fact.statement, error = %e, "skipping fact");
                    outcome.skipped.push(SkippedFact {
                        statement: fact.statement.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let memory = build_memory(fact, owner, context, embedding, now);
            match self.repo.save_memory(&memory).await {
                Ok(()) => outcome.stored.push(memory.id),
                Err(e) => {
                    tracing::warn!(statement = %fact.statement, error = %e, "failed to save memory");
                    outcome.skipped.push(SkippedFact {
                        statement: fact.statement.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            stored = outcome.stored.len(),
            skipped = outcome.skipped.len(),
            "facts stored"
        );
        outcome
    }

    /// Extract facts from an exchange and store them in one call.
    pub async fn remember_exchange(
        &self,
        user_message: &str,
        reply: &str,
        owner: &MemoryOwner,
        session_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> StoreOutcome {
        let facts = self.extractor.extract_exchange(user_message, reply);
        if facts.is_empty() {
            return StoreOutcome::default();
        }

        let context = InteractionContext {
            participants: vec![owner.user_id, owner.persona_id],
            session_id,
            topics: FactExtractor::topics(&format!("{user_message} {reply}")),
        };
        self.store_facts(&facts, owner, &context, now).await
    }

    /// Memories of one persona relevant to `query`, at or above the
    /// similarity floor, most similar first.
    #[tracing::instrument(skip(self, query), fields(user_id = %user_id, persona_id = %persona_id))]
    pub async fn retrieve(
        &self,
        query: &str,
        user_id: Uuid,
        persona_id: Uuid,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedMemory> {
        let Some(embedding) = self.embed_query(query).await else {
            return Vec::new();
        };
        let scope = OwnerScope::Persona { user_id, persona_id };
        self.above_floor(self.search(&scope, &embedding, limit, now).await)
    }

    /// Like [`Self::retrieve`], across every persona of the user.
    #[tracing::instrument(skip(self, query), fields(user_id = %user_id))]
    pub async fn retrieve_across_personas(
        &self,
        query: &str,
        user_id: Uuid,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedMemory> {
        let Some(embedding) = self.embed_query(query).await else {
            return Vec::new();
        };
        self.above_floor(self.search(&OwnerScope::User { user_id }, &embedding, limit, now).await)
    }

    /// Raw nearest-neighbor search without the similarity floor.
    ///
    /// Memories whose recomputed decay has fallen below the archive
    /// threshold are treated as unavailable even before consolidation
    /// archives them. They are dropped before `limit` is applied, so they
    /// never take the place of a live match.
    pub async fn search(
        &self,
        scope: &OwnerScope,
        embedding: &[f32],
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedMemory> {
        match self.repo.similarity_search(scope, embedding, usize::MAX).await {
            Ok(results) => results
                .into_iter()
                .filter(|r| {
                    self.policy.decay_factor(&r.memory.signals(), now)
                        >= self.policy.archive_threshold()
                })
                .take(limit)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "similarity search failed");
                Vec::new()
            }
        }
    }

    /// Formatted context lines for reply generation.
    ///
    /// The persona query and the cross-persona query run independently and
    /// are merged same-persona first, so cross-persona noise never displaces
    /// same-persona matches. Every memory used is strengthened.
    pub async fn relevant_context(
        &self,
        query: &str,
        user_id: Uuid,
        persona_id: Uuid,
        include_cross_persona: bool,
        persona_names: &HashMap<Uuid, String>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let Some(embedding) = self.embed_query(query).await else {
            return Vec::new();
        };

        let own_scope = OwnerScope::Persona { user_id, persona_id };
        let mut ranked = self.above_floor(
            self.search(&own_scope, &embedding, self.config.default_limit, now)
                .await,
        );
        if include_cross_persona {
            let cross = self.above_floor(
                self.search(
                    &OwnerScope::User { user_id },
                    &embedding,
                    self.config.cross_persona_limit,
                    now,
                )
                .await,
            );
            ranked.extend(cross);
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for r in ranked {
            if !seen.insert(r.memory.id) {
                continue;
            }

            if let Err(e) = self.repo.record_access(&r.memory.id, now).await {
                tracing::warn!(memory_id = %r.memory.id, error = %e, "failed to record memory access");
            }

            let name = persona_names
                .get(&r.memory.persona_id)
                .cloned()
                .unwrap_or_else(|| r.memory.persona_id.to_string());
            lines.push(format!(
                "Relevant memory ({name}): {}",
                r.memory.display_content()
            ));
        }
        lines
    }

    fn above_floor(&self, ranked: Vec<RankedMemory>) -> Vec<RankedMemory> {
        ranked
            .into_iter()
            .filter(|r| r.similarity >= self.config.similarity_floor)
            .collect()
    }

    async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        match self.embed_checked(query).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, returning no memories");
                None
            }
        }
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.embedder.embed(text).await?;
        if vector.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        let expected = self.embedder.dimension();
        if expected > 0 && vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

fn build_memory(
    fact: &ExtractedFact,
    owner: &MemoryOwner,
    context: &InteractionContext,
    embedding: Vec<f32>,
    now: DateTime<Utc>,
) -> Memory {
    let mut memory = Memory::new(
        *owner,
        fact.statement.clone(),
        fact.memory_type,
        fact.confidence,
        now,
    );
    memory.embedding = Some(embedding);
    memory.tags = fact.tags.clone();
    memory.emotional_impact = fact.emotional_impact.clamp(-1.0, 1.0);

    for participant in &context.participants {
        if !memory.context.participants.contains(participant) {
            memory.context.participants.push(*participant);
        }
    }
    memory.context.session_id = context.session_id;
    memory.context.topics = context.topics.clone();
    memory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockMemoryRepository, StubEmbedder};
    use kindred_types::extraction::FactRule;
    use kindred_types::memory::MemoryType;

    fn fact(statement: &str) -> ExtractedFact {
        ExtractedFact {
            statement: statement.to_string(),
            memory_type: MemoryType::Preference,
            confidence: 0.8,
            rule: FactRule::Like,
            tags: vec!["interest".to_string()],
            emotional_impact: 0.5,
        }
    }

    fn stored(owner: MemoryOwner, content: &str, embedding: Vec<f32>) -> Memory {
        let mut m = Memory::new(owner, content, MemoryType::Preference, 0.8, Utc::now());
        m.embedding = Some(embedding);
        m
    }

    #[tokio::test]
    async fn test_store_skips_failed_embeddings_without_blocking_others() {
        let repo = Arc::new(MockMemoryRepository::new());
        let embedder = Arc::new(
            StubEmbedder::new(2)
                .with("User likes tea", vec![1.0, 0.0])
                .with("User likes jazz", vec![])
                .with("User likes chess", vec![1.0, 0.0, 0.0])
                .with("User likes rain", vec![0.0, 1.0]),
        );
        let retriever = EmbeddingRetriever::new(repo.clone(), embedder.clone(), &MemoryConfig::default());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());

        let facts = [
            fact("User likes tea"),
            fact("User likes jazz"),
            fact("User likes chess"),
            fact("User likes unknown things"),
            fact("User likes rain"),
        ];
        let outcome = retriever
            .store_facts(&facts, &owner, &InteractionContext::default(), Utc::now())
            .await;

        assert_eq!(outcome.stored.len(), 2);
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(embedder.calls(), 5);
        assert_eq!(repo.len(), 2);

        let saved = repo.snapshot(&outcome.stored[0]).unwrap();
        assert_eq!(saved.importance_score, 0.8);
        assert_eq!(saved.tags, vec!["interest".to_string()]);
        assert!(saved.embedding.is_some());
    }

    #[tokio::test]
    async fn test_store_skips_save_failures() {
        let repo = Arc::new(MockMemoryRepository::new());
        repo.fail_saves_of("User likes tea");
        let embedder = Arc::new(
            StubEmbedder::new(2)
                .with("User likes tea", vec![1.0, 0.0])
                .with("User likes rain", vec![0.0, 1.0]),
        );
        let retriever = EmbeddingRetriever::new(repo.clone(), embedder, &MemoryConfig::default());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());

        let outcome = retriever
            .store_facts(
                &[fact("User likes tea"), fact("User likes rain")],
                &owner,
                &InteractionContext::default(),
                Utc::now(),
            )
            .await;
        assert_eq!(outcome.stored.len(), 1);
        assert_eq!(outcome.skipped[0].statement, "User likes tea");
    }

    #[tokio::test]
    async fn test_retrieve_applies_similarity_floor() {
        let repo = Arc::new(MockMemoryRepository::new());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let close = stored(owner, "User loves pepperoni pizza", vec![0.9, 0.435_889_9]);
        let far = stored(owner, "User has a dog", vec![0.6, 0.8]);
        let close_id = close.id;
        repo.insert(close);
        repo.insert(far);

        let embedder = Arc::new(StubEmbedder::new(2).with("pizza preferences", vec![1.0, 0.0]));
        let retriever = EmbeddingRetriever::new(repo, embedder, &MemoryConfig::default());

        let results = retriever
            .retrieve("pizza preferences", owner.user_id, owner.persona_id, 5, Utc::now())
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory.id, close_id);
        assert!((results[0].similarity - 0.9).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_retrieve_degrades_to_empty_on_embedding_failure() {
        let repo = Arc::new(MockMemoryRepository::new());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        repo.insert(stored(owner, "User loves pizza", vec![1.0, 0.0]));

        let retriever = EmbeddingRetriever::new(repo, Arc::new(StubEmbedder::new(2)), &MemoryConfig::default());
        let results = retriever
            .retrieve("anything", owner.user_id, owner.persona_id, 5, Utc::now())
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_is_scoped_to_persona() {
        let repo = Arc::new(MockMemoryRepository::new());
        let user = Uuid::now_v7();
        let mine = MemoryOwner::new(user, Uuid::now_v7());
        let other = MemoryOwner::new(user, Uuid::now_v7());
        repo.insert(stored(mine, "User loves pizza", vec![1.0, 0.0]));
        repo.insert(stored(other, "User loves pizza too", vec![1.0, 0.01]));

        let embedder = Arc::new(StubEmbedder::new(2).with("pizza", vec![1.0, 0.0]));
        let retriever = EmbeddingRetriever::new(repo, embedder, &MemoryConfig::default());

        let own = retriever.retrieve("pizza", user, mine.persona_id, 5, Utc::now()).await;
        assert_eq!(own.len(), 1);
        let all = retriever.retrieve_across_personas("pizza", user, 5, Utc::now()).await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_decayed_memories_are_not_recalled() {
        let repo = Arc::new(MockMemoryRepository::new());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let now = Utc::now();
        let mut old = stored(owner, "User loves pizza", vec![1.0, 0.0]);
        old.importance_score = 0.0;
        old.created_at = now - chrono::Duration::days(20);
        repo.insert(old);

        let embedder = Arc::new(StubEmbedder::new(2).with("pizza", vec![1.0, 0.0]));
        let retriever = EmbeddingRetriever::new(repo, embedder, &MemoryConfig::default());
        assert!(retriever
            .retrieve("pizza", owner.user_id, owner.persona_id, 5, now)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_decayed_top_match_does_not_take_a_result_slot() {
        let repo = Arc::new(MockMemoryRepository::new());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let now = Utc::now();
        let mut old = stored(owner, "User loves pizza", vec![1.0, 0.0]);
        old.importance_score = 0.0;
        old.created_at = now - chrono::Duration::days(20);
        let recent = stored(owner, "User ordered pizza on Friday", vec![0.95, 0.3122]);
        let recent_id = recent.id;
        repo.insert(old);
        repo.insert(recent);

        let embedder = Arc::new(StubEmbedder::new(2).with("pizza", vec![1.0, 0.0]));
        let retriever = EmbeddingRetriever::new(repo, embedder, &MemoryConfig::default());
        let ranked = retriever
            .retrieve("pizza", owner.user_id, owner.persona_id, 1, now)
            .await;
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].memory.id, recent_id);
    }

    #[tokio::test]
    async fn test_relevant_context_merges_same_persona_first_and_strengthens() {
        let repo = Arc::new(MockMemoryRepository::new());
        let user = Uuid::now_v7();
        let nova = MemoryOwner::new(user, Uuid::now_v7());
        let sage = MemoryOwner::new(user, Uuid::now_v7());

        let own = stored(nova, "User loves pizza", vec![0.8, 0.6]);
        let cross = stored(sage, "User ordered pizza on Friday", vec![1.0, 0.0]);
        let noise = stored(sage, "User dislikes olives", vec![0.5, 0.866]);
        let own_id = own.id;
        repo.insert(own);
        repo.insert(cross);
        repo.insert(noise);

        let embedder = Arc::new(StubEmbedder::new(2).with("pizza", vec![1.0, 0.0]));
        let retriever = EmbeddingRetriever::new(repo.clone(), embedder, &MemoryConfig::default());

        let mut names = HashMap::new();
        names.insert(nova.persona_id, "Nova".to_string());
        names.insert(sage.persona_id, "Sage".to_string());

        let lines = retriever
            .relevant_context("pizza", user, nova.persona_id, true, &names, Utc::now())
            .await;
        assert_eq!(
            lines,
            vec![
                "Relevant memory (Nova): User loves pizza".to_string(),
                "Relevant memory (Sage): User ordered pizza on Friday".to_string(),
            ]
        );
        assert_eq!(repo.snapshot(&own_id).unwrap().consolidation_count, 1);

        let own_only = retriever
            .relevant_context("pizza", user, nova.persona_id, false, &names, Utc::now())
            .await;
        assert_eq!(own_only.len(), 1);
    }

    #[tokio::test]
    async fn test_remember_exchange_extracts_and_stores() {
        let repo = Arc::new(MockMemoryRepository::new());
        let embedder = Arc::new(
            StubEmbedder::new(2)
                .with("User's name is Alice", vec![1.0, 0.0])
                .with("User works as a nurse", vec![0.0, 1.0]),
        );
        let retriever = EmbeddingRetriever::new(repo.clone(), embedder, &MemoryConfig::default());
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());

        let outcome = retriever
            .remember_exchange("My name is Alice. I work as a nurse.", "Nice to meet you!", &owner, None, Utc::now())
            .await;
        assert_eq!(outcome.stored.len(), 2);
        let saved = repo.snapshot(&outcome.stored[1]).unwrap();
        assert_eq!(saved.original_content, "User works as a nurse");
        assert_eq!(saved.context.topics, vec![kindred_types::extraction::Topic::Work]);
    }
}
