//! Aging engine: access strengthening and the consolidation pass.
//!
//! The engine is an explicitly constructed service holding its policy and a
//! handle to the memory store. Consolidation first rechecks one owner's
//! archived memories and deletes those past the delete threshold, then walks
//! the non-archived memories in id-ordered chunks and routes each to delete,
//! archive, or consolidate. Every outcome for a single memory is one
//! repository write.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use kindred_types::config::AgingConfig;
use kindred_types::error::{ConsolidationError, RepositoryError};
use kindred_types::memory::{
    ConsolidationReport, ConsolidationUpdate, Memory, MemoryOwner, MemoryState,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use super::decay::DecayPolicy;
use super::fuzz::{self, FuzzinessTier};
use crate::memory::store::MemoryRepository;

/// Decay difference below which a persisted snapshot counts as current.
const DECAY_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// Per-memory outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Consolidated,
    Archived,
    Deleted,
    Unchanged,
}

/// Marks an owner scope as running for the lifetime of one pass.
struct RunGuard<'a> {
    running: &'a DashSet<MemoryOwner>,
    owner: MemoryOwner,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.remove(&self.owner);
    }
}

// ---------------------------------------------------------------------------
// AgingEngine
// ---------------------------------------------------------------------------

pub struct AgingEngine<M: MemoryRepository> {
    repo: Arc<M>,
    policy: DecayPolicy,
    batch_size: usize,
    interval: Duration,
    rng: Mutex<StdRng>,
    running: DashSet<MemoryOwner>,
    last_run: DashMap<MemoryOwner, DateTime<Utc>>,
}

impl<M: MemoryRepository> AgingEngine<M> {
    pub fn new(repo: Arc<M>, config: &AgingConfig) -> Self {
        Self::with_rng(repo, config, StdRng::from_entropy())
    }

    /// Build an engine whose fuzziness wording is reproducible.
    pub fn with_seed(repo: Arc<M>, config: &AgingConfig, seed: u64) -> Self {
        Self::with_rng(repo, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(repo: Arc<M>, config: &AgingConfig, rng: StdRng) -> Self {
        let interval_secs = i64::try_from(config.consolidation_interval_secs).unwrap_or(i64::MAX);
        Self {
            repo,
            policy: DecayPolicy::new(config),
            batch_size: config.batch_size.max(1),
            interval: Duration::try_seconds(interval_secs).unwrap_or(Duration::MAX),
            rng: Mutex::new(rng),
            running: DashSet::new(),
            last_run: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &DecayPolicy {
        &self.policy
    }

    pub fn repository(&self) -> &Arc<M> {
        &self.repo
    }

    /// Strengthen a memory: one atomic increment of `consolidation_count`
    /// plus a `last_accessed` refresh. Decay is not recomputed here.
    #[tracing::instrument(skip(self), fields(memory_id = %id))]
    pub async fn access_memory(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Memory, RepositoryError> {
        let memory = self.repo.record_access(id, now).await?;
        tracing::debug!(
            consolidation_count = memory.consolidation_count,
            "memory accessed"
        );
        Ok(memory)
    }

    /// Decay factor of `memory` at `now`, recomputed from its signals.
    pub fn current_decay(&self, memory: &Memory, now: DateTime<Utc>) -> f32 {
        self.policy.decay_factor(&memory.signals(), now)
    }

    /// Lifecycle state of `memory` at `now`.
    pub fn state(&self, memory: &Memory, now: DateTime<Utc>) -> MemoryState {
        if memory.is_archived {
            return MemoryState::Archived;
        }
        self.policy.state_for(self.current_decay(memory, now))
    }

    /// Text to present for `memory` at `now`.
    ///
    /// Reuses the persisted fuzzy rendering while it still belongs to the
    /// current tier; otherwise fuzzes afresh without persisting.
    pub fn render(&self, memory: &Memory, now: DateTime<Utc>) -> String {
        let tier = FuzzinessTier::from_decay(self.current_decay(memory, now));
        self.fuzzy_for_tier(memory, tier)
            .unwrap_or_else(|| memory.original_content.clone())
    }

    /// Memories already routed to the archive. Only reachable through here.
    pub async fn archived_memories(
        &self,
        owner: &MemoryOwner,
    ) -> Result<Vec<Memory>, RepositoryError> {
        self.repo.list_archived(owner).await
    }

    /// When the last pass for `owner` finished, if any ran in this process.
    pub fn last_run(&self, owner: &MemoryOwner) -> Option<DateTime<Utc>> {
        self.last_run.get(owner).map(|entry| *entry.value())
    }

    /// Run a pass only when the consolidation interval has elapsed since the
    /// previous one for this owner.
    pub async fn consolidate_if_due(
        &self,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
    ) -> Result<Option<ConsolidationReport>, ConsolidationError> {
        if let Some(last) = self.last_run(owner) {
            if now - last < self.interval {
                tracing::trace!(
                    user_id = %owner.user_id,
                    persona_id = %owner.persona_id,
                    "consolidation not due"
                );
                return Ok(None);
            }
        }
        self.run_consolidation(owner, now).await.map(Some)
    }

    /// Recompute decay for every memory of `owner` and route it.
    ///
    /// Archived memories are only ever deleted, never brought back.
    /// Per-memory failures are counted and logged; they never abort the pass
    /// and the memory is picked up again next time. Overlapping passes for
    /// the same owner are rejected.
    #[tracing::instrument(
        skip(self, owner),
        fields(user_id = %owner.user_id, persona_id = %owner.persona_id)
    )]
    pub async fn run_consolidation(
        &self,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport, ConsolidationError> {
        if !self.running.insert(*owner) {
            return Err(ConsolidationError::AlreadyRunning {
                user_id: owner.user_id,
                persona_id: owner.persona_id,
            });
        }
        let _guard = RunGuard {
            running: &self.running,
            owner: *owner,
        };

        let mut report = ConsolidationReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        self.review_archive(owner, now, &mut report).await?;

        let mut cursor: Option<Uuid> = None;
        loop {
            let chunk = self
                .repo
                .due_for_consolidation(owner, cursor, self.batch_size)
                .await?;
            let Some(last) = chunk.last() else { break };
            cursor = Some(last.id);
            let exhausted = chunk.len() < self.batch_size;

            for memory in &chunk {
                report.examined += 1;
                match self.consolidate_one(memory, now).await {
                    Ok(Outcome::Consolidated) => report.consolidated += 1,
                    Ok(Outcome::Archived) => report.archived += 1,
                    Ok(Outcome::Deleted) => report.deleted += 1,
                    Ok(Outcome::Unchanged) => report.unchanged += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(memory_id = %memory.id, error = %e, "failed to consolidate memory");
                    }
                }
            }

            if exhausted {
                break;
            }
        }

        report.finished_at = Some(Utc::now());
        self.last_run.insert(*owner, now);

        tracing::info!(
            examined = report.examined,
            consolidated = report.consolidated,
            archived = report.archived,
            deleted = report.deleted,
            unchanged = report.unchanged,
            failed = report.failed,
            "consolidation pass complete"
        );

        Ok(report)
    }

    /// Delete archived memories whose decay has fallen below the delete
    /// threshold. Runs before the active walk so memories archived in this
    /// pass are not examined twice.
    async fn review_archive(
        &self,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
        report: &mut ConsolidationReport,
    ) -> Result<(), RepositoryError> {
        let mut cursor: Option<Uuid> = None;
        loop {
            let chunk = self
                .repo
                .archived_for_review(owner, cursor, self.batch_size)
                .await?;
            let Some(last) = chunk.last() else { break };
            cursor = Some(last.id);
            let exhausted = chunk.len() < self.batch_size;

            for memory in &chunk {
                report.examined += 1;
                let decay = self.current_decay(memory, now);
                if self.policy.state_for(decay) != MemoryState::Deleted {
                    report.unchanged += 1;
                    continue;
                }
                match self.repo.delete_memory(&memory.id).await {
                    Ok(()) => {
                        report.deleted += 1;
                        tracing::debug!(memory_id = %memory.id, decay, "archived memory deleted");
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(memory_id = %memory.id, error = %e, "failed to delete archived memory");
                    }
                }
            }

            if exhausted {
                break;
            }
        }
        Ok(())
    }

    async fn consolidate_one(
        &self,
        memory: &Memory,
        now: DateTime<Utc>,
    ) -> Result<Outcome, RepositoryError> {
        let decay = self.current_decay(memory, now);

        match self.policy.state_for(decay) {
            MemoryState::Deleted => {
                self.repo.delete_memory(&memory.id).await?;
                tracing::debug!(memory_id = %memory.id, decay, "memory deleted");
                Ok(Outcome::Deleted)
            }
            MemoryState::Archived => {
                let update = ConsolidationUpdate {
                    decay_factor: decay,
                    fuzzy_content: self.fuzzy_for_tier(memory, FuzzinessTier::from_decay(decay)),
                    archive: true,
                    updated_at: now,
                };
                self.repo.apply_consolidation(&memory.id, &update).await?;
                tracing::debug!(memory_id = %memory.id, decay, "memory archived");
                Ok(Outcome::Archived)
            }
            MemoryState::Fresh | MemoryState::Consolidated => {
                let fuzzy_content = self.fuzzy_for_tier(memory, FuzzinessTier::from_decay(decay));
                if (memory.decay_factor - decay).abs() < DECAY_EPSILON
                    && memory.fuzzy_content == fuzzy_content
                {
                    return Ok(Outcome::Unchanged);
                }

                let update = ConsolidationUpdate {
                    decay_factor: decay,
                    fuzzy_content,
                    archive: false,
                    updated_at: now,
                };
                self.repo.apply_consolidation(&memory.id, &update).await?;
                Ok(Outcome::Consolidated)
            }
        }
    }

    /// Fuzzy rendering for `tier`, keeping the persisted one when its tier
    /// has not moved. `None` for the verbatim tier.
    fn fuzzy_for_tier(&self, memory: &Memory, tier: FuzzinessTier) -> Option<String> {
        if tier == FuzzinessTier::Verbatim {
            return None;
        }
        if let Some(existing) = &memory.fuzzy_content {
            if FuzzinessTier::from_decay(memory.decay_factor) == tier {
                return Some(existing.clone());
            }
        }

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(fuzz::apply(&memory.original_content, tier, &mut *rng))
    }
}
