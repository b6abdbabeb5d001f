//! SharedMemoryNetwork: cross-persona sharing, connections and derived views.
//!
//! Generic over the memory, shared-memory and relationship repositories so
//! it can be tested with in-memory doubles and wired to SQLite in the binary.
//! Relationship strength and trust are external signals: sharing and
//! connection events only bump counters and `last_interaction`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kindred_types::config::{MemoryConfig, SharingConfig};
use kindred_types::error::{ConnectionError, RepositoryError, SharingError};
use kindred_types::memory::{
    ConnectionKind, Memory, MemoryConnection, MemoryOwner, PermissionLevel, SharedMemory,
};
use kindred_types::network::{
    AccessibleMemory, AutoShareReport, ImportResult, MemoryCluster, NetworkInsight, NetworkNode,
    PersonaRelationship,
};
use uuid::Uuid;

use super::clustering::cluster_memories;
use super::export::{export_tree, import_tree};
use super::graph::PersonaGraph;
use super::insights::generate_insights;
use super::store::{RelationshipRepository, SharedMemoryRepository};
use crate::aging::decay::DecayPolicy;
use crate::memory::store::MemoryRepository;

pub struct SharedMemoryNetwork<M, S, R>
where
    M: MemoryRepository,
    S: SharedMemoryRepository,
    R: RelationshipRepository,
{
    memories: Arc<M>,
    shared: Arc<S>,
    relationships: Arc<R>,
    config: SharingConfig,
    policy: DecayPolicy,
}

impl<M, S, R> SharedMemoryNetwork<M, S, R>
where
    M: MemoryRepository,
    S: SharedMemoryRepository,
    R: RelationshipRepository,
{
    pub fn new(memories: Arc<M>, shared: Arc<S>, relationships: Arc<R>, config: &MemoryConfig) -> Self {
        Self {
            memories,
            shared,
            relationships,
            config: config.sharing.clone(),
            policy: DecayPolicy::new(&config.aging),
        }
    }

    async fn graph_for(&self, persona: &Uuid) -> Result<PersonaGraph, RepositoryError> {
        let relationships = self.relationships.list_for_persona(persona).await?;
        Ok(PersonaGraph::from_relationships(relationships))
    }

    async fn relationship_or_new(
        &self,
        a: &Uuid,
        b: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<PersonaRelationship, RepositoryError> {
        Ok(match self.relationships.get_relationship(a, b).await? {
            Some(existing) => existing,
            None => PersonaRelationship::new(
                *a,
                *b,
                self.config.initial_relationship_strength,
                self.config.initial_trust,
                now,
            ),
        })
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    /// Share a memory owned by `from` with the eligible subset of `to`.
    ///
    /// Eligibility requires relationship strength and trust at or above the
    /// configured minimums. The original memory is never modified.
    #[tracing::instrument(skip(self, to), fields(memory_id = %memory_id, from = %from, requested = to.len()))]
    pub async fn share_memory(
        &self,
        memory_id: &Uuid,
        from: &Uuid,
        to: &[Uuid],
        permission: Option<PermissionLevel>,
        now: DateTime<Utc>,
    ) -> Result<SharedMemory, SharingError> {
        let memory = self
            .memories
            .get_memory(memory_id)
            .await?
            .ok_or(SharingError::MemoryNotFound(*memory_id))?;
        if memory.persona_id != *from {
            return Err(SharingError::NotOwner {
                memory_id: *memory_id,
                persona_id: *from,
            });
        }

        let graph = self.graph_for(from).await?;
        let recipients = graph.eligible_recipients(
            from,
            to,
            self.config.min_relationship_strength,
            self.config.min_trust,
        );
        if recipients.is_empty() {
            return Err(SharingError::NoEligibleRecipients);
        }

        let level = permission.unwrap_or_default();
        let mut access_permissions = BTreeMap::new();
        for recipient in &recipients {
            access_permissions.insert(*recipient, level);
        }
        access_permissions.insert(*from, PermissionLevel::Admin);

        let shared = SharedMemory {
            id: Uuid::now_v7(),
            original_memory_id: memory.id,
            origin_persona_id: *from,
            user_id: memory.user_id,
            content: memory.original_content.clone(),
            memory_type: memory.memory_type,
            tags: memory.tags.clone(),
            importance_score: memory.importance_score,
            emotional_impact: memory.emotional_impact,
            access_permissions,
            shared_with_companions: recipients.clone(),
            created_at: now,
            last_referenced: now,
        };
        self.shared.save_shared(&shared).await?;

        for recipient in &recipients {
            let Some(existing) = graph.relationship(from, recipient) else { continue };
            let mut relationship = existing.clone();
            relationship.shared_memory_count += 1;
            relationship.last_interaction = now;
            if let Err(e) = self.relationships.upsert_relationship(&relationship).await {
                tracing::warn!(recipient = %recipient, error = %e, "failed to record sharing event");
            }
        }

        tracing::info!(shared_id = %shared.id, recipients = recipients.len(), "memory shared");
        Ok(shared)
    }

    /// Share every high-importance or emotionally strong memory of `owner`
    /// with each persona it is connected to above the strength threshold.
    ///
    /// Memories this persona already shared are not shared again. Individual
    /// failures are logged and counted as skipped.
    #[tracing::instrument(skip(self, owner), fields(persona_id = %owner.persona_id))]
    pub async fn auto_share_memories(
        &self,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
    ) -> Result<AutoShareReport, RepositoryError> {
        let memories = self.memories.list_memories(owner, false).await?;
        let already_shared: HashSet<Uuid> = self
            .shared
            .list_by_origin(&owner.persona_id)
            .await?
            .into_iter()
            .map(|s| s.original_memory_id)
            .collect();

        let candidates: Vec<&Memory> = memories
            .iter()
            .filter(|m| {
                m.importance_score > self.config.auto_share_importance
                    || m.emotional_impact.abs() > self.config.auto_share_emotional_impact
            })
            .collect();

        let mut report = AutoShareReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        let graph = self.graph_for(&owner.persona_id).await?;
        let connected = graph.connected(&owner.persona_id, self.config.min_relationship_strength);
        if connected.is_empty() {
            report.skipped = candidates.len();
            tracing::debug!("no connected personas, nothing auto-shared");
            return Ok(report);
        }

        for memory in candidates {
            if already_shared.contains(&memory.id) {
                report.skipped += 1;
                continue;
            }
            match self
                .share_memory(&memory.id, &owner.persona_id, &connected, None, now)
                .await
            {
                Ok(shared) => report.shared.push(shared.id),
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(memory_id = %memory.id, error = %e, "auto-share skipped memory");
                }
            }
        }

        tracing::info!(
            candidates = report.candidates,
            shared = report.shared.len(),
            skipped = report.skipped,
            "auto-share complete"
        );
        Ok(report)
    }

    /// A persona's own active memories plus memories shared with it.
    ///
    /// Deduplicated by the memory they derive from, most recently referenced
    /// first.
    pub async fn get_accessible_memories(
        &self,
        owner: &MemoryOwner,
    ) -> Result<Vec<AccessibleMemory>, RepositoryError> {
        let mut all: Vec<AccessibleMemory> = self
            .memories
            .list_memories(owner, false)
            .await?
            .into_iter()
            .map(AccessibleMemory::Own)
            .collect();

        all.extend(
            self.shared
                .list_for_recipient(&owner.persona_id)
                .await?
                .into_iter()
                .filter(|s| s.user_id == owner.user_id)
                .map(AccessibleMemory::Shared),
        );

        all.sort_by(|a, b| b.last_referenced().cmp(&a.last_referenced()));
        let mut seen = HashSet::new();
        all.retain(|m| seen.insert(m.source_id()));
        Ok(all)
    }

    /// Mark a shared memory as referenced by a recipient.
    pub async fn reference_shared(&self, id: &Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.shared.touch_shared(id, now).await
    }

    // -----------------------------------------------------------------------
    // Connections and relationships
    // -----------------------------------------------------------------------

    /// Append a typed connection from memory `a` to memory `b`.
    ///
    /// When the two memories belong to different personas the pair's
    /// relationship record is created if needed and its connection count
    /// bumped.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_memory_connection(
        &self,
        from_persona: &Uuid,
        a: &Uuid,
        b: &Uuid,
        kind: ConnectionKind,
        description: &str,
        strength: f32,
        now: DateTime<Utc>,
    ) -> Result<MemoryConnection, ConnectionError> {
        if a == b {
            return Err(ConnectionError::SelfConnection);
        }
        let first = self
            .memories
            .get_memory(a)
            .await?
            .ok_or(ConnectionError::MemoryNotFound(*a))?;
        let second = self
            .memories
            .get_memory(b)
            .await?
            .ok_or(ConnectionError::MemoryNotFound(*b))?;

        let connection = MemoryConnection {
            target_memory_id: second.id,
            kind,
            strength: if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) },
            description: description.to_string(),
            created_by: *from_persona,
            created_at: now,
        };
        self.memories.add_connection(&first.id, &connection).await?;

        if first.persona_id != second.persona_id {
            let mut relationship = self
                .relationship_or_new(&first.persona_id, &second.persona_id, now)
                .await?;
            relationship.connection_count += 1;
            relationship.last_interaction = now;
            if let Err(e) = self.relationships.upsert_relationship(&relationship).await {
                tracing::warn!(error = %e, "failed to record connection on relationship");
            }
        }

        tracing::debug!(from = %a, to = %b, kind = %kind, "memory connection created");
        Ok(connection)
    }

    /// Apply externally supplied relationship signals for a persona pair.
    pub async fn update_relationship_signals(
        &self,
        a: &Uuid,
        b: &Uuid,
        strength: f32,
        trust: f32,
        now: DateTime<Utc>,
    ) -> Result<PersonaRelationship, RepositoryError> {
        if a == b {
            return Err(RepositoryError::Conflict(
                "a persona cannot have a relationship with itself".to_string(),
            ));
        }
        let mut relationship = self.relationship_or_new(a, b, now).await?;
        relationship.relationship_strength = strength.clamp(0.0, 1.0);
        relationship.trust_level = trust.clamp(0.0, 1.0);
        relationship.last_interaction = now;
        self.relationships.upsert_relationship(&relationship).await?;
        Ok(relationship)
    }

    pub async fn relationships_of(
        &self,
        persona: &Uuid,
    ) -> Result<Vec<PersonaRelationship>, RepositoryError> {
        self.relationships.list_for_persona(persona).await
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    pub async fn memory_clusters(
        &self,
        owner: &MemoryOwner,
    ) -> Result<Vec<MemoryCluster>, RepositoryError> {
        let memories = self.memories.list_memories(owner, false).await?;
        Ok(cluster_memories(&memories, self.config.cluster_min_significance))
    }

    pub async fn network_insights(
        &self,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
    ) -> Result<Vec<NetworkInsight>, RepositoryError> {
        let memories = self.memories.list_memories(owner, false).await?;
        let relationships = self.relationships.list_for_persona(&owner.persona_id).await?;
        let clusters = cluster_memories(&memories, self.config.cluster_min_significance);
        Ok(generate_insights(
            &owner.persona_id,
            &relationships,
            &memories,
            &clusters,
            self.config.insight_window_days,
            now,
        ))
    }

    // -----------------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------------

    pub async fn export_network(
        &self,
        owner: &MemoryOwner,
        persona_label: &str,
        now: DateTime<Utc>,
    ) -> Result<NetworkNode, RepositoryError> {
        let memories = self.memories.list_memories(owner, false).await?;
        let shared: Vec<SharedMemory> = self
            .shared
            .list_for_recipient(&owner.persona_id)
            .await?
            .into_iter()
            .filter(|s| s.user_id == owner.user_id)
            .collect();
        Ok(export_tree(
            owner.persona_id,
            persona_label,
            &memories,
            &shared,
            &self.policy,
            now,
        ))
    }

    /// Import an exported tree into `owner`'s memories.
    ///
    /// Validation errors reject the tree before anything is written. The
    /// memories are saved as one unit, so a save failure leaves nothing
    /// imported.
    pub async fn import_network(
        &self,
        root: &NetworkNode,
        owner: &MemoryOwner,
        now: DateTime<Utc>,
    ) -> ImportResult {
        let (memories, mut result) = import_tree(root, *owner, now);
        if !result.success {
            return result;
        }

        if let Err(e) = self.memories.save_memories(&memories).await {
            result.imported = 0;
            result.success = false;
            result.errors.push(format!("failed to save imported memories: {e}"));
        }

        tracing::info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "network import finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockMemoryRepository, MockRelationshipRepository, MockSharedRepository};
    use kindred_types::memory::MemoryType;

    type Network = SharedMemoryNetwork<MockMemoryRepository, MockSharedRepository, MockRelationshipRepository>;

    struct Fixture {
        memories: Arc<MockMemoryRepository>,
        shared: Arc<MockSharedRepository>,
        relationships: Arc<MockRelationshipRepository>,
        network: Network,
    }

    fn fixture(relationships: MockRelationshipRepository) -> Fixture {
        let memories = Arc::new(MockMemoryRepository::new());
        let shared = Arc::new(MockSharedRepository::new());
        let relationships = Arc::new(relationships);
        let network = SharedMemoryNetwork::new(
            memories.clone(),
            shared.clone(),
            relationships.clone(),
            &MemoryConfig::default(),
        );
        Fixture {
            memories,
            shared,
            relationships,
            network,
        }
    }

    fn memory(owner: MemoryOwner, content: &str, importance: f32) -> Memory {
        Memory::new(owner, content, MemoryType::Experience, importance, Utc::now())
    }

    #[tokio::test]
    async fn test_share_below_strength_threshold_fails_without_record() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(
            MockRelationshipRepository::new()
                .with(PersonaRelationship::new(a, b, 0.5, 0.9, Utc::now())),
        );
        let m = memory(MemoryOwner::new(user, a), "User ran a marathon", 0.9);
        let id = m.id;
        fx.memories.insert(m);

        let err = fx.network.share_memory(&id, &a, &[b], None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SharingError::NoEligibleRecipients));
        assert_eq!(err.to_string(), "no eligible recipients");
        assert_eq!(fx.shared.len(), 0);
    }

    #[tokio::test]
    async fn test_share_creates_copy_and_leaves_original_untouched() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(
            MockRelationshipRepository::new()
                .with(PersonaRelationship::new(a, b, 0.7, 0.6, Utc::now())),
        );
        let owner_a = MemoryOwner::new(user, a);
        let m = memory(owner_a, "User ran a marathon", 0.9);
        let id = m.id;
        let before = m.clone();
        fx.memories.insert(m);

        let shared = fx
            .network
            .share_memory(&id, &a, &[b], Some(PermissionLevel::Write), Utc::now())
            .await
            .unwrap();
        assert_eq!(shared.permission_for(&a), Some(PermissionLevel::Admin));
        assert_eq!(shared.permission_for(&b), Some(PermissionLevel::Write));
        assert_eq!(shared.shared_with_companions, vec![b]);

        let accessible = fx
            .network
            .get_accessible_memories(&MemoryOwner::new(user, b))
            .await
            .unwrap();
        assert_eq!(accessible.len(), 1);
        assert_eq!(accessible[0].source_id(), id);
        assert_eq!(accessible[0].content(), "User ran a marathon");

        let after = fx.memories.snapshot(&id).unwrap();
        assert_eq!(after.original_content, before.original_content);
        assert_eq!(after.access_permissions, before.access_permissions);
        assert_eq!(after.shared_with_companions, before.shared_with_companions);
        assert_eq!(after.consolidation_count, before.consolidation_count);

        let rel = fx.relationships.get_relationship(&a, &b).await.unwrap().unwrap();
        assert_eq!(rel.shared_memory_count, 1);
        assert_eq!(rel.relationship_strength, 0.7);
    }

    #[tokio::test]
    async fn test_share_rejects_non_owner_and_missing_memory() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        let m = memory(MemoryOwner::new(user, a), "User likes tea", 0.5);
        let id = m.id;
        fx.memories.insert(m);

        let err = fx.network.share_memory(&id, &b, &[a], None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SharingError::NotOwner { .. }));
        let missing = Uuid::now_v7();
        let err = fx.network.share_memory(&missing, &a, &[b], None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SharingError::MemoryNotFound(x) if x == missing));
    }

    #[tokio::test]
    async fn test_accessible_memories_dedup_and_order() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(
            MockRelationshipRepository::new()
                .with(PersonaRelationship::new(a, b, 0.9, 0.9, Utc::now())),
        );
        let own_b = memory(MemoryOwner::new(user, b), "User likes tea", 0.5);
        fx.memories.insert(own_b);
        let m = memory(MemoryOwner::new(user, a), "User ran a marathon", 0.9);
        let id = m.id;
        fx.memories.insert(m);

        let later = Utc::now() + chrono::Duration::minutes(5);
        fx.network.share_memory(&id, &a, &[b], None, Utc::now()).await.unwrap();
        fx.network.share_memory(&id, &a, &[b], None, later).await.unwrap();

        let accessible = fx
            .network
            .get_accessible_memories(&MemoryOwner::new(user, b))
            .await
            .unwrap();
        assert_eq!(accessible.len(), 2);
        assert_eq!(accessible[0].last_referenced(), later);
    }

    #[tokio::test]
    async fn test_auto_share_picks_important_and_emotional_memories() {
        let user = Uuid::now_v7();
        let (a, close, weak) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(
            MockRelationshipRepository::new()
                .with(PersonaRelationship::new(a, close, 0.8, 0.8, Utc::now()))
                .with(PersonaRelationship::new(a, weak, 0.6, 0.8, Utc::now())),
        );
        let owner = MemoryOwner::new(user, a);
        fx.memories.insert(memory(owner, "User got married", 0.95));
        let mut emotional = memory(owner, "User lost their dog", 0.4);
        emotional.emotional_impact = -0.9;
        fx.memories.insert(emotional);
        fx.memories.insert(memory(owner, "User ate toast", 0.2));

        let report = fx.network.auto_share_memories(&owner, Utc::now()).await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.shared.len(), 2);
        assert_eq!(report.skipped, 0);

        let for_close = fx.shared.list_for_recipient(&close).await.unwrap();
        assert_eq!(for_close.len(), 2);
        assert!(fx.shared.list_for_recipient(&weak).await.unwrap().is_empty());

        let again = fx.network.auto_share_memories(&owner, Utc::now()).await.unwrap();
        assert!(again.shared.is_empty());
        assert_eq!(again.skipped, 2);
    }

    #[tokio::test]
    async fn test_auto_share_without_connections_shares_nothing() {
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        fx.memories.insert(memory(owner, "User got married", 0.95));

        let report = fx.network.auto_share_memories(&owner, Utc::now()).await.unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(fx.shared.len(), 0);
    }

    #[tokio::test]
    async fn test_cross_persona_connection_creates_relationship() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        let ma = memory(MemoryOwner::new(user, a), "User plans a trip to Peru", 0.5);
        let mb = memory(MemoryOwner::new(user, b), "User is learning Spanish", 0.5);
        let (ida, idb) = (ma.id, mb.id);
        fx.memories.insert(ma);
        fx.memories.insert(mb);

        let conn = fx
            .network
            .create_memory_connection(&a, &ida, &idb, ConnectionKind::Related, "travel prep", 1.4, Utc::now())
            .await
            .unwrap();
        assert_eq!(conn.strength, 1.0);
        assert_eq!(fx.memories.snapshot(&ida).unwrap().connections.len(), 1);
        assert!(fx.memories.snapshot(&idb).unwrap().connections.is_empty());

        let rel = fx.relationships.get_relationship(&b, &a).await.unwrap().unwrap();
        assert_eq!(rel.connection_count, 1);
        assert_eq!(rel.relationship_strength, 0.5);
        assert_eq!(rel.trust_level, 0.5);
    }

    #[tokio::test]
    async fn test_connection_errors() {
        let fx = fixture(MockRelationshipRepository::new());
        let id = Uuid::now_v7();
        let err = fx
            .network
            .create_memory_connection(&Uuid::now_v7(), &id, &id, ConnectionKind::Similar, "", 0.5, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::SelfConnection));

        let err = fx
            .network
            .create_memory_connection(&Uuid::now_v7(), &id, &Uuid::now_v7(), ConnectionKind::Similar, "", 0.5, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::MemoryNotFound(x) if x == id));
    }

    #[tokio::test]
    async fn test_relationship_signals_enable_sharing() {
        let user = Uuid::now_v7();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        let m = memory(MemoryOwner::new(user, a), "User won a prize", 0.9);
        let id = m.id;
        fx.memories.insert(m);

        assert!(fx.network.share_memory(&id, &a, &[b], None, Utc::now()).await.is_err());
        let rel = fx
            .network
            .update_relationship_signals(&b, &a, 0.75, 0.6, Utc::now())
            .await
            .unwrap();
        assert_eq!(rel.relationship_strength, 0.75);
        assert!(fx.network.share_memory(&id, &a, &[b], None, Utc::now()).await.is_ok());

        assert!(fx.network.update_relationship_signals(&a, &a, 0.5, 0.5, Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_export_import_through_service() {
        let user = Uuid::now_v7();
        let source = MemoryOwner::new(user, Uuid::now_v7());
        let target = MemoryOwner::new(user, Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        fx.memories.insert(memory(source, "User loves sailing", 0.7));

        let tree = fx.network.export_network(&source, "Nova", Utc::now()).await.unwrap();
        let result = fx.network.import_network(&tree, &target, Utc::now()).await;
        assert!(result.success);
        assert_eq!(result.imported, 1);

        let imported = fx.memories.list_memories(&target, false).await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].original_content, "User loves sailing");
    }

    #[tokio::test]
    async fn test_import_save_failure_leaves_nothing_behind() {
        let user = Uuid::now_v7();
        let source = MemoryOwner::new(user, Uuid::now_v7());
        let target = MemoryOwner::new(user, Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        fx.memories.insert(memory(source, "User loves sailing", 0.7));
        fx.memories.insert(memory(source, "User fears heights", 0.4));
        fx.memories.fail_saves_of("User fears heights");

        let tree = fx.network.export_network(&source, "Nova", Utc::now()).await.unwrap();
        let result = fx.network.import_network(&tree, &target, Utc::now()).await;
        assert!(!result.success);
        assert_eq!(result.imported, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(fx.memories.list_memories(&target, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clusters_and_insights() {
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let fx = fixture(MockRelationshipRepository::new());
        for i in 0..4 {
            let mut m = memory(owner, &format!("User was happy about event {i}"), 0.5);
            m.emotional_impact = 0.6;
            fx.memories.insert(m);
        }

        let clusters = fx.network.memory_clusters(&owner).await.unwrap();
        assert_eq!(clusters.len(), 1);

        let insights = fx.network.network_insights(&owner, Utc::now()).await.unwrap();
        let kinds: Vec<_> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                kindred_types::network::InsightKind::DominantTheme,
                kindred_types::network::InsightKind::EmotionalTrend
            ]
        );
    }
}
