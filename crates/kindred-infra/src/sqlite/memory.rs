//! SQLite memory repository implementation.
//!
//! Implements `MemoryRepository` from `kindred-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the reader
//! pool and every mutation as one statement on the writer.

use chrono::{DateTime, Utc};
use kindred_core::memory::store::MemoryRepository;
use kindred_core::memory::vector::rank_by_similarity;
use kindred_types::error::RepositoryError;
use kindred_types::memory::{
    ConsolidationUpdate, Memory, MemoryConnection, MemoryOwner, MemoryType, OwnerScope,
    RankedMemory,
};
use sqlx::Row;
use uuid::Uuid;

use super::codec::{
    decode_embedding, encode_embedding, format_datetime, from_json, parse_datetime, parse_uuid,
    query_err, to_json,
};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `MemoryRepository`.
pub struct SqliteMemoryRepository {
    pool: DatabasePool,
}

impl SqliteMemoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_many<'q>(
        &self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let rows = query.fetch_all(&self.pool.reader).await.map_err(query_err)?;
        rows.iter()
            .map(|row| MemoryRow::from_row(row).map_err(query_err)?.into_memory())
            .collect()
    }

    /// Id-ordered page of one owner's archived or active memories.
    async fn chunk(
        &self,
        owner: &MemoryOwner,
        archived: bool,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let after = after.map(|id| id.to_string());
        let query = sqlx::query(
            "SELECT * FROM memories
             WHERE user_id = ? AND persona_id = ? AND is_archived = ?
               AND (? IS NULL OR id > ?)
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(owner.user_id.to_string())
        .bind(owner.persona_id.to_string())
        .bind(i64::from(archived))
        .bind(after.clone())
        .bind(after)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX));
        self.fetch_many(query).await
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MemoryRow {
    id: String,
    user_id: String,
    persona_id: String,
    original_content: String,
    fuzzy_content: Option<String>,
    embedding: Option<Vec<u8>>,
    memory_type: String,
    tags: String,
    importance_score: f64,
    emotional_impact: f64,
    decay_factor: f64,
    consolidation_count: i64,
    created_at: String,
    last_accessed: String,
    last_updated: String,
    is_archived: i64,
    connections: String,
    access_permissions: String,
    shared_with_companions: String,
    context: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            persona_id: row.try_get("persona_id")?,
            original_content: row.try_get("original_content")?,
            fuzzy_content: row.try_get("fuzzy_content")?,
            embedding: row.try_get("embedding")?,
            memory_type: row.try_get("memory_type")?,
            tags: row.try_get("tags")?,
            importance_score: row.try_get("importance_score")?,
            emotional_impact: row.try_get("emotional_impact")?,
            decay_factor: row.try_get("decay_factor")?,
            consolidation_count: row.try_get("consolidation_count")?,
            created_at: row.try_get("created_at")?,
            last_accessed: row.try_get("last_accessed")?,
            last_updated: row.try_get("last_updated")?,
            is_archived: row.try_get("is_archived")?,
            connections: row.try_get("connections")?,
            access_permissions: row.try_get("access_permissions")?,
            shared_with_companions: row.try_get("shared_with_companions")?,
            context: row.try_get("context")?,
        })
    }

    fn into_memory(self) -> Result<Memory, RepositoryError> {
        let memory_type: MemoryType = self.memory_type.parse().map_err(RepositoryError::Query)?;
        let embedding = self.embedding.as_deref().map(decode_embedding).transpose()?;

        Ok(Memory {
            id: parse_uuid(&self.id, "memory id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            persona_id: parse_uuid(&self.persona_id, "persona_id")?,
            original_content: self.original_content,
            fuzzy_content: self.fuzzy_content,
            embedding,
            memory_type,
            tags: from_json(&self.tags, "tags")?,
            importance_score: self.importance_score as f32,
            emotional_impact: self.emotional_impact as f32,
            decay_factor: self.decay_factor as f32,
            consolidation_count: u32::try_from(self.consolidation_count).unwrap_or(u32::MAX),
            created_at: parse_datetime(&self.created_at)?,
            last_accessed: parse_datetime(&self.last_accessed)?,
            last_updated: parse_datetime(&self.last_updated)?,
            is_archived: self.is_archived != 0,
            connections: from_json(&self.connections, "connections")?,
            access_permissions: from_json(&self.access_permissions, "access_permissions")?,
            shared_with_companions: from_json(
                &self.shared_with_companions,
                "shared_with_companions",
            )?,
            context: from_json(&self.context, "context")?,
        })
    }
}

fn insert_query(
    memory: &Memory,
) -> Result<sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>>, RepositoryError> {
    Ok(sqlx::query(
        r#"INSERT INTO memories (id, user_id, persona_id, original_content, fuzzy_content, embedding,
               memory_type, tags, importance_score, emotional_impact, decay_factor, consolidation_count,
               created_at, last_accessed, last_updated, is_archived, connections, access_permissions,
               shared_with_companions, context)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(memory.id.to_string())
    .bind(memory.user_id.to_string())
    .bind(memory.persona_id.to_string())
    .bind(&memory.original_content)
    .bind(memory.fuzzy_content.as_deref())
    .bind(memory.embedding.as_deref().map(encode_embedding))
    .bind(memory.memory_type.to_string())
    .bind(to_json(&memory.tags)?)
    .bind(f64::from(memory.importance_score))
    .bind(f64::from(memory.emotional_impact))
    .bind(f64::from(memory.decay_factor))
    .bind(i64::from(memory.consolidation_count))
    .bind(format_datetime(&memory.created_at))
    .bind(format_datetime(&memory.last_accessed))
    .bind(format_datetime(&memory.last_updated))
    .bind(i64::from(memory.is_archived))
    .bind(to_json(&memory.connections)?)
    .bind(to_json(&memory.access_permissions)?)
    .bind(to_json(&memory.shared_with_companions)?)
    .bind(to_json(&memory.context)?))
}

fn insert_err(e: sqlx::Error, memory: &Memory) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.message().contains("UNIQUE") {
            return RepositoryError::Conflict(format!("memory {} already exists", memory.id));
        }
    }
    query_err(e)
}

// ---------------------------------------------------------------------------
// MemoryRepository implementation
// ---------------------------------------------------------------------------

impl MemoryRepository for SqliteMemoryRepository {
    async fn save_memory(&self, memory: &Memory) -> Result<(), RepositoryError> {
        insert_query(memory)?
            .execute(&self.pool.writer)
            .await
            .map_err(|e| insert_err(e, memory))?;
        Ok(())
    }

    async fn save_memories(&self, memories: &[Memory]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        for memory in memories {
            insert_query(memory)?
                .execute(&mut *tx)
                .await
                .map_err(|e| insert_err(e, memory))?;
        }
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_memory(&self, id: &Uuid) -> Result<Option<Memory>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM memories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.map(|r| MemoryRow::from_row(&r).map_err(query_err)?.into_memory())
            .transpose()
    }

    async fn list_memories(
        &self,
        owner: &MemoryOwner,
        include_archived: bool,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let query = sqlx::query(
            "SELECT * FROM memories
             WHERE user_id = ? AND persona_id = ? AND (? OR is_archived = 0)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner.user_id.to_string())
        .bind(owner.persona_id.to_string())
        .bind(include_archived);
        self.fetch_many(query).await
    }

    async fn list_archived(&self, owner: &MemoryOwner) -> Result<Vec<Memory>, RepositoryError> {
        let query = sqlx::query(
            "SELECT * FROM memories
             WHERE user_id = ? AND persona_id = ? AND is_archived = 1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner.user_id.to_string())
        .bind(owner.persona_id.to_string());
        self.fetch_many(query).await
    }

    async fn similarity_search(
        &self,
        scope: &OwnerScope,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RankedMemory>, RepositoryError> {
        let query = sqlx::query(
            "SELECT * FROM memories
             WHERE user_id = ? AND (? IS NULL OR persona_id = ?)
               AND is_archived = 0 AND embedding IS NOT NULL",
        )
        .bind(scope.user_id().to_string())
        .bind(scope.persona_id().map(|p| p.to_string()))
        .bind(scope.persona_id().map(|p| p.to_string()));

        let candidates = self.fetch_many(query).await?;
        Ok(rank_by_similarity(candidates, query_embedding, limit))
    }

    async fn due_for_consolidation(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        self.chunk(owner, false, after, limit).await
    }

    async fn archived_for_review(
        &self,
        owner: &MemoryOwner,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        self.chunk(owner, true, after, limit).await
    }

    async fn record_access(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Memory, RepositoryError> {
        let row = sqlx::query(
            "UPDATE memories
             SET consolidation_count = consolidation_count + 1, last_accessed = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_err)?
        .ok_or(RepositoryError::NotFound)?;

        MemoryRow::from_row(&row).map_err(query_err)?.into_memory()
    }

    async fn apply_consolidation(
        &self,
        id: &Uuid,
        update: &ConsolidationUpdate,
    ) -> Result<(), RepositoryError> {
        // Archiving is one-way; the flag is never cleared here.
        let result = sqlx::query(
            "UPDATE memories
             SET decay_factor = ?, fuzzy_content = ?, is_archived = MAX(is_archived, ?), last_updated = ?
             WHERE id = ?",
        )
        .bind(f64::from(update.decay_factor))
        .bind(update.fuzzy_content.as_deref())
        .bind(i64::from(update.archive))
        .bind(format_datetime(&update.updated_at))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn add_connection(
        &self,
        id: &Uuid,
        connection: &MemoryConnection,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE memories SET connections = json_insert(connections, '$[#]', json(?)) WHERE id = ?",
        )
        .bind(to_json(connection)?)
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_memory(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM memories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn owner_scopes(&self) -> Result<Vec<MemoryOwner>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT DISTINCT user_id, persona_id FROM memories ORDER BY user_id, persona_id",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|(user, persona)| {
                Ok(MemoryOwner::new(
                    parse_uuid(user, "user_id")?,
                    parse_uuid(persona, "persona_id")?,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kindred_types::memory::ConnectionKind;

    async fn setup() -> (tempfile::TempDir, SqliteMemoryRepository) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("memories.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, SqliteMemoryRepository::new(pool))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn memory(owner: MemoryOwner, content: &str, embedding: Option<Vec<f32>>) -> Memory {
        let mut m = Memory::new(owner, content, MemoryType::Preference, 0.6, t0());
        m.embedding = embedding;
        m
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let mut m = memory(owner, "User loves hiking", Some(vec![0.1, 0.2, 0.3]));
        m.tags = vec!["hobbies".to_string()];
        m.emotional_impact = 0.5;
        repo.save_memory(&m).await.unwrap();

        let got = repo.get_memory(&m.id).await.unwrap().unwrap();
        assert_eq!(got.original_content, "User loves hiking");
        assert_eq!(got.embedding, Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(got.tags, vec!["hobbies".to_string()]);
        assert_eq!(got.memory_type, MemoryType::Preference);
        assert_eq!(got.importance_score, 0.6);
        assert_eq!(got.emotional_impact, 0.5);
        assert_eq!(got.created_at, t0());
        assert_eq!(got.access_permissions, m.access_permissions);
        assert_eq!(got.context, m.context);
        assert!(!got.is_archived);

        assert!(repo.get_memory(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_save_is_conflict() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let m = memory(owner, "User is from Lisbon", None);
        repo.save_memory(&m).await.unwrap();
        let err = repo.save_memory(&m).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_archive_filter() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let mut old = memory(owner, "old", None);
        old.created_at = t0() - Duration::days(2);
        let new = memory(owner, "new", None);
        let mut archived = memory(owner, "archived", None);
        archived.is_archived = true;
        for m in [&old, &new, &archived] {
            repo.save_memory(m).await.unwrap();
        }

        let active = repo.list_memories(&owner, false).await.unwrap();
        let contents: Vec<&str> = active.iter().map(|m| m.original_content.as_str()).collect();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1], "old");

        assert_eq!(repo.list_memories(&owner, true).await.unwrap().len(), 3);
        let only_archived = repo.list_archived(&owner).await.unwrap();
        assert_eq!(only_archived.len(), 1);
        assert_eq!(only_archived[0].id, archived.id);
    }

    #[tokio::test]
    async fn test_similarity_search_respects_scope_and_archive() {
        let (_dir, repo) = setup().await;
        let user = Uuid::now_v7();
        let mine = MemoryOwner::new(user, Uuid::now_v7());
        let sibling = MemoryOwner::new(user, Uuid::now_v7());
        let stranger = MemoryOwner::new(Uuid::now_v7(), mine.persona_id);

        let close = memory(mine, "close", Some(vec![1.0, 0.0]));
        let far = memory(mine, "far", Some(vec![0.0, 1.0]));
        let mut archived = memory(mine, "archived", Some(vec![1.0, 0.0]));
        archived.is_archived = true;
        let unembedded = memory(mine, "unembedded", None);
        let other_persona = memory(sibling, "sibling", Some(vec![0.9, 0.1]));
        let other_user = memory(stranger, "stranger", Some(vec![1.0, 0.0]));
        for m in [&close, &far, &archived, &unembedded, &other_persona, &other_user] {
            repo.save_memory(m).await.unwrap();
        }

        let ranked = repo.similarity_search(&mine.scope(), &[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<Uuid> = ranked.iter().map(|r| r.memory.id).collect();
        assert_eq!(ids, vec![close.id, far.id]);
        assert!(ranked[0].similarity > 0.99);

        let across = repo
            .similarity_search(&OwnerScope::User { user_id: user }, &[1.0, 0.0], 2)
            .await
            .unwrap();
        let ids: Vec<Uuid> = across.iter().map(|r| r.memory.id).collect();
        assert_eq!(ids, vec![close.id, other_persona.id]);
    }

    #[tokio::test]
    async fn test_due_for_consolidation_pages_by_id() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let mut ids = Vec::new();
        for i in 0..5 {
            let m = memory(owner, &format!("fact {i}"), None);
            ids.push(m.id);
            repo.save_memory(&m).await.unwrap();
        }
        ids.sort();

        let first = repo.due_for_consolidation(&owner, None, 2).await.unwrap();
        assert_eq!(first.iter().map(|m| m.id).collect::<Vec<_>>(), ids[..2]);

        let next = repo
            .due_for_consolidation(&owner, Some(ids[1]), 10)
            .await
            .unwrap();
        assert_eq!(next.iter().map(|m| m.id).collect::<Vec<_>>(), ids[2..]);
    }

    #[tokio::test]
    async fn test_archived_for_review_only_returns_archived() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let active = memory(owner, "User is learning piano", None);
        let mut archived = memory(owner, "User once lost an umbrella", None);
        archived.is_archived = true;
        repo.save_memory(&active).await.unwrap();
        repo.save_memory(&archived).await.unwrap();

        let review = repo.archived_for_review(&owner, None, 10).await.unwrap();
        assert_eq!(review.iter().map(|m| m.id).collect::<Vec<_>>(), vec![archived.id]);
        let due = repo.due_for_consolidation(&owner, None, 10).await.unwrap();
        assert_eq!(due.iter().map(|m| m.id).collect::<Vec<_>>(), vec![active.id]);

        let after = repo
            .archived_for_review(&owner, Some(archived.id), 10)
            .await
            .unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn test_save_memories_is_all_or_nothing() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let existing = memory(owner, "User has a cat", None);
        repo.save_memory(&existing).await.unwrap();

        let fresh = memory(owner, "User plays chess", None);
        let err = repo
            .save_memories(&[fresh.clone(), existing.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(repo.get_memory(&fresh.id).await.unwrap().is_none());

        let other = memory(owner, "User bakes bread", None);
        repo.save_memories(&[fresh.clone(), other.clone()]).await.unwrap();
        assert_eq!(repo.list_memories(&owner, false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_record_access_increments_count() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let m = memory(owner, "User works as a nurse", None);
        repo.save_memory(&m).await.unwrap();

        let later = t0() + Duration::hours(3);
        repo.record_access(&m.id, t0() + Duration::hours(1)).await.unwrap();
        let updated = repo.record_access(&m.id, later).await.unwrap();
        assert_eq!(updated.consolidation_count, 2);
        assert_eq!(updated.last_accessed, later);

        let err = repo.record_access(&Uuid::now_v7(), later).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_apply_consolidation_keeps_original_and_archive_is_sticky() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let m = memory(owner, "User loves jazz", None);
        repo.save_memory(&m).await.unwrap();

        let archive = ConsolidationUpdate {
            decay_factor: 0.25,
            fuzzy_content: Some("I vaguely remember jazz... it's all quite fuzzy now.".to_string()),
            archive: true,
            updated_at: t0() + Duration::days(4),
        };
        repo.apply_consolidation(&m.id, &archive).await.unwrap();

        let no_archive = ConsolidationUpdate { archive: false, ..archive.clone() };
        repo.apply_consolidation(&m.id, &no_archive).await.unwrap();

        let got = repo.get_memory(&m.id).await.unwrap().unwrap();
        assert!(got.is_archived);
        assert_eq!(got.decay_factor, 0.25);
        assert_eq!(got.original_content, "User loves jazz");
        assert_eq!(got.fuzzy_content, archive.fuzzy_content);

        let err = repo.apply_consolidation(&Uuid::now_v7(), &archive).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_add_connection_appends() {
        let (_dir, repo) = setup().await;
        let owner = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let a = memory(owner, "a", None);
        let b = memory(owner, "b", None);
        repo.save_memory(&a).await.unwrap();
        repo.save_memory(&b).await.unwrap();

        for kind in [ConnectionKind::Related, ConnectionKind::Causal] {
            let connection = MemoryConnection {
                target_memory_id: b.id,
                kind,
                strength: 0.7,
                description: "same trip".to_string(),
                created_by: owner.persona_id,
                created_at: t0(),
            };
            repo.add_connection(&a.id, &connection).await.unwrap();
        }

        let got = repo.get_memory(&a.id).await.unwrap().unwrap();
        assert_eq!(got.connections.len(), 2);
        assert_eq!(got.connections[1].kind, ConnectionKind::Causal);
        assert_eq!(got.connections[0].target_memory_id, b.id);
    }

    #[tokio::test]
    async fn test_delete_and_owner_scopes() {
        let (_dir, repo) = setup().await;
        let first = MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7());
        let second = MemoryOwner::new(first.user_id, Uuid::now_v7());
        let m = memory(first, "gone soon", None);
        repo.save_memory(&m).await.unwrap();
        repo.save_memory(&memory(first, "stays", None)).await.unwrap();
        repo.save_memory(&memory(second, "other persona", None)).await.unwrap();

        let scopes = repo.owner_scopes().await.unwrap();
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains(&first) && scopes.contains(&second));

        repo.delete_memory(&m.id).await.unwrap();
        assert!(repo.get_memory(&m.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_memory(&m.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }
}
