//! SQLite shared memory repository.
//!
//! A shared copy lives in `shared_memories`; its recipient list lives in
//! `shared_memory_recipients` so that recipient lookups hit an index.

use chrono::{DateTime, Utc};
use kindred_core::network::store::SharedMemoryRepository;
use kindred_types::error::RepositoryError;
use kindred_types::memory::{MemoryType, SharedMemory};
use sqlx::Row;
use uuid::Uuid;

use super::codec::{format_datetime, from_json, parse_datetime, parse_uuid, query_err, to_json};
use super::pool::DatabasePool;

const SELECT_SHARED: &str = "SELECT s.*,
        (SELECT json_group_array(persona_id) FROM
            (SELECT persona_id FROM shared_memory_recipients r
             WHERE r.shared_memory_id = s.id ORDER BY r.position)) AS recipients
     FROM shared_memories s";

pub struct SqliteSharedMemoryRepository {
    pool: DatabasePool,
}

impl SqliteSharedMemoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, persona_id: &Uuid) -> Result<Vec<SharedMemory>, RepositoryError> {
        let sql = format!("{SELECT_SHARED} WHERE {clause} ORDER BY s.created_at DESC, s.id DESC");
        let rows = sqlx::query(&sql)
            .bind(persona_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter()
            .map(|row| SharedRow::from_row(row).map_err(query_err)?.into_shared())
            .collect()
    }
}

struct SharedRow {
    id: String,
    original_memory_id: String,
    origin_persona_id: String,
    user_id: String,
    content: String,
    memory_type: String,
    tags: String,
    importance_score: f64,
    emotional_impact: f64,
    access_permissions: String,
    recipients: String,
    created_at: String,
    last_referenced: String,
}

impl SharedRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            original_memory_id: row.try_get("original_memory_id")?,
            origin_persona_id: row.try_get("origin_persona_id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            memory_type: row.try_get("memory_type")?,
            tags: row.try_get("tags")?,
            importance_score: row.try_get("importance_score")?,
            emotional_impact: row.try_get("emotional_impact")?,
            access_permissions: row.try_get("access_permissions")?,
            recipients: row.try_get("recipients")?,
            created_at: row.try_get("created_at")?,
            last_referenced: row.try_get("last_referenced")?,
        })
    }

    fn into_shared(self) -> Result<SharedMemory, RepositoryError> {
        let memory_type: MemoryType = self.memory_type.parse().map_err(RepositoryError::Query)?;
        let recipients: Vec<String> = from_json(&self.recipients, "recipients")?;
        let shared_with_companions = recipients
            .iter()
            .map(|r| parse_uuid(r, "recipient"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SharedMemory {
            id: parse_uuid(&self.id, "shared memory id")?,
            original_memory_id: parse_uuid(&self.original_memory_id, "original_memory_id")?,
            origin_persona_id: parse_uuid(&self.origin_persona_id, "origin_persona_id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            content: self.content,
            memory_type,
            tags: from_json(&self.tags, "tags")?,
            importance_score: self.importance_score as f32,
            emotional_impact: self.emotional_impact as f32,
            access_permissions: from_json(&self.access_permissions, "access_permissions")?,
            shared_with_companions,
            created_at: parse_datetime(&self.created_at)?,
            last_referenced: parse_datetime(&self.last_referenced)?,
        })
    }
}

impl SharedMemoryRepository for SqliteSharedMemoryRepository {
    async fn save_shared(&self, shared: &SharedMemory) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO shared_memories (id, original_memory_id, origin_persona_id, user_id, content,
                   memory_type, tags, importance_score, emotional_impact, access_permissions,
                   created_at, last_referenced)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(shared.id.to_string())
        .bind(shared.original_memory_id.to_string())
        .bind(shared.origin_persona_id.to_string())
        .bind(shared.user_id.to_string())
        .bind(&shared.content)
        .bind(shared.memory_type.to_string())
        .bind(to_json(&shared.tags)?)
        .bind(f64::from(shared.importance_score))
        .bind(f64::from(shared.emotional_impact))
        .bind(to_json(&shared.access_permissions)?)
        .bind(format_datetime(&shared.created_at))
        .bind(format_datetime(&shared.last_referenced))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        for (position, recipient) in shared.shared_with_companions.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO shared_memory_recipients (shared_memory_id, persona_id, position)
                 VALUES (?, ?, ?)",
            )
            .bind(shared.id.to_string())
            .bind(recipient.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_shared(&self, id: &Uuid) -> Result<Option<SharedMemory>, RepositoryError> {
        let sql = format!("{SELECT_SHARED} WHERE s.id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.map(|r| SharedRow::from_row(&r).map_err(query_err)?.into_shared())
            .transpose()
    }

    async fn list_for_recipient(&self, persona_id: &Uuid) -> Result<Vec<SharedMemory>, RepositoryError> {
        self.fetch_where(
            "EXISTS (SELECT 1 FROM shared_memory_recipients r WHERE r.shared_memory_id = s.id AND r.persona_id = ?)",
            persona_id,
        )
        .await
    }

    async fn list_by_origin(&self, persona_id: &Uuid) -> Result<Vec<SharedMemory>, RepositoryError> {
        self.fetch_where("s.origin_persona_id = ?", persona_id).await
    }

    async fn touch_shared(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shared_memories SET last_referenced = ? WHERE id = ?")
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
