//! SQLite persona relationship repository.

use kindred_core::network::store::RelationshipRepository;
use kindred_types::error::RepositoryError;
use kindred_types::network::PersonaRelationship;
use sqlx::Row;
use uuid::Uuid;

use super::codec::{format_datetime, parse_datetime, parse_uuid, query_err};
use super::pool::DatabasePool;

pub struct SqliteRelationshipRepository {
    pool: DatabasePool,
}

impl SqliteRelationshipRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_relationship(row: &sqlx::sqlite::SqliteRow) -> Result<PersonaRelationship, RepositoryError> {
    let get_str = |column: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(column).map_err(query_err)
    };
    let get_f32 = |column: &str| -> Result<f32, RepositoryError> {
        row.try_get::<f64, _>(column).map(|v| v as f32).map_err(query_err)
    };
    let get_u32 = |column: &str| -> Result<u32, RepositoryError> {
        let v: i64 = row.try_get(column).map_err(query_err)?;
        Ok(u32::try_from(v).unwrap_or(u32::MAX))
    };

    Ok(PersonaRelationship {
        persona_a: parse_uuid(&get_str("persona_a")?, "persona_a")?,
        persona_b: parse_uuid(&get_str("persona_b")?, "persona_b")?,
        relationship_strength: get_f32("relationship_strength")?,
        trust_level: get_f32("trust_level")?,
        shared_memory_count: get_u32("shared_memory_count")?,
        connection_count: get_u32("connection_count")?,
        last_interaction: parse_datetime(&get_str("last_interaction")?)?,
        created_at: parse_datetime(&get_str("created_at")?)?,
    })
}

impl RelationshipRepository for SqliteRelationshipRepository {
    async fn get_relationship(
        &self,
        a: &Uuid,
        b: &Uuid,
    ) -> Result<Option<PersonaRelationship>, RepositoryError> {
        let (first, second) = PersonaRelationship::canonical_pair(*a, *b);
        let row = sqlx::query("SELECT * FROM persona_relationships WHERE persona_a = ? AND persona_b = ?")
            .bind(first.to_string())
            .bind(second.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_relationship).transpose()
    }

    async fn upsert_relationship(&self, relationship: &PersonaRelationship) -> Result<(), RepositoryError> {
        if relationship.persona_a == relationship.persona_b {
            return Err(RepositoryError::Conflict(
                "a persona cannot have a relationship with itself".to_string(),
            ));
        }
        let (first, second) =
            PersonaRelationship::canonical_pair(relationship.persona_a, relationship.persona_b);

        sqlx::query(
            r#"INSERT INTO persona_relationships (persona_a, persona_b, relationship_strength, trust_level,
                   shared_memory_count, connection_count, last_interaction, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(persona_a, persona_b) DO UPDATE SET
                   relationship_strength = excluded.relationship_strength,
                   trust_level = excluded.trust_level,
                   shared_memory_count = excluded.shared_memory_count,
                   connection_count = excluded.connection_count,
                   last_interaction = excluded.last_interaction"#,
        )
        .bind(first.to_string())
        .bind(second.to_string())
        .bind(f64::from(relationship.relationship_strength))
        .bind(f64::from(relationship.trust_level))
        .bind(i64::from(relationship.shared_memory_count))
        .bind(i64::from(relationship.connection_count))
        .bind(format_datetime(&relationship.last_interaction))
        .bind(format_datetime(&relationship.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn list_for_persona(&self, persona_id: &Uuid) -> Result<Vec<PersonaRelationship>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM persona_relationships WHERE persona_a = ? OR persona_b = ?
             ORDER BY relationship_strength DESC, persona_a, persona_b",
        )
        .bind(persona_id.to_string())
        .bind(persona_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_relationship).collect()
    }

    async fn list_relationships(&self) -> Result<Vec<PersonaRelationship>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM persona_relationships ORDER BY persona_a, persona_b")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_relationship).collect()
    }
}
