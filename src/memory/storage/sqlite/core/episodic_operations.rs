// src/memory/storage/sqlite/core/episodic_operations.rs

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::CoreResult;
use crate::memory::core::types::EpisodicMemory;

/// Handles the append-only episodic layer. Rows are never updated or
/// deleted; decay-based exclusion happens at query time.
pub struct EpisodicOperations {
    pool: SqlitePool,
}

impl EpisodicOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, entry: &EpisodicMemory) -> CoreResult<EpisodicMemory> {
        let metadata_json = entry
            .metadata
            .as_ref()
            .map(|m| m.to_string());

        let row = sqlx::query(
            r#"
            INSERT INTO episodic_memories (
                org_id, event_type, platform, importance, strength, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.org_id)
        .bind(&entry.event_type)
        .bind(&entry.platform)
        .bind(entry.importance.clamp(0.0, 1.0))
        .bind(entry.strength.clamp(0.0, 1.0))
        .bind(metadata_json)
        .bind(entry.created_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let new_id: i64 = row.get("id");
        let mut saved = entry.clone();
        saved.id = Some(new_id);

        debug!(
            "Saved episodic memory {} for org {} ({})",
            new_id, entry.org_id, entry.event_type
        );
        Ok(saved)
    }

    /// Windowed slice for the pattern detector, oldest first.
    pub async fn load_window(
        &self,
        org_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<EpisodicMemory>> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, event_type, platform, importance, strength, metadata, created_at
            FROM episodic_memories
            WHERE org_id = ? AND created_at >= ?
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(org_id)
        .bind(since.naive_utc())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_episodic).collect())
    }

    /// Latest outcome row carrying the given post id in its metadata.
    pub async fn latest_for_post(
        &self,
        org_id: &str,
        post_id: &str,
    ) -> CoreResult<Option<EpisodicMemory>> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, event_type, platform, importance, strength, metadata, created_at
            FROM episodic_memories
            WHERE org_id = ? AND json_extract(metadata, '$.post_id') = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_episodic))
    }
}

pub(crate) fn row_to_episodic(row: &sqlx::sqlite::SqliteRow) -> EpisodicMemory {
    let created: NaiveDateTime = row.get("created_at");
    let metadata = row
        .get::<Option<String>, _>("metadata")
        .and_then(|raw| serde_json::from_str(&raw).ok());

    EpisodicMemory {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        event_type: row.get("event_type"),
        platform: row.get("platform"),
        importance: row.get("importance"),
        strength: row.get("strength"),
        metadata,
        created_at: Utc.from_utc_datetime(&created),
    }
}
