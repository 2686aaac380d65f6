// src/memory/storage/sqlite/core/working_operations.rs

use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::CoreResult;
use crate::memory::core::types::{MetacognitiveLogEntry, WorkingMemoryEntry};

/// Handles working memory (expiring scratch state) and the append-only
/// metacognitive log.
pub struct WorkingOperations {
    pool: SqlitePool,
}

impl WorkingOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn put(&self, entry: &WorkingMemoryEntry) -> CoreResult<WorkingMemoryEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO working_memory (org_id, scope_key, content, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.org_id)
        .bind(&entry.scope_key)
        .bind(entry.content.to_string())
        .bind(entry.created_at.naive_utc())
        .bind(entry.expires_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let mut saved = entry.clone();
        saved.id = Some(row.get("id"));
        Ok(saved)
    }

    /// Latest unexpired entry for a scope key. Expired rows are invisible
    /// until the sweep physically removes them.
    pub async fn get(
        &self,
        org_id: &str,
        scope_key: &str,
    ) -> CoreResult<Option<WorkingMemoryEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, scope_key, content, created_at, expires_at
            FROM working_memory
            WHERE org_id = ? AND scope_key = ? AND expires_at > ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .bind(scope_key)
        .bind(Utc::now().naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_working))
    }

    pub async fn sweep_expired(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM working_memory WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!("Swept {} expired working memory rows", removed);
        }
        Ok(removed)
    }

    pub async fn append_metacognitive(
        &self,
        entry: &MetacognitiveLogEntry,
    ) -> CoreResult<MetacognitiveLogEntry> {
        let details_json = entry.details.as_ref().map(|d| d.to_string());

        let row = sqlx::query(
            r#"
            INSERT INTO metacognitive_logs (
                org_id, metric, value, period_start, period_end, details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.org_id)
        .bind(&entry.metric)
        .bind(entry.value)
        .bind(entry.period_start.naive_utc())
        .bind(entry.period_end.naive_utc())
        .bind(details_json)
        .bind(entry.created_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let mut saved = entry.clone();
        saved.id = Some(row.get("id"));
        Ok(saved)
    }

    pub async fn recent_metacognitive(
        &self,
        org_id: &str,
        metric: &str,
        n: i64,
    ) -> CoreResult<Vec<MetacognitiveLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, metric, value, period_start, period_end, details, created_at
            FROM metacognitive_logs
            WHERE org_id = ? AND metric = ?
            ORDER BY period_end DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(org_id)
        .bind(metric)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_metacognitive).collect())
    }
}

fn row_to_working(row: &sqlx::sqlite::SqliteRow) -> WorkingMemoryEntry {
    let created: NaiveDateTime = row.get("created_at");
    let expires: NaiveDateTime = row.get("expires_at");
    let content_raw: String = row.get("content");

    WorkingMemoryEntry {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        scope_key: row.get("scope_key"),
        content: serde_json::from_str(&content_raw).unwrap_or(serde_json::Value::Null),
        created_at: Utc.from_utc_datetime(&created),
        expires_at: Utc.from_utc_datetime(&expires),
    }
}

fn row_to_metacognitive(row: &sqlx::sqlite::SqliteRow) -> MetacognitiveLogEntry {
    let created: NaiveDateTime = row.get("created_at");
    let period_start: NaiveDateTime = row.get("period_start");
    let period_end: NaiveDateTime = row.get("period_end");
    let details = row
        .get::<Option<String>, _>("details")
        .and_then(|raw| serde_json::from_str(&raw).ok());

    MetacognitiveLogEntry {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        metric: row.get("metric"),
        value: row.get("value"),
        period_start: Utc.from_utc_datetime(&period_start),
        period_end: Utc.from_utc_datetime(&period_end),
        details,
        created_at: Utc.from_utc_datetime(&created),
    }
}
