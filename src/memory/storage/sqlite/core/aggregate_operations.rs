// src/memory/storage/sqlite/core/aggregate_operations.rs

use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::CoreResult;
use crate::memory::core::traits::CreativeKey;
use crate::memory::core::types::{CreativeMemory, DecisionLogEntry};

/// Handles the creative-memory aggregates and the decision log.
/// Aggregates hold running sums only; raw outcome events live in the
/// episodic layer.
pub struct AggregateOperations {
    pool: SqlitePool,
}

impl AggregateOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_creative(
        &self,
        org_id: &str,
        key: &CreativeKey,
    ) -> CoreResult<Option<CreativeMemory>> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, platform, objective, hook_type, framework, cta_type,
                   sample_size, success_count, total_engagement, avg_engagement, updated_at
            FROM creative_memories
            WHERE org_id = ? AND platform = ? AND objective = ?
              AND hook_type = ? AND framework = ? AND cta_type = ?
            "#,
        )
        .bind(org_id)
        .bind(&key.platform)
        .bind(&key.objective)
        .bind(&key.hook_type)
        .bind(&key.framework)
        .bind(&key.cta_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_creative))
    }

    /// Find-or-create plus one streaming-mean observation, in a single
    /// upsert so concurrent observers cannot drop an increment.
    pub async fn record_observation(
        &self,
        org_id: &str,
        key: &CreativeKey,
        engagement: f64,
        success: bool,
    ) -> CoreResult<CreativeMemory> {
        let success_increment: i64 = if success { 1 } else { 0 };

        let row = sqlx::query(
            r#"
            INSERT INTO creative_memories (
                org_id, platform, objective, hook_type, framework, cta_type,
                sample_size, success_count, total_engagement, avg_engagement, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
            ON CONFLICT(org_id, platform, objective, hook_type, framework, cta_type) DO UPDATE SET
                sample_size = sample_size + 1,
                success_count = success_count + excluded.success_count,
                total_engagement = total_engagement + excluded.total_engagement,
                avg_engagement = (total_engagement + excluded.total_engagement) / (sample_size + 1),
                updated_at = excluded.updated_at
            RETURNING id, org_id, platform, objective, hook_type, framework, cta_type,
                      sample_size, success_count, total_engagement, avg_engagement, updated_at
            "#,
        )
        .bind(org_id)
        .bind(&key.platform)
        .bind(&key.objective)
        .bind(&key.hook_type)
        .bind(&key.framework)
        .bind(&key.cta_type)
        .bind(success_increment)
        .bind(engagement)
        .bind(engagement)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let updated = row_to_creative(&row);
        debug!(
            "Creative memory {}/{}/{} now n={} avg={:.1}",
            updated.platform, updated.hook_type, updated.cta_type,
            updated.sample_size, updated.avg_engagement
        );
        Ok(updated)
    }

    pub async fn append_decision(&self, entry: &DecisionLogEntry) -> CoreResult<DecisionLogEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO decision_logs (
                org_id, draft_id, variant, platform, objective, post_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.org_id)
        .bind(&entry.draft_id)
        .bind(&entry.variant)
        .bind(&entry.platform)
        .bind(&entry.objective)
        .bind(&entry.post_id)
        .bind(entry.created_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let mut saved = entry.clone();
        saved.id = Some(row.get("id"));
        Ok(saved)
    }
}

fn row_to_creative(row: &sqlx::sqlite::SqliteRow) -> CreativeMemory {
    let updated: NaiveDateTime = row.get("updated_at");

    CreativeMemory {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        platform: row.get("platform"),
        objective: row.get("objective"),
        hook_type: row.get("hook_type"),
        framework: row.get("framework"),
        cta_type: row.get("cta_type"),
        sample_size: row.get("sample_size"),
        success_count: row.get("success_count"),
        total_engagement: row.get("total_engagement"),
        avg_engagement: row.get("avg_engagement"),
        updated_at: Utc.from_utc_datetime(&updated),
    }
}
