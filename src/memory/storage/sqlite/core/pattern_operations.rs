// src/memory/storage/sqlite/core/pattern_operations.rs

use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::CoreResult;
use crate::memory::core::types::{ProceduralStrategy, SemanticPattern};

/// Handles the semantic and procedural layers. Only the consolidation
/// pipeline writes here.
pub struct PatternOperations {
    pool: SqlitePool,
}

impl PatternOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_pattern(
        &self,
        org_id: &str,
        pattern_type: &str,
        platform: Option<&str>,
        pattern_key: &str,
    ) -> CoreResult<Option<SemanticPattern>> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, pattern_type, platform, pattern_key, pattern_value,
                   confidence, sample_size, created_at, updated_at
            FROM semantic_patterns
            WHERE org_id = ? AND pattern_type = ? AND platform IS ? AND pattern_key = ?
            "#,
        )
        .bind(org_id)
        .bind(pattern_type)
        .bind(platform)
        .bind(pattern_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_pattern))
    }

    pub async fn insert_pattern(&self, pattern: &SemanticPattern) -> CoreResult<SemanticPattern> {
        let row = sqlx::query(
            r#"
            INSERT INTO semantic_patterns (
                org_id, pattern_type, platform, pattern_key, pattern_value,
                confidence, sample_size, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&pattern.org_id)
        .bind(&pattern.pattern_type)
        .bind(&pattern.platform)
        .bind(&pattern.pattern_key)
        .bind(pattern.pattern_value.to_string())
        .bind(pattern.confidence.clamp(0.0, 1.0))
        .bind(pattern.sample_size)
        .bind(pattern.created_at.naive_utc())
        .bind(pattern.updated_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let mut saved = pattern.clone();
        saved.id = Some(row.get("id"));
        debug!(
            "Inserted semantic pattern {:?}/{} for org {:?}",
            saved.id, pattern.pattern_key, pattern.org_id
        );
        Ok(saved)
    }

    /// Merge update. Sample size only ever grows; confidence stays clamped.
    pub async fn update_pattern(
        &self,
        id: i64,
        confidence: f64,
        sample_size: i64,
        pattern_value: &serde_json::Value,
    ) -> CoreResult<()> {
        sqlx::query(
            r#"
            UPDATE semantic_patterns
            SET confidence = ?,
                sample_size = MAX(sample_size, ?),
                pattern_value = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(confidence.clamp(0.0, 1.0))
        .bind(sample_size)
        .bind(pattern_value.to_string())
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_strategy_for_pattern(
        &self,
        org_id: &str,
        source_pattern_id: i64,
    ) -> CoreResult<Option<ProceduralStrategy>> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, strategy_key, source_pattern_id, strategy_value,
                   confidence, sample_size, created_at, updated_at
            FROM procedural_strategies
            WHERE org_id = ? AND source_pattern_id = ?
            "#,
        )
        .bind(org_id)
        .bind(source_pattern_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_strategy))
    }

    pub async fn upsert_strategy(
        &self,
        strategy: &ProceduralStrategy,
    ) -> CoreResult<ProceduralStrategy> {
        let row = sqlx::query(
            r#"
            INSERT INTO procedural_strategies (
                org_id, strategy_key, source_pattern_id, strategy_value,
                confidence, sample_size, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(org_id, source_pattern_id) DO UPDATE SET
                strategy_key = excluded.strategy_key,
                strategy_value = excluded.strategy_value,
                confidence = excluded.confidence,
                sample_size = MAX(sample_size, excluded.sample_size),
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&strategy.org_id)
        .bind(&strategy.strategy_key)
        .bind(strategy.source_pattern_id)
        .bind(strategy.strategy_value.to_string())
        .bind(strategy.confidence.clamp(0.0, 1.0))
        .bind(strategy.sample_size)
        .bind(strategy.created_at.naive_utc())
        .bind(strategy.updated_at.naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let mut saved = strategy.clone();
        saved.id = Some(row.get("id"));
        debug!(
            "Upserted procedural strategy {:?} for org {} (pattern {})",
            saved.id, strategy.org_id, strategy.source_pattern_id
        );
        Ok(saved)
    }
}

fn row_to_pattern(row: &sqlx::sqlite::SqliteRow) -> SemanticPattern {
    let created: NaiveDateTime = row.get("created_at");
    let updated: NaiveDateTime = row.get("updated_at");
    let value_raw: String = row.get("pattern_value");

    SemanticPattern {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        pattern_type: row.get("pattern_type"),
        platform: row.get("platform"),
        pattern_key: row.get("pattern_key"),
        pattern_value: serde_json::from_str(&value_raw).unwrap_or(serde_json::Value::Null),
        confidence: row.get("confidence"),
        sample_size: row.get("sample_size"),
        created_at: Utc.from_utc_datetime(&created),
        updated_at: Utc.from_utc_datetime(&updated),
    }
}

fn row_to_strategy(row: &sqlx::sqlite::SqliteRow) -> ProceduralStrategy {
    let created: NaiveDateTime = row.get("created_at");
    let updated: NaiveDateTime = row.get("updated_at");
    let value_raw: String = row.get("strategy_value");

    ProceduralStrategy {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        strategy_key: row.get("strategy_key"),
        source_pattern_id: row.get("source_pattern_id"),
        strategy_value: serde_json::from_str(&value_raw).unwrap_or(serde_json::Value::Null),
        confidence: row.get("confidence"),
        sample_size: row.get("sample_size"),
        created_at: Utc.from_utc_datetime(&created),
        updated_at: Utc.from_utc_datetime(&updated),
    }
}
