// src/memory/storage/sqlite/core/audit_operations.rs

use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::memory::core::types::{AuditAction, AuditEntry, AuditFilters};

/// Append-only consolidation audit trail. A failed insert is surfaced as
/// CONSOLIDATION_FAILED: losing provenance is not acceptable.
pub struct AuditOperations {
    pool: SqlitePool,
}

impl AuditOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: &AuditEntry) -> CoreResult<AuditEntry> {
        let source_ids_json = serde_json::to_string(&entry.source_ids)?;

        let row = sqlx::query(
            r#"
            INSERT INTO consolidation_audit_log (
                org_id, action_type, source_ids, target_id, details, confidence, actor, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entry.org_id)
        .bind(entry.action_type.as_str())
        .bind(source_ids_json)
        .bind(entry.target_id)
        .bind(entry.details.to_string())
        .bind(entry.confidence)
        .bind(&entry.actor)
        .bind(entry.created_at.naive_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoreError::ConsolidationFailed(format!("audit write failed: {e}")))?;

        let mut saved = entry.clone();
        saved.id = Some(row.get("id"));
        debug!(
            "Appended audit entry {:?} ({}) for org {}",
            saved.id,
            entry.action_type.as_str(),
            entry.org_id
        );
        Ok(saved)
    }

    /// Read-only projection over the log. Never mutates.
    pub async fn query(&self, org_id: &str, filters: &AuditFilters) -> CoreResult<Vec<AuditEntry>> {
        let limit = filters.limit.unwrap_or(200);
        let action = filters.action_type.map(|a| a.as_str());
        let since = filters.since.map(|s| s.naive_utc());

        let rows = sqlx::query(
            r#"
            SELECT id, org_id, action_type, source_ids, target_id, details,
                   confidence, actor, created_at
            FROM consolidation_audit_log
            WHERE org_id = ?
              AND (? IS NULL OR action_type = ?)
              AND (? IS NULL OR created_at >= ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(org_id)
        .bind(action)
        .bind(action)
        .bind(since)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_audit).collect())
    }
}

fn row_to_audit(row: &sqlx::sqlite::SqliteRow) -> Option<AuditEntry> {
    let action_raw: String = row.get("action_type");
    let action = AuditAction::parse(&action_raw)?;
    let created: NaiveDateTime = row.get("created_at");
    let source_ids_raw: String = row.get("source_ids");
    let details_raw: String = row.get("details");

    Some(AuditEntry {
        id: Some(row.get("id")),
        org_id: row.get("org_id"),
        action_type: action,
        source_ids: serde_json::from_str(&source_ids_raw).unwrap_or_default(),
        target_id: row.get("target_id"),
        details: serde_json::from_str(&details_raw).unwrap_or(serde_json::Value::Null),
        confidence: row.get("confidence"),
        actor: row.get("actor"),
        created_at: Utc.from_utc_datetime(&created),
    })
}
