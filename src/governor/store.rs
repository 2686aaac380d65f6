// src/governor/store.rs
// Ledger and cache persistence for the governor. The usage ledger is the
// single source of truth for budget accounting; the miss-path write couples
// the usage event and the cache entry in one transaction.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::types::{AiUsageEvent, IntentCacheEntry, UsageTotals};
use crate::error::CoreResult;

pub struct GovernorStore {
    pool: SqlitePool,
}

impl GovernorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Spend sums for the current UTC day and calendar month.
    /// No history simply sums to zero.
    pub async fn usage_totals(&self, org_id: &str, now: DateTime<Utc>) -> CoreResult<UsageTotals> {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or(now.naive_utc());
        let month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .map(|dt| dt.naive_utc())
            .unwrap_or(day_start);

        let daily: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(estimated_cost_usd) FROM ai_usage_events WHERE org_id = ? AND created_at >= ?",
        )
        .bind(org_id)
        .bind(day_start)
        .fetch_one(&self.pool)
        .await?;

        let monthly: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(estimated_cost_usd) FROM ai_usage_events WHERE org_id = ? AND created_at >= ?",
        )
        .bind(org_id)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(UsageTotals {
            daily_spent_usd: daily.unwrap_or(0.0),
            monthly_spent_usd: monthly.unwrap_or(0.0),
        })
    }

    pub async fn log_usage(&self, event: &AiUsageEvent) -> CoreResult<AiUsageEvent> {
        let mut tx = self.pool.begin().await?;
        let saved = insert_usage(&mut tx, event).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Unexpired cache entry for the key, or None. Expiry is checked here
    /// so callers never see stale entries.
    pub async fn get_cache(
        &self,
        org_id: &str,
        route_key: &str,
        intent_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<IntentCacheEntry>> {
        let row = sqlx::query(
            r#"
            SELECT org_id, route_key, intent_hash, response, provider, model,
                   estimated_cost_usd, created_at, expires_at
            FROM intent_cache
            WHERE org_id = ? AND route_key = ? AND intent_hash = ? AND expires_at > ?
            "#,
        )
        .bind(org_id)
        .bind(route_key)
        .bind(intent_hash)
        .bind(now.naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_cache_entry))
    }

    /// Last-write-wins upsert. Entries are idempotent recomputations of the
    /// same intent, so racing writers are fine.
    pub async fn set_cache(&self, entry: &IntentCacheEntry) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        upsert_cache(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Miss-path write: the usage event and the refreshed cache entry land
    /// in one transaction so the ledger and cache stay consistent.
    pub async fn record_model_result(
        &self,
        event: &AiUsageEvent,
        cache_entry: &IntentCacheEntry,
    ) -> CoreResult<AiUsageEvent> {
        let mut tx = self.pool.begin().await?;
        let saved = insert_usage(&mut tx, event).await?;
        upsert_cache(&mut tx, cache_entry).await?;
        tx.commit().await?;

        debug!(
            "Recorded model result for org {} route {} (${:.4})",
            event.org_id, event.route_key, event.estimated_cost_usd
        );
        Ok(saved)
    }
}

async fn insert_usage(
    tx: &mut Transaction<'_, Sqlite>,
    event: &AiUsageEvent,
) -> CoreResult<AiUsageEvent> {
    let metadata_json = event.metadata.as_ref().map(|m| m.to_string());

    let row = sqlx::query(
        r#"
        INSERT INTO ai_usage_events (
            org_id, route_key, provider, model, input_tokens, output_tokens,
            estimated_cost_usd, latency_ms, success, cache_hit, error_code,
            metadata, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&event.org_id)
    .bind(&event.route_key)
    .bind(&event.provider)
    .bind(&event.model)
    .bind(event.input_tokens)
    .bind(event.output_tokens)
    .bind(event.estimated_cost_usd)
    .bind(event.latency_ms)
    .bind(event.success)
    .bind(event.cache_hit)
    .bind(&event.error_code)
    .bind(metadata_json)
    .bind(event.created_at.naive_utc())
    .fetch_one(&mut **tx)
    .await?;

    let mut saved = event.clone();
    saved.id = Some(row.get("id"));
    Ok(saved)
}

async fn upsert_cache(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &IntentCacheEntry,
) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO intent_cache (
            org_id, route_key, intent_hash, response, provider, model,
            estimated_cost_usd, created_at, expires_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(org_id, route_key, intent_hash) DO UPDATE SET
            response = excluded.response,
            provider = excluded.provider,
            model = excluded.model,
            estimated_cost_usd = excluded.estimated_cost_usd,
            created_at = excluded.created_at,
            expires_at = excluded.expires_at
        "#,
    )
    .bind(&entry.org_id)
    .bind(&entry.route_key)
    .bind(&entry.intent_hash)
    .bind(&entry.response)
    .bind(&entry.provider)
    .bind(&entry.model)
    .bind(entry.estimated_cost_usd)
    .bind(entry.created_at.naive_utc())
    .bind(entry.expires_at.naive_utc())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_cache_entry(row: &sqlx::sqlite::SqliteRow) -> IntentCacheEntry {
    let created: NaiveDateTime = row.get("created_at");
    let expires: NaiveDateTime = row.get("expires_at");

    IntentCacheEntry {
        org_id: row.get("org_id"),
        route_key: row.get("route_key"),
        intent_hash: row.get("intent_hash"),
        response: row.get("response"),
        provider: row.get("provider"),
        model: row.get("model"),
        estimated_cost_usd: row.get("estimated_cost_usd"),
        created_at: Utc.from_utc_datetime(&created),
        expires_at: Utc.from_utc_datetime(&expires),
    }
}
