// src/memory/features/scheduler.rs
//! Periodic consolidation driver. Runs on an interval, one organization at
//! a time; a working-memory watermark keeps a retried job from
//! double-promoting an org whose run is still fresh.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::memory::core::config::{ConsolidationConfig, DetectorConfig};
use crate::memory::core::traits::MemoryStore;
use crate::memory::core::types::WorkingMemoryEntry;
use crate::memory::features::consolidation::ConsolidationPipeline;
use crate::memory::features::patterns::PatternDetector;
use crate::memory::storage::SqliteMemoryStore;

const RUN_WATERMARK_KEY: &str = "consolidation:last_run";

/// Spawn the background consolidation task.
///
/// `interval` is the time between passes (e.g., 1h).
pub fn spawn_consolidation_scheduler(
    store: Arc<SqliteMemoryStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(err) = run_consolidation_cycle(store.clone(), interval).await {
                warn!("consolidation cycle failed: {err:#}");
            }
            tokio::time::sleep(interval).await;
        }
    })
}

/// One consolidation pass across all recently active organizations.
/// Safe to re-run; orgs with a fresh watermark are skipped.
pub async fn run_consolidation_cycle(
    store: Arc<SqliteMemoryStore>,
    interval: Duration,
) -> Result<()> {
    // Expired scratch state goes first so stale watermarks can't linger.
    store.sweep_expired_working().await?;

    let lookback = chrono::Duration::days(CONFIG.pattern_lookback_days);
    let org_ids = store.active_org_ids(Utc::now() - lookback).await?;
    if org_ids.is_empty() {
        return Ok(());
    }

    let detector = PatternDetector::new(store.clone(), DetectorConfig::from_config(&CONFIG));
    let pipeline =
        ConsolidationPipeline::new(store.clone(), ConsolidationConfig::from_config(&CONFIG));

    let mut consolidated = 0usize;
    for org_id in &org_ids {
        if !try_begin_run(&store, org_id, interval).await? {
            continue;
        }

        let candidates = detector.detect_all(org_id).await?;
        if candidates.is_empty() {
            continue;
        }

        let audit_entries = pipeline.consolidate(org_id, &candidates).await?;
        consolidated += audit_entries.len();
    }

    info!(
        "Consolidation cycle over {} orgs produced {} audit entries",
        org_ids.len(),
        consolidated
    );
    Ok(())
}

/// Claims the per-org run watermark. Returns false while a previous run's
/// watermark is still unexpired, so overlapping runs become no-ops instead
/// of blocking.
async fn try_begin_run(
    store: &SqliteMemoryStore,
    org_id: &str,
    interval: Duration,
) -> Result<bool> {
    if store.get_working(org_id, RUN_WATERMARK_KEY).await?.is_some() {
        return Ok(false);
    }

    let now = Utc::now();
    store
        .put_working(&WorkingMemoryEntry {
            id: None,
            org_id: org_id.to_string(),
            scope_key: RUN_WATERMARK_KEY.to_string(),
            content: json!({ "started_at": now.to_rfc3339() }),
            created_at: now,
            expires_at: now + chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::hours(1)),
        })
        .await?;
    Ok(true)
}
