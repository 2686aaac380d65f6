// src/memory/features/patterns/mod.rs
// Pattern detection over a bounded, time-windowed slice of one org's
// episodic memory. Mining itself is pure; only the window load touches
// the store, so "no patterns found" is always Ok(vec![]).

pub mod cooccurrence;
pub mod frequency;
pub mod temporal;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{require_org_id, CoreResult};
use crate::memory::core::config::DetectorConfig;
use crate::memory::core::traits::MemoryStore;
use crate::memory::core::types::{CandidatePattern, EpisodicMemory};
use crate::memory::features::decay::{decay_weight, resolve_decay_config};

pub const PATTERN_TYPE_FREQUENCY: &str = "frequency";
pub const PATTERN_TYPE_TEMPORAL: &str = "temporal";
pub const PATTERN_TYPE_COOCCURRENCE: &str = "co_occurrence";

/// Decay weight of one episodic event at `now`, using the per-event-type
/// half-life table.
pub(crate) fn event_weight(event: &EpisodicMemory, now: DateTime<Utc>) -> f64 {
    let params = resolve_decay_config(&event.event_type, None);
    decay_weight(
        event.strength,
        event.importance,
        params.half_life_days,
        event.age_days(now),
    )
}

/// Mines frequency, temporal, and co-occurrence patterns for one org.
pub struct PatternDetector<S: MemoryStore> {
    store: Arc<S>,
    config: DetectorConfig,
}

impl<S: MemoryStore> PatternDetector<S> {
    pub fn new(store: Arc<S>, config: DetectorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    async fn load_window(&self, org_id: &str) -> CoreResult<Vec<EpisodicMemory>> {
        let since = Utc::now() - Duration::days(self.config.lookback_days);
        self.store
            .load_episodic_window(org_id, since, self.config.max_rows)
            .await
    }

    /// Groups events by (event_type, platform) and keeps groups with at
    /// least `min_occurrences` members.
    pub async fn detect_frequency_patterns(
        &self,
        org_id: &str,
        min_occurrences: i64,
    ) -> CoreResult<Vec<CandidatePattern>> {
        require_org_id(org_id)?;
        let events = self.load_window(org_id).await?;
        let patterns = frequency::mine(&events, min_occurrences, Utc::now());
        debug!(
            "Frequency detection for org {}: {} events -> {} patterns",
            org_id,
            events.len(),
            patterns.len()
        );
        Ok(patterns)
    }

    /// Buckets events by (weekday, hour) to surface time-of-day regularities.
    pub async fn detect_temporal_patterns(&self, org_id: &str) -> CoreResult<Vec<CandidatePattern>> {
        require_org_id(org_id)?;
        let events = self.load_window(org_id).await?;
        let patterns = temporal::mine(&events, self.config.min_bucket_size, Utc::now());
        debug!(
            "Temporal detection for org {}: {} events -> {} patterns",
            org_id,
            events.len(),
            patterns.len()
        );
        Ok(patterns)
    }

    /// Counts ordered event pairs within a sliding time window.
    pub async fn detect_cooccurrence_patterns(
        &self,
        org_id: &str,
    ) -> CoreResult<Vec<CandidatePattern>> {
        require_org_id(org_id)?;
        let events = self.load_window(org_id).await?;
        let patterns = cooccurrence::mine(
            &events,
            self.config.cooccurrence_window_minutes,
            self.config.min_pair_count,
            Utc::now(),
        );
        debug!(
            "Co-occurrence detection for org {}: {} events -> {} patterns",
            org_id,
            events.len(),
            patterns.len()
        );
        Ok(patterns)
    }

    /// One full detection pass; the consolidation scheduler feeds this
    /// straight into the pipeline.
    pub async fn detect_all(&self, org_id: &str) -> CoreResult<Vec<CandidatePattern>> {
        let mut patterns = self
            .detect_frequency_patterns(org_id, self.config.min_occurrences)
            .await?;
        patterns.extend(self.detect_temporal_patterns(org_id).await?);
        patterns.extend(self.detect_cooccurrence_patterns(org_id).await?);

        info!(
            "Detection pass for org {} produced {} candidate patterns",
            org_id,
            patterns.len()
        );
        Ok(patterns)
    }
}
