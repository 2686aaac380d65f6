// src/memory/features/outcomes.rs
// Outcome learning: turns published-content metrics back into memory.
// Raw outcome events land in the episodic layer; creative memory only ever
// holds streaming aggregates.

use chrono::Utc;
use std::sync::Arc;
use serde_json::json;
use tracing::{debug, info};

use crate::config::EngramConfig;
use crate::error::{require_org_id, CoreResult};
use crate::memory::core::traits::{CreativeKey, MemoryStore};
use crate::memory::core::types::{
    CreativeMemory, DecisionLogEntry, EpisodicMemory, MetacognitiveLogEntry,
};
use crate::memory::features::signals::derive_creative_signals;

pub const METRIC_PREDICTION_ACCURACY: &str = "prediction_accuracy";

/// Terminal lifecycle event: always logged, even with zero engagement.
pub const EVENT_PUBLISHED: &str = "published";

/// Engagement counters for one published post, as synced from a platform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngagementMetrics {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub saves: i64,
    pub impressions: i64,
}

impl EngagementMetrics {
    /// Total interaction count. Impressions are reach, not engagement.
    pub fn total_engagement(&self) -> f64 {
        (self.likes + self.comments + self.shares + self.saves) as f64
    }

    pub fn is_all_zero(&self) -> bool {
        self.total_engagement() == 0.0 && self.impressions == 0
    }

    /// Stable fingerprint for duplicate-snapshot suppression.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.likes, self.comments, self.shares, self.saves, self.impressions
        )
    }
}

/// A published post as seen by the outcome pipeline.
#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub org_id: String,
    pub post_id: String,
    pub platform: String,
    pub content: String,
    /// Content framework the draft was generated with (e.g. "aida"), when known.
    pub framework: Option<String>,
    pub metrics: EngagementMetrics,
}

/// Per-objective success bars, lifted out of the environment config.
#[derive(Debug, Clone)]
pub struct OutcomeConfig {
    pub success_bar_awareness: f64,
    pub success_bar_engagement: f64,
    pub success_bar_conversions: f64,
    pub success_bar_default: f64,
}

impl OutcomeConfig {
    pub fn from_config(config: &EngramConfig) -> Self {
        Self {
            success_bar_awareness: config.success_bar_awareness,
            success_bar_engagement: config.success_bar_engagement,
            success_bar_conversions: config.success_bar_conversions,
            success_bar_default: config.success_bar_default,
        }
    }

    pub fn success_bar(&self, objective: &str) -> f64 {
        match objective {
            "awareness" => self.success_bar_awareness,
            "engagement" => self.success_bar_engagement,
            "conversions" => self.success_bar_conversions,
            _ => self.success_bar_default,
        }
    }
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            success_bar_awareness: 500.0,
            success_bar_engagement: 100.0,
            success_bar_conversions: 25.0,
            success_bar_default: 100.0,
        }
    }
}

pub struct OutcomeLearning<S: MemoryStore> {
    store: Arc<S>,
    config: OutcomeConfig,
}

impl<S: MemoryStore> OutcomeLearning<S> {
    pub fn new(store: Arc<S>, config: OutcomeConfig) -> Self {
        Self { store, config }
    }

    /// Writes one episodic outcome row for the post. Skipped (returns
    /// Ok(false)) when the post has no engagement and the event is not
    /// terminal, or when a snapshot repeats the metrics already recorded,
    /// since duplicates would inflate sample sizes downstream.
    pub async fn log_outcome_for_post(
        &self,
        post: &PublishedPost,
        source: &str,
        event_type: &str,
        objective: &str,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<bool> {
        require_org_id(&post.org_id)?;

        let terminal = event_type == EVENT_PUBLISHED;
        if post.metrics.total_engagement() == 0.0 && !terminal {
            debug!("Skipping outcome for post {}: no engagement yet", post.post_id);
            return Ok(false);
        }

        let fingerprint = post.metrics.fingerprint();
        if !terminal {
            if let Some(previous) = self
                .store
                .latest_outcome_for_post(&post.org_id, &post.post_id)
                .await?
            {
                let unchanged = previous
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("metrics_fingerprint"))
                    .and_then(|v| v.as_str())
                    .map(|prev| prev == fingerprint)
                    .unwrap_or(false);
                if unchanged {
                    debug!(
                        "Skipping outcome for post {}: metrics unchanged since last snapshot",
                        post.post_id
                    );
                    return Ok(false);
                }
            }
        }

        let bar = self.config.success_bar(objective);
        let importance = (post.metrics.total_engagement() / bar).clamp(0.1, 1.0);

        let mut outcome_metadata = json!({
            "post_id": post.post_id,
            "source": source,
            "objective": objective,
            "metrics_fingerprint": fingerprint,
            "likes": post.metrics.likes,
            "comments": post.metrics.comments,
            "shares": post.metrics.shares,
            "saves": post.metrics.saves,
            "impressions": post.metrics.impressions,
        });
        if let Some(context) = metadata {
            outcome_metadata["context"] = context;
        }

        let entry = EpisodicMemory::new(post.org_id.as_str(), event_type, importance)
            .with_platform(post.platform.as_str())
            .with_metadata(outcome_metadata);
        self.store.save_episodic(&entry).await?;

        info!(
            "Logged {} outcome for post {} on {} (engagement {})",
            event_type,
            post.post_id,
            post.platform,
            post.metrics.total_engagement()
        );
        Ok(true)
    }

    /// Streaming update of the matching creative-memory aggregate:
    /// sample += 1, totals accumulate, success counts against the
    /// per-objective bar.
    pub async fn refresh_creative_memory_from_post(
        &self,
        post: &PublishedPost,
        objective: &str,
        metadata: Option<&serde_json::Value>,
    ) -> CoreResult<CreativeMemory> {
        require_org_id(&post.org_id)?;

        // Framework comes from the post when known, else from the caller's
        // generation metadata.
        let framework = post
            .framework
            .clone()
            .or_else(|| {
                metadata
                    .and_then(|m| m.get("framework"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "none".to_string());

        let signals = derive_creative_signals(&post.content);
        let key = CreativeKey {
            platform: post.platform.clone(),
            objective: objective.to_string(),
            hook_type: signals.hook_type.as_str().to_string(),
            framework,
            cta_type: signals.cta_type.as_str().to_string(),
        };

        let engagement = post.metrics.total_engagement();
        let success = engagement >= self.config.success_bar(objective);

        self.store
            .record_creative_observation(&post.org_id, &key, engagement, success)
            .await
    }

    /// Records which draft variant became which post, so outcomes arriving
    /// on the metrics-sync delay can be attributed later.
    pub async fn log_decision_for_published_post(
        &self,
        org_id: &str,
        draft_id: &str,
        variant: &str,
        platform: &str,
        objective: &str,
        post_id: &str,
    ) -> CoreResult<DecisionLogEntry> {
        require_org_id(org_id)?;

        let entry = DecisionLogEntry {
            id: None,
            org_id: org_id.to_string(),
            draft_id: draft_id.to_string(),
            variant: variant.to_string(),
            platform: platform.to_string(),
            objective: objective.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now(),
        };
        self.store.append_decision(&entry).await
    }

    /// Appends one prediction-accuracy self-assessment for a period.
    pub async fn record_prediction_accuracy(
        &self,
        org_id: &str,
        value: f64,
        period_start: chrono::DateTime<Utc>,
        period_end: chrono::DateTime<Utc>,
        details: Option<serde_json::Value>,
    ) -> CoreResult<MetacognitiveLogEntry> {
        require_org_id(org_id)?;

        let entry = MetacognitiveLogEntry {
            id: None,
            org_id: org_id.to_string(),
            metric: METRIC_PREDICTION_ACCURACY.to_string(),
            value: value.clamp(0.0, 1.0),
            period_start,
            period_end,
            details,
            created_at: Utc::now(),
        };
        self.store.append_metacognitive(&entry).await
    }

    /// Mean of the most recent `n` accuracy periods. No history is a valid
    /// None, not an error.
    pub async fn rolling_prediction_accuracy(
        &self,
        org_id: &str,
        n: i64,
    ) -> CoreResult<Option<f64>> {
        require_org_id(org_id)?;

        let recent = self
            .store
            .recent_metacognitive(org_id, METRIC_PREDICTION_ACCURACY, n)
            .await?;
        if recent.is_empty() {
            return Ok(None);
        }
        let mean = recent.iter().map(|e| e.value).sum::<f64>() / recent.len() as f64;
        Ok(Some(mean))
    }
}
