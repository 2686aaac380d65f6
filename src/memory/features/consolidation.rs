// src/memory/features/consolidation.rs
// Promotes candidate patterns into the semantic layer and, past the
// configured bar, into procedural strategies. Every action lands one
// audit row; sources are never deleted.

use chrono::Utc;
use std::sync::Arc;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{require_org_id, CoreResult};
use crate::memory::core::config::ConsolidationConfig;
use crate::memory::core::traits::MemoryStore;
use crate::memory::core::types::{
    AuditAction, AuditEntry, AuditFilters, CandidatePattern, ProceduralStrategy, SemanticPattern,
};

pub struct ConsolidationPipeline<S: MemoryStore> {
    store: Arc<S>,
    config: ConsolidationConfig,
}

impl<S: MemoryStore> ConsolidationPipeline<S> {
    pub fn new(store: Arc<S>, config: ConsolidationConfig) -> Self {
        Self { store, config }
    }

    /// Runs one consolidation pass over detector output. Returns the audit
    /// entries written, one per action taken.
    pub async fn consolidate(
        &self,
        org_id: &str,
        candidates: &[CandidatePattern],
    ) -> CoreResult<Vec<AuditEntry>> {
        require_org_id(org_id)?;

        let mut audit_entries = Vec::new();
        for candidate in candidates {
            let entry = self.apply_candidate(org_id, candidate).await?;
            audit_entries.push(entry);

            if let Some(promotion) = self.maybe_promote(org_id, candidate).await? {
                audit_entries.push(promotion);
            }
        }

        if !audit_entries.is_empty() {
            info!(
                "Consolidated {} candidates for org {} ({} audit entries)",
                candidates.len(),
                org_id,
                audit_entries.len()
            );
        }
        Ok(audit_entries)
    }

    /// Creates a new semantic pattern or merges the candidate into the
    /// existing row keyed by (pattern_type, platform, pattern_key).
    async fn apply_candidate(
        &self,
        org_id: &str,
        candidate: &CandidatePattern,
    ) -> CoreResult<AuditEntry> {
        let existing = self
            .store
            .find_pattern(
                org_id,
                &candidate.pattern_type,
                candidate.platform.as_deref(),
                &candidate.pattern_key,
            )
            .await?;

        match existing {
            None => {
                let now = Utc::now();
                let pattern = SemanticPattern {
                    id: None,
                    org_id: Some(org_id.to_string()),
                    pattern_type: candidate.pattern_type.clone(),
                    platform: candidate.platform.clone(),
                    pattern_key: candidate.pattern_key.clone(),
                    pattern_value: candidate.pattern_value.clone(),
                    confidence: candidate.confidence.clamp(0.0, 1.0),
                    sample_size: candidate.sample_size,
                    created_at: now,
                    updated_at: now,
                };
                let saved = self.store.insert_pattern(&pattern).await?;

                self.append_audit_entry(AuditEntry {
                    id: None,
                    org_id: org_id.to_string(),
                    action_type: AuditAction::EpisodicPromoted,
                    source_ids: candidate.source_episode_ids.clone(),
                    target_id: saved.id,
                    details: json!({
                        "pattern_type": candidate.pattern_type,
                        "pattern_key": candidate.pattern_key,
                        "sample_size": candidate.sample_size,
                    }),
                    confidence: Some(saved.confidence),
                    actor: self.config.actor.clone(),
                    created_at: Utc::now(),
                })
                .await
            }
            Some(current) => {
                let merged = merge_confidence(
                    current.confidence,
                    current.sample_size,
                    candidate.confidence,
                    candidate.sample_size,
                );
                let merged_sample = current.sample_size + candidate.sample_size;
                let current_id = current.id.unwrap_or_default();

                self.store
                    .update_pattern(current_id, merged, merged_sample, &candidate.pattern_value)
                    .await?;

                let mut source_ids = candidate.source_episode_ids.clone();
                source_ids.push(current_id);

                self.append_audit_entry(AuditEntry {
                    id: None,
                    org_id: org_id.to_string(),
                    action_type: AuditAction::PatternMerged,
                    source_ids,
                    target_id: current.id,
                    details: json!({
                        "pattern_type": candidate.pattern_type,
                        "pattern_key": candidate.pattern_key,
                        "previous_confidence": current.confidence,
                        "previous_sample_size": current.sample_size,
                        "merged_sample_size": merged_sample,
                    }),
                    confidence: Some(merged),
                    actor: self.config.actor.clone(),
                    created_at: Utc::now(),
                })
                .await
            }
        }
    }

    /// Promotes the (post-merge) pattern into a procedural strategy when it
    /// clears both configured bars. Idempotent: re-promotion upserts.
    async fn maybe_promote(
        &self,
        org_id: &str,
        candidate: &CandidatePattern,
    ) -> CoreResult<Option<AuditEntry>> {
        let Some(pattern) = self
            .store
            .find_pattern(
                org_id,
                &candidate.pattern_type,
                candidate.platform.as_deref(),
                &candidate.pattern_key,
            )
            .await?
        else {
            warn!(
                "Pattern {}/{} vanished between merge and promotion check",
                candidate.pattern_type, candidate.pattern_key
            );
            return Ok(None);
        };

        if pattern.confidence < self.config.promotion_threshold
            || pattern.sample_size < self.config.min_sample_for_strategy
        {
            return Ok(None);
        }

        let pattern_id = pattern.id.unwrap_or_default();
        let now = Utc::now();
        let strategy = ProceduralStrategy {
            id: None,
            org_id: org_id.to_string(),
            strategy_key: format!("{}:{}", pattern.pattern_type, pattern.pattern_key),
            source_pattern_id: pattern_id,
            strategy_value: pattern.pattern_value.clone(),
            confidence: pattern.confidence,
            sample_size: pattern.sample_size,
            created_at: now,
            updated_at: now,
        };
        let saved = self.store.upsert_strategy(&strategy).await?;

        let entry = self
            .append_audit_entry(AuditEntry {
                id: None,
                org_id: org_id.to_string(),
                action_type: AuditAction::StrategyPromoted,
                source_ids: vec![pattern_id],
                target_id: saved.id,
                details: json!({
                    "strategy_key": saved.strategy_key,
                    "sample_size": saved.sample_size,
                }),
                confidence: Some(saved.confidence),
                actor: self.config.actor.clone(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(Some(entry))
    }

    /// A failed insert comes back as CONSOLIDATION_FAILED so the caller can
    /// retry; provenance is not best-effort logging.
    pub async fn append_audit_entry(&self, entry: AuditEntry) -> CoreResult<AuditEntry> {
        self.store.append_audit(&entry).await
    }

    /// Read-only projection over the audit log.
    pub async fn query_audit_trail(
        &self,
        org_id: &str,
        filters: &AuditFilters,
    ) -> CoreResult<Vec<AuditEntry>> {
        require_org_id(org_id)?;
        self.store.query_audit(org_id, filters).await
    }
}

/// Weighted-average confidence merge. Sample sizes weight each side; a
/// zero total (malformed inputs) falls back to the candidate value.
pub fn merge_confidence(
    old_confidence: f64,
    old_sample: i64,
    new_confidence: f64,
    new_sample: i64,
) -> f64 {
    let total = old_sample + new_sample;
    if total <= 0 {
        return new_confidence.clamp(0.0, 1.0);
    }
    let merged = (old_confidence * old_sample as f64 + new_confidence * new_sample as f64)
        / total as f64;
    merged.clamp(0.0, 1.0)
}
