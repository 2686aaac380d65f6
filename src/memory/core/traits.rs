// src/memory/core/traits.rs

//! Storage trait for the memory layers. All storage goes through this;
//! no direct DB calls in the detection, consolidation, or outcome logic,
//! which keeps the algorithms portable across storage engines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::memory::core::types::{
    AuditEntry, AuditFilters, CreativeMemory, DecisionLogEntry, EpisodicMemory,
    MemoryLayerStats, MetacognitiveLogEntry, ProceduralStrategy, SemanticPattern,
    WorkingMemoryEntry,
};

/// Key identifying one creative-memory aggregate row within an org.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeKey {
    pub platform: String,
    pub objective: String,
    pub hook_type: String,
    pub framework: String,
    pub cta_type: String,
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    // ── Episodic layer
    async fn save_episodic(&self, entry: &EpisodicMemory) -> CoreResult<EpisodicMemory>;

    /// Time-windowed slice of one org's episodic rows, oldest first.
    async fn load_episodic_window(
        &self,
        org_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<EpisodicMemory>>;

    /// Most recent episodic row whose metadata carries the given post id.
    /// Used for duplicate-snapshot suppression in outcome logging.
    async fn latest_outcome_for_post(
        &self,
        org_id: &str,
        post_id: &str,
    ) -> CoreResult<Option<EpisodicMemory>>;

    // ── Semantic layer
    async fn find_pattern(
        &self,
        org_id: &str,
        pattern_type: &str,
        platform: Option<&str>,
        pattern_key: &str,
    ) -> CoreResult<Option<SemanticPattern>>;

    async fn insert_pattern(&self, pattern: &SemanticPattern) -> CoreResult<SemanticPattern>;

    async fn update_pattern(
        &self,
        id: i64,
        confidence: f64,
        sample_size: i64,
        pattern_value: &serde_json::Value,
    ) -> CoreResult<()>;

    // ── Procedural layer
    async fn find_strategy_for_pattern(
        &self,
        org_id: &str,
        source_pattern_id: i64,
    ) -> CoreResult<Option<ProceduralStrategy>>;

    async fn upsert_strategy(&self, strategy: &ProceduralStrategy)
        -> CoreResult<ProceduralStrategy>;

    // ── Audit trail
    async fn append_audit(&self, entry: &AuditEntry) -> CoreResult<AuditEntry>;

    async fn query_audit(&self, org_id: &str, filters: &AuditFilters)
        -> CoreResult<Vec<AuditEntry>>;

    // ── Working memory
    async fn put_working(&self, entry: &WorkingMemoryEntry) -> CoreResult<WorkingMemoryEntry>;

    /// Latest unexpired entry for a scope key; expired rows are invisible.
    async fn get_working(
        &self,
        org_id: &str,
        scope_key: &str,
    ) -> CoreResult<Option<WorkingMemoryEntry>>;

    /// Deletes expired working-memory rows; returns how many were removed.
    async fn sweep_expired_working(&self) -> CoreResult<u64>;

    // ── Metacognitive layer
    async fn append_metacognitive(
        &self,
        entry: &MetacognitiveLogEntry,
    ) -> CoreResult<MetacognitiveLogEntry>;

    /// Most recent N values for a metric, newest first.
    async fn recent_metacognitive(
        &self,
        org_id: &str,
        metric: &str,
        n: i64,
    ) -> CoreResult<Vec<MetacognitiveLogEntry>>;

    // ── Creative memory + decision log
    async fn find_creative(
        &self,
        org_id: &str,
        key: &CreativeKey,
    ) -> CoreResult<Option<CreativeMemory>>;

    /// Find-or-create the aggregate row and apply one streaming observation.
    async fn record_creative_observation(
        &self,
        org_id: &str,
        key: &CreativeKey,
        engagement: f64,
        success: bool,
    ) -> CoreResult<CreativeMemory>;

    async fn append_decision(&self, entry: &DecisionLogEntry) -> CoreResult<DecisionLogEntry>;

    // ── Operator visibility
    async fn layer_stats(&self, org_id: &str) -> CoreResult<MemoryLayerStats>;
}
