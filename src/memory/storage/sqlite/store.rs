// src/memory/storage/sqlite/store.rs
// SqliteMemoryStore delegates to focused operation modules, one per
// entity family.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::core::{
    AggregateOperations, AuditOperations, EpisodicOperations, PatternOperations,
    WorkingOperations,
};
use super::migration;
use crate::error::CoreResult;
use crate::memory::core::traits::{CreativeKey, MemoryStore};
use crate::memory::core::types::{
    AuditEntry, AuditFilters, CreativeMemory, DecisionLogEntry, EpisodicMemory,
    MemoryLayerStats, MetacognitiveLogEntry, ProceduralStrategy, SemanticPattern,
    WorkingMemoryEntry,
};

pub struct SqliteMemoryStore {
    pub pool: SqlitePool,

    episodic_ops: EpisodicOperations,
    pattern_ops: PatternOperations,
    audit_ops: AuditOperations,
    working_ops: WorkingOperations,
    aggregate_ops: AggregateOperations,
}

impl SqliteMemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            episodic_ops: EpisodicOperations::new(pool.clone()),
            pattern_ops: PatternOperations::new(pool.clone()),
            audit_ops: AuditOperations::new(pool.clone()),
            working_ops: WorkingOperations::new(pool.clone()),
            aggregate_ops: AggregateOperations::new(pool.clone()),
            pool,
        }
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        migration::run_migrations(&self.pool).await
    }

    /// Organizations with episodic activity since the given time. Drives
    /// the consolidation scheduler's per-org iteration.
    pub async fn active_org_ids(&self, since: DateTime<Utc>) -> CoreResult<Vec<String>> {
        let org_ids = sqlx::query_scalar(
            r#"
            SELECT DISTINCT org_id FROM episodic_memories
            WHERE created_at >= ?
            ORDER BY org_id
            "#,
        )
        .bind(since.naive_utc())
        .fetch_all(&self.pool)
        .await?;
        Ok(org_ids)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn save_episodic(&self, entry: &EpisodicMemory) -> CoreResult<EpisodicMemory> {
        self.episodic_ops.save(entry).await
    }

    async fn load_episodic_window(
        &self,
        org_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> CoreResult<Vec<EpisodicMemory>> {
        self.episodic_ops.load_window(org_id, since, limit).await
    }

    async fn latest_outcome_for_post(
        &self,
        org_id: &str,
        post_id: &str,
    ) -> CoreResult<Option<EpisodicMemory>> {
        self.episodic_ops.latest_for_post(org_id, post_id).await
    }

    async fn find_pattern(
        &self,
        org_id: &str,
        pattern_type: &str,
        platform: Option<&str>,
        pattern_key: &str,
    ) -> CoreResult<Option<SemanticPattern>> {
        self.pattern_ops
            .find_pattern(org_id, pattern_type, platform, pattern_key)
            .await
    }

    async fn insert_pattern(&self, pattern: &SemanticPattern) -> CoreResult<SemanticPattern> {
        self.pattern_ops.insert_pattern(pattern).await
    }

    async fn update_pattern(
        &self,
        id: i64,
        confidence: f64,
        sample_size: i64,
        pattern_value: &serde_json::Value,
    ) -> CoreResult<()> {
        self.pattern_ops
            .update_pattern(id, confidence, sample_size, pattern_value)
            .await
    }

    async fn find_strategy_for_pattern(
        &self,
        org_id: &str,
        source_pattern_id: i64,
    ) -> CoreResult<Option<ProceduralStrategy>> {
        self.pattern_ops
            .find_strategy_for_pattern(org_id, source_pattern_id)
            .await
    }

    async fn upsert_strategy(
        &self,
        strategy: &ProceduralStrategy,
    ) -> CoreResult<ProceduralStrategy> {
        self.pattern_ops.upsert_strategy(strategy).await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> CoreResult<AuditEntry> {
        self.audit_ops.append(entry).await
    }

    async fn query_audit(
        &self,
        org_id: &str,
        filters: &AuditFilters,
    ) -> CoreResult<Vec<AuditEntry>> {
        self.audit_ops.query(org_id, filters).await
    }

    async fn put_working(&self, entry: &WorkingMemoryEntry) -> CoreResult<WorkingMemoryEntry> {
        self.working_ops.put(entry).await
    }

    async fn get_working(
        &self,
        org_id: &str,
        scope_key: &str,
    ) -> CoreResult<Option<WorkingMemoryEntry>> {
        self.working_ops.get(org_id, scope_key).await
    }

    async fn sweep_expired_working(&self) -> CoreResult<u64> {
        self.working_ops.sweep_expired().await
    }

    async fn append_metacognitive(
        &self,
        entry: &MetacognitiveLogEntry,
    ) -> CoreResult<MetacognitiveLogEntry> {
        self.working_ops.append_metacognitive(entry).await
    }

    async fn recent_metacognitive(
        &self,
        org_id: &str,
        metric: &str,
        n: i64,
    ) -> CoreResult<Vec<MetacognitiveLogEntry>> {
        self.working_ops.recent_metacognitive(org_id, metric, n).await
    }

    async fn find_creative(
        &self,
        org_id: &str,
        key: &CreativeKey,
    ) -> CoreResult<Option<CreativeMemory>> {
        self.aggregate_ops.find_creative(org_id, key).await
    }

    async fn record_creative_observation(
        &self,
        org_id: &str,
        key: &CreativeKey,
        engagement: f64,
        success: bool,
    ) -> CoreResult<CreativeMemory> {
        self.aggregate_ops
            .record_observation(org_id, key, engagement, success)
            .await
    }

    async fn append_decision(&self, entry: &DecisionLogEntry) -> CoreResult<DecisionLogEntry> {
        self.aggregate_ops.append_decision(entry).await
    }

    async fn layer_stats(&self, org_id: &str) -> CoreResult<MemoryLayerStats> {
        let episodic: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM episodic_memories WHERE org_id = ?")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        let semantic: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM semantic_patterns WHERE org_id = ?")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        let procedural: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM procedural_strategies WHERE org_id = ?")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        let working: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM working_memory WHERE org_id = ?")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        let metacognitive: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM metacognitive_logs WHERE org_id = ?")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(MemoryLayerStats {
            episodic,
            semantic,
            procedural,
            working,
            metacognitive,
        })
    }
}
