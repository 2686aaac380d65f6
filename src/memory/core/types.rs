// src/memory/core/types.rs
// Domain types for the layered memory model. All tenant-scoped rows carry an
// org_id; semantic patterns with org_id = None are global (read-only here).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable record per discrete observed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    pub id: Option<i64>,
    pub org_id: String,
    pub event_type: String,
    pub platform: Option<String>,
    /// Importance in [0,1]; clamped on construction.
    pub importance: f64,
    /// Initial strength in [0,1]; decays over time together with importance.
    pub strength: f64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl EpisodicMemory {
    pub fn new(org_id: impl Into<String>, event_type: impl Into<String>, importance: f64) -> Self {
        Self {
            id: None,
            org_id: org_id.into(),
            event_type: event_type.into(),
            platform: None,
            importance: importance.clamp(0.0, 1.0),
            strength: 1.0,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Age of this memory in fractional days.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds();
        (seconds.max(0) as f64) / 86_400.0
    }
}

/// A named, typed regularity mined from many episodic memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticPattern {
    pub id: Option<i64>,
    /// None marks a cross-tenant global pattern.
    pub org_id: Option<String>,
    pub pattern_type: String,
    pub platform: Option<String>,
    pub pattern_key: String,
    pub pattern_value: serde_json::Value,
    pub confidence: f64,
    pub sample_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A candidate produced by the pattern detector, not yet persisted.
/// Carries the episodic rows that contributed, for audit provenance.
#[derive(Debug, Clone)]
pub struct CandidatePattern {
    pub pattern_type: String,
    pub platform: Option<String>,
    pub pattern_key: String,
    pub pattern_value: serde_json::Value,
    pub confidence: f64,
    pub sample_size: i64,
    pub source_episode_ids: Vec<i64>,
}

/// A semantic pattern promoted to actionable status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralStrategy {
    pub id: Option<i64>,
    pub org_id: String,
    pub strategy_key: String,
    pub source_pattern_id: i64,
    pub strategy_value: serde_json::Value,
    pub confidence: f64,
    pub sample_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short-lived scratch state; expires instead of decaying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemoryEntry {
    pub id: Option<i64>,
    pub org_id: String,
    pub scope_key: String,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Append-only self-assessment record (e.g. prediction_accuracy per period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetacognitiveLogEntry {
    pub id: Option<i64>,
    pub org_id: String,
    pub metric: String,
    pub value: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Running statistical aggregate of content-style outcomes. Never stores
/// raw events; updated with a streaming mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeMemory {
    pub id: Option<i64>,
    pub org_id: String,
    pub platform: String,
    pub objective: String,
    pub hook_type: String,
    pub framework: String,
    pub cta_type: String,
    pub sample_size: i64,
    pub success_count: i64,
    pub total_engagement: f64,
    pub avg_engagement: f64,
    pub updated_at: DateTime<Utc>,
}

/// Links a generated draft to the objective it was optimized for and the
/// resulting post, for delayed outcome attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub id: Option<i64>,
    pub org_id: String,
    pub draft_id: String,
    pub variant: String,
    pub platform: String,
    pub objective: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

/// One row per consolidation action. Append-only; the only place memory
/// mutation history is reconstructable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Option<i64>,
    pub org_id: String,
    pub action_type: AuditAction,
    pub source_ids: Vec<i64>,
    pub target_id: Option<i64>,
    pub details: serde_json::Value,
    pub confidence: Option<f64>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EpisodicPromoted,
    PatternMerged,
    StrategyPromoted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::EpisodicPromoted => "episodic_promoted",
            AuditAction::PatternMerged => "pattern_merged",
            AuditAction::StrategyPromoted => "strategy_promoted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "episodic_promoted" => Some(AuditAction::EpisodicPromoted),
            "pattern_merged" => Some(AuditAction::PatternMerged),
            "strategy_promoted" => Some(AuditAction::StrategyPromoted),
            _ => None,
        }
    }
}

/// Filters for reading back the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilters {
    pub action_type: Option<AuditAction>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Row counts per memory layer, for operator visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryLayerStats {
    pub episodic: i64,
    pub semantic: i64,
    pub procedural: i64,
    pub working: i64,
    pub metacognitive: i64,
}
