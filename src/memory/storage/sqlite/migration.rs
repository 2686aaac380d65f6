// src/memory/storage/sqlite/migration.rs
//! Schema for all memory layers and the governor ledger.
//! Run at startup; every statement is idempotent.

use anyhow::Result;
use sqlx::{Executor, SqlitePool};

const CREATE_EPISODIC_MEMORIES: &str = r#"
CREATE TABLE IF NOT EXISTS episodic_memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    platform TEXT,
    importance REAL NOT NULL,
    strength REAL NOT NULL DEFAULT 1.0,
    metadata TEXT,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_SEMANTIC_PATTERNS: &str = r#"
CREATE TABLE IF NOT EXISTS semantic_patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT,
    pattern_type TEXT NOT NULL,
    platform TEXT,
    pattern_key TEXT NOT NULL,
    pattern_value TEXT NOT NULL,
    confidence REAL NOT NULL,
    sample_size INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE (org_id, pattern_type, platform, pattern_key)
);
"#;

const CREATE_PROCEDURAL_STRATEGIES: &str = r#"
CREATE TABLE IF NOT EXISTS procedural_strategies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    strategy_key TEXT NOT NULL,
    source_pattern_id INTEGER NOT NULL,
    strategy_value TEXT NOT NULL,
    confidence REAL NOT NULL,
    sample_size INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE (org_id, source_pattern_id)
);
"#;

const CREATE_WORKING_MEMORY: &str = r#"
CREATE TABLE IF NOT EXISTS working_memory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    expires_at DATETIME NOT NULL
);
"#;

const CREATE_METACOGNITIVE_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS metacognitive_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    period_start DATETIME NOT NULL,
    period_end DATETIME NOT NULL,
    details TEXT,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_CREATIVE_MEMORIES: &str = r#"
CREATE TABLE IF NOT EXISTS creative_memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    objective TEXT NOT NULL,
    hook_type TEXT NOT NULL,
    framework TEXT NOT NULL,
    cta_type TEXT NOT NULL,
    sample_size INTEGER NOT NULL DEFAULT 0,
    success_count INTEGER NOT NULL DEFAULT 0,
    total_engagement REAL NOT NULL DEFAULT 0,
    avg_engagement REAL NOT NULL DEFAULT 0,
    updated_at DATETIME NOT NULL,
    UNIQUE (org_id, platform, objective, hook_type, framework, cta_type)
);
"#;

const CREATE_DECISION_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS decision_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    draft_id TEXT NOT NULL,
    variant TEXT NOT NULL,
    platform TEXT NOT NULL,
    objective TEXT NOT NULL,
    post_id TEXT NOT NULL,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_CONSOLIDATION_AUDIT_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    source_ids TEXT NOT NULL,
    target_id INTEGER,
    details TEXT NOT NULL,
    confidence REAL,
    actor TEXT NOT NULL,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_INTENT_CACHE: &str = r#"
CREATE TABLE IF NOT EXISTS intent_cache (
    org_id TEXT NOT NULL,
    route_key TEXT NOT NULL,
    intent_hash TEXT NOT NULL,
    response TEXT NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    estimated_cost_usd REAL NOT NULL,
    created_at DATETIME NOT NULL,
    expires_at DATETIME NOT NULL,
    PRIMARY KEY (org_id, route_key, intent_hash)
);
"#;

const CREATE_AI_USAGE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS ai_usage_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id TEXT NOT NULL,
    route_key TEXT NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    estimated_cost_usd REAL NOT NULL DEFAULT 0,
    latency_ms INTEGER NOT NULL DEFAULT 0,
    success BOOLEAN NOT NULL,
    cache_hit BOOLEAN NOT NULL DEFAULT FALSE,
    error_code TEXT,
    metadata TEXT,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_INDICES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_episodic_org_created ON episodic_memories(org_id, created_at);
CREATE INDEX IF NOT EXISTS idx_episodic_org_event ON episodic_memories(org_id, event_type);
CREATE INDEX IF NOT EXISTS idx_patterns_org_type ON semantic_patterns(org_id, pattern_type);
CREATE INDEX IF NOT EXISTS idx_strategies_org ON procedural_strategies(org_id);
CREATE INDEX IF NOT EXISTS idx_working_org_scope ON working_memory(org_id, scope_key);
CREATE INDEX IF NOT EXISTS idx_working_expires ON working_memory(expires_at);
CREATE INDEX IF NOT EXISTS idx_metacognitive_org_metric ON metacognitive_logs(org_id, metric);
CREATE INDEX IF NOT EXISTS idx_audit_org_created ON consolidation_audit_log(org_id, created_at);
CREATE INDEX IF NOT EXISTS idx_usage_org_created ON ai_usage_events(org_id, created_at);
CREATE INDEX IF NOT EXISTS idx_decisions_org_post ON decision_logs(org_id, post_id);
"#;

/// Runs all required migrations for the SQLite backend.
/// Safe to call at every startup (idempotent).
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    pool.execute(CREATE_EPISODIC_MEMORIES).await?;
    pool.execute(CREATE_SEMANTIC_PATTERNS).await?;
    pool.execute(CREATE_PROCEDURAL_STRATEGIES).await?;
    pool.execute(CREATE_WORKING_MEMORY).await?;
    pool.execute(CREATE_METACOGNITIVE_LOGS).await?;
    pool.execute(CREATE_CREATIVE_MEMORIES).await?;
    pool.execute(CREATE_DECISION_LOGS).await?;
    pool.execute(CREATE_CONSOLIDATION_AUDIT_LOG).await?;
    pool.execute(CREATE_INTENT_CACHE).await?;
    pool.execute(CREATE_AI_USAGE_EVENTS).await?;
    pool.execute(CREATE_INDICES).await?;
    Ok(())
}
