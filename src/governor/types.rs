// src/governor/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan-dependent spending caps, supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct BudgetCaps {
    pub daily_usd: f64,
    pub monthly_usd: f64,
}

/// Ledger totals for the current UTC day and calendar month.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    pub daily_spent_usd: f64,
    pub monthly_spent_usd: f64,
}

/// Outcome of a budget check. Denials carry a human-readable reason; the
/// route handler is expected to degrade to a deterministic computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub usage: UsageTotals,
}

/// One cached AI response, keyed by (org, route, intent hash).
/// Overwritten on refresh, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentCacheEntry {
    pub org_id: String,
    pub route_key: String,
    pub intent_hash: String,
    pub response: String,
    pub provider: String,
    pub model: String,
    pub estimated_cost_usd: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One row in the usage ledger, the source of truth for budget
/// accounting. Appended for hits, misses, successes, and failures alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiUsageEvent {
    pub id: Option<i64>,
    pub org_id: String,
    pub route_key: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated_cost_usd: f64,
    pub latency_ms: i64,
    pub success: bool,
    pub cache_hit: bool,
    pub error_code: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// One chat turn for the opaque model capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

impl ModelMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// What the model capability returns on success.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
}

/// A governed generation request.
#[derive(Debug, Clone)]
pub struct GovernedRequest {
    pub org_id: String,
    /// Route/version discriminator; bumping it invalidates prior cache entries.
    pub route_key: String,
    /// Semantic parameters of the request; hashed into the intent key.
    pub params: serde_json::Value,
    pub prompt: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub caps: BudgetCaps,
    pub cache_ttl_seconds: i64,
    pub model_timeout_ms: u64,
}

/// How a governed request resolved.
#[derive(Debug, Clone)]
pub enum GovernedOutcome {
    /// Served from the intent cache; no model invocation.
    CacheHit { response: String },
    /// Fresh model output, logged and cached.
    Generated { response: String, cost_usd: f64 },
    /// Deterministic fallback: budget denied, model error, or timeout.
    Fallback { response: String, reason: String },
}

impl GovernedOutcome {
    pub fn response(&self) -> &str {
        match self {
            GovernedOutcome::CacheHit { response } => response,
            GovernedOutcome::Generated { response, .. } => response,
            GovernedOutcome::Fallback { response, .. } => response,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GovernedOutcome::Fallback { .. })
    }
}
