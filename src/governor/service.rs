// src/governor/service.rs
// The per-request state machine in front of every paid AI call:
// ESTIMATE -> CACHE_LOOKUP -> {HIT} -> {MISS: BUDGET_CHECK -> {DENIED:
// fallback} -> {ALLOWED: CALL_MODEL -> LOG_USAGE + WRITE_CACHE}}.
// Model errors and timeouts never escape as exceptions; every path lands
// in the usage ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::anthropic::ModelClient;
use super::budget::decide_paid_ai_access;
use super::intent::{build_intent_cache_key, estimate_anthropic_cost_usd, estimate_tokens_from_text};
use super::store::GovernorStore;
use super::types::{
    AccessDecision, AiUsageEvent, BudgetCaps, GovernedOutcome, GovernedRequest, IntentCacheEntry,
    ModelMessage,
};
use crate::error::{require_org_id, CoreError, CoreResult};

pub struct GovernorService<C: ModelClient> {
    store: GovernorStore,
    client: Arc<C>,
}

impl<C: ModelClient> GovernorService<C> {
    pub fn new(pool: SqlitePool, client: Arc<C>) -> Self {
        Self {
            store: GovernorStore::new(pool),
            client,
        }
    }

    pub fn store(&self) -> &GovernorStore {
        &self.store
    }

    /// Budget check against the ledger, without executing anything.
    pub async fn decide_paid_ai_access(
        &self,
        org_id: &str,
        estimated_additional_cost_usd: f64,
        caps: BudgetCaps,
    ) -> CoreResult<AccessDecision> {
        decide_paid_ai_access(&self.store, org_id, estimated_additional_cost_usd, caps).await
    }

    /// Unexpired cache entry for the key, or None. Never an error path for
    /// the caller's hot loop.
    pub async fn get_intent_cache(
        &self,
        org_id: &str,
        route_key: &str,
        intent_hash: &str,
    ) -> CoreResult<Option<IntentCacheEntry>> {
        self.store
            .get_cache(org_id, route_key, intent_hash, Utc::now())
            .await
    }

    pub async fn set_intent_cache(&self, entry: &IntentCacheEntry) -> CoreResult<()> {
        self.store.set_cache(entry).await
    }

    pub async fn log_ai_usage_event(&self, event: &AiUsageEvent) -> CoreResult<AiUsageEvent> {
        self.store.log_usage(event).await
    }

    /// Drives one governed request end to end. `fallback` computes the
    /// deterministic result used on budget denial, model error, or timeout.
    pub async fn execute<F>(
        &self,
        request: &GovernedRequest,
        fallback: F,
    ) -> CoreResult<GovernedOutcome>
    where
        F: FnOnce() -> String + Send,
    {
        require_org_id(&request.org_id)?;
        if request.route_key.trim().is_empty() {
            return Err(CoreError::validation("route key must not be empty"));
        }

        // ESTIMATE
        let input_tokens = estimate_tokens_from_text(&request.prompt);
        let estimated_cost = estimate_anthropic_cost_usd(
            &request.model,
            input_tokens,
            request.max_output_tokens as i64,
        );
        let intent_hash = build_intent_cache_key(&request.route_key, &request.params);

        // CACHE_LOOKUP
        if let Some(entry) = self
            .store
            .get_cache(&request.org_id, &request.route_key, &intent_hash, Utc::now())
            .await?
        {
            debug!(
                "Intent cache hit for org {} route {}",
                request.org_id, request.route_key
            );
            self.store
                .log_usage(&self.usage_event(request, &intent_hash, 0, 0, 0.0, 0, true, true, None))
                .await?;
            return Ok(GovernedOutcome::CacheHit { response: entry.response });
        }

        // BUDGET_CHECK
        let decision = self
            .decide_paid_ai_access(&request.org_id, estimated_cost, request.caps)
            .await?;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "AI budget exhausted".to_string());
            self.store
                .log_usage(&self.usage_event(
                    request,
                    &intent_hash,
                    0,
                    0,
                    0.0,
                    0,
                    false,
                    false,
                    Some("BUDGET_DENIED".to_string()),
                ))
                .await?;
            return Ok(GovernedOutcome::Fallback { response: fallback(), reason });
        }

        // CALL_MODEL under the caller-supplied timeout.
        let messages = [ModelMessage::user(request.prompt.clone())];
        let call = self
            .client
            .call_model(&request.model, &messages, request.max_output_tokens);
        let timeout = Duration::from_millis(request.model_timeout_ms.max(1));

        let response = match tokio::time::timeout(timeout, call).await {
            Err(_) => {
                let err = CoreError::ModelTimeout(request.model_timeout_ms);
                warn!(
                    "Model call timed out for org {} route {} after {}ms",
                    request.org_id, request.route_key, request.model_timeout_ms
                );
                self.store
                    .log_usage(&self.usage_event(
                        request,
                        &intent_hash,
                        input_tokens,
                        0,
                        0.0,
                        request.model_timeout_ms as i64,
                        false,
                        false,
                        Some(err.code().to_string()),
                    ))
                    .await?;
                return Ok(GovernedOutcome::Fallback {
                    response: fallback(),
                    reason: err.to_string(),
                });
            }
            Ok(Err(model_err)) => {
                let err = CoreError::ModelUnavailable(model_err.to_string());
                warn!(
                    "Model call failed for org {} route {}: {}",
                    request.org_id, request.route_key, model_err
                );
                self.store
                    .log_usage(&self.usage_event(
                        request,
                        &intent_hash,
                        input_tokens,
                        0,
                        0.0,
                        0,
                        false,
                        false,
                        Some(err.code().to_string()),
                    ))
                    .await?;
                return Ok(GovernedOutcome::Fallback {
                    response: fallback(),
                    reason: err.to_string(),
                });
            }
            Ok(Ok(response)) => response,
        };

        // LOG_USAGE + WRITE_CACHE, consistent in one transaction.
        let cost = estimate_anthropic_cost_usd(
            &response.model,
            response.input_tokens,
            response.output_tokens,
        );
        let now = Utc::now();
        let event = self.usage_event(
            request,
            &intent_hash,
            response.input_tokens,
            response.output_tokens,
            cost,
            response.latency_ms,
            true,
            false,
            None,
        );
        let cache_entry = IntentCacheEntry {
            org_id: request.org_id.clone(),
            route_key: request.route_key.clone(),
            intent_hash,
            response: response.text.clone(),
            provider: response.provider.clone(),
            model: response.model.clone(),
            estimated_cost_usd: cost,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(request.cache_ttl_seconds.max(0)),
        };
        self.store.record_model_result(&event, &cache_entry).await?;

        info!(
            "Generated response for org {} route {} (${:.4}, {}ms)",
            request.org_id, request.route_key, cost, response.latency_ms
        );
        Ok(GovernedOutcome::Generated { response: response.text, cost_usd: cost })
    }

    #[allow(clippy::too_many_arguments)]
    fn usage_event(
        &self,
        request: &GovernedRequest,
        intent_hash: &str,
        input_tokens: i64,
        output_tokens: i64,
        cost: f64,
        latency_ms: i64,
        success: bool,
        cache_hit: bool,
        error_code: Option<String>,
    ) -> AiUsageEvent {
        AiUsageEvent {
            id: None,
            org_id: request.org_id.clone(),
            route_key: request.route_key.clone(),
            provider: self.client.provider().to_string(),
            model: request.model.clone(),
            input_tokens,
            output_tokens,
            estimated_cost_usd: cost,
            latency_ms,
            success,
            cache_hit,
            error_code,
            metadata: Some(serde_json::json!({ "intent_hash": intent_hash })),
            created_at: Utc::now(),
        }
    }
}
