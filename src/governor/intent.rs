// src/governor/intent.rs
// Intent hashing and pre-flight estimators. The hash is over canonical
// JSON (stable key order), so semantically identical requests collide
// into one cache entry regardless of incidental formatting. Estimates are
// conservative and deterministic; they gate budgets, they never bill.

use sha2::{Digest, Sha256};

/// Deterministic cache key for one semantic request. The route key is a
/// version discriminator: bump it and every prior entry for the route
/// misses.
pub fn build_intent_cache_key(route_key: &str, params: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(route_key.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_json(params).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Serializes with object keys sorted recursively. Arrays keep their
/// order; position is meaning there.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        serde_json::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Rough token count: ~4 characters per token, rounded up. Good enough
/// for pre-flight budget decisions, not for billing.
pub fn estimate_tokens_from_text(text: &str) -> i64 {
    let chars = text.chars().count() as i64;
    (chars + 3) / 4
}

/// Pricing per million tokens (input, output) by model family. Unknown
/// models price at Opus rates so the estimate errs high.
fn model_rates_per_mtok(model: &str) -> (f64, f64) {
    let m = model.to_ascii_lowercase();
    if m.contains("haiku") {
        (0.80, 4.00)
    } else if m.contains("sonnet") {
        (3.00, 15.00)
    } else {
        (15.00, 75.00)
    }
}

pub fn estimate_anthropic_cost_usd(model: &str, input_tokens: i64, output_tokens: i64) -> f64 {
    let (input_rate, output_rate) = model_rates_per_mtok(model);
    (input_tokens.max(0) as f64 * input_rate + output_tokens.max(0) as f64 * output_rate)
        / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"platform": "instagram", "objective": "awareness", "tone": "bold"});
        let b = json!({"tone": "bold", "platform": "instagram", "objective": "awareness"});
        assert_eq!(
            build_intent_cache_key("score_content:v2", &a),
            build_intent_cache_key("score_content:v2", &b)
        );
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let a = json!({"outer": {"b": 2, "a": 1}});
        let b = json!({"outer": {"a": 1, "b": 2}});
        assert_eq!(
            build_intent_cache_key("route:v1", &a),
            build_intent_cache_key("route:v1", &b)
        );
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!({"items": [1, 2]});
        let b = json!({"items": [2, 1]});
        assert_ne!(
            build_intent_cache_key("route:v1", &a),
            build_intent_cache_key("route:v1", &b)
        );
    }

    #[test]
    fn test_route_version_bump_invalidates() {
        let params = json!({"platform": "tiktok"});
        assert_ne!(
            build_intent_cache_key("score_content:v1", &params),
            build_intent_cache_key("score_content:v2", &params)
        );
    }

    #[test]
    fn test_different_params_different_keys() {
        assert_ne!(
            build_intent_cache_key("r:v1", &json!({"x": 1})),
            build_intent_cache_key("r:v1", &json!({"x": 2}))
        );
    }

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens_from_text(""), 0);
        assert_eq!(estimate_tokens_from_text("a"), 1);
        assert_eq!(estimate_tokens_from_text("abcd"), 1);
        assert_eq!(estimate_tokens_from_text("abcde"), 2);
    }

    #[test]
    fn test_cost_estimates_by_family() {
        // 1M input + 1M output at sonnet rates.
        let cost = estimate_anthropic_cost_usd("claude-sonnet-4-5", 1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);

        let haiku = estimate_anthropic_cost_usd("claude-haiku-4-5", 1_000_000, 0);
        assert!((haiku - 0.8).abs() < 1e-9);

        // Unknown models err toward the expensive family.
        let unknown = estimate_anthropic_cost_usd("mystery-model", 1_000_000, 0);
        assert!((unknown - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_tokens_clamp_to_zero() {
        assert_eq!(estimate_anthropic_cost_usd("claude-sonnet-4-5", -10, -10), 0.0);
    }
}
