// tests/decay_math_test.rs
// Decay math exercised through the public API, the way retrieval ranking
// uses it at generation time.

use chrono::{TimeZone, Utc};
use engram::memory::decay::{
    composite_score, days_since, decay_weight, estimate_memory_lifespan, resolve_decay_config,
};

#[test]
fn test_ranking_prefers_recent_memories_at_equal_similarity() {
    // Two candidate memories for a campaign-name prompt, same similarity.
    let recent = composite_score(0.82, 1.0, 0.9, 30.0, 3.0, 1.0);
    let stale = composite_score(0.82, 1.0, 0.9, 30.0, 45.0, 1.0);
    assert!(recent > stale);
}

#[test]
fn test_recency_bias_amplifies_fresh_memories() {
    let unbiased = composite_score(0.5, 1.0, 1.0, 30.0, 1.0, 1.0);
    let biased = composite_score(0.5, 1.0, 1.0, 30.0, 1.0, 1.5);
    assert!(biased > unbiased);
}

#[test]
fn test_event_type_half_lives_feed_the_weight() {
    // A budget_exhausted memory (7d half-life) fades faster than a
    // viral_moment (60d) of equal importance.
    let budget = resolve_decay_config("budget_exhausted", None);
    let viral = resolve_decay_config("viral_moment", None);

    let budget_weight = decay_weight(1.0, 0.8, budget.half_life_days, 14.0);
    let viral_weight = decay_weight(1.0, 0.8, viral.half_life_days, 14.0);
    assert!(viral_weight > budget_weight);
}

#[test]
fn test_lifespan_matches_decay_curve() {
    let params = resolve_decay_config("post_success", None);
    let days = estimate_memory_lifespan(1.0, 0.9, params.half_life_days, params.min_strength);
    assert!(days > 0.0);

    let weight_at_end = decay_weight(1.0, 0.9, params.half_life_days, days);
    assert!((weight_at_end - params.min_strength).abs() < 1e-9);
}

#[test]
fn test_days_since_edge_inputs() {
    let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
    assert_eq!(days_since("garbage", now), 0.0);
    assert_eq!(days_since("2030-01-01T00:00:00Z", now), 0.0);
    assert!(days_since("2025-06-14T00:00:00Z", now) > 0.99);
}
