// src/memory/features/decay.rs
// Pure decay math for memory relevance. Weight halves every half-life:
// weight = strength * importance * 2^(-days / half_life).

use chrono::{DateTime, Utc};

/// Per-event-type decay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayParams {
    pub half_life_days: f64,
    pub min_strength: f64,
}

/// Default half-life when an event type has no table entry.
pub const DEFAULT_HALF_LIFE_DAYS: f64 = 30.0;

/// Default floor below which a memory is excluded from queries.
pub const DEFAULT_MIN_STRENGTH: f64 = 0.05;

/// Time-decayed weight of a memory.
///
/// Negative `days_since_created` clamps to 0 so future-dated records are
/// never boosted. A half-life of 0 means "decays instantly", so any zero
/// input collapses the weight to 0.
pub fn decay_weight(
    strength: f64,
    importance: f64,
    half_life_days: f64,
    days_since_created: f64,
) -> f64 {
    if strength == 0.0 || importance == 0.0 || half_life_days == 0.0 {
        return 0.0;
    }
    let days = days_since_created.max(0.0);
    strength * importance * (2.0_f64).powf(-days / half_life_days)
}

/// Ranking score for a retrieved memory. `similarity` comes from the caller
/// (query match quality); `recency_bias` lets retrieval lean newer.
pub fn composite_score(
    similarity: f64,
    strength: f64,
    importance: f64,
    half_life_days: f64,
    days_since_created: f64,
    recency_bias: f64,
) -> f64 {
    similarity * recency_bias * decay_weight(strength, importance, half_life_days, days_since_created)
}

/// Looks up decay parameters for an event type. Explicit overrides win,
/// unknown event types fall back to the 30-day default.
pub fn resolve_decay_config(event_type: &str, overrides: Option<DecayParams>) -> DecayParams {
    if let Some(params) = overrides {
        return params;
    }

    let half_life_days = match event_type {
        "post_success" => 30.0,
        "post_failure" => 21.0,
        "viral_moment" => 60.0,
        "engagement_spike" => 21.0,
        "trend_detected" => 14.0,
        "budget_exhausted" => 7.0,
        "platform_connected" => 90.0,
        _ => DEFAULT_HALF_LIFE_DAYS,
    };

    DecayParams {
        half_life_days,
        min_strength: DEFAULT_MIN_STRENGTH,
    }
}

/// rate = ln(2) / half_life. A zero half-life maps to the sentinel rate 1.0.
pub fn half_life_to_decay_rate(half_life_days: f64) -> f64 {
    if half_life_days == 0.0 {
        return 1.0;
    }
    std::f64::consts::LN_2 / half_life_days
}

/// half_life = ln(2) / rate. A zero rate means "never decays" and maps to
/// the infinity sentinel.
pub fn decay_rate_to_half_life(rate: f64) -> f64 {
    if rate == 0.0 {
        return f64::INFINITY;
    }
    std::f64::consts::LN_2 / rate
}

/// Days until the decayed weight crosses `min_threshold`. Returns 0 when the
/// record is born below the threshold or has no strength at all.
pub fn estimate_memory_lifespan(
    strength: f64,
    importance: f64,
    half_life_days: f64,
    min_threshold: f64,
) -> f64 {
    if strength == 0.0 {
        return 0.0;
    }
    let initial = strength * importance;
    if initial <= min_threshold {
        return 0.0;
    }
    // min_threshold = initial * 2^(-t/h)  =>  t = h * log2(initial / min_threshold)
    half_life_days * (initial / min_threshold).log2()
}

/// Fractional days since an ISO-8601 timestamp. Unparsable or future
/// timestamps yield 0, never a negative value.
pub fn days_since(iso_timestamp: &str, now: DateTime<Utc>) -> f64 {
    let parsed = match DateTime::parse_from_rfc3339(iso_timestamp) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => return 0.0,
    };
    let seconds = (now - parsed).num_seconds();
    (seconds.max(0) as f64) / 86_400.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_weight_halves_at_half_life() {
        let weight = decay_weight(0.8, 0.5, 30.0, 30.0);
        assert!((weight - 0.5 * 0.8 * 0.5).abs() < EPSILON);

        let weight = decay_weight(0.8, 0.5, 30.0, 60.0);
        assert!((weight - 0.25 * 0.8 * 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_zero_inputs_kill_weight() {
        assert_eq!(decay_weight(0.0, 1.0, 30.0, 5.0), 0.0);
        assert_eq!(decay_weight(1.0, 0.0, 30.0, 5.0), 0.0);
        assert_eq!(decay_weight(1.0, 1.0, 0.0, 5.0), 0.0);
        assert_eq!(decay_weight(1.0, 1.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_future_dates_never_boost() {
        let at_zero = decay_weight(1.0, 1.0, 30.0, 0.0);
        let negative = decay_weight(1.0, 1.0, 30.0, -10.0);
        assert!((at_zero - negative).abs() < EPSILON);
        assert!((at_zero - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_composite_score_ranks_recent_higher() {
        // Equal similarity, different ages: the fresher memory wins.
        let recent = composite_score(0.9, 1.0, 0.8, 30.0, 2.0, 1.0);
        let stale = composite_score(0.9, 1.0, 0.8, 30.0, 25.0, 1.0);
        assert!(recent > stale);
    }

    #[test]
    fn test_rate_half_life_round_trip() {
        for h in [0.5, 1.0, 7.0, 30.0, 60.0, 365.0] {
            let rate = half_life_to_decay_rate(h);
            let back = decay_rate_to_half_life(rate);
            assert!((back - h).abs() < 1e-9, "round trip failed for h={h}");
        }
    }

    #[test]
    fn test_rate_half_life_sentinels() {
        assert_eq!(half_life_to_decay_rate(0.0), 1.0);
        assert_eq!(decay_rate_to_half_life(0.0), f64::INFINITY);
    }

    #[test]
    fn test_resolve_decay_config_table() {
        assert_eq!(resolve_decay_config("post_success", None).half_life_days, 30.0);
        assert_eq!(resolve_decay_config("viral_moment", None).half_life_days, 60.0);
        assert_eq!(resolve_decay_config("budget_exhausted", None).half_life_days, 7.0);
        assert_eq!(resolve_decay_config("trend_detected", None).half_life_days, 14.0);
        assert_eq!(
            resolve_decay_config("never_seen_before", None).half_life_days,
            DEFAULT_HALF_LIFE_DAYS
        );

        let custom = DecayParams { half_life_days: 3.0, min_strength: 0.2 };
        assert_eq!(resolve_decay_config("post_success", Some(custom)), custom);
    }

    #[test]
    fn test_lifespan_solves_threshold_crossing() {
        // Weight 1.0, threshold 0.05, half-life 30: crosses after ~129.66 days.
        let days = estimate_memory_lifespan(1.0, 1.0, 30.0, 0.05);
        let weight_at_crossing = decay_weight(1.0, 1.0, 30.0, days);
        assert!((weight_at_crossing - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_lifespan_born_dead() {
        assert_eq!(estimate_memory_lifespan(0.0, 1.0, 30.0, 0.05), 0.0);
        assert_eq!(estimate_memory_lifespan(0.1, 0.1, 30.0, 0.05), 0.0);
    }

    #[test]
    fn test_days_since_handles_garbage_and_future() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(days_since("not a timestamp", now), 0.0);
        assert_eq!(days_since("2025-07-01T00:00:00Z", now), 0.0);

        let days = days_since("2025-06-05T12:00:00Z", now);
        assert!((days - 10.0).abs() < EPSILON);
    }
}
