// src/memory/features/patterns/temporal.rs

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::json;
use std::collections::BTreeMap;

use super::{event_weight, PATTERN_TYPE_TEMPORAL};
use crate::memory::core::types::{CandidatePattern, EpisodicMemory};

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Buckets events by (weekday, hour-of-day) and emits a candidate per
/// bucket that clears `min_bucket_size`, so a single lucky Tuesday never
/// becomes a pattern. Confidence blends the bucket's share of all events
/// with the mean decay weight of its members.
pub fn mine(
    events: &[EpisodicMemory],
    min_bucket_size: i64,
    now: DateTime<Utc>,
) -> Vec<CandidatePattern> {
    if events.is_empty() {
        return Vec::new();
    }

    let total = events.len() as f64;
    let mut buckets: BTreeMap<(usize, u32), Vec<&EpisodicMemory>> = BTreeMap::new();
    for event in events {
        let weekday = event.created_at.weekday().num_days_from_monday() as usize;
        let hour = event.created_at.hour();
        buckets.entry((weekday, hour)).or_default().push(event);
    }

    let mut patterns = Vec::new();
    for ((weekday, hour), members) in buckets {
        let count = members.len() as i64;
        if count < min_bucket_size.max(1) {
            continue;
        }

        let mean_weight =
            members.iter().map(|e| event_weight(e, now)).sum::<f64>() / count as f64;
        let saturation = count as f64 / (count as f64 + 2.0);
        let share = count as f64 / total;
        let confidence = (mean_weight * saturation * share.sqrt()).clamp(0.0, 1.0);

        let pattern_key = format!("{}_{:02}", WEEKDAYS[weekday], hour);
        patterns.push(CandidatePattern {
            pattern_type: PATTERN_TYPE_TEMPORAL.to_string(),
            platform: None,
            pattern_key: pattern_key.clone(),
            pattern_value: json!({
                "weekday": WEEKDAYS[weekday],
                "hour": hour,
                "count": count,
                "share": share,
            }),
            confidence,
            sample_size: count,
            source_episode_ids: members.iter().filter_map(|e| e.id).collect(),
        });
    }

    patterns
}
