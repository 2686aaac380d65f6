// src/memory/features/patterns/frequency.rs

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;

use super::{event_weight, PATTERN_TYPE_FREQUENCY};
use crate::memory::core::types::{CandidatePattern, EpisodicMemory};

/// Groups events by (event_type, platform) and emits one candidate per
/// group with at least `min_occurrences` members. Confidence is the mean
/// decay weight of the group scaled by a count-saturation term, so five
/// fresh events beat five stale ones and one-off noise never saturates.
pub fn mine(
    events: &[EpisodicMemory],
    min_occurrences: i64,
    now: DateTime<Utc>,
) -> Vec<CandidatePattern> {
    let mut groups: BTreeMap<(String, Option<String>), Vec<&EpisodicMemory>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.event_type.clone(), event.platform.clone()))
            .or_default()
            .push(event);
    }

    let mut patterns = Vec::new();
    for ((event_type, platform), members) in groups {
        let count = members.len() as i64;
        if count < min_occurrences.max(1) {
            continue;
        }

        let mean_weight =
            members.iter().map(|e| event_weight(e, now)).sum::<f64>() / count as f64;
        let saturation = count as f64 / (count as f64 + 2.0);
        let confidence = (mean_weight * saturation).clamp(0.0, 1.0);

        patterns.push(CandidatePattern {
            pattern_type: PATTERN_TYPE_FREQUENCY.to_string(),
            platform,
            pattern_key: event_type.clone(),
            pattern_value: json!({
                "event_type": event_type,
                "count": count,
                "mean_decay_weight": mean_weight,
            }),
            confidence,
            sample_size: count,
            source_episode_ids: members.iter().filter_map(|e| e.id).collect(),
        });
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::core::types::EpisodicMemory;
    use chrono::Duration;

    fn event(event_type: &str, platform: &str, days_ago: i64, id: i64) -> EpisodicMemory {
        let mut e = EpisodicMemory::new("org_1", event_type, 0.8).with_platform(platform);
        e.id = Some(id);
        e.created_at = Utc::now() - Duration::days(days_ago);
        e
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        assert!(mine(&[], 3, Utc::now()).is_empty());
    }

    #[test]
    fn test_below_min_occurrences_yields_nothing() {
        let events = vec![
            event("post_success", "instagram", 1, 1),
            event("post_success", "instagram", 2, 2),
        ];
        assert!(mine(&events, 3, Utc::now()).is_empty());
    }

    #[test]
    fn test_five_events_over_ten_days_form_a_pattern() {
        let events: Vec<_> = (0..5)
            .map(|i| event("post_success", "instagram", i * 2, i + 1))
            .collect();

        let patterns = mine(&events, 3, Utc::now());
        assert_eq!(patterns.len(), 1);

        let pattern = &patterns[0];
        assert_eq!(pattern.pattern_key, "post_success");
        assert_eq!(pattern.platform.as_deref(), Some("instagram"));
        assert_eq!(pattern.pattern_value["count"], 5);
        assert_eq!(pattern.sample_size, 5);
        assert_eq!(pattern.source_episode_ids.len(), 5);
        assert!(pattern.confidence > 0.0 && pattern.confidence <= 1.0);
    }

    #[test]
    fn test_fresh_groups_score_higher_than_stale_ones() {
        let fresh: Vec<_> = (0..4).map(|i| event("post_success", "tiktok", i, i + 1)).collect();
        let stale: Vec<_> = (0..4)
            .map(|i| event("post_success", "tiktok", 60 + i, i + 10))
            .collect();

        let now = Utc::now();
        let fresh_conf = mine(&fresh, 3, now)[0].confidence;
        let stale_conf = mine(&stale, 3, now)[0].confidence;
        assert!(fresh_conf > stale_conf);
    }

    #[test]
    fn test_groups_split_by_platform() {
        let mut events = vec![
            event("post_success", "instagram", 1, 1),
            event("post_success", "instagram", 2, 2),
            event("post_success", "instagram", 3, 3),
        ];
        events.push(event("post_success", "tiktok", 1, 4));

        let patterns = mine(&events, 3, Utc::now());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].platform.as_deref(), Some("instagram"));
    }
}
