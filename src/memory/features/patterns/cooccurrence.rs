// src/memory/features/patterns/cooccurrence.rs

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;

use super::{event_weight, PATTERN_TYPE_COOCCURRENCE};
use crate::memory::core::types::{CandidatePattern, EpisodicMemory};

/// Counts ordered event-type pairs (a before b) within a sliding time
/// window. Fewer than two events can never form a pair, so that input
/// yields an empty result rather than an error.
pub fn mine(
    events: &[EpisodicMemory],
    window_minutes: i64,
    min_pair_count: i64,
    now: DateTime<Utc>,
) -> Vec<CandidatePattern> {
    if events.len() < 2 {
        return Vec::new();
    }

    let mut ordered: Vec<&EpisodicMemory> = events.iter().collect();
    ordered.sort_by_key(|e| (e.created_at, e.id));
    let window = Duration::minutes(window_minutes.max(1));

    // pair key -> (count, weight sum, contributing ids)
    let mut pairs: BTreeMap<(String, String), (i64, f64, Vec<i64>)> = BTreeMap::new();

    for (i, first) in ordered.iter().enumerate() {
        for second in ordered.iter().skip(i + 1) {
            if second.created_at - first.created_at > window {
                break;
            }
            if first.event_type == second.event_type {
                continue;
            }

            let key = (first.event_type.clone(), second.event_type.clone());
            let entry = pairs.entry(key).or_insert((0, 0.0, Vec::new()));
            entry.0 += 1;
            // Weight the pair by its more decayed endpoint.
            entry.1 += event_weight(first, now).min(event_weight(second, now));
            if let Some(id) = first.id {
                entry.2.push(id);
            }
            if let Some(id) = second.id {
                entry.2.push(id);
            }
        }
    }

    let mut patterns = Vec::new();
    for ((antecedent, consequent), (count, weight_sum, mut ids)) in pairs {
        if count < min_pair_count.max(1) {
            continue;
        }

        let mean_weight = weight_sum / count as f64;
        let saturation = count as f64 / (count as f64 + 2.0);
        let confidence = (mean_weight * saturation).clamp(0.0, 1.0);

        ids.sort_unstable();
        ids.dedup();

        patterns.push(CandidatePattern {
            pattern_type: PATTERN_TYPE_COOCCURRENCE.to_string(),
            platform: None,
            pattern_key: format!("{antecedent}->{consequent}"),
            pattern_value: json!({
                "antecedent": antecedent,
                "consequent": consequent,
                "pair_count": count,
                "window_minutes": window_minutes,
            }),
            confidence,
            sample_size: count,
            source_episode_ids: ids,
        });
    }

    patterns
}
