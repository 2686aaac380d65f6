// tests/consolidation_test.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use engram::memory::core::config::ConsolidationConfig;
use engram::memory::core::traits::MemoryStore;
use engram::memory::core::types::{
    AuditAction, AuditEntry, AuditFilters, CandidatePattern, SemanticPattern,
};
use engram::memory::features::consolidation::{merge_confidence, ConsolidationPipeline};
use engram::memory::storage::SqliteMemoryStore;

async fn setup_store() -> Arc<SqliteMemoryStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool.");

    let store = SqliteMemoryStore::new(pool);
    store.run_migrations().await.unwrap();
    Arc::new(store)
}

fn candidate(confidence: f64, sample_size: i64) -> CandidatePattern {
    CandidatePattern {
        pattern_type: "frequency".to_string(),
        platform: Some("instagram".to_string()),
        pattern_key: "post_success".to_string(),
        pattern_value: json!({"count": sample_size}),
        confidence,
        sample_size,
        source_episode_ids: vec![1, 2, 3],
    }
}

#[tokio::test]
async fn test_new_candidate_creates_pattern_with_audit() {
    let store = setup_store().await;
    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());

    let entries = pipeline
        .consolidate("org_1", &[candidate(0.6, 3)])
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action_type, AuditAction::EpisodicPromoted);
    assert_eq!(entries[0].source_ids, vec![1, 2, 3]);
    assert!(entries[0].target_id.is_some());

    let pattern = store
        .find_pattern("org_1", "frequency", Some("instagram"), "post_success")
        .await
        .unwrap()
        .expect("pattern should exist after consolidation");
    assert!((pattern.confidence - 0.6).abs() < 1e-9);
    assert_eq!(pattern.sample_size, 3);
}

#[tokio::test]
async fn test_merge_uses_sample_weighted_confidence() {
    let store = setup_store().await;
    let now = Utc::now();
    store
        .insert_pattern(&SemanticPattern {
            id: None,
            org_id: Some("org_1".to_string()),
            pattern_type: "frequency".to_string(),
            platform: Some("instagram".to_string()),
            pattern_key: "post_success".to_string(),
            pattern_value: json!({"count": 9}),
            confidence: 0.9,
            sample_size: 9,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());
    let entries = pipeline
        .consolidate("org_1", &[candidate(0.5, 1)])
        .await
        .unwrap();

    let merged = store
        .find_pattern("org_1", "frequency", Some("instagram"), "post_success")
        .await
        .unwrap()
        .unwrap();
    // (0.9*9 + 0.5*1) / 10
    assert!((merged.confidence - 0.86).abs() < 1e-9);
    assert_eq!(merged.sample_size, 10);

    let merge_entry = entries
        .iter()
        .find(|e| e.action_type == AuditAction::PatternMerged)
        .expect("merge should be audited");
    assert!(merge_entry.source_ids.contains(&merged.id.unwrap()));
}

#[tokio::test]
async fn test_sample_size_is_monotonic_across_merges() {
    let store = setup_store().await;
    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());

    pipeline.consolidate("org_1", &[candidate(0.4, 3)]).await.unwrap();
    let after_first = store
        .find_pattern("org_1", "frequency", Some("instagram"), "post_success")
        .await
        .unwrap()
        .unwrap()
        .sample_size;

    pipeline.consolidate("org_1", &[candidate(0.5, 4)]).await.unwrap();
    let after_second = store
        .find_pattern("org_1", "frequency", Some("instagram"), "post_success")
        .await
        .unwrap()
        .unwrap()
        .sample_size;

    assert!(after_second > after_first);
}

#[tokio::test]
async fn test_promotion_past_both_bars_creates_strategy() {
    let store = setup_store().await;
    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());

    // Default bars: confidence >= 0.75, sample >= 5.
    let entries = pipeline
        .consolidate("org_1", &[candidate(0.9, 8)])
        .await
        .unwrap();

    let promotion = entries
        .iter()
        .find(|e| e.action_type == AuditAction::StrategyPromoted)
        .expect("expected a promotion audit entry");

    let pattern = store
        .find_pattern("org_1", "frequency", Some("instagram"), "post_success")
        .await
        .unwrap()
        .unwrap();
    let strategy = store
        .find_strategy_for_pattern("org_1", pattern.id.unwrap())
        .await
        .unwrap()
        .expect("strategy should exist");
    assert_eq!(strategy.strategy_key, "frequency:post_success");
    assert_eq!(promotion.target_id, strategy.id);
}

#[tokio::test]
async fn test_no_promotion_below_confidence_bar() {
    let store = setup_store().await;
    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());

    let entries = pipeline
        .consolidate("org_1", &[candidate(0.5, 20)])
        .await
        .unwrap();
    assert!(entries
        .iter()
        .all(|e| e.action_type != AuditAction::StrategyPromoted));
}

#[tokio::test]
async fn test_promotion_thresholds_come_from_config() {
    let store = setup_store().await;
    let lenient = ConsolidationConfig {
        promotion_threshold: 0.3,
        min_sample_for_strategy: 2,
        actor: "consolidation_pipeline".to_string(),
    };
    let pipeline = ConsolidationPipeline::new(store.clone(), lenient);

    let entries = pipeline
        .consolidate("org_1", &[candidate(0.4, 3)])
        .await
        .unwrap();
    assert!(entries
        .iter()
        .any(|e| e.action_type == AuditAction::StrategyPromoted));
}

#[tokio::test]
async fn test_audit_trail_maps_fields_and_filters() {
    let store = setup_store().await;
    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());

    let appended = pipeline
        .append_audit_entry(AuditEntry {
            id: None,
            org_id: "org_1".to_string(),
            action_type: AuditAction::PatternMerged,
            source_ids: vec![11, 12, 13],
            target_id: Some(42),
            details: json!({"pattern_key": "tue_18"}),
            confidence: Some(0.7),
            actor: "consolidation_pipeline".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    assert!(appended.id.is_some());

    let trail = pipeline
        .query_audit_trail("org_1", &AuditFilters::default())
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].source_ids, vec![11, 12, 13]);
    assert_eq!(trail[0].target_id, Some(42));
    assert_eq!(trail[0].details["pattern_key"], "tue_18");
    assert_eq!(trail[0].confidence, Some(0.7));

    // Action-type filter excludes non-matching rows.
    let filtered = pipeline
        .query_audit_trail(
            "org_1",
            &AuditFilters {
                action_type: Some(AuditAction::StrategyPromoted),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(filtered.is_empty());

    // Unknown org reads back empty, not an error.
    let other = pipeline
        .query_audit_trail("org_other", &AuditFilters::default())
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_consolidation_never_deletes_episodic_sources() {
    let store = setup_store().await;

    let mut seeded_ids = Vec::new();
    for _ in 0..3 {
        let entry = engram::memory::core::types::EpisodicMemory::new("org_1", "post_success", 0.8);
        let saved = store.save_episodic(&entry).await.unwrap();
        seeded_ids.push(saved.id.unwrap());
    }

    let pipeline = ConsolidationPipeline::new(store.clone(), ConsolidationConfig::default());
    let mut promoted = candidate(0.6, 3);
    promoted.source_episode_ids = seeded_ids;
    pipeline.consolidate("org_1", &[promoted]).await.unwrap();

    let stats = store.layer_stats("org_1").await.unwrap();
    assert_eq!(stats.episodic, 3);
    assert_eq!(stats.semantic, 1);
}

#[test]
fn test_merge_confidence_formula() {
    assert!((merge_confidence(0.9, 9, 0.5, 1) - 0.86).abs() < 1e-9);
    assert!((merge_confidence(0.0, 5, 1.0, 5) - 0.5).abs() < 1e-9);
}
