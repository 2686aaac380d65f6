// tests/outcome_learning_test.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;

use engram::memory::core::traits::MemoryStore;
use engram::memory::features::outcomes::{
    EngagementMetrics, OutcomeConfig, OutcomeLearning, PublishedPost, EVENT_PUBLISHED,
};
use engram::memory::storage::SqliteMemoryStore;

async fn setup() -> (OutcomeLearning<SqliteMemoryStore>, Arc<SqliteMemoryStore>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool.");

    let store = SqliteMemoryStore::new(pool);
    store.run_migrations().await.unwrap();
    let store = Arc::new(store);

    (OutcomeLearning::new(store.clone(), OutcomeConfig::default()), store)
}

fn post(post_id: &str, metrics: EngagementMetrics) -> PublishedPost {
    PublishedPost {
        org_id: "org_1".to_string(),
        post_id: post_id.to_string(),
        platform: "instagram".to_string(),
        content: "Why is nobody talking about this?\n\nSave this for later!".to_string(),
        framework: Some("aida".to_string()),
        metrics,
    }
}

#[tokio::test]
async fn test_published_event_logs_even_with_zero_metrics() {
    let (outcomes, store) = setup().await;

    let written = outcomes
        .log_outcome_for_post(
            &post("post_1", EngagementMetrics::default()),
            "publisher",
            EVENT_PUBLISHED,
            "engagement",
            None,
        )
        .await
        .unwrap();
    assert!(written);

    let stats = store.layer_stats("org_1").await.unwrap();
    assert_eq!(stats.episodic, 1);
}

#[tokio::test]
async fn test_zero_engagement_snapshot_is_skipped() {
    let (outcomes, store) = setup().await;

    let written = outcomes
        .log_outcome_for_post(
            &post("post_1", EngagementMetrics::default()),
            "metrics_sync",
            "metrics_synced",
            "engagement",
            None,
        )
        .await
        .unwrap();
    assert!(!written);

    let stats = store.layer_stats("org_1").await.unwrap();
    assert_eq!(stats.episodic, 0);
}

#[tokio::test]
async fn test_unchanged_snapshot_is_deduplicated() {
    let (outcomes, _store) = setup().await;
    let metrics = EngagementMetrics { likes: 40, comments: 5, ..Default::default() };

    let first = outcomes
        .log_outcome_for_post(&post("post_1", metrics), "metrics_sync", "metrics_synced", "engagement", None)
        .await
        .unwrap();
    assert!(first);

    // Same counters again: a no-op snapshot must not inflate sample sizes.
    let second = outcomes
        .log_outcome_for_post(&post("post_1", metrics), "metrics_sync", "metrics_synced", "engagement", None)
        .await
        .unwrap();
    assert!(!second);

    // Metrics moved, so this one counts.
    let grown = EngagementMetrics { likes: 90, comments: 12, ..Default::default() };
    let third = outcomes
        .log_outcome_for_post(&post("post_1", grown), "metrics_sync", "metrics_synced", "engagement", None)
        .await
        .unwrap();
    assert!(third);
}

#[tokio::test]
async fn test_creative_memory_streaming_mean() {
    let (outcomes, _store) = setup().await;

    // Bar for "engagement" is 100: the first post clears it, the second doesn't.
    let strong = EngagementMetrics { likes: 120, comments: 30, ..Default::default() };
    let weak = EngagementMetrics { likes: 40, comments: 10, ..Default::default() };

    let first = outcomes
        .refresh_creative_memory_from_post(&post("post_1", strong), "engagement", None)
        .await
        .unwrap();
    assert_eq!(first.sample_size, 1);
    assert_eq!(first.success_count, 1);
    assert_eq!(first.total_engagement, 150.0);
    assert_eq!(first.avg_engagement, 150.0);

    let second = outcomes
        .refresh_creative_memory_from_post(&post("post_2", weak), "engagement", None)
        .await
        .unwrap();
    assert_eq!(second.sample_size, 2);
    assert_eq!(second.success_count, 1);
    assert_eq!(second.total_engagement, 200.0);
    assert_eq!(second.avg_engagement, 100.0);
}

#[tokio::test]
async fn test_creative_rows_split_by_derived_signals() {
    let (outcomes, _store) = setup().await;

    let question_post = post("post_1", EngagementMetrics { likes: 10, ..Default::default() });
    let mut list_post = post("post_2", EngagementMetrics { likes: 10, ..Default::default() });
    list_post.content = "5 ways to grow your audience.\nLink in bio.".to_string();

    let a = outcomes
        .refresh_creative_memory_from_post(&question_post, "engagement", None)
        .await
        .unwrap();
    let b = outcomes
        .refresh_creative_memory_from_post(&list_post, "engagement", None)
        .await
        .unwrap();

    assert_eq!(a.hook_type, "question");
    assert_eq!(b.hook_type, "list");
    assert_ne!(a.id, b.id);
    assert_eq!(a.sample_size, 1);
    assert_eq!(b.sample_size, 1);
}

#[tokio::test]
async fn test_decision_log_links_draft_to_post() {
    let (outcomes, _store) = setup().await;

    let entry = outcomes
        .log_decision_for_published_post(
            "org_1",
            "draft_77",
            "variant_b",
            "linkedin",
            "conversions",
            "post_901",
        )
        .await
        .unwrap();

    assert!(entry.id.is_some());
    assert_eq!(entry.draft_id, "draft_77");
    assert_eq!(entry.post_id, "post_901");
}

#[tokio::test]
async fn test_rolling_prediction_accuracy() {
    let (outcomes, _store) = setup().await;

    // No history yet: a valid None, not an error.
    let empty = outcomes.rolling_prediction_accuracy("org_1", 5).await.unwrap();
    assert!(empty.is_none());

    let now = Utc::now();
    outcomes
        .record_prediction_accuracy("org_1", 0.8, now - Duration::days(14), now - Duration::days(7), None)
        .await
        .unwrap();
    outcomes
        .record_prediction_accuracy("org_1", 0.6, now - Duration::days(7), now, None)
        .await
        .unwrap();

    let rolling = outcomes
        .rolling_prediction_accuracy("org_1", 5)
        .await
        .unwrap()
        .unwrap();
    assert!((rolling - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn test_blank_org_is_rejected() {
    let (outcomes, _store) = setup().await;
    let mut bad = post("post_1", EngagementMetrics::default());
    bad.org_id = String::new();

    let err = outcomes
        .log_outcome_for_post(&bad, "publisher", EVENT_PUBLISHED, "engagement", None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
}
