// src/memory/core/config.rs
// Tunables for detection and consolidation, built from the environment config
// so thresholds stay out of business logic.

use crate::config::EngramConfig;

/// Bounds and thresholds for the pattern detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// How far back the episodic window reaches, in days.
    pub lookback_days: i64,
    /// Hard cap on rows pulled into one detection pass.
    pub max_rows: i64,
    /// Minimum group size for a frequency pattern.
    pub min_occurrences: i64,
    /// Minimum population for a temporal bucket.
    pub min_bucket_size: i64,
    /// Minimum ordered-pair count for a co-occurrence pattern.
    pub min_pair_count: i64,
    /// Sliding window for co-occurrence pairing, in minutes.
    pub cooccurrence_window_minutes: i64,
}

impl DetectorConfig {
    pub fn from_config(config: &EngramConfig) -> Self {
        Self {
            lookback_days: config.pattern_lookback_days,
            max_rows: config.pattern_max_rows,
            min_occurrences: config.min_occurrences,
            min_bucket_size: config.min_bucket_size,
            min_pair_count: config.min_pair_count,
            cooccurrence_window_minutes: config.cooccurrence_window_minutes,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            max_rows: 2000,
            min_occurrences: 3,
            min_bucket_size: 3,
            min_pair_count: 2,
            cooccurrence_window_minutes: 60,
        }
    }
}

/// Thresholds for merging and promotion.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Merged confidence required before a pattern becomes a strategy.
    pub promotion_threshold: f64,
    /// Merged sample size required before a pattern becomes a strategy.
    pub min_sample_for_strategy: i64,
    /// Recorded as the audit actor for every action this pipeline takes.
    pub actor: String,
}

impl ConsolidationConfig {
    pub fn from_config(config: &EngramConfig) -> Self {
        Self {
            promotion_threshold: config.promotion_threshold,
            min_sample_for_strategy: config.min_sample_for_strategy,
            actor: "consolidation_pipeline".to_string(),
        }
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: 0.75,
            min_sample_for_strategy: 5,
            actor: "consolidation_pipeline".to_string(),
        }
    }
}
