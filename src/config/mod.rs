// src/config/mod.rs
// All tunables load from the environment with sane defaults; thresholds that
// the consolidation and governor layers use are configuration, not constants.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct EngramConfig {
    // ── Database Configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Pattern Detection
    pub pattern_lookback_days: i64,
    pub pattern_max_rows: i64,
    pub min_occurrences: i64,
    pub min_bucket_size: i64,
    pub min_pair_count: i64,
    pub cooccurrence_window_minutes: i64,

    // ── Consolidation
    pub promotion_threshold: f64,
    pub min_sample_for_strategy: i64,
    pub consolidation_interval_seconds: u64,

    // ── Decay
    pub decay_min_threshold: f64,
    pub recency_bias_multiplier: f64,

    // ── Governor
    pub intent_cache_ttl_seconds: i64,
    pub default_daily_cap_usd: f64,
    pub default_monthly_cap_usd: f64,
    pub model_timeout_seconds: u64,
    pub default_model: String,

    // ── Outcome Learning (per-objective success bars)
    pub success_bar_awareness: f64,
    pub success_bar_engagement: f64,
    pub success_bar_conversions: f64,
    pub success_bar_default: f64,

    // ── Logging Configuration
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl EngramConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            database_url: env_var_or("DATABASE_URL", "sqlite:./engram.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 10),

            pattern_lookback_days: env_var_or("ENGRAM_PATTERN_LOOKBACK_DAYS", 90),
            pattern_max_rows: env_var_or("ENGRAM_PATTERN_MAX_ROWS", 2000),
            min_occurrences: env_var_or("ENGRAM_MIN_OCCURRENCES", 3),
            min_bucket_size: env_var_or("ENGRAM_MIN_BUCKET_SIZE", 3),
            min_pair_count: env_var_or("ENGRAM_MIN_PAIR_COUNT", 2),
            cooccurrence_window_minutes: env_var_or("ENGRAM_COOCCURRENCE_WINDOW_MINUTES", 60),

            promotion_threshold: env_var_or("ENGRAM_PROMOTION_THRESHOLD", 0.75),
            min_sample_for_strategy: env_var_or("ENGRAM_MIN_SAMPLE_FOR_STRATEGY", 5),
            consolidation_interval_seconds: env_var_or("ENGRAM_CONSOLIDATION_INTERVAL", 3600),

            decay_min_threshold: env_var_or("ENGRAM_DECAY_MIN_THRESHOLD", 0.05),
            recency_bias_multiplier: env_var_or("ENGRAM_RECENCY_BIAS", 1.0),

            intent_cache_ttl_seconds: env_var_or("ENGRAM_INTENT_CACHE_TTL", 86_400),
            default_daily_cap_usd: env_var_or("ENGRAM_DAILY_CAP_USD", 5.0),
            default_monthly_cap_usd: env_var_or("ENGRAM_MONTHLY_CAP_USD", 50.0),
            model_timeout_seconds: env_var_or("ENGRAM_MODEL_TIMEOUT", 60),
            default_model: env_var_or("ENGRAM_MODEL", "claude-sonnet-4-5".to_string()),

            success_bar_awareness: env_var_or("ENGRAM_SUCCESS_BAR_AWARENESS", 500.0),
            success_bar_engagement: env_var_or("ENGRAM_SUCCESS_BAR_ENGAGEMENT", 100.0),
            success_bar_conversions: env_var_or("ENGRAM_SUCCESS_BAR_CONVERSIONS", 25.0),
            success_bar_default: env_var_or("ENGRAM_SUCCESS_BAR_DEFAULT", 100.0),

            log_level: env_var_or("ENGRAM_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Success bar for a campaign objective. Unknown objectives use the default bar.
    pub fn success_bar_for_objective(&self, objective: &str) -> f64 {
        match objective {
            "awareness" => self.success_bar_awareness,
            "engagement" => self.success_bar_engagement,
            "conversions" => self.success_bar_conversions,
            _ => self.success_bar_default,
        }
    }

    pub fn database_pool_config(&self) -> (String, u32) {
        (self.database_url.clone(), self.sqlite_max_connections)
    }
}

pub static CONFIG: Lazy<EngramConfig> = Lazy::new(EngramConfig::from_env);
