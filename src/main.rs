// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use engram::config::CONFIG;
use engram::memory::features::scheduler::spawn_consolidation_scheduler;
use engram::memory::storage::SqliteMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let level = CONFIG.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Engram consolidation daemon");
    info!("Database: {}", CONFIG.database_url);
    info!(
        "Promotion threshold: {:.2} (min sample {})",
        CONFIG.promotion_threshold, CONFIG.min_sample_for_strategy
    );

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.sqlite_max_connections)
        .connect(&CONFIG.database_url)
        .await?;

    let store = Arc::new(SqliteMemoryStore::new(pool));
    store.run_migrations().await?;

    // Periodic pattern detection + consolidation, one org at a time
    let interval = Duration::from_secs(CONFIG.consolidation_interval_seconds);
    let handle = spawn_consolidation_scheduler(store, interval);
    info!(
        "Consolidation scheduler started - running every {} seconds",
        interval.as_secs()
    );

    handle.await?;
    Ok(())
}
