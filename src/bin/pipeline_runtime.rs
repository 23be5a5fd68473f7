//! Pipeline Runtime - windowed sale counting
//!
//! Wires the pipeline together for a live run:
//! - Loads configuration from the environment
//! - Picks the result sink (JSONL file or log lines)
//! - Spawns the partitioned pipeline workers
//! - Feeds demo sale events until CTRL+C, then drains and reports
//!
//! Usage:
//!   cargo run --release --bin pipeline_runtime
//!
//! Environment variables:
//!   SALEFLOW_FILTER_THRESHOLD - minimum qualifying amount (default: 100)
//!   SALEFLOW_WINDOW_SIZE_MS - window size (default: 5000)
//!   SALEFLOW_PARTITIONS - worker count (default: 4)
//!   SALEFLOW_RESULTS_PATH - JSONL output path (default: unset, log sink)
//!   SALEFLOW_FEED_INTERVAL_MS - demo feed period (default: 500)

use chrono::Utc;
use dotenv::dotenv;
use log::{error, info};
use rand::Rng;
use saleflow::pipeline::{
    config::PipelineConfig,
    ingestion::start_pipeline,
    sink::{JsonlResultSink, LogResultSink, ResultSink},
    types::SaleEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Demo stand-in for a real event source, shaped like the upstream
/// feed: two products, two customers, amounts in [50, 550).
fn random_sale() -> SaleEvent {
    let mut rng = rand::thread_rng();
    let product = if rng.gen_bool(0.5) { "Laptop" } else { "Phone" };
    let customer = if rng.gen_bool(0.5) { "C1" } else { "C2" };
    SaleEvent {
        product: product.to_string(),
        customer: customer.to_string(),
        timestamp_ms: Utc::now().timestamp_millis(),
        amount: 50.0 + rng.gen_range(0..500) as f64,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    info!("🚀 Saleflow Pipeline Runtime");

    let config = PipelineConfig::from_env();
    info!("✅ Configuration loaded");
    info!("   ├─ Filter threshold: {}", config.filter_threshold);
    info!(
        "   ├─ Windows: {}ms, advance {}ms",
        config.window_size_ms, config.window_advance_ms
    );
    info!("   ├─ Partitions: {}", config.partitions);
    info!("   ├─ Channel buffer: {} events", config.channel_buffer);
    info!(
        "   └─ Retention: {}",
        if config.retention_windows > 0 {
            format!("last {} windows", config.retention_windows)
        } else {
            "unbounded".to_string()
        }
    );

    let sink: Arc<dyn ResultSink> = match &config.results_path {
        Some(path) => Arc::new(JsonlResultSink::new(path)?),
        None => Arc::new(LogResultSink),
    };
    info!("✅ Result sink ready ({})", sink.backend_type());

    let mut handle = start_pipeline(config, sink)?;
    info!("✅ Pipeline workers spawned");

    let feed_interval_ms: u64 = std::env::var("SALEFLOW_FEED_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500);
    let mut feed_timer = interval(Duration::from_millis(feed_interval_ms));
    info!("📊 Feeding demo sales every {}ms", feed_interval_ms);
    info!("🔄 Press CTRL+C to shutdown gracefully");

    loop {
        tokio::select! {
            _ = feed_timer.tick() => {
                let event = random_sale();
                if let Err(e) = handle.send(event).await {
                    error!("❌ Feed stopped: {}", e);
                    break;
                }
            }

            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                    Err(e) => error!("❌ Failed to listen for CTRL+C: {}", e),
                }
                break;
            }
        }
    }

    // Drain in-flight events, then report final state
    handle.shutdown().await;

    for product in ["Laptop", "Phone"] {
        match handle.current_counts(product).await {
            Ok(windows) => {
                info!("📊 {}: {} retained windows", product, windows.len());
                for (start_ms, count) in windows.iter().rev().take(3) {
                    info!("   └─ window starting {} -> {} sales", start_ms, count);
                }
            }
            Err(e) => error!("❌ Failed to read counts for {}: {}", product, e),
        }
    }
    info!(
        "✅ Pipeline runtime stopped ({} malformed events dropped)",
        handle.dropped_events()
    );

    Ok(())
}
