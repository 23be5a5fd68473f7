//! Per-partition orchestration
//!
//! One `PartitionEngine` runs inside each partition worker and carries an
//! event through the whole pipeline: filter -> rekey -> window assignment
//! -> store upsert -> result emission. The worker drives it strictly
//! sequentially, so updates for a given product reach the store in the
//! order their events arrived on the lane.
//!
//! Store access is guarded twice: a per-call timeout turns a hung
//! backend into a transient error, and transient errors are retried with
//! bounded exponential backoff. Once the budget is spent the error
//! escalates to `StoreFailure` and the worker shuts the lane down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::filter::{rekey, AmountFilter};
use super::retry::ExponentialBackoff;
use super::sink::ResultSink;
use super::store::CountStore;
use super::types::{SaleEvent, WindowedCount, WindowedKey};
use super::windows::WindowAssigner;

pub struct PartitionEngine {
    filter: AmountFilter,
    assigner: WindowAssigner,
    store: Arc<dyn CountStore>,
    sink: Arc<dyn ResultSink>,

    /// Shared across partitions; observable through the pipeline handle
    dropped_events: Arc<AtomicU64>,

    /// Largest event timestamp seen on this lane; drives retention
    high_watermark_ms: Option<i64>,

    window_size_ms: i64,
    retention_windows: u32,
    store_timeout_ms: u64,
    store_retry_initial_ms: u64,
    store_retry_max_ms: u64,
    store_retries: u32,
}

impl PartitionEngine {
    pub fn new(
        config: &PipelineConfig,
        store: Arc<dyn CountStore>,
        sink: Arc<dyn ResultSink>,
        dropped_events: Arc<AtomicU64>,
    ) -> Self {
        Self {
            filter: AmountFilter::new(config.filter_threshold),
            assigner: WindowAssigner::new(config.window_size_ms, config.window_advance_ms),
            store,
            sink,
            dropped_events,
            high_watermark_ms: None,
            window_size_ms: config.window_size_ms,
            retention_windows: config.retention_windows,
            store_timeout_ms: config.store_timeout_ms,
            store_retry_initial_ms: config.store_retry_initial_ms,
            store_retry_max_ms: config.store_retry_max_ms,
            store_retries: config.store_retries,
        }
    }

    /// Run one event through the pipeline.
    ///
    /// Below-threshold events are ignored, malformed events are dropped
    /// and counted; neither is an error. The only error path is the
    /// store: a terminal store error propagates so the caller can halt
    /// the lane.
    pub async fn process_event(&mut self, event: SaleEvent) -> Result<(), PipelineError> {
        if !self.filter.passes(&event) {
            return Ok(());
        }

        let (product, delta) = match rekey(&event) {
            Ok(keyed) => keyed,
            Err(e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                log::debug!("Dropped event: {}", e);
                return Ok(());
            }
        };
        let product = product.to_string();

        self.high_watermark_ms = Some(
            self.high_watermark_ms
                .map_or(event.timestamp_ms, |wm| wm.max(event.timestamp_ms)),
        );

        for window in self.assigner.windows_for(event.timestamp_ms) {
            let key = WindowedKey::new(product.clone(), window);
            let count = self.upsert_with_retry(&key, delta).await?;

            // Continuous re-emission: every update produces a record.
            // Sink delivery is the consumer's concern; a failed emit is
            // logged and does not stop the lane.
            let result = WindowedCount::from_update(&key, count);
            if let Err(e) = self.sink.emit(result).await {
                log::error!("❌ Failed to emit windowed count: {}", e);
            }
        }

        Ok(())
    }

    /// Upsert with per-call timeout and bounded backoff on transient
    /// errors. Returns the post-update count, or `StoreFailure` once the
    /// retry budget is spent.
    async fn upsert_with_retry(
        &self,
        key: &WindowedKey,
        delta: u64,
    ) -> Result<u64, PipelineError> {
        let mut backoff = ExponentialBackoff::new(
            self.store_retry_initial_ms,
            self.store_retry_max_ms,
            self.store_retries,
        );

        loop {
            let attempt = tokio::time::timeout(
                Duration::from_millis(self.store_timeout_ms),
                self.store.upsert(key, delta),
            )
            .await
            .unwrap_or_else(|_| {
                Err(PipelineError::StoreUnavailable(format!(
                    "upsert timed out after {}ms",
                    self.store_timeout_ms
                )))
            });

            match attempt {
                Ok(count) => return Ok(count),
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "⚠️  Transient store error for {} [{}..{}): {}",
                        key.product,
                        key.window.start_ms,
                        key.window.end_ms,
                        e
                    );
                    if !backoff.sleep().await {
                        return Err(PipelineError::StoreFailure {
                            attempts: backoff.attempts(),
                            reason: e.to_string(),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Current windows for a product, ascending by window start.
    pub async fn current_counts(&self, product: &str) -> Result<Vec<(i64, u64)>, PipelineError> {
        let windows = self.store.scan(product).await?;
        Ok(windows
            .into_iter()
            .map(|(window, count)| (window.start_ms, count))
            .collect())
    }

    /// Drop windows that ended more than the retention horizon before
    /// this lane's high watermark. No-op until events have been seen or
    /// when retention is disabled. Runs from the sweep timer, off the
    /// upsert path.
    pub async fn evict_expired(&self) -> Result<usize, PipelineError> {
        if self.retention_windows == 0 {
            return Ok(0);
        }
        let Some(watermark) = self.high_watermark_ms else {
            return Ok(0);
        };

        let cutoff = watermark - self.retention_windows as i64 * self.window_size_ms;
        self.store.evict_before(cutoff).await
    }

    pub fn high_watermark_ms(&self) -> Option<i64> {
        self.high_watermark_ms
    }
}
