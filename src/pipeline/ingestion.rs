//! Partitioned ingestion - channel workers, routing, backpressure
//!
//! The event stream is hash-partitioned by product across N workers.
//! Each worker owns one `PartitionEngine` (and through it one store
//! shard) and consumes its own bounded mpsc channel, so:
//!
//! - updates for a given product apply in arrival order (one sequential
//!   consumer per lane),
//! - independent products progress concurrently,
//! - a full lane blocks the sender instead of dropping events
//!   (backpressure through the bounded channel).
//!
//! The worker loop multiplexes event processing with a periodic
//! retention sweep. A terminal store failure halts only the affected
//! lane; sends routed to it then fail loudly while other lanes keep
//! running. Dropping every sender closes the lanes: each worker drains
//! what is already queued, then exits, which is the graceful-shutdown
//! path.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::config::PipelineConfig;
use super::engine::PartitionEngine;
use super::error::PipelineError;
use super::sink::ResultSink;
use super::store::{CountStore, MemoryCountStore};
use super::types::SaleEvent;

/// Cloneable ingress side of the pipeline. Feeders hold one of these;
/// the pipeline shuts down once every clone (and the handle's own) is
/// dropped and the lanes drain.
#[derive(Clone)]
pub struct PipelineSender {
    senders: Vec<mpsc::Sender<SaleEvent>>,
}

impl PipelineSender {
    /// Route an event to its partition. Awaits when the lane's buffer is
    /// full - backpressure, never a silent drop. Fails only when the
    /// owning worker has already stopped.
    pub async fn send(&self, event: SaleEvent) -> Result<(), PipelineError> {
        let partition = partition_for(&event.product, self.senders.len());
        self.senders[partition]
            .send(event)
            .await
            .map_err(|_| PipelineError::LaneClosed(partition))
    }
}

/// Running pipeline: ingress, per-partition store shards for queries,
/// and the worker tasks.
pub struct PipelineHandle {
    sender: Option<PipelineSender>,
    workers: Vec<JoinHandle<()>>,
    stores: Vec<Arc<dyn CountStore>>,
    dropped_events: Arc<AtomicU64>,
}

impl PipelineHandle {
    /// See [`PipelineSender::send`].
    pub async fn send(&self, event: SaleEvent) -> Result<(), PipelineError> {
        match &self.sender {
            Some(sender) => sender.send(event).await,
            None => Err(PipelineError::LaneClosed(0)),
        }
    }

    /// A cloneable ingress for concurrent feeders.
    pub fn sender(&self) -> Option<PipelineSender> {
        self.sender.clone()
    }

    /// Current windowed counts for a product, ascending by window start,
    /// served from the owning partition's shard.
    pub async fn current_counts(&self, product: &str) -> Result<Vec<(i64, u64)>, PipelineError> {
        let partition = partition_for(product, self.stores.len());
        let windows = self.stores[partition].scan(product).await?;
        Ok(windows
            .into_iter()
            .map(|(window, count)| (window.start_ms, count))
            .collect())
    }

    /// Events rejected at rekey (no product key) since startup.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Graceful shutdown: stop accepting events, let every lane drain
    /// what is in flight, and wait for the workers to exit. Queries keep
    /// working on the final state afterwards.
    pub async fn shutdown(&mut self) {
        self.sender = None;
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                log::error!("❌ Partition worker panicked: {}", e);
            }
        }
    }
}

/// Spawn the pipeline with in-memory store shards.
pub fn start_pipeline(
    config: PipelineConfig,
    sink: Arc<dyn ResultSink>,
) -> Result<PipelineHandle, PipelineError> {
    start_pipeline_with(config, sink, |_| Arc::new(MemoryCountStore::new()))
}

/// Spawn the pipeline with caller-provided store shards (one per
/// partition). Used by tests to inject failing stores.
pub fn start_pipeline_with(
    config: PipelineConfig,
    sink: Arc<dyn ResultSink>,
    store_factory: impl Fn(usize) -> Arc<dyn CountStore>,
) -> Result<PipelineHandle, PipelineError> {
    config.validate()?;

    log::info!(
        "🚀 Starting pipeline: {} partitions, {}ms windows (advance {}ms), threshold {}",
        config.partitions,
        config.window_size_ms,
        config.window_advance_ms,
        config.filter_threshold
    );
    if config.retention_windows > 0 {
        log::info!(
            "   └─ Retention: last {} windows per key, sweep every {}ms",
            config.retention_windows,
            config.sweep_interval_ms
        );
    }

    let dropped_events = Arc::new(AtomicU64::new(0));
    let mut senders = Vec::with_capacity(config.partitions);
    let mut workers = Vec::with_capacity(config.partitions);
    let mut stores = Vec::with_capacity(config.partitions);

    for partition in 0..config.partitions {
        let store = store_factory(partition);
        let engine = PartitionEngine::new(
            &config,
            store.clone(),
            sink.clone(),
            dropped_events.clone(),
        );

        let (tx, rx) = mpsc::channel::<SaleEvent>(config.channel_buffer);
        let sweep_interval_ms = config.sweep_interval_ms;
        workers.push(tokio::spawn(async move {
            run_partition_worker(partition, rx, engine, sweep_interval_ms).await;
        }));

        senders.push(tx);
        stores.push(store);
    }

    Ok(PipelineHandle {
        sender: Some(PipelineSender { senders }),
        workers,
        stores,
        dropped_events,
    })
}

/// One lane: consume events sequentially, sweep expired windows on a
/// timer, stop on terminal store failure or once the channel is closed
/// and drained.
async fn run_partition_worker(
    partition: usize,
    mut rx: mpsc::Receiver<SaleEvent>,
    mut engine: PartitionEngine,
    sweep_interval_ms: u64,
) {
    let mut sweep_timer = interval(Duration::from_millis(sweep_interval_ms));

    loop {
        tokio::select! {
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => {
                    if let Err(e) = engine.process_event(event).await {
                        // Terminal for this lane only; other partitions
                        // keep running.
                        log::error!("❌ Partition {} halted: {}", partition, e);
                        break;
                    }
                }
                None => {
                    log::info!("✅ Partition {} drained, shutting down", partition);
                    break;
                }
            },

            _ = sweep_timer.tick() => {
                match engine.evict_expired().await {
                    Ok(0) => {}
                    Ok(evicted) => {
                        log::debug!("🧹 Partition {} evicted {} expired windows", partition, evicted);
                    }
                    Err(e) => {
                        log::warn!("⚠️  Partition {} eviction sweep failed: {}", partition, e);
                    }
                }
            }
        }
    }
}

fn partition_for(product: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    product.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_routing_is_stable() {
        // Same key always lands on the same lane
        for partitions in [1, 2, 4, 7] {
            let first = partition_for("Laptop", partitions);
            assert!(first < partitions);
            for _ in 0..10 {
                assert_eq!(partition_for("Laptop", partitions), first);
            }
        }
    }
}
