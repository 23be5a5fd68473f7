//! Count store - materialized (product, window) -> count mapping
//!
//! One store instance backs one partition, so a given `WindowedKey` is
//! only ever updated from a single worker; the trait still requires
//! atomic upserts so a shard can be shared with the query surface (and
//! with any future backend that serves several lanes at once).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::error::PipelineError;
use super::types::{Window, WindowedKey};

/// Queryable running-count store.
///
/// `upsert` is atomic per `WindowedKey` and returns the post-update
/// count, so the engine can emit the new running total without a second
/// read. `evict_before` is the only destructive operation; it exists for
/// the retention sweep and is never called on the hot path.
#[async_trait]
pub trait CountStore: Send + Sync {
    /// Add `delta` to the slot, creating it at zero first if absent.
    /// Returns the post-update count.
    async fn upsert(&self, key: &WindowedKey, delta: u64) -> Result<u64, PipelineError>;

    /// Point lookup; `None` if no qualifying event ever hit the slot.
    async fn get(&self, key: &WindowedKey) -> Result<Option<u64>, PipelineError>;

    /// All retained windows for a product, ascending by window start.
    async fn scan(&self, product: &str) -> Result<Vec<(Window, u64)>, PipelineError>;

    /// Remove every slot whose window ended at or before the cutoff.
    /// Returns the number of evicted slots.
    async fn evict_before(&self, cutoff_ms: i64) -> Result<usize, PipelineError>;
}

/// In-memory store shard: a mutex-guarded map. Mutation never fails;
/// the error path exists for backends with real I/O behind them.
pub struct MemoryCountStore {
    slots: Mutex<HashMap<WindowedKey, u64>>,
}

impl MemoryCountStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<WindowedKey, u64>>, PipelineError> {
        self.slots
            .lock()
            .map_err(|_| PipelineError::StoreUnavailable("store mutex poisoned".to_string()))
    }
}

impl Default for MemoryCountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CountStore for MemoryCountStore {
    async fn upsert(&self, key: &WindowedKey, delta: u64) -> Result<u64, PipelineError> {
        let mut slots = self.lock()?;
        let count = slots.entry(key.clone()).or_insert(0);
        *count += delta;
        Ok(*count)
    }

    async fn get(&self, key: &WindowedKey) -> Result<Option<u64>, PipelineError> {
        Ok(self.lock()?.get(key).copied())
    }

    async fn scan(&self, product: &str) -> Result<Vec<(Window, u64)>, PipelineError> {
        let slots = self.lock()?;
        let mut windows: Vec<(Window, u64)> = slots
            .iter()
            .filter(|(key, _)| key.product == product)
            .map(|(key, count)| (key.window, *count))
            .collect();
        drop(slots);

        windows.sort_by_key(|(window, _)| window.start_ms);
        Ok(windows)
    }

    async fn evict_before(&self, cutoff_ms: i64) -> Result<usize, PipelineError> {
        let mut slots = self.lock()?;
        let before = slots.len();
        slots.retain(|key, _| key.window.end_ms > cutoff_ms);
        Ok(before - slots.len())
    }
}
