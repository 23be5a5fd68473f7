//! Core data types flowing through the pipeline

use serde::{Deserialize, Serialize};

/// A raw sale event as produced by the upstream event source.
///
/// Immutable once created; the pipeline never mutates events, only
/// projects them into `(product, window)` count updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleEvent {
    pub product: String,
    pub customer: String,
    /// Event time in epoch milliseconds
    pub timestamp_ms: i64,
    pub amount: f64,
}

/// Half-open time interval `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Window {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Boundary timestamps belong to the window that starts at that instant.
    pub fn contains(&self, ts_ms: i64) -> bool {
        self.start_ms <= ts_ms && ts_ms < self.end_ms
    }

    pub fn size_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Identity of one count slot: the aggregation key plus the window it
/// falls in. Two qualifying events with the same product and timestamps
/// in the same window update the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowedKey {
    pub product: String,
    pub window: Window,
}

impl WindowedKey {
    pub fn new(product: impl Into<String>, window: Window) -> Self {
        Self {
            product: product.into(),
            window,
        }
    }
}

/// Running-total record emitted on every count update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedCount {
    pub product: String,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub count: u64,
}

impl WindowedCount {
    pub fn from_update(key: &WindowedKey, count: u64) -> Self {
        Self {
            product: key.product.clone(),
            window_start_ms: key.window.start_ms,
            window_end_ms: key.window.end_ms,
            count,
        }
    }
}
