//! # Windowed counting pipeline
//!
//! In-memory stream-processing core that turns raw sale events into
//! per-product windowed counts:
//!
//! ```text
//! SaleEvent (channel)
//!     ↓
//! AmountFilter (amount > threshold)
//!     ↓
//! rekey (product, +1)
//!     ↓
//! WindowAssigner (tumbling / hopping)
//!     ↓
//! CountStore upsert (per-partition shard)
//!     ↓
//! ResultSink (WindowedCount, one per update)
//! ```
//!
//! The stream is hash-partitioned by product over N workers. Each worker
//! owns its store shard and processes events strictly sequentially, which
//! is what gives per-key ordering without locks on the hot path. Counts
//! are running totals: a new `WindowedCount` is emitted on every store
//! update, never only at window close, so downstream consumers can treat
//! the latest record per (product, window start) as the current value.
//!
//! Replay deduplication is not implemented: delivery into the store is
//! at-least-once, and feeding the same event twice counts it twice.
//!
//! ## Module organization
//!
//! - `types` - event, window, and result types
//! - `config` - environment-driven configuration
//! - `error` - pipeline error kinds
//! - `filter` - amount predicate and key extraction
//! - `windows` - timestamp -> window assignment
//! - `store` - count store trait and in-memory shard
//! - `retry` - backoff for transient store errors
//! - `engine` - per-partition orchestration
//! - `sink` - result sink trait and backends
//! - `ingestion` - partitioned worker pool and routing

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod retry;
pub mod sink;
pub mod store;
pub mod types;
pub mod windows;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use engine::PartitionEngine;
pub use error::PipelineError;
pub use ingestion::{start_pipeline, PipelineHandle, PipelineSender};
pub use sink::{ChannelResultSink, JsonlResultSink, LogResultSink, ResultSink, SinkError};
pub use store::{CountStore, MemoryCountStore};
pub use types::{SaleEvent, Window, WindowedCount, WindowedKey};
pub use windows::WindowAssigner;
