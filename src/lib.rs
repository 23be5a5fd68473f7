//! saleflow - windowed sale-event counting pipeline
//!
//! Consumes a stream of timestamped sale events and maintains, per product,
//! a running count of qualifying sales per fixed-size time window. Results
//! are re-emitted on every count update (running totals, not close-only).
//!
//! Event transport and result delivery are external collaborators: events
//! arrive over a bounded channel, results leave through a `ResultSink`.

pub mod pipeline;
