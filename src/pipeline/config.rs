//! Pipeline configuration from environment variables

use std::env;

use super::error::PipelineError;

/// Configuration for the windowed counting pipeline.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sales at or below this amount are ignored
    pub filter_threshold: f64,

    /// Window size in milliseconds
    pub window_size_ms: i64,

    /// Window advance in milliseconds; equal to the size for tumbling
    /// windows, smaller for hopping windows
    pub window_advance_ms: i64,

    /// Number of partition workers (events are hash-routed by product)
    pub partitions: usize,

    /// Channel buffer size per partition (events)
    pub channel_buffer: usize,

    /// Keep only the last K windows per key; 0 disables eviction
    pub retention_windows: u32,

    /// Eviction sweep interval in milliseconds
    pub sweep_interval_ms: u64,

    /// Per-call store timeout in milliseconds; a timeout is treated as a
    /// transient store error and retried
    pub store_timeout_ms: u64,

    /// Initial retry delay for transient store errors (milliseconds)
    pub store_retry_initial_ms: u64,

    /// Retry delay cap (milliseconds)
    pub store_retry_max_ms: u64,

    /// Retry attempts before a transient error escalates to StoreFailure
    pub store_retries: u32,

    /// Optional JSONL output path for emitted results (runtime binary)
    pub results_path: Option<String>,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SALEFLOW_FILTER_THRESHOLD` (default: 100.0)
    /// - `SALEFLOW_WINDOW_SIZE_MS` (default: 5000)
    /// - `SALEFLOW_WINDOW_ADVANCE_MS` (default: window size, i.e. tumbling)
    /// - `SALEFLOW_PARTITIONS` (default: 4)
    /// - `SALEFLOW_CHANNEL_BUFFER` (default: 10000)
    /// - `SALEFLOW_RETENTION_WINDOWS` (default: 0, unbounded)
    /// - `SALEFLOW_SWEEP_INTERVAL_MS` (default: 5000)
    /// - `SALEFLOW_STORE_TIMEOUT_MS` (default: 1000)
    /// - `SALEFLOW_STORE_RETRY_INITIAL_MS` (default: 100)
    /// - `SALEFLOW_STORE_RETRY_MAX_MS` (default: 5000)
    /// - `SALEFLOW_STORE_RETRIES` (default: 5)
    /// - `SALEFLOW_RESULTS_PATH` (default: unset, log sink)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. `from_env` wires
    /// this to the process environment; tests pass a closure.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let window_size_ms = get("SALEFLOW_WINDOW_SIZE_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5_000);

        Self {
            filter_threshold: get("SALEFLOW_FILTER_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(100.0),

            window_size_ms,

            window_advance_ms: get("SALEFLOW_WINDOW_ADVANCE_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(window_size_ms),

            partitions: get("SALEFLOW_PARTITIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),

            channel_buffer: get("SALEFLOW_CHANNEL_BUFFER")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),

            retention_windows: get("SALEFLOW_RETENTION_WINDOWS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),

            sweep_interval_ms: get("SALEFLOW_SWEEP_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),

            store_timeout_ms: get("SALEFLOW_STORE_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),

            store_retry_initial_ms: get("SALEFLOW_STORE_RETRY_INITIAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),

            store_retry_max_ms: get("SALEFLOW_STORE_RETRY_MAX_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),

            store_retries: get("SALEFLOW_STORE_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            results_path: get("SALEFLOW_RESULTS_PATH"),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size_ms <= 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "window size must be positive, got {}ms",
                self.window_size_ms
            )));
        }
        if self.window_advance_ms <= 0 || self.window_advance_ms > self.window_size_ms {
            return Err(PipelineError::InvalidConfig(format!(
                "window advance must be in (0, {}ms], got {}ms",
                self.window_size_ms, self.window_advance_ms
            )));
        }
        if self.partitions == 0 {
            return Err(PipelineError::InvalidConfig(
                "at least one partition is required".to_string(),
            ));
        }
        if self.channel_buffer == 0 {
            return Err(PipelineError::InvalidConfig(
                "channel buffer must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        // Test: defaults when no variables are set
        let config = PipelineConfig::default();

        assert_eq!(config.filter_threshold, 100.0);
        assert_eq!(config.window_size_ms, 5_000);
        assert_eq!(config.window_advance_ms, 5_000); // tumbling
        assert_eq!(config.partitions, 4);
        assert_eq!(config.channel_buffer, 10_000);
        assert_eq!(config.retention_windows, 0);
        assert_eq!(config.store_retries, 5);
        assert!(config.results_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config() {
        // Test: overrides are picked up, advance defaults to the size
        let vars = [
            ("SALEFLOW_FILTER_THRESHOLD", "250.5"),
            ("SALEFLOW_WINDOW_SIZE_MS", "60000"),
            ("SALEFLOW_PARTITIONS", "8"),
            ("SALEFLOW_RETENTION_WINDOWS", "12"),
            ("SALEFLOW_RESULTS_PATH", "/tmp/counts.jsonl"),
        ];
        let config = PipelineConfig::from_lookup(lookup(&vars));

        assert_eq!(config.filter_threshold, 250.5);
        assert_eq!(config.window_size_ms, 60_000);
        assert_eq!(config.window_advance_ms, 60_000);
        assert_eq!(config.partitions, 8);
        assert_eq!(config.retention_windows, 12);
        assert_eq!(config.results_path.as_deref(), Some("/tmp/counts.jsonl"));
    }

    #[test]
    fn test_hopping_config() {
        // Test: explicit advance smaller than the size is accepted
        let vars = [
            ("SALEFLOW_WINDOW_SIZE_MS", "10000"),
            ("SALEFLOW_WINDOW_ADVANCE_MS", "2000"),
        ];
        let config = PipelineConfig::from_lookup(lookup(&vars));

        assert_eq!(config.window_advance_ms, 2_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        let mut config = PipelineConfig::default();
        config.window_size_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.window_advance_ms = config.window_size_ms + 1;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.partitions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_value_falls_back_to_default() {
        let vars = [("SALEFLOW_WINDOW_SIZE_MS", "not-a-number")];
        let config = PipelineConfig::from_lookup(lookup(&vars));

        assert_eq!(config.window_size_ms, 5_000);
    }
}
