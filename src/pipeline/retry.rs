use std::time::Duration;
use tokio::time::sleep;

/// Bounded exponential backoff for transient store errors.
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial_delay_ms: u64, max_delay_ms: u64, max_retries: u32) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            max_retries,
            current_attempt: 0,
        }
    }

    /// Sleep before the next attempt. Returns false once the retry
    /// budget is spent; the caller escalates.
    pub async fn sleep(&mut self) -> bool {
        if self.current_attempt >= self.max_retries {
            return false;
        }

        let delay_ms = std::cmp::min(
            self.initial_delay_ms.saturating_mul(1 << self.current_attempt.min(16)),
            self.max_delay_ms,
        );

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay_ms
        );

        sleep(Duration::from_millis(delay_ms)).await;
        self.current_attempt += 1;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_bounded() {
        let mut backoff = ExponentialBackoff::new(1, 10, 3);

        assert!(backoff.sleep().await);
        assert!(backoff.sleep().await);
        assert!(backoff.sleep().await);
        assert!(!backoff.sleep().await); // budget spent
        assert_eq!(backoff.attempts(), 3);

        backoff.reset();
        assert!(backoff.sleep().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_caps_at_max() {
        // 1ms initial doubles past the 4ms cap on the third attempt;
        // paused time makes the sleeps instantaneous, so this just
        // exercises the arithmetic path without panicking on overflow.
        let mut backoff = ExponentialBackoff::new(1, 4, 40);
        for _ in 0..40 {
            assert!(backoff.sleep().await);
        }
        assert!(!backoff.sleep().await);
    }
}
