//! Timestamp -> window assignment
//!
//! Pure mapping from an event timestamp to the set of fixed-size windows
//! it belongs to. Window starts are aligned to multiples of the advance,
//! so assignment is deterministic and independent of arrival order; an
//! out-of-order or late event lands in exactly the windows its own
//! timestamp dictates.

use super::types::Window;

/// Assigns timestamps to fixed-size windows advancing by a fixed step.
///
/// `advance == size` is the tumbling case: non-overlapping, contiguous
/// windows, every instant in exactly one. `advance < size` yields
/// hopping windows where each instant is covered by `size / advance`
/// overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct WindowAssigner {
    size_ms: i64,
    advance_ms: i64,
}

impl WindowAssigner {
    pub fn new(size_ms: i64, advance_ms: i64) -> Self {
        debug_assert!(size_ms > 0 && advance_ms > 0 && advance_ms <= size_ms);
        Self {
            size_ms,
            advance_ms,
        }
    }

    pub fn tumbling(size_ms: i64) -> Self {
        Self::new(size_ms, size_ms)
    }

    /// All windows containing `ts_ms`, ascending by start. For tumbling
    /// windows this is always exactly one window.
    ///
    /// Invariant: every returned window satisfies `start <= ts < end`, so
    /// no window starting after the event's own timestamp is ever
    /// created. A timestamp exactly on a boundary belongs to the window
    /// that starts there, not the one that ends there.
    pub fn windows_for(&self, ts_ms: i64) -> Vec<Window> {
        // Latest aligned start at or before the timestamp; div_euclid
        // keeps the alignment correct for pre-epoch timestamps.
        let mut start = ts_ms.div_euclid(self.advance_ms) * self.advance_ms;

        let mut windows = Vec::with_capacity((self.size_ms / self.advance_ms) as usize);
        while start + self.size_ms > ts_ms {
            windows.push(Window::new(start, start + self.size_ms));
            start -= self.advance_ms;
        }
        windows.reverse();
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tumbling_assignment_is_deterministic() {
        let assigner = WindowAssigner::tumbling(5_000);

        for ts in [0, 1, 2_500, 4_999, 5_000, 12_345] {
            let windows = assigner.windows_for(ts);
            assert_eq!(windows.len(), 1, "tumbling maps t={} to one window", ts);
            assert!(windows[0].contains(ts));
            assert_eq!(windows, assigner.windows_for(ts)); // pure
        }
    }

    #[test]
    fn test_boundary_belongs_to_starting_window() {
        // Test: t == window start opens the new window, not the old one
        let assigner = WindowAssigner::tumbling(5_000);

        let windows = assigner.windows_for(5_000);
        assert_eq!(windows, vec![Window::new(5_000, 10_000)]);
    }

    #[test]
    fn test_adjacent_timestamps_split_across_windows() {
        // Test: t=4900 and t=5100 land in distinct 5s windows
        let assigner = WindowAssigner::tumbling(5_000);

        assert_eq!(assigner.windows_for(4_900), vec![Window::new(0, 5_000)]);
        assert_eq!(
            assigner.windows_for(5_100),
            vec![Window::new(5_000, 10_000)]
        );
    }

    #[test]
    fn test_hopping_covers_timestamp_with_overlapping_windows() {
        // size 10s, advance 5s: every instant is in two windows
        let assigner = WindowAssigner::new(10_000, 5_000);

        let windows = assigner.windows_for(12_000);
        assert_eq!(
            windows,
            vec![Window::new(5_000, 15_000), Window::new(10_000, 20_000)]
        );
        for window in &windows {
            assert!(window.contains(12_000));
        }
    }

    #[test]
    fn test_pre_epoch_timestamps_stay_aligned() {
        let assigner = WindowAssigner::tumbling(5_000);

        let windows = assigner.windows_for(-1);
        assert_eq!(windows, vec![Window::new(-5_000, 0)]);
    }
}
