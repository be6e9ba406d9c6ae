//! Lock-free latency bookkeeping.
//!
//! Each field is updated with its own atomic read-modify-write, so concurrent
//! writers never lose an update. The fields of one recorder are not updated
//! as a group: a reader racing with writers may see a max/min pair that does
//! not yet agree with total/count. Every field converges once the writers
//! settle.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Running latency statistics for one kind of queue operation.
#[derive(Debug)]
pub struct LatencyRecorder {
    total_micros: AtomicI64,
    count: AtomicI64,
    max_micros: AtomicI64,
    /// `i64::MAX` until the first observation.
    min_micros: AtomicI64,
}

impl LatencyRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            total_micros: AtomicI64::new(0),
            count: AtomicI64::new(0),
            max_micros: AtomicI64::new(0),
            min_micros: AtomicI64::new(i64::MAX),
        }
    }

    /// Record one completed operation.
    pub fn record(&self, elapsed: Duration) {
        let micros = i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX);

        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
        self.min_micros.fetch_min(micros, Ordering::Relaxed);
    }

    /// Sum of all recorded latencies, in microseconds.
    pub fn total(&self) -> i64 {
        self.total_micros.load(Ordering::Relaxed)
    }

    /// Number of recorded operations.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean latency in microseconds, or 0 when nothing was recorded.
    pub fn average(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.total() as f64 / count as f64
    }

    /// Largest recorded latency, in microseconds.
    pub fn max(&self) -> i64 {
        self.max_micros.load(Ordering::Relaxed)
    }

    /// Smallest recorded latency, in microseconds.
    pub fn min(&self) -> i64 {
        self.min_micros.load(Ordering::Relaxed)
    }

    /// Copy the current values out.
    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            total_micros: self.total(),
            count: self.count(),
            average_micros: self.average(),
            max_micros: self.max(),
            min_micros: self.min(),
        }
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a [`LatencyRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySnapshot {
    /// Sum of all latencies (µs)
    pub total_micros: i64,
    /// Number of operations
    pub count: i64,
    /// Mean latency (µs), 0 when `count` is 0
    pub average_micros: f64,
    /// Largest latency (µs)
    pub max_micros: i64,
    /// Smallest latency (µs), `i64::MAX` when `count` is 0
    pub min_micros: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_recorder() {
        let recorder = LatencyRecorder::new();
        assert_eq!(recorder.total(), 0);
        assert_eq!(recorder.count(), 0);
        assert_eq!(recorder.average(), 0.0);
        assert_eq!(recorder.max(), 0);
        assert_eq!(recorder.min(), i64::MAX);
    }

    #[test]
    fn test_record_tracks_extremes() {
        let recorder = LatencyRecorder::new();
        recorder.record(Duration::from_micros(30));
        recorder.record(Duration::from_micros(10));
        recorder.record(Duration::from_micros(20));

        assert_eq!(recorder.total(), 60);
        assert_eq!(recorder.count(), 3);
        assert_eq!(recorder.average(), 20.0);
        assert_eq!(recorder.max(), 30);
        assert_eq!(recorder.min(), 10);
    }

    #[test]
    fn test_first_observation_becomes_min() {
        let recorder = LatencyRecorder::new();
        recorder.record(Duration::from_secs(5));
        assert_eq!(recorder.min(), 5_000_000);
        assert_eq!(recorder.max(), 5_000_000);
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let recorder = Arc::new(LatencyRecorder::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for i in 1..=1000u64 {
                        recorder.record(Duration::from_micros(i + t));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected_total: i64 = (0..8i64)
            .map(|t| (1..=1000i64).map(|i| i + t).sum::<i64>())
            .sum();
        assert_eq!(recorder.count(), 8000);
        assert_eq!(recorder.total(), expected_total);
        assert_eq!(recorder.min(), 1);
        assert_eq!(recorder.max(), 1007);
    }

    #[test]
    fn test_snapshot_matches_accessors() {
        let recorder = LatencyRecorder::new();
        recorder.record(Duration::from_micros(4));
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_micros, 4);
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.average_micros, 4.0);
        assert_eq!(snapshot.max_micros, 4);
        assert_eq!(snapshot.min_micros, 4);
    }
}
