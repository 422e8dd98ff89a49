//! Logging statistics.
//!
//! Counters are mutated behind one exclusion lock and read out as
//! point-in-time snapshots for display.

use std::collections::BTreeMap;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::LogLevel;

/// Shared counters for emitted records.
pub struct LogStats {
    inner: Mutex<StatsInner>,
}

struct StatsInner {
    total_messages: u64,
    by_level: BTreeMap<LogLevel, u64>,
    error_count: u64,
    started: Instant,
}

impl LogStats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsInner {
                total_messages: 0,
                by_level: BTreeMap::new(),
                error_count: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Count one record. Per-level entries are created on first
    /// occurrence; `ERROR` and `CRITICAL` also advance the error tally.
    pub fn record(&self, level: LogLevel) {
        let mut inner = self.inner.lock();
        inner.total_messages += 1;
        *inner.by_level.entry(level).or_insert(0) += 1;
        if level.is_error() {
            inner.error_count += 1;
        }
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> TelemetryStats {
        let inner = self.inner.lock();
        let uptime_seconds = inner.started.elapsed().as_secs_f64();
        let messages_per_second = if uptime_seconds > 0.0 {
            inner.total_messages as f64 / uptime_seconds
        } else {
            0.0
        };
        TelemetryStats {
            total_messages: inner.total_messages,
            messages_per_second,
            by_level: inner
                .by_level
                .iter()
                .map(|(level, count)| (level.as_str().to_string(), *count))
                .collect(),
            error_count: inner.error_count,
            uptime_seconds,
        }
    }
}

impl Default for LogStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters, suitable for display or serialization.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryStats {
    pub total_messages: u64,
    pub messages_per_second: f64,
    pub by_level: BTreeMap<String, u64>,
    pub error_count: u64,
    pub uptime_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_and_per_level_counts_agree() {
        let stats = LogStats::new();
        for _ in 0..3 {
            stats.record(LogLevel::Info);
        }
        stats.record(LogLevel::Warning);
        stats.record(LogLevel::Error);
        stats.record(LogLevel::Critical);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_messages, 6);
        assert_eq!(snapshot.by_level.values().sum::<u64>(), 6);
        assert_eq!(snapshot.by_level["INFO"], 3);
        assert_eq!(snapshot.error_count, 2);
    }

    #[test]
    fn test_levels_appear_on_first_occurrence() {
        let stats = LogStats::new();
        assert!(stats.snapshot().by_level.is_empty());
        stats.record(LogLevel::Success);
        assert_eq!(stats.snapshot().by_level["SUCCESS"], 1);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let stats = std::sync::Arc::new(LogStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        stats.record(LogLevel::Debug);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().total_messages, 1000);
    }
}
