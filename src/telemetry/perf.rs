//! Scoped performance measurement.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::telemetry::batch::LoadProbe;

/// Guard measuring one operation's wall-clock time and memory footprint.
///
/// Measurements start at construction; the summary line is emitted from
/// `Drop`, so it fires on every exit path, including early returns and
/// unwinding.
pub struct PerfSpan {
    operation: String,
    started: Instant,
    start_memory: u64,
    probe: Arc<Mutex<Box<dyn LoadProbe>>>,
}

impl PerfSpan {
    pub(crate) fn new(operation: String, probe: Arc<Mutex<Box<dyn LoadProbe>>>) -> Self {
        let start_memory = probe.lock().process_memory_bytes();
        Self {
            operation,
            started: Instant::now(),
            start_memory,
            probe,
        }
    }

    /// Time elapsed since the span started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let end_memory = self.probe.lock().process_memory_bytes();
        let delta_kib = (end_memory as i64 - self.start_memory as i64) / 1024;
        tracing::info!(
            operation = %self.operation,
            duration_ms = elapsed.as_millis() as u64,
            memory_delta_kib = delta_kib,
            "operation completed"
        );
    }
}
