//! Record emission seam.
//!
//! Everything the facade logs funnels through [`RecordSink`], so batching,
//! the async entry points, and the parallel path stay testable without a
//! global subscriber.

use crate::config::LogLevel;

/// Destination for log records.
pub trait RecordSink: Send + Sync {
    /// Emit one record. Implementations must not block on callers' locks.
    fn emit(&self, level: LogLevel, message: &str);
}

/// The production sink: forwards records into the `tracing` pipeline.
///
/// `SUCCESS` and `CRITICAL` map onto the nearest `tracing` level; the
/// original severity name rides along as the `severity` field so the file
/// formats can preserve it.
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(severity = %level, "{message}"),
            LogLevel::Debug => tracing::debug!(severity = %level, "{message}"),
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(severity = %level, "{message}")
            }
            LogLevel::Warning => tracing::warn!(severity = %level, "{message}"),
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(severity = %level, "{message}")
            }
        }
    }
}
