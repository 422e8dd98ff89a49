//! Telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! All callers produce:
//!     → batch.rs (buffered records, load-adaptive flushing)
//!     → facade.rs (async + parallel entry points, scopes)
//!     → sink.rs (tracing pipeline)
//!
//! Consumers:
//!     → console layer (configured minimum level)
//!     → rolling plain-text file (format.rs template, TRACE)
//!     → rolling JSON-records file (format.rs, TRACE)
//! ```
//!
//! # Design Decisions
//! - One record seam (`RecordSink`) so every path is testable without a
//!   global subscriber
//! - Counters are cheap and sit behind a single lock
//! - Scoped guards (progress, performance, temporary level) clean up on
//!   every exit path

pub mod batch;
pub mod facade;
pub mod format;
pub mod interpolate;
pub mod perf;
pub mod progress;
pub mod sink;
pub mod stats;

pub use batch::{BatchLogger, LoadProbe, SysinfoProbe};
pub use facade::{FilterHook, LevelGuard, TelemetryBuilder, TelemetryError, TelemetryFacade};
pub use format::{JsonRecordFormat, PlainRecordFormat};
pub use interpolate::interpolate;
pub use perf::PerfSpan;
pub use progress::{ProgressScope, ProgressTracker, PROGRESS_CACHE_SIZE};
pub use sink::{RecordSink, TracingSink};
pub use stats::{LogStats, TelemetryStats};
