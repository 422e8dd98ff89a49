//! Telemetry facade construction and high-level logging operations.
//!
//! # Data Flow
//! ```text
//! LoggingSettings
//!     → TelemetryBuilder (sink/probe/filter-hook injection points)
//!     → console + file + json layers, each independently enabled
//!     → global subscriber (installed once per process)
//!
//! batch_log/async_log/parallel_log
//!     → RecordSink (tracing by default)
//!     → layers → terminal / rolling files
//! ```
//!
//! # Design Decisions
//! - Sinks are configured exactly once at construction; there is no
//!   runtime reconfiguration short of rebuilding the facade
//! - The console layer's level sits behind a reload handle so it can be
//!   swapped temporarily and restored by a guard
//! - File sinks run at TRACE (most verbose); the console honors the
//!   configured minimum level
//! - Writer guards live on the facade so buffered records drain when it
//!   is dropped

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::Metadata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::{filter_fn, FilterExt, LevelFilter};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, Registry};

use crate::config::{LogLevel, LoggingSettings, RotationPolicy};
use crate::telemetry::batch::{BatchLogger, LoadProbe, SysinfoProbe};
use crate::telemetry::format::{JsonRecordFormat, PlainRecordFormat};
use crate::telemetry::interpolate::interpolate;
use crate::telemetry::perf::PerfSpan;
use crate::telemetry::progress::{ProgressScope, ProgressTracker};
use crate::telemetry::sink::{RecordSink, TracingSink};
use crate::telemetry::stats::{LogStats, TelemetryStats};

/// Error type for telemetry construction and control operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install global subscriber: {0}")]
    Init(String),

    #[error("invalid progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    #[error("unknown progress theme: {0}")]
    UnknownTheme(String),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("console level is not adjustable: {0}")]
    Level(String),
}

/// Caller-supplied record predicate, AND-combined into every sink filter.
pub type FilterHook = Arc<dyn Fn(&Metadata<'_>) -> bool + Send + Sync>;

type ConsoleLevelHandle = reload::Handle<LevelFilter, Registry>;

/// High-level logging surface built from [`LoggingSettings`].
pub struct TelemetryFacade {
    stats: Arc<LogStats>,
    batch: BatchLogger,
    progress: ProgressTracker,
    pool: rayon::ThreadPool,
    sink: Arc<dyn RecordSink>,
    probe: Arc<Mutex<Box<dyn LoadProbe>>>,
    async_gate: tokio::sync::Mutex<()>,
    console_level: Option<ConsoleLevelHandle>,
    _guards: Vec<WorkerGuard>,
}

impl TelemetryFacade {
    /// Build sinks from settings and install the global subscriber.
    ///
    /// Fails if the log directory cannot be created or a subscriber is
    /// already installed in this process.
    pub fn init(settings: &LoggingSettings) -> Result<Self, TelemetryError> {
        Self::builder(settings.clone()).install()
    }

    /// Start a builder for injecting a sink, probe, or filter hook.
    pub fn builder(settings: LoggingSettings) -> TelemetryBuilder {
        TelemetryBuilder {
            settings,
            probe: None,
            sink: None,
            filter_hook: None,
        }
    }

    /// Append to the batch buffer; flushes when the adaptive target size
    /// is reached.
    pub fn batch_log(&self, level: LogLevel, message: impl Into<String>) {
        self.batch.push(level, message.into());
    }

    /// Replay and clear the batch buffer in FIFO order.
    pub fn flush(&self) {
        self.batch.flush();
    }

    /// Log immediately from an async context.
    ///
    /// The single suspension point is the ordering gate: prior writes are
    /// drained before the new record is emitted, so earlier records are
    /// visible first.
    pub async fn async_log(&self, level: LogLevel, message: impl Into<String>) {
        let _gate = self.async_gate.lock().await;
        self.batch.flush();
        self.sink.emit(level, &message.into());
    }

    /// [`async_log`](Self::async_log) plus counter updates.
    pub async fn alog(&self, level: LogLevel, message: impl Into<String>) {
        let _gate = self.async_gate.lock().await;
        self.batch.flush();
        self.sink.emit(level, &message.into());
        self.stats.record(level);
    }

    /// Emit a message list through the worker pool in fixed-size chunks.
    ///
    /// Order is preserved within a chunk; chunks are independent units of
    /// work, so no ordering holds across them.
    pub fn parallel_log(&self, messages: Vec<(LogLevel, String)>, chunk_size: usize) {
        let chunk_size = chunk_size.max(1);
        for chunk in messages.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let sink = Arc::clone(&self.sink);
            let stats = Arc::clone(&self.stats);
            self.pool.spawn(move || {
                for (level, message) in chunk {
                    sink.emit(level, &message);
                    stats.record(level);
                }
            });
        }
    }

    /// Scoped timer over `operation`; the summary line is emitted when
    /// the returned span drops, on every exit path.
    pub fn performance_span(&self, operation: impl Into<String>) -> PerfSpan {
        PerfSpan::new(operation.into(), Arc::clone(&self.probe))
    }

    /// Scoped progress reporter over `total` units.
    pub fn progress_scope(&self, total: u64, description: &str) -> ProgressScope {
        self.progress.scope(total, description)
    }

    /// Count one record without emitting it.
    pub fn record(&self, level: LogLevel) {
        self.stats.record(level);
    }

    /// Point-in-time counter snapshot.
    pub fn stats(&self) -> TelemetryStats {
        self.stats.snapshot()
    }

    /// Substitute `{name}` placeholders; a missing field degrades to a
    /// diagnostic string instead of an error.
    pub fn interpolate(&self, template: &str, fields: &[(&str, &str)]) -> String {
        interpolate(template, fields)
    }

    /// Run `f`, logging any error and its source chain against
    /// `group` before returning it unchanged. Never swallows.
    pub fn error_scope<T, E, F>(&self, group: &str, f: F) -> Result<T, E>
    where
        E: std::error::Error,
        F: FnOnce() -> Result<T, E>,
    {
        match f() {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::error!(group = group, error = %error, "error scope failed");
                let mut source = error.source();
                while let Some(cause) = source {
                    tracing::error!(group = group, cause = %cause, "caused by");
                    source = cause.source();
                }
                Err(error)
            }
        }
    }

    /// Temporarily change the console sink's minimum level. The previous
    /// level is restored when the returned guard drops.
    pub fn temporary_level(&self, level: LogLevel) -> Result<LevelGuard, TelemetryError> {
        let handle = self
            .console_level
            .as_ref()
            .ok_or_else(|| TelemetryError::Level("console sink not installed".to_string()))?;

        let mut previous = LevelFilter::OFF;
        handle
            .modify(|filter| {
                previous = *filter;
                *filter = level_filter(level);
            })
            .map_err(|e| TelemetryError::Level(e.to_string()))?;

        Ok(LevelGuard {
            handle: handle.clone(),
            previous,
        })
    }
}

/// Guard restoring the console level on drop.
pub struct LevelGuard {
    handle: ConsoleLevelHandle,
    previous: LevelFilter,
}

impl Drop for LevelGuard {
    fn drop(&mut self) {
        let previous = self.previous;
        let _ = self.handle.modify(move |filter| *filter = previous);
    }
}

/// Builder for [`TelemetryFacade`] with injection points for tests and
/// embedders.
pub struct TelemetryBuilder {
    settings: LoggingSettings,
    probe: Option<Box<dyn LoadProbe>>,
    sink: Option<Arc<dyn RecordSink>>,
    filter_hook: Option<FilterHook>,
}

impl TelemetryBuilder {
    /// Replace the CPU/memory probe.
    pub fn probe(mut self, probe: Box<dyn LoadProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Replace the record sink.
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// AND an additional predicate into every sink's filter.
    pub fn filter_hook(mut self, hook: FilterHook) -> Self {
        self.filter_hook = Some(hook);
        self
    }

    /// Build the facade and install the global subscriber.
    pub fn install(self) -> Result<TelemetryFacade, TelemetryError> {
        let settings = &self.settings;
        fs::create_dir_all(&settings.log_dir)?;

        let hook: FilterHook = self
            .filter_hook
            .clone()
            .unwrap_or_else(|| Arc::new(|_| true));

        let mut guards = Vec::new();
        let mut console_level = None;
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if settings.console.enabled {
            let (level, handle) = reload::Layer::new(level_filter(settings.level));
            console_level = Some(handle);
            let hook = Arc::clone(&hook);
            let combined = level.and(filter_fn(move |meta: &Metadata<'_>| hook(meta)));
            let layer: Box<dyn Layer<Registry> + Send + Sync> = if settings.console.show_time {
                fmt::layer()
                    .with_target(true)
                    .with_ansi(settings.console.ansi)
                    .with_file(settings.console.show_path)
                    .with_line_number(settings.console.show_path)
                    .with_filter(combined)
                    .boxed()
            } else {
                fmt::layer()
                    .without_time()
                    .with_target(true)
                    .with_ansi(settings.console.ansi)
                    .with_file(settings.console.show_path)
                    .with_line_number(settings.console.show_path)
                    .with_filter(combined)
                    .boxed()
            };
            layers.push(layer);
        }

        if settings.file.enabled {
            let file_name = format!("{}.log", settings.app_name);
            sweep_expired(&settings.log_dir, &file_name, settings.file.retention_days);
            let appender = rolling_appender(settings.file.rotation, &settings.log_dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            let hook = Arc::clone(&hook);
            layers.push(
                fmt::layer()
                    .event_format(PlainRecordFormat::new(settings.format_string.clone()))
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(
                        LevelFilter::TRACE.and(filter_fn(move |meta: &Metadata<'_>| hook(meta))),
                    )
                    .boxed(),
            );
        }

        if settings.json.enabled {
            let file_name = format!("{}.json", settings.app_name);
            sweep_expired(&settings.log_dir, &file_name, settings.json.retention_days);
            let appender = rolling_appender(settings.json.rotation, &settings.log_dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            let hook = Arc::clone(&hook);
            layers.push(
                fmt::layer()
                    .event_format(JsonRecordFormat)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(
                        LevelFilter::TRACE.and(filter_fn(move |meta: &Metadata<'_>| hook(meta))),
                    )
                    .boxed(),
            );
        }

        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))?;

        self.finish(guards, console_level)
    }

    /// Build the facade without touching the global subscriber.
    ///
    /// Records are emitted to whatever subscriber is current; no file
    /// sinks are created. Intended for tests and embedding into an
    /// existing subscriber stack.
    pub fn detached(self) -> Result<TelemetryFacade, TelemetryError> {
        self.finish(Vec::new(), None)
    }

    fn finish(
        self,
        guards: Vec<WorkerGuard>,
        console_level: Option<ConsoleLevelHandle>,
    ) -> Result<TelemetryFacade, TelemetryError> {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let probe: Arc<Mutex<Box<dyn LoadProbe>>> = Arc::new(Mutex::new(
            self.probe.unwrap_or_else(|| Box::new(SysinfoProbe::new())),
        ));
        let progress = ProgressTracker::new(&self.settings.progress)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.parallel.max_workers)
            .thread_name(|i| format!("telemetry-{i}"))
            .build()?;
        let batch = BatchLogger::new(
            self.settings.batch.clone(),
            Arc::clone(&probe),
            Arc::clone(&sink),
        );

        Ok(TelemetryFacade {
            stats: Arc::new(LogStats::new()),
            batch,
            progress,
            pool,
            sink,
            probe,
            async_gate: tokio::sync::Mutex::new(()),
            console_level,
            _guards: guards,
        })
    }
}

pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info | LogLevel::Success => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
    }
}

fn rolling_appender(
    rotation: RotationPolicy,
    dir: &Path,
    file_name: &str,
) -> RollingFileAppender {
    match rotation {
        RotationPolicy::Daily => rolling::daily(dir, file_name),
        RotationPolicy::Hourly => rolling::hourly(dir, file_name),
        RotationPolicy::Never => rolling::never(dir, file_name),
    }
}

/// Best-effort removal of rolled files for `prefix` older than the
/// retention window. Zero days disables the sweep.
fn sweep_expired(dir: &Path, prefix: &str, retention_days: u32) {
    if retention_days == 0 {
        return;
    }
    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(retention_days) * 86_400);
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        if let Ok(modified) = meta.modified() {
            if modified < cutoff {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}
