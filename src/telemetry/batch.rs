//! Batched logging with load-adaptive flushing.
//!
//! # Design Decisions
//! - The flush threshold adapts to CPU utilization: halved under high
//!   load, doubled under low load, always inside the configured bounds
//! - Load is sampled at most once per check interval
//! - Flushing uses a double-checked lock so racing callers that both see
//!   a full buffer produce one flush, not two
//! - The buffer lock is released before records reach the sink

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, Pid, ProcessesToUpdate, RefreshKind, System};

use crate::config::{BatchConfig, LogLevel};
use crate::telemetry::sink::RecordSink;

/// Source of CPU-utilization and process-memory readings.
///
/// Kept as a seam so tests can feed fixed readings instead of the host's.
pub trait LoadProbe: Send {
    /// Instantaneous CPU utilization across all cores, in percent.
    fn cpu_percent(&mut self) -> f32;

    /// Resident set size of this process, in bytes.
    fn process_memory_bytes(&mut self) -> u64;
}

/// Production probe backed by `sysinfo`.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::everything().with_cpu(CpuRefreshKind::everything()),
            ),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadProbe for SysinfoProbe {
    fn cpu_percent(&mut self) -> f32 {
        self.system.refresh_cpu_all();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32
        }
    }

    fn process_memory_bytes(&mut self) -> u64 {
        let pid = Pid::from(std::process::id() as usize);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// FIFO buffer of records that flushes when it reaches the adaptive
/// target size.
pub struct BatchLogger {
    buffer: Mutex<Vec<(LogLevel, String)>>,
    flush_lock: Mutex<()>,
    target_size: AtomicUsize,
    last_check: Mutex<Instant>,
    config: BatchConfig,
    probe: Arc<Mutex<Box<dyn LoadProbe>>>,
    sink: Arc<dyn RecordSink>,
}

impl BatchLogger {
    pub fn new(
        config: BatchConfig,
        probe: Arc<Mutex<Box<dyn LoadProbe>>>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let floor = config.min_size.max(1);
        let ceiling = config.max_size.max(floor);
        let initial = config.initial_size.clamp(floor, ceiling);
        Self {
            buffer: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
            target_size: AtomicUsize::new(initial),
            last_check: Mutex::new(Instant::now()),
            config,
            probe,
            sink,
        }
    }

    /// Append a record; flush if the buffer has reached the target size.
    pub fn push(&self, level: LogLevel, message: String) {
        let len = {
            let mut buffer = self.buffer.lock();
            buffer.push((level, message));
            buffer.len()
        };

        self.maybe_adjust_target();

        if len >= self.target() {
            let _guard = self.flush_lock.lock();
            // Re-check after acquiring: a racing caller may have flushed.
            if self.buffer.lock().len() >= self.target() {
                self.drain();
            }
        }
    }

    /// Drain the buffer, replaying records to the sink in FIFO order.
    pub fn flush(&self) {
        let _guard = self.flush_lock.lock();
        self.drain();
    }

    fn drain(&self) {
        let drained = std::mem::take(&mut *self.buffer.lock());
        for (level, message) in drained {
            self.sink.emit(level, &message);
        }
    }

    /// Current flush threshold.
    pub fn target(&self) -> usize {
        self.target_size.load(Ordering::Relaxed)
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_adjust_target(&self) {
        {
            let mut last = self.last_check.lock();
            if last.elapsed() < Duration::from_secs(self.config.check_interval) {
                return;
            }
            *last = Instant::now();
        }
        let load = self.probe.lock().cpu_percent();
        self.apply_load(load);
    }

    /// Recompute the target size from a load reading, clamped to the
    /// configured bounds.
    pub(crate) fn apply_load(&self, load: f32) {
        let current = self.target();
        let next = if load > self.config.high_load_threshold {
            (current / 2).max(self.config.min_size)
        } else if load < self.config.low_load_threshold {
            current.saturating_mul(2).min(self.config.max_size)
        } else {
            current
        };
        self.target_size.store(next, Ordering::Relaxed);
    }
}
