//! Application settings and telemetry foundation.
//!
//! # Architecture Overview
//!
//! ```text
//! settings file (YAML) + APP_* environment overrides
//!     → config::loader (parse, merge, validate)
//!     → config::SettingsStore (atomic snapshot, memoized dotted reads)
//!     → telemetry::TelemetryFacade (built once from the current tree)
//!         → console sink        (configured minimum level)
//!         → rolling text file   (template format, TRACE)
//!         → rolling JSON file   (structured records, TRACE)
//! ```
//!
//! The store may be reloaded at runtime; the facade keeps the sinks it
//! was built with and is rebuilt explicitly when that matters.

pub mod config;
pub mod telemetry;

pub use config::{AppSettings, LogLevel, SettingsError, SettingsStore};
pub use telemetry::{TelemetryError, TelemetryFacade};
