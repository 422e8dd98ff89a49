//! Settings schema definitions.
//!
//! This module defines the complete settings tree for the application.
//! All types derive Serde traits for deserialization from the YAML file,
//! and every section has defaults so a minimal file is valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Root settings for the application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application name used in log files and context fields.
    pub app_name: String,

    /// Application version string.
    pub version: String,

    /// Debug mode flag.
    pub debug: bool,

    /// Logging and telemetry configuration.
    pub logging: LoggingSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "groundwork".to_string(),
            version: "0.1.0".to_string(),
            debug: false,
            logging: LoggingSettings::default(),
        }
    }
}

/// Severity levels understood by the telemetry facade.
///
/// The set is wider than `tracing`'s five levels; `SUCCESS` and `CRITICAL`
/// keep their own identity in counters and structured records and map onto
/// the nearest `tracing` level at emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Canonical name as it appears in config files and log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Whether records at this level count toward the error tally.
    pub fn is_error(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Default plain-text record template.
pub const DEFAULT_FORMAT: &str =
    "{time} | {level} | {module}:{line} | pid={process} tid={thread} | {message}";

/// Logging and telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Name used for log file stems and the context field.
    pub app_name: String,

    /// Minimum level for the console sink.
    pub level: LogLevel,

    /// Directory for log file storage. Created on facade construction.
    pub log_dir: PathBuf,

    /// Plain-text record template. Recognized placeholders:
    /// `{time}`, `{level}`, `{module}`, `{line}`, `{process}`, `{thread}`,
    /// `{message}`.
    pub format_string: String,

    /// Console sink settings.
    pub console: ConsoleSinkConfig,

    /// Rolling plain-text file sink settings.
    pub file: FileSinkConfig,

    /// Rolling structured-JSON file sink settings.
    pub json: FileSinkConfig,

    /// Batch buffering settings.
    pub batch: BatchConfig,

    /// Progress bar theming.
    pub progress: ProgressConfig,

    /// Worker pool settings for the parallel logging path.
    pub parallel: ParallelConfig,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            app_name: "groundwork".to_string(),
            level: LogLevel::Info,
            log_dir: PathBuf::from("logs"),
            format_string: DEFAULT_FORMAT.to_string(),
            console: ConsoleSinkConfig::default(),
            file: FileSinkConfig::default(),
            json: FileSinkConfig::default(),
            batch: BatchConfig::default(),
            progress: ProgressConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

/// Console sink settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleSinkConfig {
    /// Enable the console sink.
    pub enabled: bool,

    /// Include timestamps in console output.
    pub show_time: bool,

    /// Include source file and line in console output.
    pub show_path: bool,

    /// Emit ANSI colors.
    pub ansi: bool,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_time: true,
            show_path: true,
            ansi: true,
        }
    }
}

/// Rotation policy for file sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

/// Settings shared by the plain-text and JSON file sinks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Enable this sink.
    pub enabled: bool,

    /// When the current log file rolls over.
    pub rotation: RotationPolicy,

    /// Rolled files older than this many days are swept on facade
    /// construction. Zero disables the sweep.
    pub retention_days: u32,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rotation: RotationPolicy::Daily,
            retention_days: 7,
        }
    }
}

/// Batch buffering settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Target size at facade construction.
    pub initial_size: usize,

    /// Ceiling for the adaptive target size.
    pub max_size: usize,

    /// Floor for the adaptive target size.
    pub min_size: usize,

    /// Minimum seconds between load readings.
    pub check_interval: u64,

    /// CPU utilization (percent) above which the target size halves.
    pub high_load_threshold: f32,

    /// CPU utilization (percent) below which the target size doubles.
    pub low_load_threshold: f32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_size: 100,
            max_size: 1000,
            min_size: 10,
            check_interval: 60,
            high_load_threshold: 80.0,
            low_load_threshold: 30.0,
        }
    }
}

/// A single color-and-weight style entry inside a progress theme.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StyleConfig {
    /// Color name understood by the terminal renderer (e.g. "cyan").
    pub color: String,

    /// Render bold.
    #[serde(default)]
    pub bold: bool,
}

impl StyleConfig {
    pub fn new(color: &str, bold: bool) -> Self {
        Self {
            color: color.to_string(),
            bold,
        }
    }
}

/// A named progress bar theme.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThemeConfig {
    /// Color of the unfilled bar portion.
    pub bar_color: String,

    /// Style of the filled bar portion.
    pub complete_style: StyleConfig,

    /// Style of the position/length readout.
    pub progress_style: StyleConfig,

    /// Style of the spinner.
    pub spinner_style: StyleConfig,

    /// Style of the description text.
    pub description_style: StyleConfig,
}

/// Progress bar theming: the active theme name plus the theme catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Name of the active theme. Must exist in `themes`.
    pub theme: String,

    /// Theme catalog, keyed by lowercase name.
    pub themes: BTreeMap<String, ThemeConfig>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        let mut themes = BTreeMap::new();
        themes.insert(
            "neon".to_string(),
            ThemeConfig {
                bar_color: "cyan".to_string(),
                complete_style: StyleConfig::new("green", true),
                progress_style: StyleConfig::new("white", false),
                spinner_style: StyleConfig::new("magenta", false),
                description_style: StyleConfig::new("yellow", false),
            },
        );
        themes.insert(
            "minimal".to_string(),
            ThemeConfig {
                bar_color: "white".to_string(),
                complete_style: StyleConfig::new("white", false),
                progress_style: StyleConfig::new("white", false),
                spinner_style: StyleConfig::new("white", false),
                description_style: StyleConfig::new("white", false),
            },
        );
        Self {
            theme: "neon".to_string(),
            themes,
        }
    }
}

/// Worker pool settings for the parallel logging path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker threads.
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let settings = AppSettings::default();
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert!(settings.logging.batch.min_size <= settings.logging.batch.initial_size);
        assert!(settings.logging.batch.initial_size <= settings.logging.batch.max_size);
        assert!(settings
            .logging
            .progress
            .themes
            .contains_key(&settings.logging.progress.theme));
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Success,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
        assert!("NOISE".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_error_classification() {
        assert!(LogLevel::Error.is_error());
        assert!(LogLevel::Critical.is_error());
        assert!(!LogLevel::Warning.is_error());
        assert!(!LogLevel::Success.is_error());
    }

    #[test]
    fn test_minimal_yaml_deserializes() {
        let settings: AppSettings = serde_yaml::from_str("app_name: demo\n").unwrap();
        assert_eq!(settings.app_name, "demo");
        assert_eq!(settings.logging.batch.initial_size, 100);
    }

    #[test]
    fn test_level_yaml_spelling() {
        let settings: AppSettings = serde_yaml::from_str("logging:\n  level: WARNING\n").unwrap();
        assert_eq!(settings.logging.level, LogLevel::Warning);
    }
}
