//! Settings loading from disk.
//!
//! # Responsibilities
//! - Read and parse the YAML settings file
//! - Merge environment overrides (`APP_` prefix, `__` nesting separator)
//! - Extract the typed settings tree and run semantic validation
//!
//! Syntax errors, shape mismatches, and semantic violations surface as
//! distinct error variants so callers can tell a broken file from a wrong
//! one.

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Serialized};
use figment::Figment;
use thiserror::Error;

use crate::config::schema::AppSettings;
use crate::config::validation::validate;

/// Prefix for environment-variable overrides.
pub const ENV_PREFIX: &str = "APP_";

/// Separator addressing nested fields in override names, e.g.
/// `APP_LOGGING__LEVEL` overrides `logging.level`.
pub const ENV_NESTING: &str = "__";

/// Error type for settings loading and access.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read settings file: {0}")]
    Io(#[from] io::Error),

    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid settings: {0}")]
    Validation(String),

    #[error("settings have not been loaded")]
    NotLoaded,
}

/// One fully-loaded settings tree.
///
/// Holds the typed tree plus a canonical JSON view of it (post
/// env-override merge) that dotted-path lookups walk. Replaced wholesale
/// on reload, never mutated.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The validated settings tree.
    pub settings: AppSettings,

    view: serde_json::Value,
}

impl Snapshot {
    /// Walk the JSON view segment by segment. `None` as soon as a segment
    /// is missing.
    pub(crate) fn lookup(&self, path: &str) -> Option<&serde_json::Value> {
        let mut value = &self.view;
        for segment in path.split('.') {
            value = value.get(segment)?;
        }
        Some(value)
    }
}

impl Deref for Snapshot {
    type Target = AppSettings;

    fn deref(&self) -> &AppSettings {
        &self.settings
    }
}

/// Load, merge, extract, and validate settings from a YAML file.
pub fn load_settings(path: &Path) -> Result<Snapshot, SettingsError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SettingsError::NotFound(path.to_path_buf()),
        _ => SettingsError::Io(e),
    })?;

    let mut raw: serde_yaml::Value = serde_yaml::from_str(&content)?;
    if raw.is_null() {
        // An empty file is an empty mapping, not a syntax error.
        raw = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    }

    let settings: AppSettings = Figment::new()
        .merge(Serialized::defaults(raw))
        .merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING))
        .extract()
        .map_err(|e| SettingsError::Validation(e.to_string()))?;

    validate(&settings)?;

    let view =
        serde_json::to_value(&settings).map_err(|e| SettingsError::Validation(e.to_string()))?;

    Ok(Snapshot { settings, view })
}
