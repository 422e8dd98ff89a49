//! Process-wide settings store.
//!
//! # Data Flow
//! ```text
//! settings file (YAML)
//!     → loader.rs (parse, env merge, validate)
//!     → Snapshot (typed tree + JSON view)
//!     → atomic swap into the store
//!     → readers observe old or new tree, never a torn one
//! ```
//!
//! # Design Decisions
//! - Reload is gated on file-modification-time staleness; an unchanged
//!   file is a no-op that preserves the memoization cache
//! - Dotted-path lookups are memoized in a bounded LRU cache; the cache
//!   is cleared inside the reload critical section so no reader pairs a
//!   new tree with stale entries
//! - A failed load leaves the previous snapshot, mtime, and cache intact

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use lru::LruCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::config::loader::{load_settings, SettingsError, Snapshot};

/// Capacity of the dotted-path memoization cache.
pub const SETTING_CACHE_SIZE: usize = 32;

/// Default settings file path, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "config.yaml";

/// Environment variable naming an alternative settings file for the
/// global store.
pub const SETTINGS_PATH_ENV: &str = "GROUNDWORK_CONFIG";

/// Settings store: staleness-gated loading, atomic tree replacement, and
/// memoized dotted-path reads.
///
/// One process-wide instance is reachable through [`SettingsStore::global`];
/// independent handles can be constructed with [`SettingsStore::new`] for
/// injection into dependents or for tests.
pub struct SettingsStore {
    current: ArcSwapOption<Snapshot>,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    cache: LruCache<String, serde_json::Value>,
    generation: u64,
}

impl SettingsStore {
    /// Create a store reading from `path`. Nothing is loaded until
    /// [`load`](Self::load) or [`settings`](Self::settings) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let capacity =
            NonZeroUsize::new(SETTING_CACHE_SIZE).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            current: ArcSwapOption::from(None),
            inner: Mutex::new(StoreInner {
                path: path.into(),
                last_modified: None,
                cache: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    /// The process-wide store.
    ///
    /// Reads `GROUNDWORK_CONFIG` for the file path, falling back to
    /// `config.yaml`. Construction is lazy and does not touch the disk.
    pub fn global() -> &'static SettingsStore {
        static STORE: OnceLock<SettingsStore> = OnceLock::new();
        STORE.get_or_init(|| {
            let path = std::env::var_os(SETTINGS_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
            SettingsStore::new(path)
        })
    }

    /// Load the settings file, replacing the active source if `path` is
    /// given.
    ///
    /// If a tree is already loaded and the file's modification time has
    /// not advanced past the last successful load, this is a no-op. On
    /// success the snapshot is swapped in, the generation advances, and
    /// the memoization cache is cleared. On failure the previous state is
    /// untouched.
    pub fn load(&self, path: Option<&Path>) -> Result<(), SettingsError> {
        let mut inner = self.inner.lock();

        if let Some(p) = path {
            if p != inner.path {
                inner.path = p.to_path_buf();
                inner.last_modified = None;
            }
        }

        let modified = match fs::metadata(&inner.path) {
            Ok(meta) => meta.modified().ok(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SettingsError::NotFound(inner.path.clone()))
            }
            Err(e) => return Err(SettingsError::Io(e)),
        };

        if self.current.load().is_some() {
            if let (Some(current), Some(last)) = (modified, inner.last_modified) {
                if current <= last {
                    return Ok(());
                }
            }
        }

        let snapshot = load_settings(&inner.path)?;

        inner.last_modified = modified;
        inner.generation += 1;
        inner.cache.clear();
        self.current.store(Some(Arc::new(snapshot)));
        Ok(())
    }

    /// Re-evaluate staleness against the active source and reload if the
    /// file changed.
    pub fn reload(&self) -> Result<(), SettingsError> {
        self.load(None)
    }

    /// Current settings tree, loading it first if nothing is loaded yet.
    pub fn settings(&self) -> Result<Arc<Snapshot>, SettingsError> {
        if let Some(snapshot) = self.current.load_full() {
            return Ok(snapshot);
        }
        self.load(None)?;
        self.current.load_full().ok_or(SettingsError::NotLoaded)
    }

    /// Resolve a dotted path against the current tree.
    ///
    /// Returns `None` if nothing is loaded or any path segment is
    /// missing; lookups never fail with an error. Successful resolutions
    /// are memoized until the next successful reload.
    pub fn get(&self, path: &str) -> Option<serde_json::Value> {
        let mut inner = self.inner.lock();

        if let Some(value) = inner.cache.get(path) {
            return Some(value.clone());
        }

        let snapshot = self.current.load_full()?;
        let value = snapshot.lookup(path)?.clone();
        inner.cache.put(path.to_string(), value.clone());
        Some(value)
    }

    /// Resolve a dotted path, falling back to `default` when any segment
    /// is missing.
    pub fn get_or(&self, path: &str, default: serde_json::Value) -> serde_json::Value {
        self.get(path).unwrap_or(default)
    }

    /// Resolve a dotted path into a typed value. `None` on a missing path
    /// or a type mismatch.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        serde_json::from_value(self.get(path)?).ok()
    }

    /// How many times a tree has actually been parsed in. Staleness
    /// no-ops do not advance this.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Number of memoized dotted-path entries.
    pub fn memoized_len(&self) -> usize {
        self.inner.lock().cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use filetime::FileTime;
    use std::fs;
    use std::time::Duration;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    fn bump_mtime(path: &Path, seconds_forward: u64) {
        let meta = fs::metadata(path).unwrap();
        let current = FileTime::from_last_modification_time(&meta);
        let bumped = FileTime::from_unix_time(
            current.unix_seconds() + seconds_forward as i64,
            current.nanoseconds(),
        );
        filetime::set_file_mtime(path, bumped).unwrap();
    }

    #[test]
    fn test_load_then_get_configured_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "logging:\n  level: DEBUG\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();

        assert_eq!(
            store.get_as::<LogLevel>("logging.level"),
            Some(LogLevel::Debug)
        );
    }

    #[test]
    fn test_missing_path_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: demo\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();

        let fallback = serde_json::json!("fallback");
        assert_eq!(
            store.get_or("logging.console.nonexistent", fallback.clone()),
            fallback
        );
        assert_eq!(store.get("nothing.here"), None);
    }

    #[test]
    fn test_lookups_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: demo\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();

        assert_eq!(store.memoized_len(), 0);
        store.get("logging.level");
        store.get("logging.level");
        store.get("logging.batch.initial_size");
        assert_eq!(store.memoized_len(), 2);
    }

    #[test]
    fn test_reload_with_unchanged_mtime_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: demo\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();
        store.get("logging.level");

        let generation = store.generation();
        store.reload().unwrap();
        store.reload().unwrap();

        assert_eq!(store.generation(), generation);
        assert_eq!(store.memoized_len(), 1);
    }

    #[test]
    fn test_reload_after_change_clears_memoization() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "logging:\n  level: DEBUG\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();
        assert_eq!(
            store.get_as::<LogLevel>("logging.level"),
            Some(LogLevel::Debug)
        );

        fs::write(&path, "logging:\n  level: ERROR\n").unwrap();
        bump_mtime(&path, 5);
        store.reload().unwrap();

        assert_eq!(store.memoized_len(), 0);
        assert_eq!(
            store.get_as::<LogLevel>("logging.level"),
            Some(LogLevel::Error)
        );
    }

    #[test]
    fn test_failed_load_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: original\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();

        let missing = dir.path().join("missing.yaml");
        let err = store.load(Some(&missing)).unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(_)));

        let snapshot = store.settings().unwrap();
        assert_eq!(snapshot.app_name, "original");
    }

    #[test]
    fn test_settings_triggers_initial_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: lazy\n");
        let store = SettingsStore::new(&path);

        let snapshot = store.settings().unwrap();
        assert_eq!(snapshot.app_name, "lazy");
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_cache_capacity_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "app_name: demo\n");
        let store = SettingsStore::new(&path);
        store.load(None).unwrap();

        // More distinct misses than the cache holds; all resolve against
        // real fields to be memoized.
        for field in ["app_name", "version", "debug"] {
            for prefix in ["", "logging."] {
                let _ = store.get(&format!("{prefix}{field}"));
            }
        }
        assert!(store.memoized_len() <= SETTING_CACHE_SIZE);
    }

    #[test]
    fn test_mtime_probe_does_not_race_readers() {
        // A reload and concurrent readers must never observe a torn pair.
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "logging:\n  level: DEBUG\n");
        let store = std::sync::Arc::new(SettingsStore::new(&path));
        store.load(None).unwrap();

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    if let Some(level) = store.get_as::<LogLevel>("logging.level") {
                        assert!(level == LogLevel::Debug || level == LogLevel::Error);
                    }
                }
            })
        };

        fs::write(&path, "logging:\n  level: ERROR\n").unwrap();
        bump_mtime(&path, 5);
        store.reload().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        reader.join().unwrap();

        assert_eq!(
            store.get_as::<LogLevel>("logging.level"),
            Some(LogLevel::Error)
        );
    }
}
