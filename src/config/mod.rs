//! Settings management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (YAML)
//!     → loader.rs (parse & env-override merge)
//!     → validation.rs (semantic checks)
//!     → Snapshot (validated, immutable)
//!     → store.rs (atomic swap + memoized dotted-path reads)
//!
//! On reload:
//!     store.rs checks file modification time
//!     → unchanged: no-op, memoization kept
//!     → changed: loader + validation run again
//!     → atomic swap of Arc<Snapshot>, memoization cleared
//! ```
//!
//! # Design Decisions
//! - The tree is immutable once loaded; changes require a full reload
//! - All sections have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks
//! - Dotted-path lookups degrade to a caller default, never an error

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;

pub use loader::{SettingsError, Snapshot, ENV_NESTING, ENV_PREFIX};
pub use schema::{
    AppSettings, BatchConfig, ConsoleSinkConfig, FileSinkConfig, LogLevel, LoggingSettings,
    ParallelConfig, ProgressConfig, RotationPolicy, StyleConfig, ThemeConfig,
};
pub use store::SettingsStore;
