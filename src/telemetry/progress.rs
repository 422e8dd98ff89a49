//! Themed progress reporting.
//!
//! Bars are cached by description and held through indicatif's own weak
//! handles: a cached entry stays reusable only while some scope keeps the
//! bar alive, and dead entries are evicted on the next lookup. Scopes
//! remove their bar from the draw target on drop, success or failure.

use std::collections::HashMap;

use indicatif::style::TemplateError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle, WeakProgressBar};
use parking_lot::Mutex;

use crate::config::{ProgressConfig, StyleConfig, ThemeConfig};
use crate::telemetry::facade::TelemetryError;

/// Upper bound on cached description → bar entries.
pub const PROGRESS_CACHE_SIZE: usize = 100;

/// Progress bar manager: one draw target, themed styling, and a bounded
/// weak-handle cache keyed by description.
pub struct ProgressTracker {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: Mutex<HashMap<String, WeakProgressBar>>,
}

impl ProgressTracker {
    pub fn new(config: &ProgressConfig) -> Result<Self, TelemetryError> {
        let theme = config
            .themes
            .get(&config.theme)
            .ok_or_else(|| TelemetryError::UnknownTheme(config.theme.clone()))?;
        Ok(Self {
            multi: MultiProgress::new(),
            style: build_style(theme)?,
            bars: Mutex::new(HashMap::new()),
        })
    }

    /// Obtain a scope over `total` units, reusing a live cached bar for
    /// the same description when one exists.
    pub fn scope(&self, total: u64, description: &str) -> ProgressScope {
        let bar = self.obtain(total, description);
        ProgressScope {
            bar,
            multi: self.multi.clone(),
        }
    }

    fn obtain(&self, total: u64, description: &str) -> ProgressBar {
        let mut bars = self.bars.lock();

        if let Some(bar) = bars.get(description).and_then(WeakProgressBar::upgrade) {
            bar.reset();
            bar.set_length(total);
            return bar;
        }

        bars.retain(|_, weak| weak.upgrade().is_some());

        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_message(description.to_string());
        if bars.len() < PROGRESS_CACHE_SIZE {
            bars.insert(description.to_string(), bar.downgrade());
        }
        bar
    }
}

/// Handle over one tracked operation. Dropping it finishes the bar and
/// removes its task from the draw target regardless of outcome.
pub struct ProgressScope {
    bar: ProgressBar,
    multi: MultiProgress,
}

impl ProgressScope {
    /// Advance by `n` units.
    pub fn update(&self, n: u64) {
        self.bar.inc(n);
    }

    /// Mark the operation complete ahead of scope exit.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for ProgressScope {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        self.multi.remove(&self.bar);
    }
}

fn build_style(theme: &ThemeConfig) -> Result<ProgressStyle, TemplateError> {
    let template = format!(
        "{{spinner:.{spinner}}} {{msg:.{description}}} \
         [{{bar:40.{complete}/{bar}}}] {{pos:.{progress}}}/{{len:.{progress}}} ({{elapsed}})",
        spinner = style_spec(&theme.spinner_style),
        description = style_spec(&theme.description_style),
        complete = style_spec(&theme.complete_style),
        bar = theme.bar_color,
        progress = style_spec(&theme.progress_style),
    );
    Ok(ProgressStyle::default_bar()
        .template(&template)?
        .progress_chars("=>-"))
}

fn style_spec(style: &StyleConfig) -> String {
    if style.bold {
        format!("{}.bold", style.color)
    } else {
        style.color.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(&ProgressConfig::default()).unwrap()
    }

    #[test]
    fn test_unknown_theme_is_rejected() {
        let config = ProgressConfig {
            theme: "plasma".to_string(),
            ..ProgressConfig::default()
        };
        assert!(matches!(
            ProgressTracker::new(&config),
            Err(TelemetryError::UnknownTheme(_))
        ));
    }

    #[test]
    fn test_scope_tracks_position() {
        let tracker = tracker();
        let scope = tracker.scope(10, "indexing");
        scope.update(3);
        scope.update(2);
        assert_eq!(scope.position(), 5);
    }

    #[test]
    fn test_live_scopes_share_a_bar_by_description() {
        let tracker = tracker();
        let first = tracker.scope(10, "same");
        first.update(4);
        let second = tracker.scope(10, "same");
        // Reuse resets the bar; both handles observe the same task.
        assert_eq!(first.position(), 0);
        second.update(2);
        assert_eq!(first.position(), 2);
    }

    #[test]
    fn test_dropped_scope_releases_cache_entry() {
        let tracker = tracker();
        {
            let scope = tracker.scope(10, "transient");
            scope.update(7);
        }
        let fresh = tracker.scope(10, "transient");
        assert_eq!(fresh.position(), 0);
        assert_eq!(tracker.bars.lock().len(), 1);
    }

    #[test]
    fn test_distinct_descriptions_get_distinct_bars() {
        let tracker = tracker();
        let a = tracker.scope(10, "a");
        let b = tracker.scope(10, "b");
        a.update(3);
        assert_eq!(b.position(), 0);
        assert_eq!(tracker.bars.lock().len(), 2);
    }
}
