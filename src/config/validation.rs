//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (the active progress theme exists)
//! - Validate value ranges (batch bounds ordered, thresholds sane)
//!
//! # Design Decisions
//! - Returns all violations, not just the first
//! - Validation is a pure function over the extracted tree
//! - Runs before a tree is accepted into the store

use crate::config::loader::SettingsError;
use crate::config::schema::AppSettings;

/// Validate an extracted settings tree. All violations are reported in one
/// error, joined with "; ".
pub fn validate(settings: &AppSettings) -> Result<(), SettingsError> {
    let mut errors = Vec::new();

    if settings.app_name.trim().is_empty() {
        errors.push("app_name must not be empty".to_string());
    }
    if settings.logging.log_dir.as_os_str().is_empty() {
        errors.push("logging.log_dir must not be empty".to_string());
    }
    if settings.logging.format_string.trim().is_empty() {
        errors.push("logging.format_string must not be empty".to_string());
    }

    validate_batch(settings, &mut errors);
    validate_progress(settings, &mut errors);

    if settings.logging.parallel.max_workers == 0 {
        errors.push("logging.parallel.max_workers must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::Validation(errors.join("; ")))
    }
}

fn validate_batch(settings: &AppSettings, errors: &mut Vec<String>) {
    let batch = &settings.logging.batch;

    if batch.min_size == 0 {
        errors.push("logging.batch.min_size must be at least 1".to_string());
    }
    if batch.min_size > batch.max_size {
        errors.push(format!(
            "logging.batch.min_size ({}) exceeds max_size ({})",
            batch.min_size, batch.max_size
        ));
    }
    if batch.initial_size < batch.min_size || batch.initial_size > batch.max_size {
        errors.push(format!(
            "logging.batch.initial_size ({}) outside [{}, {}]",
            batch.initial_size, batch.min_size, batch.max_size
        ));
    }
    if batch.check_interval == 0 {
        errors.push("logging.batch.check_interval must be at least 1 second".to_string());
    }
    for (name, value) in [
        ("high_load_threshold", batch.high_load_threshold),
        ("low_load_threshold", batch.low_load_threshold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            errors.push(format!("logging.batch.{name} ({value}) outside 0..=100"));
        }
    }
    if batch.low_load_threshold >= batch.high_load_threshold {
        errors.push(format!(
            "logging.batch.low_load_threshold ({}) must be below high_load_threshold ({})",
            batch.low_load_threshold, batch.high_load_threshold
        ));
    }
}

fn validate_progress(settings: &AppSettings, errors: &mut Vec<String>) {
    let progress = &settings.logging.progress;
    if !progress.themes.contains_key(&progress.theme) {
        errors.push(format!(
            "logging.progress.theme '{}' is not defined in logging.progress.themes",
            progress.theme
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(validate(&AppSettings::default()).is_ok());
    }

    #[test]
    fn test_batch_bounds_enforced() {
        let mut settings = AppSettings::default();
        settings.logging.batch.min_size = 500;
        settings.logging.batch.max_size = 100;
        settings.logging.batch.initial_size = 50;
        let err = validate(&settings).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("min_size"));
        assert!(message.contains("initial_size"));
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let mut settings = AppSettings::default();
        settings.logging.progress.theme = "plasma".to_string();
        let err = validate(&settings).unwrap_err();
        assert!(err.to_string().contains("plasma"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut settings = AppSettings::default();
        settings.app_name = "  ".to_string();
        settings.logging.parallel.max_workers = 0;
        let err = validate(&settings).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("app_name"));
        assert!(message.contains("max_workers"));
    }

    #[test]
    fn test_threshold_ordering() {
        let mut settings = AppSettings::default();
        settings.logging.batch.low_load_threshold = 90.0;
        settings.logging.batch.high_load_threshold = 50.0;
        assert!(validate(&settings).is_err());
    }
}
