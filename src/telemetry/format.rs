//! Record formats for the file sinks.
//!
//! Two `FormatEvent` implementations: a template-driven plain-text line
//! for the rolling log, and one JSON object per line for the structured
//! log. Both prefer the `severity` field carried by facade emissions over
//! `tracing`'s narrower level set, so `SUCCESS` and `CRITICAL` survive
//! into the files.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Collects event fields: the message plus everything else as extras.
#[derive(Default)]
struct FieldCollector {
    message: String,
    extra: Map<String, Value>,
}

impl FieldCollector {
    /// Pull the facade's severity name out of the extras, if present.
    fn take_severity(&mut self) -> Option<String> {
        match self.extra.remove("severity") {
            Some(Value::String(name)) => Some(name),
            Some(other) => {
                self.extra.insert("severity".to_string(), other);
                None
            }
            None => None,
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.extra
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.extra.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.extra.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.extra.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.extra.insert(field.name().to_string(), value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.extra
                .insert(field.name().to_string(), Value::String(format!("{value:?}")));
        }
    }
}

/// Plain-text record format driven by the configured template.
///
/// Recognized placeholders: `{time}`, `{level}`, `{module}`, `{line}`,
/// `{process}`, `{thread}`, `{message}`.
pub struct PlainRecordFormat {
    template: String,
}

impl PlainRecordFormat {
    pub fn new(template: String) -> Self {
        Self { template }
    }
}

impl<S, N> FormatEvent<S, N> for PlainRecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let level = fields
            .take_severity()
            .unwrap_or_else(|| meta.level().to_string());

        let line = self
            .template
            .replace("{time}", &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
            .replace("{level}", &level)
            .replace("{module}", meta.module_path().unwrap_or_else(|| meta.target()))
            .replace(
                "{line}",
                &meta.line().map(|l| l.to_string()).unwrap_or_default(),
            )
            .replace("{process}", &std::process::id().to_string())
            .replace("{thread}", &thread_label())
            .replace("{message}", &fields.message);

        writeln!(writer, "{line}")
    }
}

/// One JSON object per line: timestamp, level, message, source location,
/// process and thread ids, and an extras map for structured fields.
pub struct JsonRecordFormat;

impl<S, N> FormatEvent<S, N> for JsonRecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let level = fields
            .take_severity()
            .unwrap_or_else(|| meta.level().to_string());

        let record = json!({
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "level": level,
            "message": fields.message,
            "module": meta.module_path().unwrap_or_else(|| meta.target()),
            "file": meta.file(),
            "line": meta.line(),
            "process": std::process::id(),
            "thread": thread_label(),
            "extra": Value::Object(fields.extra),
        });

        writeln!(writer, "{record}")
    }
}

fn thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_with<F: FnOnce()>(format: JsonRecordFormat, emit: F) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );
        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn test_json_record_carries_expected_fields() {
        let output = capture_with(JsonRecordFormat, || {
            tracing::info!(severity = "SUCCESS", attempt = 3_u64, "catalog refreshed");
        });

        let record: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["level"], "SUCCESS");
        assert_eq!(record["message"], "catalog refreshed");
        assert_eq!(record["extra"]["attempt"], 3);
        assert!(record["timestamp"].as_str().unwrap().contains('T'));
        assert!(record["line"].as_u64().is_some());
        assert!(record["process"].as_u64().is_some());
        assert!(record["module"].as_str().unwrap().contains("format"));
    }

    #[test]
    fn test_json_level_falls_back_without_severity() {
        let output = capture_with(JsonRecordFormat, || {
            tracing::warn!("plain event");
        });
        let record: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["extra"], json!({}));
    }

    #[test]
    fn test_plain_format_applies_template() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(PlainRecordFormat::new(
                    "{level} {message} [{module}:{line}]".to_string(),
                ))
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(severity = "CRITICAL", "disk full");
        });

        let line = buffer.contents();
        assert!(line.starts_with("CRITICAL disk full ["));
        assert!(line.contains("format"));
    }
}
