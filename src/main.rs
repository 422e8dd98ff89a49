//! Demo binary: load settings, bring up telemetry, exercise the surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use groundwork::config::{LogLevel, SettingsStore};
use groundwork::telemetry::TelemetryFacade;

#[derive(Parser)]
#[command(name = "groundwork", about = "Settings and telemetry foundation demo")]
struct Args {
    /// Path to the settings file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let store = SettingsStore::global();
    store.load(Some(&args.config))?;
    let settings = store.settings()?;

    let telemetry = TelemetryFacade::init(&settings.logging)?;

    tracing::info!(
        app = %settings.app_name,
        version = %settings.version,
        debug = settings.debug,
        "settings loaded"
    );
    tracing::info!(
        level = %settings.logging.level,
        log_dir = %settings.logging.log_dir.display(),
        "telemetry initialized"
    );

    // Batched path: flushes on its own once the adaptive target is hit.
    for i in 0..12 {
        telemetry.batch_log(LogLevel::Info, format!("batched record {i}"));
    }
    telemetry.flush();

    // Scoped progress over a short unit of work.
    {
        let span = telemetry.performance_span("demo_walk");
        let progress = telemetry.progress_scope(20, "walking");
        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(10));
            progress.update(1);
        }
        drop(progress);
        drop(span);
    }

    // Async entry points.
    telemetry.alog(LogLevel::Success, "demo walk finished").await;

    // Parallel path: chunk ordering is internal only.
    let bulk: Vec<_> = (0..30)
        .map(|i| (LogLevel::Debug, format!("bulk record {i}")))
        .collect();
    telemetry.parallel_log(bulk, 10);

    // Dotted-path reads resolve against the post-override tree.
    let workers = store.get_or("logging.parallel.max_workers", serde_json::json!(1));
    tracing::info!(%workers, "effective worker count");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = telemetry.stats();
    tracing::info!(
        total = stats.total_messages,
        errors = stats.error_count,
        rate = %format!("{:.1}/s", stats.messages_per_second),
        "telemetry statistics"
    );

    Ok(())
}
