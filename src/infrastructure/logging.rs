//! Logging system configuration and initialization.
//!
//! Console output by default, with optional daily-rolling file output. The
//! non-blocking file writer's guard is held for the process lifetime.

use anyhow::Result;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

pub use super::config::LoggingConfig;

// Keeps the non-blocking file writer alive until process exit.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Local-time formatter for log lines.
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Initialize the logging system from configuration.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    let file_layer = if config.file_output {
        let appender = rolling::daily(&config.log_dir, "bid_harvester.log");
        let (writer, guard) = non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_timer(LocalTimeFormatter)
                .with_ansi(false)
                .with_writer(writer),
        )
    } else {
        None
    };

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
