//! Tracing subscriber setup.

use std::path::Path;

use anyhow::{Context, Result};
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Environment variable holding an `EnvFilter` directive; wins over `logging.level`.
pub const LOG_ENV: &str = "ROSTER_LOG";

/// Resolves the filter directive: `ROSTER_LOG`, then the configured level.
pub fn filter_directive(config: &LoggingConfig, env: Option<String>) -> String {
    env.filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Installs the global subscriber.
///
/// Logs go to stderr, or to `<home>/<logging.file>` when set. The returned
/// guard flushes the file writer and must be held until exit.
pub fn init(config: &LoggingConfig, home: &Path) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(config, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(file) = &config.file {
        let path = home.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .try_init()
            .context("Failed to install tracing subscriber")?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to install tracing subscriber")?;
        Ok(None)
    }
}
