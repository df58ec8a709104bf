use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how verbosely to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Directory for log files (e.g., "logs")
    pub dir: Utf8PathBuf,
    /// Prefix for the daily files (e.g., "slp2mp4-gui")
    pub prefix: String,
    /// Use debug level instead of info
    pub debug: bool,
    /// Also log to the console
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("logs"),
            prefix: crate::APP_NAME.to_string(),
            debug: cfg!(debug_assertions),
            console: true,
        }
    }
}

impl LogSettings {
    fn level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

/// Setup logging with a daily rotating file and optional console output.
///
/// `RUST_LOG`, when set, takes precedence over the level chosen by
/// `settings.debug`.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn init(settings: &LogSettings) -> Result<WorkerGuard> {
    ensure_log_dir(settings)?;

    let file_appender = rolling::daily(&settings.dir, &settings.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level()));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        settings.dir,
        settings.prefix,
        settings.debug,
        settings.console
    );

    Ok(guard)
}

fn ensure_log_dir(settings: &LogSettings) -> Result<()> {
    if !settings.dir.exists() {
        fs::create_dir_all(&settings.dir)
            .with_context(|| format!("Failed to create log directory: {}", settings.dir))?;
    }
    Ok(())
}
