//! Tracing setup for the `mangel` TUI.
//!
//! Submissions, project creation and storage failures are logged so a
//! lost defect can be traced after the fact. The TUI draws on the
//! terminal, so records go to the journal (`journalctl -t mangel`) or to
//! daily `mangel.log.<date>` files under the data directory, never to
//! stdout or stderr.
//! `mangel-cli` sets up its own stderr subscriber instead.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, before the terminal is
/// switched to raw mode.
///
/// `MANGEL_LOG` takes an `EnvFilter` directive such as `debug` or
/// `mangel=debug,ureq=warn`; without it only `info` and above are kept.
/// `log_dir` is used when the journal is unavailable.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("MANGEL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer.with_syslog_identifier("mangel".to_string()))
                .init();

            tracing::info!("mangel {} logging to journald", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "mangel.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard would stop the writer and lose buffered lines
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(
        "mangel {} logging to daily files in {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(())
}

/// `$XDG_DATA_HOME/mangel/logs`, or `./mangel/logs` without a data dir
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mangel")
        .join("logs")
}
