use std::{path::Path, sync::Mutex};

use anyhow::{Context, Result};

// Global guard to keep the file appender alive
static FILE_APPENDER_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);

/// Flush and close the log file appender, if one was installed.
pub fn flush_logs() {
    // Taking the guard will drop it, which flushes pending logs
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock()
        && let Some(guard) = guard_holder.take()
    {
        drop(guard);
    }
}

// RUST_LOG wins over the level picked from -v.
fn filter_or(default: &str) -> Result<tracing_subscriber::EnvFilter> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());
    tracing_subscriber::EnvFilter::try_new(filter).context("invalid RUST_LOG / filter")
}

fn base_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing on stderr, leaving stdout to check results.
/// RUST_LOG (if set) takes precedence. Otherwise, -v/-vv map to "debug"/"trace".
///
/// # Errors
/// Returns an error if the filter is invalid.
pub fn init_tracing(verbosity: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*};

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter_layer = filter_or(base_filter(verbosity))?;

    // Allow re-init to be a no-op in tests
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();

    Ok(())
}

/// Initialize tracing on stderr plus a daily `smoke.log` file in `log_dir`.
/// The file always records at least `info`; stderr keeps the -v level.
///
/// # Errors
/// Returns an error if the filter is invalid or `log_dir` cannot be created.
pub fn init_tracing_with_file(log_dir: &Path, verbosity: u8) -> Result<()> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*};

    let file_filter = filter_or(match verbosity {
        0 => "info",
        v => base_filter(v),
    })?;
    let console_filter = filter_or(base_filter(verbosity))?;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;
    let file_appender = rolling::daily(log_dir, "smoke.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard globally to keep it alive for the program duration
    if let Ok(mut guard_holder) = FILE_APPENDER_GUARD.lock() {
        *guard_holder = Some(guard);
    }

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(non_blocking)
        .with_filter(file_filter);
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    Ok(())
}
