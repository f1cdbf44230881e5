use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    // Ensure logs directory exists
    if fs::create_dir_all(log_dir).is_err() {
        init_console_only();
        return None;
    }

    // Create a non-blocking file appender for daily log rotation
    let file_appender = tracing_appender::rolling::daily(log_dir, "delivery_merge.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Create a JSON layer for file logging
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Console output goes to stderr so the report on stdout stays clean
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    Some(guard)
}

fn init_console_only() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Respect RUST_LOG if set; otherwise info for our crate, warn elsewhere.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("delivery_merge=info,warn"))
}
