//! Logging with file output and size-based rotation.
//!
//! Writes `parsecast.log` into the data directory, rotating at 10 MB. `DEBUG_LOGGING=1` or `--dev` turns on debug output for
//! parsecast crates. `RUST_LOG` overrides both.

use std::path::Path;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEBUG_DIRECTIVE: &str = "info,parsecast=debug,parsecast_core=debug";

fn filter(debug_logging: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_logging { DEBUG_DIRECTIVE } else { "info" })
    })
}

/// Initialize logging to the log file and stdout.
///
/// The returned guard must live as long as the process or buffered file
/// output is lost. Returns `None` when only stdout could be set up.
pub fn init(dev: bool, log_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = dev || std::env::var("DEBUG_LOGGING").is_ok();

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        // subscriber not installed yet
        eprintln!("Failed to create log directory {log_dir:?}: {e}, using stdout only");
        init_stdout_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("parsecast.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {log_path:?}: {e}");
            init_stdout_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "Logging initialized");

    Some(guard)
}

fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(debug_logging, "Logging initialized (stdout only)");
}
