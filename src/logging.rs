/// Run logging configuration.
///
/// Events always go to stderr. When a log directory is given they are also
/// appended to `tgstats.log` there, each run starting with a separator line.
use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "tgstats.log";

/// Installs the global subscriber for this run.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
/// Calling it again after a subscriber is installed is a no-op.
///
/// # Arguments
///
/// * `log_dir` - Directory for the log file, or `None` for stderr only
/// * `archive_label` - Archive being analyzed, written into the run separator
pub fn init_logging(log_dir: Option<&Path>, archive_label: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            write_run_separator(dir, archive_label);

            let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_target(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok(); // Ignore error if already initialized

    tracing::info!("Logging initialized for archive: {}", archive_label);

    Ok(())
}

fn write_run_separator(dir: &Path, archive_label: &str) {
    use std::io::Write;

    let separator = format!(
        "\n{sep}\n[{ts}] New run: {archive}\n{sep}\n",
        sep = "=".repeat(80),
        ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        archive = archive_label
    );

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
    {
        let _ = writeln!(file, "{}", separator);
    }
}
