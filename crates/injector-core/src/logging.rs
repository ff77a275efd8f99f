//! Log setup: a plugin log file, optionally mirrored to stderr

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber writing to `log_file`
///
/// The file is truncated first, so it only ever holds the latest run.
/// `RUST_LOG` overrides `default_level`. Keep the returned guard alive for
/// as long as logging is needed; dropping it flushes the writer.
pub fn init(log_file: &Path, default_level: &str, with_stderr: bool) -> Result<WorkerGuard> {
    File::create(log_file).map_err(|source| Error::FileWrite {
        path: log_file.to_path_buf(),
        source,
    })?;

    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .ok_or_else(|| Error::Logging(format!("not a file path: {}", log_file.display())))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stderr_layer = with_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!("log file: {}", log_file.display());
    Ok(guard)
}
