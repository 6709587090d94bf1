//! Logging bootstrap
//!
//! Structured JSON lines through `tracing`: always to stdout, and to a
//! size-rotated file when `LOG_FILE` is set. Targets in use: `http`, `auth`,
//! `storage`, `security`, `config`, `lifecycle`.

use crate::config::LogConfig;
use flexi_logger::writers::{ArcFileLogWriter, FileLogWriter, FileLogWriterHandle};
use flexi_logger::{Cleanup, Criterion, FileSpec, FlexiLoggerError, Naming};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    /// `LOG_LEVEL` is not a valid filter directive
    #[error("invalid log level `{level}`: {reason}")]
    InvalidLevel {
        /// Raw directive
        level: String,
        /// Parser message
        reason: String,
    },

    /// Log file could not be opened
    #[error("cannot open log file: {0}")]
    File(#[from] FlexiLoggerError),

    /// A global subscriber is already installed
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the rotating file open; flushes it on drop
#[must_use = "dropping the guard closes the log file"]
#[derive(Default)]
pub struct LogGuard {
    file: Option<FileLogWriterHandle>,
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("file", &self.file.is_some())
            .finish()
    }
}

/// Open the rotating log file described by `config`
///
/// # Errors
/// When the path is invalid or the file cannot be created.
pub fn rotating_writer(
    path: &str,
    config: &LogConfig,
) -> Result<(ArcFileLogWriter, FileLogWriterHandle), FlexiLoggerError> {
    FileLogWriter::builder(FileSpec::try_from(path)?)
        .rotate(
            Criterion::Size(config.max_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.backup_count),
        )
        .append()
        .try_build_with_handle()
}

/// JSON layer writing into a rotating file
pub fn file_layer<S>(writer: ArcFileLogWriter) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(move || writer.clone())
}

/// Install the global subscriber
///
/// # Errors
/// Invalid level, unopenable file, or a subscriber already installed.
pub fn init(config: &LogConfig) -> Result<LogGuard, LoggingError> {
    let filter = EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidLevel {
        level: config.level.clone(),
        reason: e.to_string(),
    })?;

    let (file, guard) = match config.file.as_deref() {
        Some(path) => {
            let (writer, handle) = rotating_writer(path, config)?;
            (
                Some(file_layer(writer)),
                LogGuard { file: Some(handle) },
            )
        }
        None => (None, LogGuard::default()),
    };

    Registry::default()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stdout))
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        target: "config",
        level = %config.level,
        file = config.file.as_deref().unwrap_or("-"),
        max_size = config.max_size,
        backups = config.backup_count,
        "logging initialized"
    );
    Ok(guard)
}
