use crate::config::TelemetryConfig;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Appended to inside the configured log directory.
pub const LOG_FILE_NAME: &str = "asycuda-export.log";

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    LogFile { path: PathBuf, source: std::io::Error },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log filter '{}' in APP_LOG_LEVEL", value)
            }
            TelemetryError::LogFile { path, source } => {
                write!(f, "cannot open log file {}: {source}", path.display())
            }
            TelemetryError::Subscriber(err) => write!(f, "could not install log subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::LogFile { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
        value: config.log_level.clone(),
        source,
    })
}

/// Opens [`LOG_FILE_NAME`] in `dir` for appending, creating the directory first.
pub fn open_log_file(dir: &Path) -> Result<File, TelemetryError> {
    let path = dir.join(LOG_FILE_NAME);
    std::fs::create_dir_all(dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
        .map_err(|source| TelemetryError::LogFile { path, source })
}

/// Compact console output, plus a full-format file copy when `log_dir` is set.
pub fn subscriber(
    config: &TelemetryConfig,
) -> Result<impl Subscriber + Send + Sync + 'static, TelemetryError> {
    let file_layer = match &config.log_dir {
        Some(dir) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(dir)?)),
        ),
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .with_ansi(false),
        )
        .with(file_layer))
}

/// Installs the global log subscriber. Fails if one is already set.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    subscriber(config)?
        .try_init()
        .map_err(|err| TelemetryError::Subscriber(Box::new(err)))
}
