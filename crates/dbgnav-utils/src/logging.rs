//! # Logging
//!
//! `tracing` subscriber setup for dbgnav front ends.
//!
//! Navigation results go to stdout, so console logs are written to stderr.
//! A log file can be added next to (or instead of) the console output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbgnav_utils::{init_logging, LoggingConfig};
//!
//! let _guard = init_logging(&LoggingConfig::from_env()).expect("Failed to initialize logging");
//! tracing::info!("snapshot loaded");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=dbgnav_core=debug`), overriding the level
//! - `DBGNAV_LOG_FORMAT`: `pretty` (default) or `json`
//! - `DBGNAV_LOG_FILE`: optional log file, written as named
//! - `DBGNAV_LOG_DIR`: optional directory for a dated log file, used when
//!   `DBGNAV_LOG_FILE` is unset

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "dev" => Ok(LogFormat::Pretty),
            "json" | "prod" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

impl TryFrom<String> for LogFormat
{
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error>
    {
        value.parse()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default; navigation failures that are recovered from)
    #[default]
    Warn,
    /// Info level
    Info,
    /// Debug level (symbol-service round trips)
    Debug,
    /// Trace level
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

impl TryFrom<String> for LogLevel
{
    type Error = String;

    fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error>
    {
        value.parse()
    }
}

/// Where and how log events are written
///
/// Built either from the environment with [`from_env`](Self::from_env) or
/// with the `with_*` methods, which later sources (a config file, command
/// line flags) use to override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Default level when no directives are given
    pub level: LogLevel,
    /// Output format for every sink
    pub format: LogFormat,
    /// `EnvFilter` directives; these win over `level`
    pub directives: Option<String>,
    /// Optional log file
    pub file: Option<PathBuf>,
    /// Whether events are also written to stderr
    pub console: bool,
}

impl Default for LoggingConfig
{
    fn default() -> Self
    {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            directives: None,
            file: None,
            console: true,
        }
    }
}

impl LoggingConfig
{
    /// Read `RUST_LOG`, `DBGNAV_LOG_FORMAT`, `DBGNAV_LOG_FILE` and `DBGNAV_LOG_DIR`.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Some(format) = env::var("DBGNAV_LOG_FORMAT").ok().and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        config.directives = env::var("RUST_LOG").ok().filter(|s| !s.trim().is_empty());
        config.file = env::var("DBGNAV_LOG_FILE")
            .ok()
            .map(PathBuf::from)
            .or_else(|| env::var("DBGNAV_LOG_DIR").ok().map(|dir| default_log_file(Path::new(&dir))));
        config
    }

    /// Set the default level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = level;
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self
    {
        self.format = format;
        self
    }

    /// Use explicit filter directives such as `dbgnav_core=trace,warn`.
    #[must_use]
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self
    {
        self.directives = Some(directives.into());
        self
    }

    /// Also write events to `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.file = Some(path.into());
        self
    }

    /// Also write events to today's [`default_log_file`] in `directory`.
    #[must_use]
    pub fn with_default_file(self, directory: impl AsRef<Path>) -> Self
    {
        self.with_file(default_log_file(directory.as_ref()))
    }

    /// Stop writing events to stderr. Only useful together with a file.
    #[must_use]
    pub fn without_console(mut self) -> Self
    {
        self.console = false;
        self
    }

    /// Build the event filter for one sink.
    ///
    /// ## Errors
    ///
    /// `LoggingError::InvalidFilter` if the directives do not parse.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError>
    {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(format!("{directives}: {e}")))
            }
            None => Ok(EnvFilter::new(Level::from(self.level).to_string())),
        }
    }
}

/// Keeps the background log-file writer alive
///
/// Dropping the guard flushes pending file output. Hold it for the lifetime
/// of the process.
#[derive(Debug)]
pub struct LoggingGuard
{
    file: Option<PathBuf>,
    _writer: Option<WorkerGuard>,
}

impl LoggingGuard
{
    /// The log file in use, if any.
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

/// A dated log file name inside `directory`, e.g. `2026-10-18-dbgnav.log`.
pub fn default_log_file(directory: &Path) -> PathBuf
{
    let today = Utc::now().format("%Y-%m-%d");
    directory.join(format!("{today}-dbgnav.log"))
}

/// Install the global subscriber described by `config`.
///
/// ## Example
///
/// ```rust,no_run
/// use dbgnav_utils::{init_logging, LogFormat, LogLevel, LoggingConfig};
///
/// let config = LoggingConfig::default()
///     .with_level(LogLevel::Debug)
///     .with_format(LogFormat::Json);
/// let _guard = init_logging(&config).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if:
/// - The filter directives are invalid
/// - The log file's directory cannot be created
/// - A global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console {
        layers.push(format_layer(config.format, io::stderr, true, config.filter()?));
    }

    let mut writer_guard = None;
    if let Some(path) = &config.file {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;
        std::fs::create_dir_all(&directory)?;

        // The path is used as given; dated names come from `default_log_file`.
        let appender = tracing_appender::rolling::never(&directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(config.format, writer, false, config.filter()?));
        writer_guard = Some(guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;

    Ok(LoggingGuard {
        file: config.file.clone(),
        _writer: writer_guard,
    })
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Filter directives did not parse
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// The log file path has no file name
    #[error("Invalid log file path: {0}")]
    InvalidFile(String),

    /// A subscriber was already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Log directory could not be created
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("TEXT").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(LogLevel::from_str("loud").is_err());
        assert_eq!(Level::from(LogLevel::default()), Level::WARN);
    }

    #[test]
    fn test_builder_overrides()
    {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_file("/tmp/dbgnav.log")
            .without_console();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file.as_deref(), Some(Path::new("/tmp/dbgnav.log")));
        assert!(!config.console);
    }

    #[test]
    fn test_filter_directives()
    {
        let config = LoggingConfig::default().with_directives("dbgnav_core=trace,warn");
        assert!(config.filter().is_ok());

        let config = LoggingConfig::default().with_directives("dbgnav_core=loud");
        assert!(matches!(config.filter(), Err(LoggingError::InvalidFilter(_))));
    }

    #[test]
    fn test_default_log_file_is_dated()
    {
        let path = default_log_file(Path::new("/var/log"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();

        assert!(path.starts_with("/var/log"));
        assert!(name.ends_with("-dbgnav.log"));
        assert_eq!(name.len(), "YYYY-MM-DD-dbgnav.log".len());

        let config = LoggingConfig::default().with_default_file("/var/log");
        assert_eq!(config.file, Some(path));
    }

    // The only test that installs the global subscriber.
    #[test]
    fn test_file_is_written_at_the_given_path()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("dbgnav.log");
        let config = LoggingConfig::default()
            .with_level(LogLevel::Info)
            .with_file(&path)
            .without_console();

        let guard = init_logging(&config).unwrap();
        assert_eq!(guard.file(), Some(path.as_path()));
        tracing::info!("snapshot loaded");
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("snapshot loaded"));
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
