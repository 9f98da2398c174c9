//! Logging setup for Courier clients.
//!
//! Library code only emits `tracing` events; applications call [`init`] once
//! to install a subscriber.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Distributed tracing utilities.
pub mod spans;

/// Convenience macros re-exported from tracing.
pub use tracing::{debug, error, info, trace, warn};

const ENV_LEVEL: &str = "COURIER_LOG_LEVEL";
const ENV_FORMAT: &str = "COURIER_LOG_FORMAT";
const ENV_FILE: &str = "COURIER_LOG_FILE";
const ENV_SOURCE: &str = "COURIER_LOG_SOURCE";
const ENV_SPANS: &str = "COURIER_LOG_SPANS";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level, used when `RUST_LOG` holds no filter directives.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Also append to this file when set.
    pub file_path: Option<PathBuf>,
    /// Include source file and line.
    pub source_location: bool,
    /// Emit span open/close events.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Structured JSON, one object per line.
    Json,
}

impl LogFormat {
    /// Parse from string; anything unrecognized reads as [`LogFormat::Pretty`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file_path: None,
            source_location: false,
            span_events: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
}

impl LogConfig {
    /// Read `COURIER_LOG_*` variables, falling back to `RUST_LOG` for the level.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var(ENV_LEVEL).or_else(|_| std::env::var("RUST_LOG"));
        if let Some(level) = level.ok().as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }
        if let Ok(format) = std::env::var(ENV_FORMAT) {
            config.format = LogFormat::parse(&format);
        }
        if let Ok(file_path) = std::env::var(ENV_FILE) {
            config.file_path = Some(PathBuf::from(file_path));
        }
        if let Some(source) = env_flag(ENV_SOURCE) {
            config.source_location = source;
        }
        if let Some(spans) = env_flag(ENV_SPANS) {
            config.span_events = spans;
        }

        config
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn layer<S, W>(&self, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_span_events(self.span_events());

        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
        }
    }
}

fn open_log_file(path: &Path) -> Result<File, LogError> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(LogError::FileError)
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already set.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let file_layer = match &config.file_path {
        Some(path) => Some(config.layer(Arc::new(open_log_file(path)?), false)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(config.layer(io::stderr, true))
        .with(file_layer)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}
