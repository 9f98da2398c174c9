//! Configuration types.

use courier_common_core::timestamp::{parse_offset, TimestampParser};
use courier_common_log::{LogConfig, LogFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration, as stored in `.courier/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// HTTP client settings.
    pub client: ClientConfig,
    /// Logging settings.
    pub log: LogSettings,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative request paths are joined onto.
    pub base_url: Option<String>,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Accept gzip-compressed responses.
    pub gzip: bool,
    pub pool_max_idle_per_host: usize,
    /// Headers sent with every request.
    pub default_headers: BTreeMap<String, String>,
    /// Zone assumed for timestamps that carry none, e.g. `UTC` or `+03:00`.
    pub reference_offset: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            user_agent: format!("courier/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            pool_max_idle_per_host: 10,
            default_headers: BTreeMap::new(),
            reference_offset: "UTC".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Timestamp parser anchored at [`ClientConfig::reference_offset`].
    pub fn timestamp_parser(&self) -> courier_common_core::Result<TimestampParser> {
        parse_offset(&self.reference_offset).map(TimestampParser::with_reference_offset)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LogSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: LogLevel::parse(&self.level).unwrap_or_default(),
            format: LogFormat::parse(&self.format),
            file_path: self.file.clone(),
            ..LogConfig::default()
        }
    }
}
