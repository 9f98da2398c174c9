//! Configuration file loading and parsing.

use crate::env::vars;
use crate::types::CourierConfig;
use courier_common_core::timestamp::parse_offset;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Directory holding the config file, relative to the project root.
pub const CONFIG_DIR: &str = ".courier";
/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            message: message.into(),
        }
    }
}

/// Loads and saves `.courier/config.yaml` under a project directory, or an
/// explicitly named file.
pub struct ConfigLoader {
    base_path: PathBuf,
    file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
            file: None,
        }
    }

    /// Like [`ConfigLoader::new`], but `COURIER_CONFIG_PATH`, when set, names
    /// the config file instead.
    pub fn from_env(project_dir: impl AsRef<Path>) -> Self {
        let loader = Self::new(project_dir);
        match std::env::var(vars::COURIER_CONFIG_PATH) {
            Ok(path) if !path.trim().is_empty() => loader.with_file(path.trim()),
            _ => loader,
        }
    }

    /// Use `path` instead of `.courier/config.yaml`. The file must exist on load.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Full path of the config file.
    pub fn config_path(&self) -> PathBuf {
        match &self.file {
            Some(file) => file.clone(),
            None => self.base_path.join(CONFIG_DIR).join(CONFIG_FILE),
        }
    }

    /// Load the configuration. Without an explicit file, a missing
    /// `.courier/config.yaml` yields the defaults.
    pub fn load(&self) -> Result<CourierConfig, ConfigError> {
        let config_path = self.config_path();
        if self.file.is_none() && !config_path.exists() {
            return Ok(CourierConfig::default());
        }
        let contents = std::fs::read_to_string(&config_path)?;
        self.load_str(&contents)
    }

    /// Parse configuration text, expanding environment variables first.
    pub fn load_str(&self, contents: &str) -> Result<CourierConfig, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: CourierConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        validate(&config)?;
        Ok(config)
    }

    /// Write the configuration, creating the parent directory if needed.
    pub fn save(&self, config: &CourierConfig) -> Result<(), ConfigError> {
        validate(config)?;
        let config_path = self.config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(&config_path, yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env var pattern is valid")
    })
}

/// Expand `${VAR}` and `${VAR:-default}` references.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = env_var_pattern().replace_all(content, |cap: &Captures<'_>| {
        let name = &cap[1];
        match (std::env::var(name), cap.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(expanded.into_owned()),
    }
}

/// Check values that deserialize fine but cannot be used.
pub fn validate(config: &CourierConfig) -> Result<(), ConfigError> {
    let client = &config.client;

    if client.request_timeout_secs == 0 {
        return Err(ConfigError::invalid("client.request_timeout_secs must be greater than 0"));
    }
    if client.connect_timeout_secs == 0 {
        return Err(ConfigError::invalid("client.connect_timeout_secs must be greater than 0"));
    }
    if let Some(base_url) = &client.base_url {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ConfigError::invalid(format!("client.base_url {base_url:?}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::invalid(format!(
                "client.base_url {base_url:?} cannot be used as a base"
            )));
        }
    }
    parse_offset(&client.reference_offset)
        .map_err(|e| ConfigError::invalid(format!("client.reference_offset: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, contents: &str) {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(CONFIG_FILE), contents).unwrap();
    }

    #[test]
    fn test_load_defaults_when_no_file() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(config, CourierConfig::default());
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
client:
  base_url: https://api.example.com/v2/
  request_timeout_secs: 15
  gzip: false
  reference_offset: "-05:00"
"#,
        );

        let config = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(config.client.base_url.as_deref(), Some("https://api.example.com/v2/"));
        assert_eq!(config.client.request_timeout_secs, 15);
        assert!(!config.client.gzip);
        assert_eq!(config.client.reference_offset, "-05:00");
        assert_eq!(config.client.connect_timeout_secs, 10);
    }

    #[test]
    fn test_env_var_expansion() {
        let _lock = crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("COURIER_TEST_HOST", "api.internal");
        let result = expand_env_vars("base_url: https://${COURIER_TEST_HOST}/").unwrap();
        assert_eq!(result, "base_url: https://api.internal/");
        std::env::remove_var("COURIER_TEST_HOST");
    }

    #[test]
    fn test_env_var_default() {
        let result = expand_env_vars("key: ${COURIER_TEST_NONEXISTENT:-fallback}").unwrap();
        assert_eq!(result, "key: fallback");
    }

    #[test]
    fn test_env_var_missing_error() {
        match expand_env_vars("key: ${COURIER_TEST_MISSING}") {
            Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "COURIER_TEST_MISSING"),
            other => panic!("expected EnvVarNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_env_vars_in_single_value() {
        let _lock = crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("COURIER_TEST_PREFIX", "courier");
        std::env::set_var("COURIER_TEST_SUFFIX", "bot");
        let result = expand_env_vars("user_agent: ${COURIER_TEST_PREFIX}-${COURIER_TEST_SUFFIX}").unwrap();
        assert_eq!(result, "user_agent: courier-bot");
        std::env::remove_var("COURIER_TEST_PREFIX");
        std::env::remove_var("COURIER_TEST_SUFFIX");
    }

    #[test]
    fn test_env_var_expansion_in_config() {
        let _lock = crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("COURIER_TEST_TIMEOUT", "42");
        let config = ConfigLoader::new(".")
            .load_str(
                r#"
client:
  request_timeout_secs: ${COURIER_TEST_TIMEOUT}
  user_agent: ${COURIER_TEST_AGENT:-courier-tests}
"#,
            )
            .unwrap();
        assert_eq!(config.client.request_timeout_secs, 42);
        assert_eq!(config.client.user_agent, "courier-tests");
        std::env::remove_var("COURIER_TEST_TIMEOUT");
    }

    #[test]
    fn test_validation_errors() {
        let expect_invalid = |config: CourierConfig, needle: &str| match validate(&config) {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains(needle), "{message}")
            }
            other => panic!("expected ValidationError, got {other:?}"),
        };

        let mut config = CourierConfig::default();
        config.client.request_timeout_secs = 0;
        expect_invalid(config, "request_timeout_secs");

        let mut config = CourierConfig::default();
        config.client.connect_timeout_secs = 0;
        expect_invalid(config, "connect_timeout_secs");

        let mut config = CourierConfig::default();
        config.client.base_url = Some("api.example.com".to_string());
        expect_invalid(config, "base_url");

        let mut config = CourierConfig::default();
        config.client.base_url = Some("mailto:ops@example.com".to_string());
        expect_invalid(config, "base_url");

        let mut config = CourierConfig::default();
        config.client.reference_offset = "+25:00".to_string();
        expect_invalid(config, "reference_offset");
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("staging.yaml");
        fs::write(&path, "client:\n  user_agent: staging-sync\n").unwrap();

        let loader = ConfigLoader::new("/nonexistent-project").with_file(&path);
        assert_eq!(loader.config_path(), path);
        assert_eq!(loader.load().unwrap().client.user_agent, "staging-sync");

        let missing = ConfigLoader::new(dir.path()).with_file(dir.path().join("absent.yaml"));
        assert!(matches!(missing.load(), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_config_path_from_env() {
        let _lock = crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.yaml");

        std::env::set_var(vars::COURIER_CONFIG_PATH, &path);
        let overridden = ConfigLoader::from_env(dir.path()).config_path();
        std::env::remove_var(vars::COURIER_CONFIG_PATH);
        let default = ConfigLoader::from_env(dir.path()).config_path();

        assert_eq!(overridden, path);
        assert_eq!(default, dir.path().join(CONFIG_DIR).join(CONFIG_FILE));
    }

    #[test]
    fn test_parse_error_with_line_number() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
client:
  base_url: https://api.example.com/
  default_headers: [unclosed
"#,
        );

        match ConfigLoader::new(dir.path()).load() {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_save_config() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());

        let mut config = CourierConfig::default();
        config.client.base_url = Some("https://api.example.com/".to_string());
        config.client.default_headers.insert("X-Tenant".into(), "acme".into());
        loader.save(&config).unwrap();

        assert!(loader.config_path().exists());
        assert_eq!(loader.load().unwrap(), config);
    }
}
