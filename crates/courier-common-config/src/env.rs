//! Environment variable handling.

use crate::types::ClientConfig;
use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required environment variable not set: {var}")]
    NotSet { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    /// Explicit config file, overriding `.courier/config.yaml`.
    pub const COURIER_CONFIG_PATH: &str = "COURIER_CONFIG_PATH";
    pub const COURIER_ENV: &str = "COURIER_ENV";
    pub const COURIER_BASE_URL: &str = "COURIER_BASE_URL";
    pub const COURIER_REQUEST_TIMEOUT_SECS: &str = "COURIER_REQUEST_TIMEOUT_SECS";
    pub const COURIER_CONNECT_TIMEOUT_SECS: &str = "COURIER_CONNECT_TIMEOUT_SECS";
    pub const COURIER_USER_AGENT: &str = "COURIER_USER_AGENT";
    pub const COURIER_REFERENCE_OFFSET: &str = "COURIER_REFERENCE_OFFSET";
    pub const COURIER_API_TOKEN: &str = "COURIER_API_TOKEN";
}

/// Typed access to process environment variables.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Load `.env`, `.env.local` and `.env.<COURIER_ENV>`, later files winning
    /// over earlier ones. Missing files are skipped.
    pub fn init() -> Result<Self, EnvError> {
        load_optional(".env")?;
        load_optional(".env.local")?;
        if let Ok(name) = env::var(vars::COURIER_ENV) {
            load_optional(&format!(".env.{name}"))?;
        }
        Ok(Self { _guard: () })
    }

    pub fn require(var: &str) -> Result<String, EnvError> {
        env::var(var).map_err(|_| EnvError::NotSet { var: var.to_string() })
    }

    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    pub fn get_or(var: &str, default: &str) -> String {
        env::var(var).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_bool(var: &str) -> Option<bool> {
        env::var(var)
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Parse a variable, `Ok(None)` when unset.
    pub fn get_parsed<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("cannot parse {v:?} as {}", std::any::type_name::<T>()),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Overwrite client settings with any `COURIER_*` variables that are set.
    pub fn apply_overrides(config: &mut ClientConfig) -> Result<(), EnvError> {
        if let Some(base_url) = Self::get(vars::COURIER_BASE_URL) {
            config.base_url = Some(base_url);
        }
        if let Some(secs) = Self::get_parsed(vars::COURIER_REQUEST_TIMEOUT_SECS)? {
            config.request_timeout_secs = secs;
        }
        if let Some(secs) = Self::get_parsed(vars::COURIER_CONNECT_TIMEOUT_SECS)? {
            config.connect_timeout_secs = secs;
        }
        if let Some(user_agent) = Self::get(vars::COURIER_USER_AGENT) {
            config.user_agent = user_agent;
        }
        if let Some(offset) = Self::get(vars::COURIER_REFERENCE_OFFSET) {
            config.reference_offset = offset;
        }
        if let Some(token) = Self::get(vars::COURIER_API_TOKEN) {
            config
                .default_headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        Ok(())
    }
}

fn load_optional(path: &str) -> Result<(), EnvError> {
    match dotenvy::from_filename(path) {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ENV_LOCK;

    #[test]
    fn test_get_or_default() {
        assert_eq!(Environment::get_or("COURIER_TEST_NONEXISTENT_12345", "default"), "default");
    }

    #[test]
    fn test_bool_parsing() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("COURIER_TEST_BOOL", "true");
        assert_eq!(Environment::get_bool("COURIER_TEST_BOOL"), Some(true));
        env::set_var("COURIER_TEST_BOOL", "yes");
        assert_eq!(Environment::get_bool("COURIER_TEST_BOOL"), Some(true));
        env::set_var("COURIER_TEST_BOOL", "off");
        assert_eq!(Environment::get_bool("COURIER_TEST_BOOL"), Some(false));
        env::remove_var("COURIER_TEST_BOOL");
        assert_eq!(Environment::get_bool("COURIER_TEST_BOOL"), None);
    }

    #[test]
    fn test_parsed_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("COURIER_TEST_INT", " 42 ");
        assert_eq!(Environment::get_parsed::<u64>("COURIER_TEST_INT").unwrap(), Some(42));

        env::set_var("COURIER_TEST_INT", "forty-two");
        assert!(matches!(
            Environment::get_parsed::<u64>("COURIER_TEST_INT"),
            Err(EnvError::InvalidValue { .. })
        ));

        env::remove_var("COURIER_TEST_INT");
        assert_eq!(Environment::get_parsed::<u64>("COURIER_TEST_INT").unwrap(), None);
    }

    #[test]
    fn test_require() {
        assert!(matches!(
            Environment::require("COURIER_TEST_REQUIRED_MISSING"),
            Err(EnvError::NotSet { .. })
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var(vars::COURIER_BASE_URL, "https://staging.example.com/");
        env::set_var(vars::COURIER_REQUEST_TIMEOUT_SECS, "5");
        env::set_var(vars::COURIER_REFERENCE_OFFSET, "+02:00");
        env::set_var(vars::COURIER_API_TOKEN, "t0k3n");

        let mut config = ClientConfig::default();
        let result = Environment::apply_overrides(&mut config);

        env::remove_var(vars::COURIER_BASE_URL);
        env::remove_var(vars::COURIER_REQUEST_TIMEOUT_SECS);
        env::remove_var(vars::COURIER_REFERENCE_OFFSET);
        env::remove_var(vars::COURIER_API_TOKEN);

        result.unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://staging.example.com/"));
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.reference_offset, "+02:00");
        assert_eq!(
            config.default_headers.get("Authorization").map(String::as_str),
            Some("Bearer t0k3n")
        );
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var(vars::COURIER_CONNECT_TIMEOUT_SECS, "soon");
        let mut config = ClientConfig::default();
        let result = Environment::apply_overrides(&mut config);
        env::remove_var(vars::COURIER_CONNECT_TIMEOUT_SECS);
        assert!(matches!(result, Err(EnvError::InvalidValue { var, .. }) if var == vars::COURIER_CONNECT_TIMEOUT_SECS));
    }

    #[test]
    fn test_environment_init_without_files() {
        assert!(Environment::init().is_ok());
    }

    #[test]
    fn test_dotenv_file_loading() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env.courier-test");
        std::fs::write(&env_path, "COURIER_TEST_DOTENV=from_dotenv\n").unwrap();

        env::remove_var("COURIER_TEST_DOTENV");
        load_optional(env_path.to_str().unwrap()).unwrap();
        assert_eq!(Environment::get("COURIER_TEST_DOTENV"), Some("from_dotenv".to_string()));
        env::remove_var("COURIER_TEST_DOTENV");

        assert!(load_optional(dir.path().join("absent").to_str().unwrap()).is_ok());
    }
}
