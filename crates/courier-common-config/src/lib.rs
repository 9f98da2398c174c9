//! Configuration for Courier clients.
//!
//! Settings live in `.courier/config.yaml`; `${VAR}` and `${VAR:-default}`
//! references are expanded from the environment before parsing.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

/// Load the project config and apply `COURIER_*` environment overrides.
///
/// `COURIER_CONFIG_PATH` replaces the project's `.courier/config.yaml`.
pub fn load_with_env(project_dir: impl AsRef<std::path::Path>) -> Result<CourierConfig, ConfigError> {
    let mut config = ConfigLoader::from_env(project_dir).load()?;
    Environment::apply_overrides(&mut config.client).map_err(|e| ConfigError::ValidationError {
        message: e.to_string(),
    })?;
    validate(&config)?;
    Ok(config)
}

// Environment variables are process-wide.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn project(yaml: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join(CONFIG_FILE), yaml).unwrap();
        dir
    }

    fn load_with(vars: &[(&str, &str)], dir: &Path) -> Result<CourierConfig, ConfigError> {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let result = load_with_env(dir);
        for (name, _) in vars {
            std::env::remove_var(name);
        }
        result
    }

    #[test]
    fn test_load_with_env_merges_overrides() {
        let dir = project("client:\n  base_url: https://api.example.com/\n  request_timeout_secs: 30\n  user_agent: inventory-sync\n");

        let config = load_with(&[(vars::COURIER_REQUEST_TIMEOUT_SECS, "5")], dir.path()).unwrap();

        assert_eq!(config.client.request_timeout_secs, 5);
        assert_eq!(config.client.base_url.as_deref(), Some("https://api.example.com/"));
        assert_eq!(config.client.user_agent, "inventory-sync");
    }

    #[test]
    fn test_load_with_env_rejects_bad_overrides() {
        let dir = project("client:\n  request_timeout_secs: 30\n");

        let zero = load_with(&[(vars::COURIER_REQUEST_TIMEOUT_SECS, "0")], dir.path());
        assert!(
            matches!(&zero, Err(ConfigError::ValidationError { message }) if message.contains("request_timeout_secs")),
            "{zero:?}"
        );

        let garbled = load_with(&[(vars::COURIER_REQUEST_TIMEOUT_SECS, "soon")], dir.path());
        assert!(matches!(garbled, Err(ConfigError::ValidationError { .. })), "{garbled:?}");
    }

    #[test]
    fn test_load_with_env_honours_config_path() {
        let dir = project("client:\n  user_agent: from-project\n");
        let other = tempfile::tempdir().unwrap();
        let file = other.path().join("courier.yaml");
        std::fs::write(&file, "client:\n  user_agent: from-override\n").unwrap();

        let config = load_with(&[(vars::COURIER_CONFIG_PATH, file.to_str().unwrap())], dir.path()).unwrap();
        assert_eq!(config.client.user_agent, "from-override");
    }

    #[test]
    fn test_default_config_serializes_sections() {
        let yaml = serde_yaml::to_string(&CourierConfig::default()).unwrap();
        assert!(yaml.contains("client:"));
        assert!(yaml.contains("log:"));
        assert!(yaml.contains("reference_offset: UTC"));
    }
}
