use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "FLEETBOOT_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} endpoint cannot be empty")]
    EmptyEndpoint(&'static str),

    #[error("Invalid {0}: must be greater than 0")]
    InvalidInterval(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .fleetboot/config.yaml
    /// 3. .fleetboot/local.yaml (optional local overrides)
    /// 4. Environment variables (FLEETBOOT_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".fleetboot/config.yaml"))
            .merge(Yaml::file(".fleetboot/local.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment variables still override it
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (name, endpoint) in [
            ("store", &config.store.endpoint),
            ("scheduler", &config.scheduler.endpoint),
            ("peers", &config.peers.endpoint),
        ] {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::EmptyEndpoint(name));
            }
        }

        for (name, key) in [
            ("store.membership_prefix", &config.store.membership_prefix),
            ("store.deployed_key", &config.store.deployed_key),
            ("store.role_key", &config.store.role_key),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{name} cannot be empty")));
            }
        }

        for (name, value) in [
            ("polling.metadata_interval_ms", config.polling.metadata_interval_ms),
            ("polling.submit_interval_ms", config.polling.submit_interval_ms),
            ("polling.convergence_interval_ms", config.polling.convergence_interval_ms),
            ("store.timeout_secs", config.store.timeout_secs),
            ("scheduler.timeout_secs", config.scheduler.timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidInterval(name));
            }
        }

        if config.polling.max_attempts == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "polling.max_attempts must be at least 1 when set".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.machine_count, 0);
        assert_eq!(config.store.endpoint, "http://127.0.0.1:4001");
        assert_eq!(config.store.deployed_key, "/fleetboot/deployed");
        assert_eq!(config.scheduler.api_prefix, "v1-alpha");
        assert_eq!(config.polling.metadata_interval_ms, 500);
        assert!(config.polling.max_attempts.is_none());
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
machine_count: 3
store:
  endpoint: http://10.1.42.1:4001
  role_key: role
polling:
  convergence_interval_ms: 250
  max_attempts: 40
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.machine_count, 3);
        assert_eq!(config.store.endpoint, "http://10.1.42.1:4001");
        assert_eq!(config.store.role_key, "role");
        assert_eq!(config.store.membership_prefix, "/_coreos.com/fleet/machines");
        assert_eq!(config.polling.convergence_interval_ms, 250);
        assert_eq!(config.polling.max_attempts, Some(40));
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_empty_endpoint() {
        let mut config = Config::default();
        config.scheduler.endpoint = "  ".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyEndpoint("scheduler")
        ));
    }

    #[test]
    fn test_validate_empty_deployed_key() {
        let mut config = Config::default();
        config.store.deployed_key = String::new();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("deployed_key")),
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.polling.convergence_interval_ms = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidInterval("polling.convergence_interval_ms")
        ));
    }

    #[test]
    fn test_validate_zero_max_attempts() {
        let mut config = Config::default();
        config.polling.max_attempts = Some(0);

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            _ => panic!("Expected InvalidLogLevel error"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            _ => panic!("Expected InvalidLogFormat error"),
        }
    }

    #[test]
    fn test_validate_zero_max_retries() {
        let mut config = Config::default();
        config.retry.max_retries = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxRetries(0)
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(30000, 10000)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config("machine_count: 5\nscheduler:\n  endpoint: http://fleet:8080\n");

        let config = temp_env::with_vars_unset(
            ["FLEETBOOT_MACHINE_COUNT", "FLEETBOOT_SCHEDULER__ENDPOINT"],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.machine_count, 5);
        assert_eq!(config.scheduler.endpoint, "http://fleet:8080");
        assert_eq!(config.scheduler.api_prefix, "v1-alpha");
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ConfigLoader::load_from_file("/nonexistent/fleetboot.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let file = write_config("logging:\n  level: loud\n");
        let result = temp_env::with_var_unset("FLEETBOOT_LOGGING__LEVEL", || {
            ConfigLoader::load_from_file(file.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("machine_count: 2\nstore:\n  endpoint: http://from-file:4001\n");

        let config = temp_env::with_vars(
            [
                ("FLEETBOOT_MACHINE_COUNT", Some("7")),
                ("FLEETBOOT_STORE__ENDPOINT", Some("http://from-env:4001")),
                ("FLEETBOOT_LOGGING__LEVEL", Some("debug")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.machine_count, 7);
        assert_eq!(config.store.endpoint, "http://from-env:4001");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.store.role_key, "kubernetes_role");
    }

    #[test]
    fn test_hierarchical_merging() {
        let base_file = write_config("machine_count: 5\nlogging:\n  level: info\n  format: json\n");
        let override_file = write_config("machine_count: 15\nlogging:\n  level: debug\n");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.machine_count, 15, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
