use logickids_core::generation::{DEFAULT_API_BASE, DEFAULT_MODEL};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Upper bound for `GENERATION_TIMEOUT_SECS`.
pub const MAX_TIMEOUT_SECS: u64 = 600;
/// Upper bound for `GENERATION_MAX_RETRIES`.
pub const MAX_RETRIES: u32 = 10;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Without a key the service still starts, but generation is disabled.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub generation_timeout: Duration,
    pub generation_max_retries: u32,
    pub generation_concurrency: usize,
    pub environment: String,
    pub public_base_url: String,
    pub log_level: Level,
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let gemini_api_base =
            std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let timeout_secs: u64 = parse_var("GENERATION_TIMEOUT_SECS", 30)?;
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::InvalidValue(
                "GENERATION_TIMEOUT_SECS".to_string(),
                format!("must be between 1 and {MAX_TIMEOUT_SECS}"),
            ));
        }
        let generation_max_retries: u32 = parse_var("GENERATION_MAX_RETRIES", 0)?;
        if generation_max_retries > MAX_RETRIES {
            return Err(ConfigError::InvalidValue(
                "GENERATION_MAX_RETRIES".to_string(),
                format!("must be at most {MAX_RETRIES}"),
            ));
        }
        let generation_concurrency: usize = parse_var("GENERATION_CONCURRENCY", 3)?;
        if generation_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "GENERATION_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_address));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            gemini_api_key,
            gemini_model,
            gemini_api_base,
            generation_timeout: Duration::from_secs(timeout_secs),
            generation_max_retries,
            generation_concurrency,
            environment,
            public_base_url,
            log_level,
        })
    }

    /// The longest one exercise type may take: every attempt plus the
    /// backoff between them, with a little slack.
    pub fn type_deadline(&self) -> Duration {
        let attempts = self.generation_max_retries.saturating_add(1);
        self.generation_timeout
            .saturating_mul(attempts)
            .saturating_add(Duration::from_secs(2u64.pow(attempts.min(8))))
    }

    /// Settings for tests and tools that do not read the environment.
    pub fn for_tests() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            generation_timeout: Duration::from_secs(30),
            generation_max_retries: 0,
            generation_concurrency: 3,
            environment: "test".to_string(),
            public_base_url: "http://127.0.0.1:5000".to_string(),
            log_level: Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("GEMINI_MODEL");
            env::remove_var("GEMINI_API_BASE");
            env::remove_var("GENERATION_TIMEOUT_SECS");
            env::remove_var("GENERATION_MAX_RETRIES");
            env::remove_var("GENERATION_CONCURRENCY");
            env::remove_var("APP_ENV");
            env::remove_var("PUBLIC_BASE_URL");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load without a key");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:5000");
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.gemini_api_base, DEFAULT_API_BASE);
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.generation_max_retries, 0);
        assert_eq!(config.generation_concurrency, 3);
        assert_eq!(config.environment, "development");
        assert_eq!(config.public_base_url, "http://0.0.0.0:5000");
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("GEMINI_API_KEY", "custom-gemini-key");
            env::set_var("GEMINI_MODEL", "gemini-1.5-flash");
            env::set_var("GEMINI_API_BASE", "http://localhost:9999/v1beta");
            env::set_var("GENERATION_TIMEOUT_SECS", "10");
            env::set_var("GENERATION_MAX_RETRIES", "2");
            env::set_var("GENERATION_CONCURRENCY", "1");
            env::set_var("APP_ENV", "production");
            env::set_var("PUBLIC_BASE_URL", "https://logickids.example/api");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.gemini_api_key, Some("custom-gemini-key".to_string()));
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.gemini_api_base, "http://localhost:9999/v1beta");
        assert_eq!(config.generation_timeout, Duration::from_secs(10));
        assert_eq!(config.generation_max_retries, 2);
        assert_eq!(config.generation_concurrency, 1);
        assert_eq!(config.environment, "production");
        assert_eq!(config.public_base_url, "https://logickids.example/api");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_blank_api_key_counts_as_missing() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "   ");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.gemini_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_config_invalid_numbers() {
        for (var, value) in [
            ("GENERATION_TIMEOUT_SECS", "soon"),
            ("GENERATION_TIMEOUT_SECS", "0"),
            ("GENERATION_TIMEOUT_SECS", "601"),
            ("GENERATION_TIMEOUT_SECS", "18446744073709551615"),
            ("GENERATION_MAX_RETRIES", "-1"),
            ("GENERATION_MAX_RETRIES", "11"),
            ("GENERATION_MAX_RETRIES", "4294967295"),
            ("GENERATION_CONCURRENCY", "0"),
        ] {
            clear_env_vars();
            unsafe {
                env::set_var(var, value);
            }

            let ConfigError::InvalidValue(name, _) = Config::from_env().unwrap_err();
            assert_eq!(name, var);
        }
        clear_env_vars();
    }

    #[test]
    fn test_type_deadline_covers_retries() {
        let mut config = Config::for_tests();
        assert_eq!(config.type_deadline(), Duration::from_secs(32));

        config.generation_max_retries = 2;
        assert_eq!(config.type_deadline(), Duration::from_secs(98));
    }

    #[test]
    fn test_type_deadline_saturates() {
        let mut config = Config::for_tests();
        config.generation_max_retries = u32::MAX;
        config.generation_timeout = Duration::from_secs(u64::MAX);
        assert_eq!(config.type_deadline(), Duration::MAX);
    }
}
