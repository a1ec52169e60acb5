// Runtime configuration: deployment environment, API endpoint, timeouts and limits

use std::time::Duration;
use thiserror::Error;

pub const PRODUCTION_API_URL: &str = "https://www.mpbarbosa.com/api";
pub const DEVELOPMENT_API_URL: &str = "http://localhost:3001/api";

pub const ENV_API_URL: &str = "MONITORA_VAGAS_API_URL";
pub const ENV_ENVIRONMENT: &str = "MONITORA_VAGAS_ENV";
pub const ENV_USE_PRODUCTION_API: &str = "MONITORA_VAGAS_USE_PRODUCTION_API";

// Guest count limits
pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 10;
pub const DEFAULT_GUESTS: u32 = 2;

// Stay length limits (nights)
pub const MIN_NIGHTS: i64 = 1;
pub const MAX_NIGHTS: i64 = 30;

// Weekend search limits
pub const MIN_WEEKENDS: u32 = 1;
pub const MAX_WEEKENDS: u32 = 12;
pub const DEFAULT_WEEKENDS: u32 = 8;

pub const RESULTS_PER_PAGE: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }

    // Local hosts talk to the mock API, anything else to the live one
    pub fn detect_from_host(host: &str) -> Self {
        match host {
            "localhost" | "127.0.0.1" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            Environment::Development => DEVELOPMENT_API_URL,
            Environment::Production | Environment::Test => PRODUCTION_API_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub default: Duration,
    pub search: Duration,
    pub weekend_search: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            search: Duration::from_secs(60),
            weekend_search: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub response_ttl: Duration,
    pub hotel_list_ttl: Duration,
    pub max_responses: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            response_ttl: Duration::from_secs(5 * 60),
            hotel_list_ttl: Duration::from_secs(24 * 60 * 60),
            max_responses: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub api_base_url: String,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub cache: CacheSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            api_base_url: environment.default_api_url().to_string(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl AppConfig {
    // Base URL precedence: explicit URL, then the production override, then the
    // environment default. The override also switches the environment itself.
    pub fn resolve(
        environment: Environment,
        explicit_url: Option<&str>,
        use_production_api: bool,
    ) -> Result<Self, ConfigError> {
        let environment = if use_production_api {
            Environment::Production
        } else {
            environment
        };

        let api_base_url = match explicit_url {
            Some(url) => normalize_base_url(url)?,
            None => environment.default_api_url().to_string(),
        };

        Ok(Self {
            environment,
            api_base_url,
            ..Self::default()
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match std::env::var(ENV_ENVIRONMENT) {
            Ok(value) => Environment::parse(&value)?,
            Err(_) => Environment::default(),
        };
        let explicit_url = std::env::var(ENV_API_URL).ok();
        let use_production_api = std::env::var(ENV_USE_PRODUCTION_API)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Self::resolve(environment, explicit_url.as_deref(), use_production_api)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn normalize_base_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("development", Environment::Development)]
    #[test_case("PROD", Environment::Production)]
    #[test_case(" test ", Environment::Test)]
    fn test_environment_parse(input: &str, expected: Environment) {
        assert_eq!(Environment::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_environment_parse_rejects_unknown() {
        assert!(matches!(
            Environment::parse("staging"),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_detect_from_host() {
        assert_eq!(
            Environment::detect_from_host("localhost"),
            Environment::Development
        );
        assert_eq!(
            Environment::detect_from_host("127.0.0.1"),
            Environment::Development
        );
        assert_eq!(
            Environment::detect_from_host("www.mpbarbosa.com"),
            Environment::Production
        );
    }

    #[test]
    fn test_production_override_wins_over_environment() {
        let config = AppConfig::resolve(Environment::Development, None, true).unwrap();
        assert_eq!(config.api_base_url, PRODUCTION_API_URL);
        assert!(config.is_production());
    }

    #[test]
    fn test_explicit_url_wins_and_is_normalized() {
        let config =
            AppConfig::resolve(Environment::Development, Some("http://api.local:8080/api/"), true)
                .unwrap();
        assert_eq!(config.api_base_url, "http://api.local:8080/api");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = AppConfig::resolve(Environment::Development, Some("ftp://nope"), false);
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, DEVELOPMENT_API_URL);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.timeouts.search, Duration::from_secs(60));
        assert_eq!(config.cache.max_responses, 100);
    }
}
