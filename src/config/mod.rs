use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub directory: DirectoryConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let path = env::var("INVIGILATION_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("directory.json"));

        let default_quota = match env::var("INVIGILATION_DEFAULT_QUOTA") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidQuota { value: raw })?,
            ),
            _ => None,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            directory: DirectoryConfig {
                path,
                default_quota,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where the teacher/session directory snapshot comes from.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub path: PathBuf,
    /// Applied to teachers whose record carries no quota; `None` leaves them unbounded.
    pub default_quota: Option<u32>,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidQuota { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidQuota { value } => write!(
                f,
                "INVIGILATION_DEFAULT_QUOTA must be a non-negative integer (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("INVIGILATION_DIRECTORY");
        env::remove_var("INVIGILATION_DEFAULT_QUOTA");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.directory.path, PathBuf::from("directory.json"));
        assert_eq!(config.directory.default_quota, None);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_directory_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "ci");
        env::set_var("INVIGILATION_DIRECTORY", "/srv/exams/june.json");
        env::set_var("INVIGILATION_DEFAULT_QUOTA", " 4 ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.directory.path, PathBuf::from("/srv/exams/june.json"));
        assert_eq!(config.directory.default_quota, Some(4));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_quota() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INVIGILATION_DEFAULT_QUOTA", "three");
        match AppConfig::load() {
            Err(ConfigError::InvalidQuota { value }) => assert_eq!(value, "three"),
            other => panic!("expected invalid quota, got {other:?}"),
        }
        reset_env();
    }
}
