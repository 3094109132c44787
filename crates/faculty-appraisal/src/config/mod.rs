use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::appraisal::{AppraisalPolicy, ScoreParsing, ScoringPolicy, SubmissionPolicy};

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
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub appraisal: AppraisalConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let cors_origins = parse_cors_origins(
            &env::var("APP_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        )?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                cors_origins,
            },
            telemetry: TelemetryConfig { log_level },
            appraisal: AppraisalConfig::from_env()?,
        })
    }
}

/// Dev servers of the browser dashboard.
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Submission and scoring rules enforced server-side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppraisalConfig {
    /// Overall completion percentage required before a submission is accepted.
    pub minimum_completion: f64,
    pub score_parsing: ScoreParsing,
    pub enforce_score_bounds: bool,
}

impl Default for AppraisalConfig {
    fn default() -> Self {
        Self {
            minimum_completion: 0.0,
            score_parsing: ScoreParsing::Strict,
            enforce_score_bounds: true,
        }
    }
}

impl AppraisalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let minimum_completion = match env::var("APP_MIN_COMPLETION") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidMinimumCompletion(raw.clone()))?;
                if !(0.0..=100.0).contains(&value) {
                    return Err(ConfigError::InvalidMinimumCompletion(raw));
                }
                value
            }
            Err(_) => defaults.minimum_completion,
        };

        let score_parsing = match env::var("APP_SCORE_PARSING") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "strict" => ScoreParsing::Strict,
                "lenient" | "legacy" => ScoreParsing::Lenient,
                _ => return Err(ConfigError::InvalidScoreParsing(raw)),
            },
            Err(_) => defaults.score_parsing,
        };

        let enforce_score_bounds = match env::var("APP_ENFORCE_SCORE_BOUNDS") {
            Ok(raw) => parse_flag("APP_ENFORCE_SCORE_BOUNDS", &raw)?,
            Err(_) => defaults.enforce_score_bounds,
        };

        Ok(Self {
            minimum_completion,
            score_parsing,
            enforce_score_bounds,
        })
    }

    pub fn policy(&self) -> AppraisalPolicy {
        AppraisalPolicy {
            submission: SubmissionPolicy::with_minimum_completion(self.minimum_completion),
            scoring: ScoringPolicy {
                parsing: self.score_parsing,
                enforce_bounds: self.enforce_score_bounds,
            },
        }
    }
}

fn parse_cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    for origin in &origins {
        let is_url = origin.starts_with("http://") || origin.starts_with("https://");
        if origin != "*" && (!is_url || axum::http::HeaderValue::from_str(origin).is_err()) {
            return Err(ConfigError::InvalidCorsOrigin(origin.clone()));
        }
    }
    Ok(origins)
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMinimumCompletion(String),
    InvalidScoreParsing(String),
    InvalidFlag { key: &'static str, value: String },
    InvalidCorsOrigin(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMinimumCompletion(value) => write!(
                f,
                "APP_MIN_COMPLETION must be a percentage between 0 and 100, got '{value}'"
            ),
            ConfigError::InvalidScoreParsing(value) => write!(
                f,
                "APP_SCORE_PARSING must be 'strict' or 'lenient', got '{value}'"
            ),
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false, got '{value}'")
            }
            ConfigError::InvalidCorsOrigin(value) => write!(
                f,
                "APP_CORS_ORIGINS entries must be '*' or an http(s) origin, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidMinimumCompletion(_)
            | ConfigError::InvalidScoreParsing(_)
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidCorsOrigin(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_MIN_COMPLETION",
            "APP_SCORE_PARSING",
            "APP_ENFORCE_SCORE_BOUNDS",
            "APP_CORS_ORIGINS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.server.cors_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
        assert_eq!(config.appraisal, AppraisalConfig::default());

        let policy = config.appraisal.policy();
        assert_eq!(policy.submission.minimum_completion, 0.0);
        assert_eq!(policy.scoring, ScoringPolicy::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3001));
        reset_env();
    }

    #[test]
    fn appraisal_rules_can_be_tightened_or_relaxed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_COMPLETION", "80");
        env::set_var("APP_SCORE_PARSING", "lenient");
        env::set_var("APP_ENFORCE_SCORE_BOUNDS", "off");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.appraisal.minimum_completion, 80.0);
        assert_eq!(
            config.appraisal.policy().scoring,
            ScoringPolicy::legacy()
        );
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_minimum_completion() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_COMPLETION", "150");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMinimumCompletion(_))
        ));

        env::set_var("APP_MIN_COMPLETION", "10");
        env::set_var("APP_ENFORCE_SCORE_BOUNDS", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { .. })
        ));
        reset_env();
    }

    #[test]
    fn cors_origins_are_split_and_validated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "APP_CORS_ORIGINS",
            " https://appraisal.college.edu , ,http://10.0.0.4:5173",
        );
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.server.cors_origins,
            vec!["https://appraisal.college.edu", "http://10.0.0.4:5173"]
        );

        env::set_var("APP_CORS_ORIGINS", "*");
        let config = AppConfig::load().expect("wildcard loads");
        assert_eq!(config.server.cors_origins, vec!["*"]);

        env::set_var("APP_CORS_ORIGINS", "appraisal.college.edu");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidCorsOrigin(origin)) if origin == "appraisal.college.edu"
        ));
        reset_env();
    }
}
