use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::workflows::financing::DecisionPolicy;

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
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineSettings::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Evaluation thresholds and bureau timing, overridable per environment.
/// Defaults mirror `DecisionPolicy::default` so a bare deployment and the
/// library agree on the rule.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub minimum_credit_score: u16,
    pub max_payment_to_income: Decimal,
    pub down_payment_fraction: Decimal,
    pub bureau_latency: Duration,
    pub assessment_timeout: Duration,
}

impl EngineSettings {
    fn load() -> Result<Self, ConfigError> {
        let policy = DecisionPolicy::default();

        Ok(Self {
            minimum_credit_score: parse_env("APP_MIN_CREDIT_SCORE", policy.minimum_score)?,
            max_payment_to_income: parse_env(
                "APP_MAX_PAYMENT_TO_INCOME",
                policy.max_payment_to_income,
            )?,
            down_payment_fraction: parse_env(
                "APP_DOWN_PAYMENT_FRACTION",
                policy.down_payment_fraction,
            )?,
            bureau_latency: Duration::from_millis(parse_env("APP_BUREAU_LATENCY_MS", 1500u64)?),
            assessment_timeout: Duration::from_millis(parse_env(
                "APP_ASSESSMENT_TIMEOUT_MS",
                10_000u64,
            )?),
        })
    }

    pub fn decision_policy(&self) -> DecisionPolicy {
        DecisionPolicy {
            minimum_score: self.minimum_credit_score,
            max_payment_to_income: self.max_payment_to_income,
            down_payment_fraction: self.down_payment_fraction,
        }
    }
}

fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidEngineSetting { name }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidEngineSetting { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEngineSetting { name } => {
                write!(f, "{name} has an invalid value")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidEngineSetting { .. } => None,
        }
    }
}
