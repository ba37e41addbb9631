//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use booking_saga::SagaConfig;
use thiserror::Error;

/// Which collaborator implementations the orchestrator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollaboratorMode {
    /// Remote services reached over HTTP.
    #[default]
    Http,
    /// In-process services seeded with sample flights.
    InMemory,
}

impl FromStr for CollaboratorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "in-memory" | "in_memory" | "memory" => Ok(Self::InMemory),
            other => Err(other.to_string()),
        }
    }
}

/// A variable was set to a value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SEAT_SERVICE_URL`, `PAYMENT_SERVICE_URL`, `ALLOCATION_SERVICE_URL` —
///   collaborator base URLs (default: `http://localhost:8001` .. `8003`)
/// - `SAGA_STEPS` — comma-separated step types (default: `seat,payment,allocation`)
/// - `SERVICE_TIMEOUT_MS` — per-call timeout (default: `10000`)
/// - `SAGA_COMPENSATE_ON_TRANSPORT_FAILURE` — unwind on transport failures too
///   (default: `false`)
/// - `COLLABORATORS` — `http` or `in-memory` (default: `http`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub seat_service_url: String,
    pub payment_service_url: String,
    pub allocation_service_url: String,
    pub steps: Vec<String>,
    pub service_timeout: Duration,
    pub compensate_on_transport_failure: bool,
    pub collaborators: CollaboratorMode,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        let steps = match lookup("SAGA_STEPS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.steps,
        };

        Ok(Self {
            host: text("HOST", defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            log_level: text("RUST_LOG", defaults.log_level),
            seat_service_url: text("SEAT_SERVICE_URL", defaults.seat_service_url),
            payment_service_url: text("PAYMENT_SERVICE_URL", defaults.payment_service_url),
            allocation_service_url: text("ALLOCATION_SERVICE_URL", defaults.allocation_service_url),
            steps,
            service_timeout: Duration::from_millis(parse(
                &lookup,
                "SERVICE_TIMEOUT_MS",
                defaults.service_timeout.as_millis() as u64,
            )?),
            compensate_on_transport_failure: parse(
                &lookup,
                "SAGA_COMPENSATE_ON_TRANSPORT_FAILURE",
                defaults.compensate_on_transport_failure,
            )?,
            collaborators: parse(&lookup, "COLLABORATORS", defaults.collaborators)?,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the saga pipeline settings.
    pub fn saga_config(&self) -> SagaConfig {
        SagaConfig::default()
            .with_steps(self.steps.iter().cloned())
            .with_timeout(self.service_timeout)
            .with_compensate_on_transport_failure(self.compensate_on_transport_failure)
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { var, value }),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        let saga = SagaConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            seat_service_url: "http://localhost:8001".to_string(),
            payment_service_url: "http://localhost:8002".to_string(),
            allocation_service_url: "http://localhost:8003".to_string(),
            steps: saga.steps,
            service_timeout: saga.timeout,
            compensate_on_transport_failure: saga.compensate_on_transport_failure,
            collaborators: CollaboratorMode::Http,
        }
    }
}
