//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::RetryPolicy;
use thiserror::Error;
use url::Url;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CAR_SERVICE_URL: &str = "http://localhost:8070/api/v1";
const DEFAULT_RENTAL_SERVICE_URL: &str = "http://localhost:8060/api/v1";
const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:8050/api/v1";
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 1000;

/// A variable that is set but cannot be used.
#[derive(Debug, Error)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

/// Gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CAR_SERVICE_URL`, `RENTAL_SERVICE_URL`, `PAYMENT_SERVICE_URL`: backend
///   base URLs (default: `http://localhost:{8070,8060,8050}/api/v1`)
/// - `BACKEND_TIMEOUT_MS`: per-call timeout (default: `1000`)
/// - `PAYMENT_RETRY_ATTEMPTS`: background cancellation attempts (default: `100`)
/// - `PAYMENT_RETRY_INTERVAL_SECS`: pause between attempts (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub car_service_url: Url,
    pub rental_service_url: Url,
    pub payment_service_url: Url,
    pub backend_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let retry_policy = RetryPolicy::new(
            parse_or(&lookup, "PAYMENT_RETRY_ATTEMPTS", defaults.retry_policy.max_attempts)?,
            Duration::from_secs(parse_or(
                &lookup,
                "PAYMENT_RETRY_INTERVAL_SECS",
                defaults.retry_policy.interval.as_secs(),
            )?),
        );

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            car_service_url: url_or(&lookup, "CAR_SERVICE_URL", defaults.car_service_url)?,
            rental_service_url: url_or(&lookup, "RENTAL_SERVICE_URL", defaults.rental_service_url)?,
            payment_service_url: url_or(
                &lookup,
                "PAYMENT_SERVICE_URL",
                defaults.payment_service_url,
            )?,
            backend_timeout: Duration::from_millis(parse_or(
                &lookup,
                "BACKEND_TIMEOUT_MS",
                DEFAULT_BACKEND_TIMEOUT_MS,
            )?),
            retry_policy,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            car_service_url: default_url(DEFAULT_CAR_SERVICE_URL),
            rental_service_url: default_url(DEFAULT_RENTAL_SERVICE_URL),
            payment_service_url: default_url(DEFAULT_PAYMENT_SERVICE_URL),
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            retry_policy: RetryPolicy::default(),
        }
    }
}

fn default_url(raw: &'static str) -> Url {
    Url::parse(raw).unwrap_or_else(|e| unreachable!("default URL {raw} is invalid: {e}"))
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn url_or<F>(lookup: &F, var: &'static str, default: Url) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError {
        var,
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError {
            var,
            reason: format!("{url} cannot be used as a base URL"),
        });
    }
    Ok(url)
}
