//! Configuration management for the API server
//!
//! Configuration is read from environment variables (a `.env` file is loaded
//! first when present) into a typed [`Config`].
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string, or `memory://` (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `PORT`: Port to bind to (default: 5000)
//! - `CORS_ORIGIN`: Allowed origins, comma separated; `*` allows any (default: *)
//! - `RATE_LIMIT_MAX`: Requests per window per client (default: 100)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length in seconds (default: 900)
//! - `TRUST_PROXY`: Key rate limits on `X-Forwarded-For` (default: false)
//! - `REDIS_URL`: Enables the Redis rate-limit backend (optional)
//! - `APP_ENV`: `production` enables HSTS (default: development)
//! - `LOG_FORMAT`: `json` or `pretty` (default: pretty)
//!
//! # Example
//!
//! ```no_run
//! use taskhub_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// `DATABASE_URL` value selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` is permissive
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL or `memory://`
    pub url: String,

    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub max_requests: u64,
    pub window_secs: u64,

    /// Shared counter backend; in-process when unset
    pub redis_url: Option<String>,

    /// Only enable behind a reverse proxy that overwrites `X-Forwarded-For`
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.is_empty()))
            .context("Invalid configuration")
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let cors_origins: Vec<String> = lookup("CORS_ORIGIN")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let max_requests = parse_or(&lookup, "RATE_LIMIT_MAX", 100u64)?;
        let window_secs = parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 900u64)?;
        if max_requests == 0 || window_secs == 0 {
            anyhow::bail!("RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECS must be positive");
        }

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 5000u16)?,
                cors_origins: if cors_origins.is_empty() {
                    vec!["*".to_string()]
                } else {
                    cors_origins
                },
                production: app_env.eq_ignore_ascii_case("production"),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            rate_limit: RateLimitSettings {
                max_requests,
                window_secs,
                redis_url: lookup("REDIS_URL"),
                trust_proxy: parse_or(&lookup, "TRUST_PROXY", false)?,
            },
            logging: LoggingConfig {
                format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "memory://"), ("JWT_SECRET", SECRET)]))
                .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(config.database.is_memory());
        assert_eq!(config.database.max_connections, 10);
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert!(config.rate_limit.redis_url.is_none());
        assert!(!config.rate_limit.trust_proxy);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/taskhub"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
            ("CORS_ORIGIN", "https://app.example.com, https://admin.example.com"),
            ("APP_ENV", "production"),
            ("LOG_FORMAT", "json"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("TRUST_PROXY", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert!(!config.database.is_memory());
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(!config.allows_any_origin());
        assert!(config.api.production);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.rate_limit.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        assert!(config.rate_limit.trust_proxy);
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "memory://")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", "too-short"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("PORT", "not-a-port"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("RATE_LIMIT_MAX", "0"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("TRUST_PROXY", "yes"),
        ]))
        .is_err());
    }
}
