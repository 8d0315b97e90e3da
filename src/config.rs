// Runtime configuration, read once at startup from the environment.
// `.env` files are loaded by main before this runs.

use anyhow::Context;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub jwt_secret: String,
    pub jwt_expiration_secs: i64,
    pub ai: AiSettings,
    pub port: u16,
    pub api_prefix: String,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: parse_or("DB_PORT", 5432)?,
                user: env_or("DB_USER", "postgres"),
                password: std::env::var("DB_PASSWORD").unwrap_or_default(),
                database: std::env::var("DB_NAME")
                    .or_else(|_| std::env::var("DB_DATABASE"))
                    .unwrap_or_else(|_| "coinquest".to_string()),
                pool_min: parse_or("DB_POOL_MIN", 1)?,
                pool_max: parse_or("DB_POOL_MAX", 10)?,
                idle_timeout: Duration::from_secs(parse_or("DB_IDLE_TIMEOUT_SECS", 600)?),
                connect_timeout: Duration::from_secs(parse_or("DB_CONNECT_TIMEOUT_SECS", 10)?),
            },
            jwt_secret: std::env::var("JWT_SECRET")
                .context("missing JWT_SECRET environment variable")?,
            jwt_expiration_secs: parse_or("JWT_EXPIRATION_SECS", 86_400)?,
            ai: AiSettings {
                base_url: env_or("AI_SERVICE_URL", "http://localhost:8001"),
                timeout: Duration::from_secs(parse_or("AI_SERVICE_TIMEOUT_SECS", 30)?),
                max_retries: parse_or("AI_SERVICE_MAX_RETRIES", 3)?,
                retry_delay: Duration::from_millis(parse_or("AI_SERVICE_RETRY_DELAY_MS", 1_000)?),
            },
            port: parse_or("PORT", 3000)?,
            api_prefix: env_or("API_PREFIX", "/api"),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset variables fall back to the default; set-but-unparsable ones are a
/// startup error rather than a silent fallback.
fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid {}: {}", key, err)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_defaults_when_unset() {
        assert_eq!(parse_or("COINQUEST_TEST_UNSET_PORT", 5432u16).unwrap(), 5432);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        std::env::set_var("COINQUEST_TEST_BAD_PORT", "not-a-number");
        assert!(parse_or("COINQUEST_TEST_BAD_PORT", 5432u16).is_err());
    }
}
