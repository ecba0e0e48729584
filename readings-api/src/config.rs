use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database.db".to_string()),
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5),
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 10)),
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30)),
        }
    }
}

/// Unset or unparsable values fall back to `default`.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
