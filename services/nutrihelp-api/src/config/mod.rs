use anyhow::Context;
use std::env;
use std::str::FromStr;

/// Deployment mode. Anything other than `production` is development.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: Environment,
    pub frontend_origin: String,
    pub verify_base_url: String,
    pub db_max_connections: u32,
    pub log_json: bool,

    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub slow_request_ms: u64,

    // Lifetimes and intervals in seconds
    pub email_token_ttl_secs: u64,
    pub sms_code_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let server_port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.server_port);

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            environment: env::var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(defaults.environment),
            frontend_origin: env::var("FRONTEND_ORIGIN").unwrap_or(defaults.frontend_origin),
            verify_base_url: env::var("DEV_VERIFY_BASE")
                .unwrap_or_else(|_| format!("http://localhost:{}/api", server_port)),
            db_max_connections: Self::env_or("DB_MAX_CONNECTIONS", 10),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            rate_limit_max_requests: Self::env_or("RATE_LIMIT_MAX", 1000),
            rate_limit_window_secs: Self::env_or("RATE_LIMIT_WINDOW_SECS", 900), // 15m
            slow_request_ms: Self::env_or("SLOW_REQUEST_MS", 5000),

            email_token_ttl_secs: Self::env_or("EMAIL_TOKEN_TTL_SECS", 86400), // 24h
            sms_code_ttl_secs: Self::env_or("SMS_CODE_TTL_SECS", 300),
            cleanup_interval_secs: Self::env_or("CLEANUP_INTERVAL_SECS", 10800), // 3h
        })
    }

    /// Value of `key` parsed as `T`; unset or unparsable (including out of
    /// range for `T`) falls back to `default`
    fn env_or<T: FromStr>(key: &str, default: T) -> T {
        env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/nutrihelp".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 80,
            environment: Environment::Development,
            frontend_origin: "http://localhost:3000".to_string(),
            verify_base_url: "http://localhost:80/api".to_string(),
            db_max_connections: 10,
            log_json: false,
            rate_limit_max_requests: 1000,
            rate_limit_window_secs: 900,
            slow_request_ms: 5000,
            email_token_ttl_secs: 86400,
            sms_code_ttl_secs: 300,
            cleanup_interval_secs: 10800,
        }
    }
}
