//! Environment-driven configuration

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub buyer_token_ttl_days: i64,
    pub cors_allowed_origins: Option<String>,
    pub top_seller_cron: String,
    pub top_seller_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3001)?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, using development secret");
                "trady-dev-secret".to_string()
            }),
            buyer_token_ttl_days: parse_var("BUYER_TOKEN_TTL_DAYS", 7)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            top_seller_cron: env::var("TOP_SELLER_CRON")
                .unwrap_or_else(|_| "0 0 0 1 * *".to_string()),
            top_seller_limit: parse_var("TOP_SELLER_LIMIT", 20)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            database_url: None,
            db_max_connections: 5,
            jwt_secret: "trady-dev-secret".to_string(),
            buyer_token_ttl_days: 7,
            cors_allowed_origins: None,
            top_seller_cron: "0 0 0 1 * *".to_string(),
            top_seller_limit: 20,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}
