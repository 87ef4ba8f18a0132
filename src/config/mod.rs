use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub postfinance: PostFinanceConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

/// PostFinance Checkout credentials and environment selection.
///
/// Passed explicitly into the gateway client so tests can construct a client
/// against a local stub without touching process-wide state.
#[derive(Debug, Clone, Deserialize)]
pub struct PostFinanceConfig {
    pub space_id: u64,
    pub user_id: u64,
    /// Base64-encoded API secret used for JWT HS256 signing
    pub api_secret: String,
    pub base_url: String,
    /// Gateway request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            postfinance: PostFinanceConfig {
                space_id: env::var("POSTFINANCE_SPACE_ID")
                    .map_err(|_| {
                        AppError::Configuration("POSTFINANCE_SPACE_ID not set".to_string())
                    })?
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid POSTFINANCE_SPACE_ID".to_string())
                    })?,
                user_id: env::var("POSTFINANCE_USER_ID")
                    .map_err(|_| {
                        AppError::Configuration("POSTFINANCE_USER_ID not set".to_string())
                    })?
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid POSTFINANCE_USER_ID".to_string())
                    })?,
                api_secret: env::var("POSTFINANCE_API_SECRET").map_err(|_| {
                    AppError::Configuration("POSTFINANCE_API_SECRET not set".to_string())
                })?,
                base_url: env::var("POSTFINANCE_BASE_URL")
                    .unwrap_or_else(|_| "https://checkout.postfinance.ch/api/v2.0".to_string()),
                request_timeout_secs: env::var("POSTFINANCE_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration(
                            "Invalid POSTFINANCE_REQUEST_TIMEOUT_SECS".to_string(),
                        )
                    })?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.postfinance.request_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "Gateway request timeout must be greater than 0".to_string(),
            ));
        }

        if self.database.max_connections < self.database.pool_size {
            return Err(AppError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be >= DATABASE_POOL_SIZE".to_string(),
            ));
        }

        Ok(())
    }
}
