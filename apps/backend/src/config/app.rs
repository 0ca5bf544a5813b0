//! Startup configuration read from the process environment.
//!
//! Every variable is read once in `AppConfig::from_env`. Missing required
//! variables and malformed numbers are `ConfigError`s that abort startup.

use std::env;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::CorsConfig;
use crate::router::{RouterOptions, DEFAULT_BODY_LIMIT, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT};
use crate::txmanager::sql::{SqlTxConfig, DRIVER_NAME};
use crate::txmanager::DriverConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub base_path: String,
    pub request_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub body_limit: usize,
    pub cors_origins: Option<String>,
    pub database_url: String,
    pub tx_driver: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = match parse_var::<u64>(var("API_TIMEOUT_MS"), "API_TIMEOUT_MS")? {
            None | Some(0) => DEFAULT_REQUEST_TIMEOUT,
            Some(ms) => Duration::from_millis(ms),
        };
        let millis = |name: &str| -> Result<Option<Duration>, AppError> {
            Ok(parse_var::<u64>(var(name), name)?
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis))
        };

        Ok(Self {
            host: var("BACKEND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(var("BACKEND_PORT"), "BACKEND_PORT")?.unwrap_or(DEFAULT_PORT),
            base_path: normalize_base_path(var("API_BASE_PATH").as_deref().unwrap_or("")),
            request_timeout,
            read_timeout: millis("SERVER_READ_TIMEOUT_MS")?,
            write_timeout: millis("SERVER_WRITE_TIMEOUT_MS")?,
            body_limit: parse_var(var("REQUEST_BODY_LIMIT"), "REQUEST_BODY_LIMIT")?
                .unwrap_or(DEFAULT_BODY_LIMIT),
            cors_origins: var("CORS_ALLOWED_ORIGINS"),
            database_url: must_var(var("DATABASE_URL"), "DATABASE_URL")?,
            tx_driver: var("TX_DRIVER").unwrap_or_else(|| DRIVER_NAME.to_string()),
        })
    }

    pub fn router_options(&self) -> RouterOptions {
        let cors = match &self.cors_origins {
            Some(raw) => CorsConfig::default().with_origins(raw),
            None => CorsConfig::default(),
        };
        RouterOptions {
            prefix: self.base_path.clone(),
            host: self.host.clone(),
            port: self.port,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            request_timeout: self.request_timeout,
            body_limit: self.body_limit,
            error_handler: None,
            cors: Some(cors),
        }
    }

    /// Driver selection for `Manager::new`. Only the `sql` driver needs a
    /// payload; other kinds are left to whoever registered them.
    pub fn driver_config(&self, db: &DatabaseConnection) -> DriverConfig {
        if self.tx_driver == DRIVER_NAME {
            DriverConfig::new(DRIVER_NAME, SqlTxConfig { db: db.clone() })
        } else {
            DriverConfig {
                kind: self.tx_driver.clone(),
                config: None,
            }
        }
    }
}

fn must_var(value: Option<String>, name: &str) -> Result<String, AppError> {
    value.ok_or_else(|| {
        AppError::config(format!("Required environment variable '{name}' is not set"))
    })
}

fn parse_var<T: std::str::FromStr>(
    value: Option<String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                AppError::config(format!(
                    "Environment variable '{name}' is not a valid number: '{raw}'"
                ))
            })
        })
        .transpose()
}

/// `api/` → `/api`; empty stays empty.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
