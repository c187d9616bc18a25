//! Configuration loading and representation.
//!
//! Everything comes from environment variables; there is no config file.

use thiserror::Error;
use url::Url;

use keystone_auth::{DEFAULT_BCRYPT_COST, TokenTtl};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Postgres connection string. `None` selects in-memory stores.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl: TokenTtl,
    /// Allowed CORS origin.
    pub frontend_url: String,
    /// Base URL used in password reset links.
    pub app_url: String,
    pub bcrypt_cost: u32,
    pub session_cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: TokenTtl::default(),
            frontend_url: "http://localhost:3000".to_string(),
            app_url: "http://localhost:3000".to_string(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            session_cookie_secure: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                message: format!("'{v}' is not a port number"),
            })?,
            None => defaults.port,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl = match get("JWT_EXPIRES_IN") {
            Some(v) => v.parse::<TokenTtl>().map_err(|e| ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                message: e.to_string(),
            })?,
            None => defaults.jwt_ttl,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(v) => match v.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BCRYPT_COST",
                        message: format!("'{v}' is not a cost between 4 and 31"),
                    });
                }
            },
            None => defaults.bcrypt_cost,
        };

        let session_cookie_secure = match get("SESSION_COOKIE_SECURE") {
            Some(v) => v.parse::<bool>().map_err(|_| ConfigError::Invalid {
                key: "SESSION_COOKIE_SECURE",
                message: format!("'{v}' is not true/false"),
            })?,
            None => defaults.session_cookie_secure,
        };

        let frontend_url = get("FRONTEND_URL").unwrap_or(defaults.frontend_url);
        let app_url = get("APP_URL")
            .or_else(|| get("NEXTAUTH_URL"))
            .unwrap_or_else(|| frontend_url.clone());
        let app_url = app_url.trim_end_matches('/').to_string();
        match Url::parse(&app_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    key: "APP_URL",
                    message: format!("'{app_url}' is not an absolute http(s) URL"),
                });
            }
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            jwt_ttl,
            frontend_url,
            app_url,
            bcrypt_cost,
            session_cookie_secure,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
