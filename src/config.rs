//! Runtime configuration loaded from the environment.

use anyhow::{bail, Result};
use tracing::warn;

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub login_max_attempts: u32,
    pub login_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let environment = Environment::from_env();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./mentorhub.db".to_string());

        // The signing secret must be provisioned outside development. The
        // development fallback exists so a fresh checkout runs, nothing more.
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                if environment == Environment::Production {
                    bail!("JWT_SECRET must be set when APP_ENV=production");
                }
                warn!("JWT_SECRET not set, using development-only fallback");
                "mentorhub-dev-secret".to_string()
            }
        };

        let token_ttl_hours = std::env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let login_max_attempts = std::env::var("LOGIN_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let login_window_secs = std::env::var("LOGIN_WINDOW_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        Ok(Self {
            environment,
            port,
            database_path,
            jwt_secret,
            token_ttl_hours,
            login_max_attempts,
            login_window_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        std::env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);
    }
}
