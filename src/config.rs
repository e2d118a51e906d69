use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use chrono::Duration;
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
    pub media_root: PathBuf,
}

impl Config {
    /// Reads the process environment. A `.env` file is honoured when present.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        Ok(Self {
            port: try_load("PORT", "8000")?,
            database_url: require("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            redis_url: var("REDIS_URL"),
            jwt_secret: require("JWT_SECRET")?,
            session_lifetime_hours: try_load("SESSION_LIFETIME_HOURS", "24")?,
            media_root: try_load("MEDIA_ROOT", "./media")?,
        })
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(self.session_lifetime_hours)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}
