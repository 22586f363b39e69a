// src/config.rs
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEV_SESSION_SECRET: &str = "threadchat-dev-secret";
/// Session lifetime bounds in hours, one hour up to a year.
const SESSION_TTL_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service on in-process stores.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub groq_api_key: String,
    pub groq_model: String,
    pub groq_base_url: String,
    pub llm_timeout: Duration,
    pub session_secret: String,
    pub session_secret_is_default: bool,
    pub session_ttl_hours: i64,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let groq_api_key = get("GROQ_API_KEY").ok_or(ConfigError::Missing("GROQ_API_KEY"))?;
        let (session_secret, session_secret_is_default) = match get("SESSION_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_SESSION_SECRET.to_string(), true),
        };

        let session_ttl_hours = parse_or(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 24)?;
        if !SESSION_TTL_RANGE.contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            groq_api_key,
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            groq_base_url: get("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            llm_timeout: Duration::from_secs(parse_or(get("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", 120)?),
            session_secret,
            session_secret_is_default,
            session_ttl_hours,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
