use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub public_rps: u32,
    pub api_rps: u32,
    pub timeline_sweep_secs: u64,
    /// Block length applied by the timeline watcher. `None` keeps the watcher report-only.
    pub auto_block_hours: Option<i64>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let bootstrap_admin = match (
            get_env_opt("BOOTSTRAP_ADMIN_EMAIL"),
            get_env_opt("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: get_env_opt("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together".to_string(),
                ))
            }
        };

        let log_format = match get_env_opt("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)))
            }
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            token_ttl_hours: get_env_parse_or("TOKEN_TTL_HOURS", 24)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            api_rps: get_env_parse_or("API_RPS", 100)?,
            timeline_sweep_secs: get_env_parse_or("TIMELINE_SWEEP_SECS", 60)?,
            auto_block_hours: get_env_opt("AUTO_BLOCK_HOURS")
                .map(|raw| parse_value("AUTO_BLOCK_HOURS", &raw))
                .transpose()?,
            bootstrap_admin,
            log_format,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
