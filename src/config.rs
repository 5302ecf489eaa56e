use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub judge_api_url: String,
    pub judge_api_key: Option<String>,
    pub judge_api_host: Option<String>,
    /// Network timeout for a single judge HTTP call, in seconds.
    pub judge_request_timeout_secs: u64,
    /// Runner-side deadline for one test case, in seconds.
    pub judge_case_timeout_secs: u64,
    pub default_cpu_time_limit: f64,
    pub default_memory_limit_kb: i32,
    pub student_rps: u32,
    pub admin_rps: u32,
    pub expiry_sweep_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            judge_api_url: get_env("JUDGE_API_URL")?,
            judge_api_key: env::var("JUDGE_API_KEY").ok(),
            judge_api_host: env::var("JUDGE_API_HOST").ok(),
            judge_request_timeout_secs: get_env_parse_or("JUDGE_REQUEST_TIMEOUT_SECS", 15)?,
            judge_case_timeout_secs: get_env_parse_or("JUDGE_CASE_TIMEOUT_SECS", 20)?,
            default_cpu_time_limit: get_env_parse_or("DEFAULT_CPU_TIME_LIMIT", 2.0)?,
            default_memory_limit_kb: get_env_parse_or("DEFAULT_MEMORY_LIMIT_KB", 128_000)?,
            student_rps: get_env_parse_or("STUDENT_RPS", 20)?,
            admin_rps: get_env_parse_or("ADMIN_RPS", 50)?,
            expiry_sweep_secs: get_env_parse_or("EXPIRY_SWEEP_SECS", 60)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok().map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
