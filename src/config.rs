/*
 * Responsibility
 * - Load settings from the environment (.env honoured): listen port, database, signing key,
 *   bypass list and rule table, transport limits
 * - Validate them; anything missing or malformed fails startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::SigningConfig;
use crate::services::auth::password;
use crate::services::auth::{PathList, RuleTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_EXPIRATION_MS: u64 = 86_400_000;
pub const DEFAULT_JWT_ISSUER: &str = "rolegate";
pub const DEFAULT_BCRYPT_COST: u32 = 12;

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub database_url: String,
    pub database_max_connections: u32,

    pub signing: SigningConfig,
    pub bypass: PathList,
    pub rules: RuleTable,
    pub bcrypt_cost: u32,

    pub request_timeout: Duration,
    pub request_body_limit: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("database_url", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .field("signing", &self.signing)
            .field("bypass", &self.bypass)
            .field("rules", &self.rules.rules().len())
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("request_timeout", &self.request_timeout)
            .field("request_body_limit", &self.request_body_limit)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(&get("APP_ENV").unwrap_or_default());

        let database_url = get("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections: u32 = parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?;

        let secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let ttl_ms: u64 = parse_or(&get, "JWT_EXPIRATION_MS", DEFAULT_JWT_EXPIRATION_MS)?;
        let issuer = get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string());
        let signing = SigningConfig::new(secret, issuer, Duration::from_millis(ttl_ms))
            .map_err(|e| {
                tracing::error!(error = %e, "signing configuration rejected");
                ConfigError::Invalid("JWT_SECRET/JWT_ISSUER/JWT_EXPIRATION_MS")
            })?;

        let bypass = match get("AUTH_BYPASS_PATHS") {
            Some(raw) => PathList::parse(&raw).map_err(|_| ConfigError::Invalid("AUTH_BYPASS_PATHS"))?,
            None => PathList::default(),
        };

        let rules = match get("AUTH_RULES") {
            Some(raw) => RuleTable::parse(&raw).map_err(|_| ConfigError::Invalid("AUTH_RULES"))?,
            None => RuleTable::default(),
        };

        let bcrypt_cost: u32 = parse_or(&get, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(password::MIN_COST..=password::MAX_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid("BCRYPT_COST"));
        }

        let timeout_secs: u64 = parse_or(&get, "REQUEST_TIMEOUT_SECONDS", 30)?;
        let request_body_limit: usize = parse_or(&get, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            database_max_connections,
            signing,
            bypass,
            rules,
            bcrypt_cost,
            request_timeout: Duration::from_secs(timeout_secs),
            request_body_limit,
        })
    }
}

/// Absent means default; present but unparsable is an error rather than a silent fallback.
fn parse_or<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
