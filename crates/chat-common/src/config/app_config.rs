//! Application configuration
//!
//! Everything is read from the environment (a `.env` file is loaded first
//! when present). Optional variables fall back to the `default_*` values
//! below; a variable that is set but does not parse is an error rather than
//! a silent fallback.

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub snowflake: SnowflakeConfig,
    pub realtime: RealtimeConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

/// Listen address. HTTP routes and the `/gateway` WebSocket share it.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Directory holding the SQL migrations. Unset means the copy in the
    /// source tree, which only exists on a development checkout.
    #[serde(default)]
    pub migrations_dir: Option<String>,
}

/// Access tokens are issued elsewhere; the server only verifies them.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub machine_id: u16,
}

/// Realtime gateway tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Interval announced to clients in `Hello`
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Silence after which a connection is treated as disconnected
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions: usize,
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            outbound_buffer: default_outbound_buffer(),
            max_subscriptions: default_max_subscriptions(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "chat-server".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_heartbeat_interval() -> u64 {
    45_000
}

fn default_heartbeat_timeout() -> u64 {
    90_000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_max_subscriptions() -> usize {
    256
}

/// Read `name`, falling back to `default` when unset
fn var_or<T: FromStr>(name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: var_or("APP_ENV", Environment::default)?,
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| default_host()),
                port: var_or("SERVER_PORT", default_port)?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: var_or("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
                connect_timeout_secs: var_or("DATABASE_CONNECT_TIMEOUT", default_connect_timeout)?,
                migrations_dir: env::var("DATABASE_MIGRATIONS_DIR").ok(),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                access_token_expiry: var_or("JWT_ACCESS_TOKEN_EXPIRY", default_access_token_expiry)?,
            },
            rate_limit: RateLimitConfig {
                requests_per_second: var_or(
                    "RATE_LIMIT_REQUESTS_PER_SECOND",
                    default_requests_per_second,
                )?,
                burst: var_or("RATE_LIMIT_BURST_SIZE", default_burst)?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|origin| !origin.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            snowflake: SnowflakeConfig {
                machine_id: var_or("SNOWFLAKE_MACHINE_ID", || 1)?,
            },
            realtime: RealtimeConfig {
                heartbeat_interval_ms: var_or(
                    "REALTIME_HEARTBEAT_INTERVAL_MS",
                    default_heartbeat_interval,
                )?,
                heartbeat_timeout_ms: var_or(
                    "REALTIME_HEARTBEAT_TIMEOUT_MS",
                    default_heartbeat_timeout,
                )?,
                outbound_buffer: var_or("REALTIME_OUTBOUND_BUFFER", default_outbound_buffer)?,
                max_subscriptions: var_or(
                    "REALTIME_MAX_SUBSCRIPTIONS",
                    default_max_subscriptions,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that a single variable parse cannot catch
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snowflake.machine_id >= 1024 {
            return Err(ConfigError::InvalidValue(
                "SNOWFLAKE_MACHINE_ID",
                "must be below 1024".to_string(),
            ));
        }
        if self.realtime.heartbeat_timeout_ms <= self.realtime.heartbeat_interval_ms {
            return Err(ConfigError::InvalidValue(
                "REALTIME_HEARTBEAT_TIMEOUT_MS",
                "must exceed the heartbeat interval".to_string(),
            ));
        }
        if self.realtime.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "REALTIME_OUTBOUND_BUFFER",
                "must be at least 1".to_string(),
            ));
        }
        if self.jwt.secret.len() < 16 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET",
                "must be at least 16 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
