use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub consolidation: ConsolidationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            consolidation: ConsolidationSettings::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const MAX_CONCURRENT_LOOKUPS: usize = 1_024;
pub const MAX_RECORDER_QUEUE: usize = 1_048_576;

/// Runtime dials for the geospatial collaborator and the decision recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationSettings {
    /// OSRM base URL. When absent, impacts are estimated locally.
    pub geo_service_url: Option<String>,
    pub geo_timeout: Duration,
    pub max_concurrent_lookups: usize,
    pub recorder_queue_capacity: usize,
    pub recorder_max_retries: u32,
}

impl Default for ConsolidationSettings {
    fn default() -> Self {
        Self {
            geo_service_url: None,
            geo_timeout: Duration::from_millis(2_000),
            max_concurrent_lookups: 8,
            recorder_queue_capacity: 1_024,
            recorder_max_retries: 3,
        }
    }
}

impl ConsolidationSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let geo_service_url = env::var("CONSOLIDATION_GEO_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let timeout_ms = read_number(
            "CONSOLIDATION_GEO_TIMEOUT_MS",
            defaults.geo_timeout.as_millis() as u64,
        )?;
        if !(1..=30_000).contains(&timeout_ms) {
            return Err(ConfigError::InvalidSetting {
                name: "CONSOLIDATION_GEO_TIMEOUT_MS",
            });
        }

        let max_concurrent_lookups = read_number(
            "CONSOLIDATION_MAX_CONCURRENT_LOOKUPS",
            defaults.max_concurrent_lookups,
        )?;
        let recorder_queue_capacity =
            read_number("CONSOLIDATION_RECORDER_QUEUE", defaults.recorder_queue_capacity)?;
        if !(1..=MAX_CONCURRENT_LOOKUPS).contains(&max_concurrent_lookups) {
            return Err(ConfigError::InvalidSetting {
                name: "CONSOLIDATION_MAX_CONCURRENT_LOOKUPS",
            });
        }
        if !(1..=MAX_RECORDER_QUEUE).contains(&recorder_queue_capacity) {
            return Err(ConfigError::InvalidSetting {
                name: "CONSOLIDATION_RECORDER_QUEUE",
            });
        }

        Ok(Self {
            geo_service_url,
            geo_timeout: Duration::from_millis(timeout_ms),
            max_concurrent_lookups,
            recorder_queue_capacity,
            recorder_max_retries: read_number(
                "CONSOLIDATION_RECORDER_RETRIES",
                defaults.recorder_max_retries,
            )?,
        })
    }
}

fn read_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidSetting { name }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { name } => {
                write!(f, "{name} is outside its accepted range")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSetting { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
