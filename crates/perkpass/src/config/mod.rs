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
    pub badge: BadgeConfig,
    pub geofence: GeofenceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let badge = BadgeConfig {
            api_key: env::var("BADGE_API_KEY").ok().filter(|key| !key.is_empty()),
            template_id: env::var("BADGE_TEMPLATE_ID")
                .ok()
                .filter(|id| !id.is_empty()),
            endpoint: env::var("BADGE_API_URL")
                .unwrap_or_else(|_| BadgeConfig::DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(
                env::var("BADGE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout)?,
            ),
        };

        let enforce_geofence = match env::var("ENFORCE_GEOFENCE") {
            Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidGeofenceFlag { value: raw })?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            badge,
            geofence: GeofenceConfig {
                enforce: enforce_geofence,
            },
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and transport settings for the external badge API.
#[derive(Debug, Clone)]
pub struct BadgeConfig {
    pub api_key: Option<String>,
    pub template_id: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
}

impl BadgeConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.trybadge.com/v0/rpc/userPassUpsert";

    /// Issuance can only succeed when both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.template_id.is_some()
    }
}

/// Hard-deny versus advisory geofencing.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceConfig {
    pub enforce: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidTimeout,
    InvalidHost { source: std::net::AddrParseError },
    InvalidGeofenceFlag { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid u16"),
            ConfigError::InvalidTimeout => {
                write!(f, "BADGE_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidGeofenceFlag { value } => {
                write!(f, "ENFORCE_GEOFENCE must be a boolean, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
