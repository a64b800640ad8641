use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::values::money::normalize_currency;

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
    pub billing: BillingConfig,
    pub pagination: PaginationConfig,
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

        let billing = BillingConfig::new(
            &env::var("APP_DEFAULT_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        )?;

        let default_page_size = parse_page_size("APP_DEFAULT_PAGE_SIZE", 20)?;
        let max_page_size = parse_page_size("APP_MAX_PAGE_SIZE", 100)?;
        let pagination = PaginationConfig::new(default_page_size, max_page_size)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            billing,
            pagination,
        })
    }
}

fn parse_page_size(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidPageSize { key }),
        Err(_) => Ok(default),
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

/// Billing defaults applied when a request leaves a value out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    default_currency: String,
}

impl BillingConfig {
    pub fn new(default_currency: &str) -> Result<Self, ConfigError> {
        let default_currency =
            normalize_currency(default_currency).map_err(|_| ConfigError::InvalidCurrency)?;
        Ok(Self { default_currency })
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }
}

/// Page size bounds for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    default_page_size: u32,
    max_page_size: u32,
}

impl PaginationConfig {
    pub fn new(default_page_size: u32, max_page_size: u32) -> Result<Self, ConfigError> {
        if default_page_size == 0 || max_page_size < default_page_size {
            return Err(ConfigError::PageSizeBounds {
                default_page_size,
                max_page_size,
            });
        }
        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCurrency,
    InvalidPageSize { key: &'static str },
    PageSizeBounds {
        default_page_size: u32,
        max_page_size: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCurrency => {
                write!(f, "APP_DEFAULT_CURRENCY must not be empty")
            }
            ConfigError::InvalidPageSize { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::PageSizeBounds {
                default_page_size,
                max_page_size,
            } => write!(
                f,
                "default page size {default_page_size} must be at least 1 and no greater than max page size {max_page_size}"
            ),
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
