use crate::workflows::resolution::MatcherConfig;
use crate::workflows::sales::SalesColumns;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub resolution: ResolutionConfig,
    pub files: FileConfig,
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
        let log_dir = optional_path("APP_LOG_DIR");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, log_dir },
            resolution: ResolutionConfig::from_env()?,
            files: FileConfig::from_env(),
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
    /// When set, logs are also appended to `asycuda-export.log` in this directory.
    pub log_dir: Option<PathBuf>,
}

/// Matcher tunables and the sales column layout.
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    pub fuzzy_threshold: u8,
    pub min_token_overlap: usize,
    pub columns: SalesColumns,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        let matcher = MatcherConfig::default();
        Self {
            fuzzy_threshold: matcher.fuzzy_threshold,
            min_token_overlap: matcher.min_token_overlap,
            columns: SalesColumns::default(),
        }
    }
}

impl ResolutionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let fuzzy_threshold = match env::var("ASYCUDA_FUZZY_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|value| (50..=100).contains(value))
                .ok_or(ConfigError::InvalidFuzzyThreshold(raw))?,
            Err(_) => defaults.fuzzy_threshold,
        };

        let min_token_overlap = match env::var("ASYCUDA_MIN_TOKEN_OVERLAP") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value >= 1)
                .ok_or(ConfigError::InvalidTokenOverlap(raw))?,
            Err(_) => defaults.min_token_overlap,
        };

        let column = |name: &str, fallback: &str| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        let columns = SalesColumns {
            description: column("ASYCUDA_DESCRIPTION_COLUMN", &defaults.columns.description),
            value: column("ASYCUDA_VALUE_COLUMN", &defaults.columns.value),
            quantity: column("ASYCUDA_QUANTITY_COLUMN", &defaults.columns.quantity),
            product_code: column("ASYCUDA_PRODUCT_COLUMN", &defaults.columns.product_code),
        };

        Ok(Self {
            fuzzy_threshold,
            min_token_overlap,
            columns,
        })
    }

    pub fn matcher(&self) -> MatcherConfig {
        MatcherConfig::default()
            .with_fuzzy_threshold(self.fuzzy_threshold)
            .with_min_token_overlap(self.min_token_overlap)
    }
}

/// Default input and output locations.
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub reference_path: Option<PathBuf>,
    /// Extra prefix and keyword weights layered over the built-in tables.
    pub weights_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl FileConfig {
    fn from_env() -> Self {
        Self {
            reference_path: optional_path("ASYCUDA_REFERENCE_PATH"),
            weights_path: optional_path("ASYCUDA_WEIGHTS_PATH"),
            output_dir: env::var("ASYCUDA_OUTPUT_DIR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map_or_else(|| PathBuf::from("output"), PathBuf::from),
        }
    }
}

fn optional_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFuzzyThreshold(String),
    InvalidTokenOverlap(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFuzzyThreshold(value) => write!(
                f,
                "ASYCUDA_FUZZY_THRESHOLD must be an integer between 50 and 100 (got '{}')",
                value
            ),
            ConfigError::InvalidTokenOverlap(value) => write!(
                f,
                "ASYCUDA_MIN_TOKEN_OVERLAP must be a positive integer (got '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFuzzyThreshold(_)
            | ConfigError::InvalidTokenOverlap(_) => None,
        }
    }
}
