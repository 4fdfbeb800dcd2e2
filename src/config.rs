//! Configuration management for the application
use crate::core::types::Magnitude;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Where raw daily catalog responses are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("resources/earthquake_data") }
    }
}

/// Remote event catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub url: String,
    pub timeout_seconds: u64,
    /// Pause inside each task before its request
    pub request_delay_ms: u64,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_order_by")]
    pub order_by: String,
}

fn default_event_type() -> String {
    "earthquake".to_string()
}

fn default_order_by() -> String {
    "time-asc".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "https://earthquake.usgs.gov/fdsnws/event/1/query".to_string(),
            timeout_seconds: 30,
            request_delay_ms: 100,
            event_type: default_event_type(),
            order_by: default_order_by(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub concurrency: usize,
    pub min_magnitude: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self { concurrency: 10, min_magnitude: 2.5 }
    }
}

/// Plate boundary reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundariesConfig {
    pub dir: PathBuf,
    pub search_radius_km: f64,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("resources/plate_boundaries"), search_radius_km: 1000.0 }
    }
}

impl BoundariesConfig {
    pub fn search_radius_m(&self) -> f64 {
        self.search_radius_km * 1000.0
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "info".to_string(),
            dependency_filter: Some(
                "hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,tower=info,tokio_util=warn,mio=warn,rustls=warn,want=warn"
                    .to_string(),
            ),
        }
    }
}

/// StatsD configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsdConfig {
    pub prefix: String,
    pub addr: String,
    pub use_tags: bool,
    pub enabled: bool,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            prefix: "faultline".to_string(),
            addr: "127.0.0.1:8125".to_string(),
            use_tags: false,
            enabled: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
    pub acquisition: AcquisitionConfig,
    pub boundaries: BoundariesConfig,
    pub logging: LoggingConfig,
    pub statsd: StatsdConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("FAULTLINE_").split("__"));

        // The config file location itself can only come from the environment
        if let Some(config_path) = std::env::var_os("FAULTLINE_CONFIG") {
            if let Some(path_str) = config_path.to_str() {
                let path = Path::new(path_str);
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.url.is_empty() {
            return Err(ConfigError::MissingConfig("Catalog URL is required".to_string()));
        }
        if url::Url::parse(&self.catalog.url).is_err() {
            return Err(ConfigError::InvalidValue(format!("Catalog URL is not a URL: {}", self.catalog.url)));
        }

        if self.acquisition.concurrency == 0 {
            return Err(ConfigError::InvalidValue("Acquisition concurrency must be at least 1".to_string()));
        }

        if Magnitude::new(self.acquisition.min_magnitude).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "Minimum magnitude must be a non-negative number, got {}",
                self.acquisition.min_magnitude
            )));
        }

        if !(self.boundaries.search_radius_km.is_finite() && self.boundaries.search_radius_km > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "Boundary search radius must be positive, got {} km",
                self.boundaries.search_radius_km
            )));
        }

        if self.cache.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingConfig("Cache root directory is required".to_string()));
        }

        Ok(())
    }

    pub fn min_magnitude(&self) -> Result<Magnitude, ConfigError> {
        Magnitude::new(self.acquisition.min_magnitude).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.acquisition.concurrency, 10);
        assert_eq!(config.catalog.request_delay(), Duration::from_millis(100));
        assert_eq!(config.boundaries.search_radius_m(), 1_000_000.0);
        assert_eq!(config.min_magnitude().unwrap().cache_namespace(), "m2.5");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.acquisition.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = Config::default();
        config.catalog.url = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));

        let mut config = Config::default();
        config.acquisition.min_magnitude = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.boundaries.search_radius_km = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::new().merge(Serialized::defaults(Config::default())).merge(Toml::string(
            r#"
            [acquisition]
            concurrency = 4
            min_magnitude = 4.5

            [catalog]
            request_delay_ms = 0
            "#,
        ));
        let config: Config = figment.extract().unwrap();
        assert_eq!(config.acquisition.concurrency, 4);
        assert_eq!(config.min_magnitude().unwrap().value(), 4.5);
        assert_eq!(config.catalog.request_delay_ms, 0);
        assert_eq!(config.catalog.timeout_seconds, 30);
    }
}
