//! Configuration management for the SafeCity service
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and provides validation for all configuration settings.

use crate::SafeCityError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the SafeCity service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeCityConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Third-party API keys, endpoints and client behavior
    pub upstream: UpstreamConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Risk engine defaults
    pub risk: RiskConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of a built frontend served for non-API paths
    pub static_dir: Option<String>,
    /// PEM certificate chain; enables TLS together with `tls_key`
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

/// Upstream provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// OpenWeatherMap API key
    pub openweather_api_key: Option<String>,
    /// Google Maps API key
    pub google_maps_api_key: Option<String>,
    pub openweather_base_url: String,
    pub open_meteo_base_url: String,
    pub open_meteo_geocoding_url: String,
    pub nominatim_base_url: String,
    pub overpass_url: String,
    pub google_maps_base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    pub user_agent: String,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `memory` or `persistent`
    pub backend: String,
    /// Cache directory location for the persistent backend
    pub location: String,
    pub risk_ttl_seconds: u64,
    pub weather_ttl_seconds: u64,
    pub free_api_ttl_seconds: u64,
    pub maps_ttl_seconds: u64,
    pub traffic_ttl_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector endpoint; spans are exported only when set
    pub otlp_endpoint: Option<String>,
}

/// Risk engine defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub default_radius_m: u32,
    pub default_prediction_hours: u32,
    pub max_places: usize,
    /// IANA zone name used for the hour-of-day prediction pattern
    pub timezone: String,
}

// Default value functions
fn default_weather_ttl() -> u64 {
    600
}

fn default_timeout() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("safecity").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".cache/safecity".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            static_dir: None,
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            google_maps_api_key: None,
            openweather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            open_meteo_base_url: "https://api.open-meteo.com/v1".to_string(),
            open_meteo_geocoding_url: "https://geocoding-api.open-meteo.com/v1".to_string(),
            nominatim_base_url: "https://nominatim.openstreetmap.org".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            google_maps_base_url: "https://maps.googleapis.com/maps/api".to_string(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            user_agent: "SafeCityAI/1.0".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            location: default_cache_location(),
            risk_ttl_seconds: 300,
            weather_ttl_seconds: default_weather_ttl(),
            free_api_ttl_seconds: 600,
            maps_ttl_seconds: 3600,
            traffic_ttl_seconds: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_radius_m: 5000,
            default_prediction_hours: 6,
            max_places: 20,
            timezone: "UTC".to_string(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn risk_ttl(&self) -> Duration {
        Duration::from_secs(self.risk_ttl_seconds)
    }

    #[must_use]
    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_ttl_seconds)
    }

    #[must_use]
    pub fn free_api_ttl(&self) -> Duration {
        Duration::from_secs(self.free_api_ttl_seconds)
    }

    #[must_use]
    pub fn maps_ttl(&self) -> Duration {
        Duration::from_secs(self.maps_ttl_seconds)
    }

    #[must_use]
    pub fn traffic_ttl(&self) -> Duration {
        Duration::from_secs(self.traffic_ttl_seconds)
    }
}

impl RiskConfig {
    /// Parsed prediction time zone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| SafeCityError::config(format!("Unknown time zone '{}'", self.timezone)).into())
    }
}

impl SafeCityConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SAFECITY_UPSTREAM__TIMEOUT_SECONDS=5 overrides upstream.timeout_seconds
        builder = builder.add_source(
            Environment::with_prefix("SAFECITY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SafeCityConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.apply_env_keys(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("safecity").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.upstream.timeout_seconds == 0 {
            self.upstream.timeout_seconds = default_timeout();
        }
        if self.upstream.user_agent.is_empty() {
            self.upstream.user_agent = UpstreamConfig::default().user_agent;
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.weather_ttl_seconds == 0 {
            self.cache.weather_ttl_seconds = default_weather_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // Blank keys in a config file mean "not configured"
        for key in [
            &mut self.upstream.openweather_api_key,
            &mut self.upstream.google_maps_api_key,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }
    }

    /// Fill missing API keys from the conventional provider variables
    pub fn apply_env_keys(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let from_env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.upstream.openweather_api_key.is_none() {
            self.upstream.openweather_api_key = from_env("OPENWEATHER_API_KEY");
        }
        if self.upstream.google_maps_api_key.is_none() {
            self.upstream.google_maps_api_key = from_env("GOOGLE_MAPS_API_KEY");
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_tls()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SafeCityError::config("Server port cannot be 0").into());
        }

        if self.upstream.timeout_seconds > 300 {
            return Err(
                SafeCityError::config("Upstream timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.upstream.max_retries > 10 {
            return Err(SafeCityError::config("Upstream max retries cannot exceed 10").into());
        }

        let ttls = [
            self.cache.risk_ttl_seconds,
            self.cache.weather_ttl_seconds,
            self.cache.free_api_ttl_seconds,
            self.cache.maps_ttl_seconds,
            self.cache.traffic_ttl_seconds,
        ];
        if ttls.iter().any(|ttl| *ttl > 7 * 24 * 3600) {
            return Err(SafeCityError::config("Cache TTL cannot exceed 1 week").into());
        }

        if !(100..=50_000).contains(&self.risk.default_radius_m) {
            return Err(SafeCityError::config(
                "Default radius must be between 100 and 50000 meters",
            )
            .into());
        }

        if !(1..=48).contains(&self.risk.default_prediction_hours) {
            return Err(
                SafeCityError::config("Default prediction hours must be between 1 and 48").into(),
            );
        }

        if !(1..=100).contains(&self.risk.max_places) {
            return Err(SafeCityError::config("Maximum places must be between 1 and 100").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SafeCityError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SafeCityError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_backends = ["memory", "persistent"];
        if !valid_backends.contains(&self.cache.backend.as_str()) {
            return Err(SafeCityError::config(format!(
                "Invalid cache backend '{}'. Must be one of: {}",
                self.cache.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        self.risk.tz()?;

        let urls = [
            ("openweather_base_url", &self.upstream.openweather_base_url),
            ("open_meteo_base_url", &self.upstream.open_meteo_base_url),
            (
                "open_meteo_geocoding_url",
                &self.upstream.open_meteo_geocoding_url,
            ),
            ("nominatim_base_url", &self.upstream.nominatim_base_url),
            ("overpass_url", &self.upstream.overpass_url),
            ("google_maps_base_url", &self.upstream.google_maps_base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SafeCityError::config(format!(
                    "Upstream {name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_tls(&self) -> Result<()> {
        match (&self.server.tls_cert, &self.server.tls_key) {
            (Some(_), None) => {
                Err(SafeCityError::config("tls_cert is set but tls_key is missing").into())
            }
            (None, Some(_)) => {
                Err(SafeCityError::config("tls_key is set but tls_cert is missing").into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SafeCityConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.upstream.timeout_seconds, 10);
        assert_eq!(config.upstream.user_agent, "SafeCityAI/1.0");
        assert_eq!(config.cache.backend, "memory");
        assert_eq!(config.cache.risk_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.maps_ttl(), Duration::from_secs(3600));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.risk.default_prediction_hours, 6);
        assert!(config.upstream.openweather_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = SafeCityConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = SafeCityConfig::default();
        config.upstream.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_timezone() {
        let mut config = SafeCityConfig::default();
        config.risk.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        config.risk.timezone = "America/New_York".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.risk.tz().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn test_config_validation_tls_pair() {
        let mut config = SafeCityConfig::default();
        config.server.tls_cert = Some("cert.pem".to_string());
        assert!(config.validate().is_err());

        config.server.tls_key = Some("key.pem".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = SafeCityConfig::default();
        config.upstream.overpass_url = "overpass-api.de".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("overpass_url"));
    }

    #[test]
    fn test_env_keys_fill_missing_only() {
        let mut config = SafeCityConfig::default();
        config.upstream.google_maps_api_key = Some("from_file".to_string());
        config.apply_env_keys(|name| match name {
            "OPENWEATHER_API_KEY" => Some("ow_key".to_string()),
            "GOOGLE_MAPS_API_KEY" => Some("gm_key".to_string()),
            _ => None,
        });

        assert_eq!(config.upstream.openweather_api_key.as_deref(), Some("ow_key"));
        assert_eq!(config.upstream.google_maps_api_key.as_deref(), Some("from_file"));
    }

    #[test]
    fn test_blank_keys_are_unset() {
        let mut config = SafeCityConfig::default();
        config.upstream.openweather_api_key = Some("  ".to_string());
        config.apply_defaults();
        assert!(config.upstream.openweather_api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[cache]\nrisk_ttl_seconds = 60\n\n[risk]\ntimezone = \"Europe/Berlin\""
        )
        .unwrap();

        let config = SafeCityConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cache.risk_ttl_seconds, 60);
        assert_eq!(config.cache.weather_ttl_seconds, 600);
        assert_eq!(config.risk.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_config_path_generation() {
        let path = SafeCityConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("safecity"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
