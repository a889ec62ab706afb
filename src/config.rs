//! Configuration management for the `TripSmith` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TripSmithError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `TripSmith` service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TripSmithConfig {
    /// Draft generator (Ollama) configuration
    pub generator: GeneratorConfig,
    /// Amadeus pricing/airport API configuration
    pub amadeus: AmadeusConfig,
    /// Airport resolution source selection
    pub airports: AirportsConfig,
    /// Validation pipeline tuning
    pub validation: ValidationConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Lookup cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Draft generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the Ollama server
    pub base_url: String,
    /// Model used for itinerary drafting
    pub model: String,
    /// Upper bound on one inference call, in seconds
    pub timeout_seconds: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_seconds: 600,
        }
    }
}

/// Amadeus API settings; the test API works without payment but needs
/// credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmadeusConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient request failures
    pub max_retries: u32,
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: "https://test.api.amadeus.com".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

/// Which airport resolver backs city lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportsConfig {
    /// "amadeus" (live) or "directory" (bundled offline extract)
    pub source: String,
    /// Optional external extract overriding the bundled one
    pub data_file: Option<String>,
}

impl Default for AirportsConfig {
    fn default() -> Self {
        Self {
            source: "amadeus".to_string(),
            data_file: None,
        }
    }
}

/// Validation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Flat nominal cost applied to train and bus segments
    pub surface_transport_cost: f64,
    /// Days between "now" and the first departure date
    pub lead_time_days: u32,
    /// Bound on generate+validate attempts per request
    pub max_attempts: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            surface_transport_cost: 50.0,
            lead_time_days: 7,
            max_attempts: 3,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Whole-request timeout; generation can legitimately take minutes
    pub request_timeout_seconds: u32,
    /// Request body size limit in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            request_timeout_seconds: 600,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Lookup cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Fare cache TTL in hours
    pub ttl_hours: u32,
    /// Cache directory location
    pub location: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 6,
            location: "~/.cache/tripsmith".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl TripSmithConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

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

        // Add environment variable overrides with TRIPSMITH_ prefix
        builder = builder.add_source(
            Environment::with_prefix("TRIPSMITH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: TripSmithConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tripsmith").join("config.toml"))
    }

    /// Resolve the cache directory, expanding a leading `~`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(rest) = self.cache.location.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.cache.location)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API credentials
    pub fn validate_credentials(&self) -> Result<()> {
        if let Some(client_id) = &self.amadeus.client_id {
            if client_id.is_empty() {
                return Err(TripSmithError::config(
                    "Amadeus client id cannot be empty if provided. Either remove it or provide a valid id."
                ).into());
            }
        }
        if let Some(client_secret) = &self.amadeus.client_secret {
            if client_secret.is_empty() {
                return Err(TripSmithError::config(
                    "Amadeus client secret cannot be empty if provided. Either remove it or provide a valid secret."
                ).into());
            }
        }
        if self.amadeus.client_id.is_some() != self.amadeus.client_secret.is_some() {
            return Err(TripSmithError::config(
                "Amadeus client id and secret must be provided together",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.amadeus.timeout_seconds == 0 || self.amadeus.timeout_seconds > 300 {
            return Err(TripSmithError::config(
                "Amadeus API timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.amadeus.max_retries > 10 {
            return Err(
                TripSmithError::config("Amadeus API max retries cannot exceed 10").into(),
            );
        }

        if self.generator.timeout_seconds == 0 {
            return Err(TripSmithError::config("Generator timeout cannot be zero").into());
        }

        if self.validation.max_attempts == 0 || self.validation.max_attempts > 10 {
            return Err(TripSmithError::config(
                "Validation max attempts must be between 1 and 10",
            )
            .into());
        }

        if self.validation.surface_transport_cost < 0.0 {
            return Err(TripSmithError::config(
                "Surface transport cost cannot be negative",
            )
            .into());
        }

        if self.cache.ttl_hours == 0 || self.cache.ttl_hours > 168 {
            return Err(TripSmithError::config(
                "Cache TTL must be between 1 and 168 hours (1 week)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TripSmithError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TripSmithError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_airport_sources = ["amadeus", "directory"];
        if !valid_airport_sources.contains(&self.airports.source.as_str()) {
            return Err(TripSmithError::config(format!(
                "Invalid airport source '{}'. Must be one of: {}",
                self.airports.source,
                valid_airport_sources.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Generator", &self.generator.base_url),
            ("Amadeus", &self.amadeus.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TripSmithError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Create configuration directory if it doesn't exist
    pub fn ensure_config_dir() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let tripsmith_config_dir = config_dir.join("tripsmith");
            std::fs::create_dir_all(&tripsmith_config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    tripsmith_config_dir.display()
                )
            })?;
            Ok(tripsmith_config_dir)
        } else {
            Err(TripSmithError::config("Unable to determine config directory").into())
        }
    }
}
