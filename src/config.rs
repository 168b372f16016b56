//! Configuration management for the flight risk pipeline
//!
//! Handles loading configuration from files and environment variables and
//! validates every setting before any collaborator is constructed.
//! Credentials are only ever read from configuration or the environment.

use crate::FlightRiskError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightRiskConfig {
    /// Flight and weather search provider (SerpAPI)
    pub search: SearchConfig,
    /// Text-generation service (Gemini)
    pub generation: GenerationConfig,
    /// Analytics warehouse (BigQuery)
    pub warehouse: WarehouseConfig,
    /// Analysis behaviour
    pub analysis: AnalysisConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Timeout for flight searches in seconds
    pub flights_timeout_seconds: u32,
    /// Timeout for weather searches in seconds
    pub weather_timeout_seconds: u32,
    pub currency: String,
    pub locale: String,
}

/// Text-generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u32,
}

/// Analytics warehouse settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub project_id: Option<String>,
    pub dataset: String,
    pub table: String,
    /// Yearly on-time performance tables in the same dataset
    pub performance_tables: Vec<String>,
    /// OAuth2 bearer token for the warehouse REST API
    pub access_token: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u32,
}

/// Analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum number of flights returned from a route search
    pub max_flights: u32,
    /// Flights departing within this many days use live weather
    pub realtime_weather_days: i64,
    /// Use the duration-bucket heuristic when the batch layover call fails
    pub batch_heuristic_fallback: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

fn default_search_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_warehouse_base_url() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_base_url(),
            flights_timeout_seconds: 30,
            weather_timeout_seconds: 10,
            currency: "USD".to_string(),
            locale: "en".to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_generation_base_url(),
            timeout_seconds: 60,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset: "airline_data".to_string(),
            table: "flight_data".to_string(),
            performance_tables: ["flights_2016", "flights_2017", "flights_2018"]
                .map(String::from)
                .to_vec(),
            access_token: None,
            base_url: default_warehouse_base_url(),
            timeout_seconds: 30,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_flights: 10,
            realtime_weather_days: 7,
            batch_heuristic_fallback: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl FlightRiskConfig {
    /// Load configuration from the default file location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

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

        // FLIGHTRISK_SEARCH__API_KEY -> search.api_key
        builder = builder.add_source(
            Environment::with_prefix("FLIGHTRISK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: FlightRiskConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.apply_credential_env();

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flightrisk").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.generation.base_url.is_empty() {
            self.generation.base_url = default_generation_base_url();
        }
        if self.generation.model.is_empty() {
            self.generation.model = default_model();
        }
        if self.warehouse.base_url.is_empty() {
            self.warehouse.base_url = default_warehouse_base_url();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Fill absent credentials from the conventional environment variables
    pub fn apply_credential_env(&mut self) {
        fill_from_env(&mut self.search.api_key, "SERPAPI_API_KEY");
        fill_from_env(&mut self.generation.api_key, "GOOGLE_API_KEY");
        fill_from_env(&mut self.warehouse.access_token, "BIGQUERY_ACCESS_TOKEN");
        fill_from_env(&mut self.warehouse.project_id, "GOOGLE_CLOUD_PROJECT");
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials that are present
    pub fn validate_api_keys(&self) -> Result<()> {
        validate_secret("Search API key", self.search.api_key.as_deref())?;
        validate_secret("Generation API key", self.generation.api_key.as_deref())?;
        validate_secret("Warehouse access token", self.warehouse.access_token.as_deref())?;
        Ok(())
    }

    /// The search provider is the one collaborator the pipeline cannot run without
    pub fn require_search_api_key(&self) -> crate::Result<&str> {
        self.search.api_key.as_deref().ok_or_else(|| {
            FlightRiskError::config(
                "Search API key is required. Set FLIGHTRISK_SEARCH__API_KEY or SERPAPI_API_KEY.",
            )
        })
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("Search flights timeout", self.search.flights_timeout_seconds),
            ("Search weather timeout", self.search.weather_timeout_seconds),
            ("Generation timeout", self.generation.timeout_seconds),
            ("Warehouse timeout", self.warehouse.timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds == 0 || seconds > 300 {
                return Err(FlightRiskError::config(format!(
                    "{name} must be between 1 and 300 seconds"
                ))
                .into());
            }
        }

        if self.analysis.max_flights == 0 || self.analysis.max_flights > 100 {
            return Err(
                FlightRiskError::config("Maximum flights must be between 1 and 100").into(),
            );
        }

        if !(0..=16).contains(&self.analysis.realtime_weather_days) {
            return Err(FlightRiskError::config(
                "Real-time weather window must be between 0 and 16 days",
            )
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(FlightRiskError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(FlightRiskError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Search", &self.search.base_url),
            ("Generation", &self.generation.base_url),
            ("Warehouse", &self.warehouse.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(FlightRiskError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.is_none() {
        if let Ok(value) = env::var(var) {
            if !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
    }
}

fn validate_secret(name: &str, secret: Option<&str>) -> Result<()> {
    let Some(secret) = secret else {
        return Ok(());
    };

    if secret.trim().is_empty() {
        return Err(FlightRiskError::config(format!(
            "{name} cannot be empty if provided. Either remove it or provide a valid key."
        ))
        .into());
    }

    if secret.len() < 8 {
        return Err(FlightRiskError::config(format!(
            "{name} appears to be invalid (too short). Please check it."
        ))
        .into());
    }

    Ok(())
}
