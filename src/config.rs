//! Configuration management for `LandmarkAI`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::LandmarkAiError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkAiConfig {
    /// Generative backend settings
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Photo recognition limits
    #[serde(default)]
    pub recognition: RecognitionConfig,
    /// Nearby search defaults
    #[serde(default)]
    pub search: SearchConfig,
    /// Landmark catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gemini API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; falls back to the `GEMINI_API_KEY` environment variable
    pub api_key: Option<String>,
    /// Base URL of the generative language API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Model used for every request
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Largest accepted photo, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_radius")]
    pub default_radius_km: f64,
    #[serde(default = "default_max_search_radius")]
    pub max_radius_km: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file replacing the built-in catalog
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Chat sessions unused for this long are discarded
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_timeout() -> u32 {
    30
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_search_radius() -> f64 {
    50.0
}

fn default_max_search_radius() -> f64 {
    1000.0
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_session_idle_timeout() -> u64 {
    30 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            timeout_seconds: default_gemini_timeout(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_search_radius(),
            max_radius_km: default_max_search_radius(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            session_idle_timeout_seconds: default_session_idle_timeout(),
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

impl LandmarkAiConfig {
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

        // Environment overrides, e.g. LANDMARKAI_GEMINI__MODEL
        builder = builder.add_source(
            Environment::with_prefix("LANDMARKAI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: LandmarkAiConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.gemini.api_key.is_none() {
            config.gemini.api_key = std::env::var("GEMINI_API_KEY").ok();
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("landmarkai").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.gemini.base_url.is_empty() {
            self.gemini.base_url = default_gemini_base_url();
        }
        if self.gemini.model.is_empty() {
            self.gemini.model = default_gemini_model();
        }
        if self.gemini.timeout_seconds == 0 {
            self.gemini.timeout_seconds = default_gemini_timeout();
        }
        if self.recognition.max_image_bytes == 0 {
            self.recognition.max_image_bytes = default_max_image_bytes();
        }
        if self.server.session_idle_timeout_seconds == 0 {
            self.server.session_idle_timeout_seconds = default_session_idle_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_key()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// An API key is optional here, but must look plausible when given
    pub fn validate_api_key(&self) -> Result<()> {
        if let Some(api_key) = &self.gemini.api_key {
            if api_key.trim().is_empty() {
                return Err(LandmarkAiError::config(
                    "Gemini API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.gemini.timeout_seconds > 300 {
            return Err(LandmarkAiError::config("Gemini timeout cannot exceed 300 seconds").into());
        }

        if self.recognition.max_image_bytes > 50 * 1024 * 1024 {
            return Err(LandmarkAiError::config("Maximum image size cannot exceed 50 MB").into());
        }

        if !(self.search.max_radius_km > 0.0 && self.search.max_radius_km <= 20_000.0) {
            return Err(LandmarkAiError::config(
                "Maximum search radius must be between 0 and 20000 km",
            )
            .into());
        }

        if !(self.search.default_radius_km > 0.0 && self.search.default_radius_km <= self.search.max_radius_km) {
            return Err(LandmarkAiError::config(
                "Default search radius must be positive and not exceed the maximum search radius",
            )
            .into());
        }

        if self.server.session_idle_timeout_seconds > 24 * 60 * 60 {
            return Err(LandmarkAiError::config("Session idle timeout cannot exceed 24 hours").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(LandmarkAiError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(LandmarkAiError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.gemini.base_url.starts_with("http://") && !self.gemini.base_url.starts_with("https://") {
            return Err(LandmarkAiError::config("Gemini base URL must be a valid HTTP or HTTPS URL").into());
        }

        Ok(())
    }
}
