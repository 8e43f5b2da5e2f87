//! Configuration management for the flight assistant
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AssistantError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "FLIGHTCHAT_CONFIG";

/// Root configuration structure for the flight assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Flight search provider configuration
    pub provider: ProviderConfig,
    /// AI dialogue engine configuration
    pub dialogue: DialogueConfig,
    /// Static data locations
    pub data: DataConfig,
    /// Default search settings
    pub defaults: DefaultsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Flight search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider API key; searches fail without a call when absent
    pub api_key: Option<String>,
    /// Base URL for the search endpoint
    pub base_url: String,
    /// Search engine identifier sent with every request
    pub engine: String,
    /// Currency for prices
    pub currency: String,
    /// Overall timeout for a single dated search, in seconds
    pub timeout_seconds: u64,
    /// Number of consecutive dates tried when no departure date is given
    pub date_attempts: u32,
    /// Retries for transient transport failures within a single attempt
    pub transport_retries: u32,
    /// Timeout for each individual HTTP request, in seconds
    pub request_timeout_seconds: u64,
}

/// AI dialogue engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Whether the AI path should be used when a key is available
    pub enabled: bool,
    /// Dialogue engine API key
    pub api_key: Option<String>,
    /// Base URL for the models endpoint
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Static data file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Airport gazetteer JSON
    pub airports_path: PathBuf,
    /// Response templates JSON
    pub responses_path: PathBuf,
}

/// Default search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Origin airports used when the message names none
    pub home_airports: Vec<String>,
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

// Default value functions
fn default_provider_base_url() -> String {
    "https://serpapi.com/search.json".to_string()
}

fn default_provider_engine() -> String {
    "google_flights".to_string()
}

fn default_currency() -> String {
    "GBP".to_string()
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_date_attempts() -> u32 {
    5
}

fn default_transport_retries() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_dialogue_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_dialogue_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_dialogue_timeout() -> u64 {
    30
}

fn default_airports_path() -> PathBuf {
    PathBuf::from("data/airports.json")
}

fn default_responses_path() -> PathBuf {
    PathBuf::from("data/responses.json")
}

fn default_home_airports() -> Vec<String> {
    vec!["LGW".to_string(), "LHR".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_base_url(),
            engine: default_provider_engine(),
            currency: default_currency(),
            timeout_seconds: default_provider_timeout(),
            date_attempts: default_date_attempts(),
            transport_retries: default_transport_retries(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_dialogue_base_url(),
            model: default_dialogue_model(),
            timeout_seconds: default_dialogue_timeout(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            airports_path: default_airports_path(),
            responses_path: default_responses_path(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            home_airports: default_home_airports(),
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

impl AssistantConfig {
    /// Load configuration from the default location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("config/default.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. FLIGHTCHAT_PROVIDER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("FLIGHTCHAT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("defaults.home_airports")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AssistantConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_credential_env();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Fall back to the conventional credential variables
    fn apply_credential_env(&mut self) {
        if self.provider.api_key.is_none() {
            self.provider.api_key = std::env::var("SERPAPI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty());
        }
        if self.dialogue.api_key.is_none() {
            self.dialogue.api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty());
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.provider.base_url.is_empty() {
            self.provider.base_url = default_provider_base_url();
        }
        if self.provider.engine.is_empty() {
            self.provider.engine = default_provider_engine();
        }
        if self.provider.currency.is_empty() {
            self.provider.currency = default_currency();
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = default_provider_timeout();
        }
        if self.provider.date_attempts == 0 {
            self.provider.date_attempts = default_date_attempts();
        }
        if self.provider.request_timeout_seconds == 0 {
            self.provider.request_timeout_seconds = default_request_timeout();
        }
        if self.dialogue.base_url.is_empty() {
            self.dialogue.base_url = default_dialogue_base_url();
        }
        if self.dialogue.model.is_empty() {
            self.dialogue.model = default_dialogue_model();
        }
        if self.dialogue.timeout_seconds == 0 {
            self.dialogue.timeout_seconds = default_dialogue_timeout();
        }
        if self.defaults.home_airports.is_empty() {
            self.defaults.home_airports = default_home_airports();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Whether the AI dialogue engine can be used
    #[must_use]
    pub fn dialogue_available(&self) -> bool {
        self.dialogue.enabled && self.dialogue.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.provider.api_key {
            if api_key.trim().is_empty() {
                return Err(AssistantError::config(
                    "Provider API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }

        if let Some(api_key) = &self.dialogue.api_key {
            if api_key.trim().is_empty() {
                return Err(AssistantError::config(
                    "Dialogue API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 120 {
            return Err(
                AssistantError::config("Provider timeout cannot exceed 120 seconds").into(),
            );
        }

        if self.provider.date_attempts > 14 {
            return Err(AssistantError::config("Date attempts cannot exceed 14").into());
        }

        if self.provider.transport_retries > 5 {
            return Err(AssistantError::config("Transport retries cannot exceed 5").into());
        }

        if self.dialogue.timeout_seconds > 300 {
            return Err(
                AssistantError::config("Dialogue timeout cannot exceed 300 seconds").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AssistantError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AssistantError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (label, url) in [
            ("Provider", &self.provider.base_url),
            ("Dialogue", &self.dialogue.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AssistantError::config(format!(
                    "{label} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if let Some(code) = self
            .defaults
            .home_airports
            .iter()
            .find(|c| c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_alphabetic()))
        {
            return Err(AssistantError::config(format!(
                "Home airport '{code}' is not a three-letter IATA code"
            ))
            .into());
        }

        Ok(())
    }
}
