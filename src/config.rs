//! Configuration management for the `Volumatic` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::VolumaticError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Root configuration structure for the `Volumatic` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumaticConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Generative analysis configuration
    #[serde(default)]
    pub ai: AiConfig,
    /// Geolocation matching configuration
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory with a prebuilt frontend to serve for non-API paths
    #[serde(default)]
    pub static_dir: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// PEM certificate for HTTPS
    #[serde(default)]
    pub tls_cert_path: Option<String>,
    /// PEM private key for HTTPS
    #[serde(default)]
    pub tls_key_path: Option<String>,
}

/// Generative analysis provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider API key; AI features are disabled without one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for both resolution and analysis
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Base URL of the provider API
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u32,
}

/// Geolocation matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// A nearest city within this distance counts as the user's city
    #[serde(default = "default_exact_match_radius")]
    pub exact_match_radius_km: f64,
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
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    60
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_timeout() -> u32 {
    30
}

fn default_exact_match_radius() -> f64 {
    20.0
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
            host: default_server_host(),
            port: default_server_port(),
            static_dir: None,
            request_timeout_seconds: default_request_timeout(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            base_url: default_ai_base_url(),
            timeout_seconds: default_ai_timeout(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            exact_match_radius_km: default_exact_match_radius(),
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

impl VolumaticConfig {
    /// Load configuration from the given file, or the default location when
    /// `None`, with environment variable overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        load_dotenv();

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

        // Add environment variable overrides, e.g. VOLUMATIC_SERVER__PORT
        builder = builder.add_source(
            Environment::with_prefix("VOLUMATIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: VolumaticConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Conventional key variables used by hosted deployments
        if config.ai.api_key.is_none() {
            config.ai.api_key = std::env::var("API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok();
        }

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("volumatic").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.ai.model.is_empty() {
            self.ai.model = default_ai_model();
        }
        if self.ai.base_url.is_empty() {
            self.ai.base_url = default_ai_base_url();
        }
        if self.ai.timeout_seconds == 0 {
            self.ai.timeout_seconds = default_ai_timeout();
        }
        if self.ai.api_key.as_deref().is_some_and(str::is_empty) {
            self.ai.api_key = None;
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
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_tls()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(VolumaticError::config("Server port must be greater than 0").into());
        }

        if self.server.request_timeout_seconds > 300 {
            return Err(
                VolumaticError::config("Request timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.ai.timeout_seconds > 300 {
            return Err(VolumaticError::config("AI timeout cannot exceed 300 seconds").into());
        }

        let radius = self.geolocation.exact_match_radius_km;
        if !radius.is_finite() || radius <= 0.0 || radius > 500.0 {
            return Err(VolumaticError::config(format!(
                "Exact match radius must be between 0 and 500 km, got: {radius}"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(VolumaticError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(VolumaticError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://")
        {
            return Err(
                VolumaticError::config("AI base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }

    /// Certificate and key must be configured together
    fn validate_tls(&self) -> Result<()> {
        match (&self.server.tls_cert_path, &self.server.tls_key_path) {
            (Some(_), None) | (None, Some(_)) => Err(VolumaticError::config(
                "TLS requires both tls_cert_path and tls_key_path",
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// Load `.env` into the process environment when one is present
fn load_dotenv() {
    let result = dotenvy::dotenv();
    if let Ok(path) = &result {
        debug!("Loaded environment from {}", path.display());
    }
    if let Some(problem) = dotenv_problem(result) {
        warn!("Ignoring .env file: {problem}");
    }
}

/// A missing file is the normal case; anything else is worth reporting
fn dotenv_problem(result: std::result::Result<PathBuf, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = VolumaticConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ai.model, "gemini-2.5-flash");
        assert_eq!(config.ai.timeout_seconds, 30);
        assert_eq!(config.geolocation.exact_match_radius_km, 20.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.ai.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = VolumaticConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = VolumaticConfig::default();
        config.ai.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = VolumaticConfig::default();
        config.geolocation.exact_match_radius_km = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_tls_pair() {
        let mut config = VolumaticConfig::default();
        config.server.tls_cert_path = Some("cert.pem".to_string());
        assert!(config.validate().is_err());

        config.server.tls_key_path = Some("key.pem".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_defaults_clears_empty_key() {
        let mut config = VolumaticConfig::default();
        config.ai.api_key = Some(String::new());
        config.ai.model = String::new();
        config.apply_defaults();
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[geolocation]\nexact_match_radius_km = 15.5\n"
        )
        .unwrap();

        let config = VolumaticConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.geolocation.exact_match_radius_km, 15.5);
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_environment_variable_override() {
        // SAFETY: Test environment, setting test values only
        unsafe {
            env::set_var("VOLUMATIC_LOGGING__FORMAT", "json");
        }

        let result = VolumaticConfig::load_from_path(Some(PathBuf::from("does-not-exist.toml")));

        // SAFETY: Test cleanup
        unsafe {
            env::remove_var("VOLUMATIC_LOGGING__FORMAT");
        }

        assert_eq!(result.unwrap().logging.format, "json");
    }

    #[test]
    fn test_dotenv_problems() {
        assert!(dotenv_problem(Ok(PathBuf::from(".env"))).is_none());

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no .env");
        assert!(dotenv_problem(Err(dotenvy::Error::Io(missing))).is_none());

        let unreadable = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(dotenv_problem(Err(dotenvy::Error::Io(unreadable))).is_some());

        let malformed = dotenvy::Error::LineParse("API_KEY abc".to_string(), 7);
        assert!(dotenv_problem(Err(malformed)).is_some());
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = VolumaticConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("volumatic"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
