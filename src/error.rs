//! Error types and handling for the `Volumatic` application

use thiserror::Error;

/// Main error type for the `Volumatic` application
#[derive(Error, Debug)]
pub enum VolumaticError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A requested city or area is not in the dataset
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The geolocation provider refused or failed to supply a position
    #[error("Geolocation unavailable: {message}")]
    GeolocationDenied { message: String },

    /// Bundled dataset could not be loaded
    #[error("Dataset error: {message}")]
    Dataset { message: String },
}

impl VolumaticError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new geolocation error
    pub fn geolocation_denied<S: Into<String>>(message: S) -> Self {
        Self::GeolocationDenied {
            message: message.into(),
        }
    }

    /// Create a new dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            VolumaticError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            VolumaticError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            VolumaticError::NotFound { message } => message.clone(),
            VolumaticError::GeolocationDenied { .. } => {
                "Location access denied. Please select a city manually.".to_string()
            }
            VolumaticError::Dataset { .. } => {
                "Water quality records are unavailable.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = VolumaticError::config("missing API key");
        assert!(matches!(config_err, VolumaticError::Config { .. }));

        let validation_err = VolumaticError::validation("empty query");
        assert!(matches!(validation_err, VolumaticError::Validation { .. }));

        let not_found = VolumaticError::not_found("Unknown city: Atlantis");
        assert!(matches!(not_found, VolumaticError::NotFound { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = VolumaticError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let validation_err = VolumaticError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let denied = VolumaticError::geolocation_denied("permission denied");
        assert_eq!(
            denied.user_message(),
            "Location access denied. Please select a city manually."
        );

        let not_found = VolumaticError::not_found("Unknown city: Atlantis");
        assert_eq!(not_found.user_message(), "Unknown city: Atlantis");
    }
}
