//! Generative-analysis collaborator
//!
//! The hosted model is used for two things: mapping free text to one of the
//! supported cities, and producing a live water-safety summary with
//! citations. Both sit behind [`WaterIntelligence`] so the resolution
//! pipeline never depends on a particular provider.

pub mod canned;
pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::models::AnalysisResult;

pub use canned::CannedIntelligence;
pub use gemini::GeminiClient;

/// Errors raised by a generative-analysis provider
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider answered with a non-success status.
    #[error("Upstream error {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Provider refused the request (HTTP 403 / `PERMISSION_DENIED`).
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Message extracted from the error body.
        message: String,
    },

    /// Provider answered without any text.
    #[error("No text returned")]
    EmptyResponse,

    /// Client could not be built from its configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Capability interface to the hosted model.
#[async_trait::async_trait]
pub trait WaterIntelligence: Send + Sync {
    /// Map a free-text query to one of `known_cities`.
    ///
    /// Returns the provider's reply verbatim (trimmed) or `None` for "no
    /// match". Callers must validate the reply against the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the provider call fails.
    async fn resolve_city(
        &self,
        query: &str,
        known_cities: &[&str],
    ) -> Result<Option<String>, AiError>;

    /// Produce a live water-quality summary for a location label.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the provider call fails.
    async fn analyze(&self, location: &str) -> Result<Option<AnalysisResult>, AiError>;
}

/// Stand-in used when no API key is configured; every call is a quiet miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIntelligence;

#[async_trait::async_trait]
impl WaterIntelligence for DisabledIntelligence {
    async fn resolve_city(
        &self,
        _query: &str,
        _known_cities: &[&str],
    ) -> Result<Option<String>, AiError> {
        Ok(None)
    }

    async fn analyze(&self, _location: &str) -> Result<Option<AnalysisResult>, AiError> {
        Ok(None)
    }
}

/// Build the provider described by the configuration.
///
/// A missing API key or a client that cannot be built degrades to
/// [`DisabledIntelligence`] rather than failing startup.
#[must_use]
pub fn from_config(config: &AiConfig) -> Arc<dyn WaterIntelligence> {
    let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) else {
        warn!("API key is not configured. AI features will be limited.");
        return Arc::new(DisabledIntelligence);
    };

    match GeminiClient::new(config, api_key) {
        Ok(client) => {
            info!(model = %config.model, "Generative analysis enabled");
            Arc::new(client)
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize generative analysis client");
            Arc::new(DisabledIntelligence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_intelligence_is_silent() {
        let ai = DisabledIntelligence;
        assert_eq!(ai.resolve_city("BZU", &["Multan"]).await.unwrap(), None);
        assert_eq!(ai.analyze("Multan, Pakistan").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_disables_provider() {
        let config = AiConfig {
            api_key: None,
            ..AiConfig::default()
        };
        let ai = from_config(&config);
        assert_eq!(ai.analyze("Lahore, Pakistan").await.unwrap(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = AiError::Upstream {
            status: 500,
            message: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error 500: internal");
        assert_eq!(AiError::EmptyResponse.to_string(), "No text returned");
    }
}
