//! Deterministic provider with fixed replies
//!
//! Used by tests and for running the service without network access. Every
//! query and label it receives is recorded so callers can assert on what the
//! pipeline asked for.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{AiError, WaterIntelligence};
use crate::models::AnalysisResult;

#[derive(Debug, Default)]
pub struct CannedIntelligence {
    city_reply: Option<String>,
    analysis: Option<AnalysisResult>,
    failing: bool,
    resolve_delay: Option<Duration>,
    resolve_queries: Mutex<Vec<String>>,
    analyzed_labels: Mutex<Vec<String>>,
}

impl CannedIntelligence {
    /// Provider that never matches a city and has no analysis
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `city` to every resolution request
    #[must_use]
    pub fn with_city_reply(mut self, city: impl Into<String>) -> Self {
        self.city_reply = Some(city.into());
        self
    }

    /// Return `analysis` for every label
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Wait `delay` before answering each resolution request
    #[must_use]
    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    /// Fail every call with an upstream error
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Queries passed to `resolve_city`, oldest first
    #[must_use]
    pub fn resolve_queries(&self) -> Vec<String> {
        self.resolve_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Labels passed to `analyze`, oldest first
    #[must_use]
    pub fn analyzed_labels(&self) -> Vec<String> {
        self.analyzed_labels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check(&self) -> Result<(), AiError> {
        if self.failing {
            Err(AiError::Upstream {
                status: 503,
                message: "canned failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl WaterIntelligence for CannedIntelligence {
    async fn resolve_city(
        &self,
        query: &str,
        _known_cities: &[&str],
    ) -> Result<Option<String>, AiError> {
        self.resolve_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.city_reply.clone())
    }

    async fn analyze(&self, location: &str) -> Result<Option<AnalysisResult>, AiError> {
        self.analyzed_labels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.to_string());
        self.check()?;
        Ok(self.analysis.clone())
    }
}
