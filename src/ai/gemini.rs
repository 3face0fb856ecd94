//! Google Gemini provider implementation.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{AiError, WaterIntelligence, prompt};
use crate::config::AiConfig;
use crate::models::{AnalysisResult, Source};

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Creates a new client for the configured model.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &AiConfig, api_key: &str) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("Volumatic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AiError::Config {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(
        &self,
        prompt: &str,
        with_search: bool,
    ) -> Result<GenerateContentResponse, AiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            tools: if with_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            with_search,
            "Gemini response received"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl WaterIntelligence for GeminiClient {
    #[instrument(skip(self, known_cities), fields(model = %self.model))]
    async fn resolve_city(
        &self,
        query: &str,
        known_cities: &[&str],
    ) -> Result<Option<String>, AiError> {
        let prompt = prompt::city_resolution(query, known_cities);
        let response = self.generate(&prompt, false).await?;
        let reply = response.text().and_then(|text| interpret_city_reply(&text));
        debug!(?reply, "City resolution reply");
        Ok(reply)
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn analyze(&self, location: &str) -> Result<Option<AnalysisResult>, AiError> {
        let prompt = prompt::water_quality_analysis(location);

        match self.generate(&prompt, true).await {
            Ok(response) => {
                let text = response.text().ok_or(AiError::EmptyResponse)?;
                Ok(Some(AnalysisResult::new(text, response.sources())))
            }
            Err(AiError::PermissionDenied { message }) => {
                warn!(%message, "Live search not permitted, falling back to model knowledge");
                let degraded = format!("{prompt}{}", prompt::OFFLINE_NOTE);
                match self.generate(&degraded, false).await {
                    Ok(response) => Ok(response
                        .text()
                        .map(|text| AnalysisResult::new(text, Vec::new()))),
                    Err(e) => {
                        warn!(error = %e, "Degraded analysis failed");
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Reads the resolver's answer; empty or "null" means no match.
fn interpret_city_reply(text: &str) -> Option<String> {
    let reply = text.trim();
    if reply.is_empty() || reply.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(reply.to_string())
    }
}

fn upstream_error(status: u16, body: &str) -> AiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| body.chars().take(512).collect());
    let denied = status == 403
        || envelope
            .as_ref()
            .and_then(|e| e.error.status.as_deref())
            .is_some_and(|s| s == "PERMISSION_DENIED");

    if denied {
        AiError::PermissionDenied { message }
    } else {
        AiError::Upstream { status, message }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, or `None` when it has none
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() { None } else { Some(text) }
    }

    /// Web citations of the first candidate that carry both a URI and a title
    fn sources(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| match (&web.title, &web.uri) {
                        (Some(title), Some(uri)) if !title.is_empty() && !uri.is_empty() => {
                            Some(Source::new(title.clone(), uri.clone()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
