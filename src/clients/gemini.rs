//! Gemini text generation over the Generative Language REST API

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{TextGenerator, build_http_client, check_status, transport_error};
use crate::config::GenerationConfig;
use crate::{FlightRiskError, Result};

const SERVICE: &str = "Gemini";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GeminiGenerator {
    /// Create a generator; returns `Unavailable` when no API key is configured
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FlightRiskError::unavailable("Text generation"))?;

        Ok(Self {
            client: build_http_client(SERVICE, config.timeout_seconds)?,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
        })
    }
}

impl TextGenerator for GeminiGenerator {
    #[instrument(skip_all, fields(prompt_chars = prompt.len()))]
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response)?;

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| FlightRiskError::parse(format!("Invalid Gemini response: {}", e.without_url())))?;
        let text = response_text(parsed)?;
        debug!("Gemini returned {} characters", text.len());
        Ok(text)
    }
}

fn response_text(response: GenerateResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| FlightRiskError::parse("Gemini returned no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FlightRiskError::parse(format!(
            "Gemini returned an empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text.trim().to_string())
}
