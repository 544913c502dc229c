//! Google Gemini `generateContent` provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{TextProvider, check_status, http_client, non_empty};
use crate::config::EndpointConfig;
use crate::{Error, Result};

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

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini provider; the persona is folded into the single prompt field
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    persona: String,
}

impl GeminiProvider {
    /// Create a Gemini provider
    ///
    /// A missing key is not an error here; every request fails instead so the
    /// chain falls through to the next provider.
    ///
    /// # Errors
    ///
    /// Returns error if no model is configured or the HTTP client cannot be built
    pub fn new(
        endpoint: &EndpointConfig,
        api_key: Option<SecretString>,
        persona: impl Into<String>,
    ) -> Result<Self> {
        let model = endpoint
            .model
            .clone()
            .ok_or_else(|| Error::Config("Gemini model required".to_string()))?;

        Ok(Self {
            client: http_client(endpoint.timeout)?,
            base_url: endpoint.base_url.clone(),
            model,
            api_key,
            persona: persona.into(),
        })
    }

    fn combined_prompt(&self, prompt: &str) -> String {
        format!("{}\n\nStudent: {prompt}", self.persona)
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let combined = self.combined_prompt(prompt);
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &combined }],
            }],
        };

        let url = format!("{}/v1/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!(model = %self.model, "requesting Gemini completion");

        // Drop the URL from transport errors: it carries the key
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let response = check_status(self.name(), response).await?;
        let result: GenerateResponse = response.json().await.map_err(reqwest::Error::without_url)?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text);

        non_empty(self.name(), text)
    }
}
