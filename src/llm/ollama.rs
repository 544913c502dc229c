//! Local model server (Ollama `/api/generate`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client};
use crate::config::EndpointConfig;
use crate::dialogue::{Reply, ReplyProvider, Responder, TurnStage};
use crate::{Error, Result};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Offline responder backed by a loopback model server
///
/// There is nothing to fall back to when offline, so every fault becomes a
/// short diagnostic reply.
pub struct LocalGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl LocalGenerator {
    /// Create a local generator
    ///
    /// # Errors
    ///
    /// Returns error if no model is configured or the HTTP client cannot be built
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let model = endpoint
            .model
            .clone()
            .ok_or_else(|| Error::Config("local model required".to_string()))?;

        Ok(Self {
            client: http_client(endpoint.timeout)?,
            base_url: endpoint.base_url.clone(),
            model,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!(model = %self.model, "requesting local completion");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let response = check_status("ollama", response).await?;
        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

#[async_trait]
impl Responder for LocalGenerator {
    async fn respond(&self, text: &str) -> Reply {
        match self.generate(text).await {
            Ok(reply) => Reply::new(reply, ReplyProvider::Local),
            Err(e) => {
                tracing::warn!(
                    stage = TurnStage::Think.label(),
                    provider = "ollama",
                    error = %e,
                    "local model failed"
                );
                Reply::new(format!("Offline model error: {e}"), ReplyProvider::FallbackMessage)
            }
        }
    }
}
