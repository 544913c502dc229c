//! OpenAI-compatible chat completions provider (Groq by default)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{TextProvider, check_status, http_client, non_empty};
use crate::config::ChatEndpointConfig;
use crate::{Error, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions provider sending the persona as a system message
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<SecretString>,
    persona: String,
}

impl ChatCompletionsProvider {
    /// Create a chat completions provider
    ///
    /// # Errors
    ///
    /// Returns error if no model is configured or the HTTP client cannot be built
    pub fn new(
        config: &ChatEndpointConfig,
        api_key: Option<SecretString>,
        persona: impl Into<String>,
    ) -> Result<Self> {
        let model = config
            .endpoint
            .model
            .clone()
            .ok_or_else(|| Error::Config("chat completions model required".to_string()))?;

        Ok(Self {
            client: http_client(config.endpoint.timeout)?,
            base_url: config.endpoint.base_url.clone(),
            model,
            temperature: config.temperature,
            api_key,
            persona: persona.into(),
        })
    }
}

#[async_trait]
impl TextProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("GROQ_API_KEY not set".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.persona,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, "requesting chat completion");

        let response = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .json(&request)
            .send()
            .await?;

        let response = check_status(self.name(), response).await?;
        let result: ChatResponse = response.json().await?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        non_empty(self.name(), text)
    }
}
