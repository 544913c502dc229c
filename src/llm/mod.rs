//! Language model backends
//!
//! Remote providers are composed into an ordered [`RemoteGeneratorChain`];
//! the local model server is wrapped by [`LocalGenerator`]. Both implement
//! [`Responder`](crate::dialogue::Responder) and never fail.

mod chain;
mod chat;
mod gemini;
mod ollama;

use async_trait::async_trait;

pub use chain::RemoteGeneratorChain;
pub use chat::ChatCompletionsProvider;
pub use gemini::GeminiProvider;
pub use ollama::LocalGenerator;

use crate::{Error, Result};

/// Reply given when every remote provider failed
pub const APOLOGY: &str = "I am sorry, I am currently unable to process your request.";

/// A single remote text-generation provider
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Generate a reply to `prompt`
    ///
    /// Any non-2xx status, transport error, timeout, or unparseable body is an error.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build an HTTP client with a per-request timeout
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("aiva/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Http)
}

/// Convert a non-success response into a generation error carrying the body
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Generation(format!("{provider} API error {status}: {body}")))
}

/// Reject blank model output
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::Generation(format!("{provider} returned no text"))),
    }
}
