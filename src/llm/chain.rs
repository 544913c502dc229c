//! Ordered fallback over remote providers

use async_trait::async_trait;

use super::{APOLOGY, TextProvider};
use crate::dialogue::{Reply, ReplyProvider, Responder, TurnStage};

/// Tries remote providers strictly in priority order, one at a time
///
/// The first provider's success is tagged [`ReplyProvider::RemotePrimary`],
/// any later one [`ReplyProvider::RemoteSecondary`]. If every provider fails
/// the fixed apology is returned.
pub struct RemoteGeneratorChain {
    providers: Vec<Box<dyn TextProvider>>,
}

impl RemoteGeneratorChain {
    /// Create a chain from a primary and a secondary provider
    #[must_use]
    pub fn new(primary: Box<dyn TextProvider>, secondary: Box<dyn TextProvider>) -> Self {
        Self {
            providers: vec![primary, secondary],
        }
    }

    /// Append a lower-priority provider
    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn TextProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Provider names in priority order
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl Responder for RemoteGeneratorChain {
    async fn respond(&self, text: &str) -> Reply {
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.generate(text).await {
                Ok(reply) => {
                    let tag = if index == 0 {
                        ReplyProvider::RemotePrimary
                    } else {
                        ReplyProvider::RemoteSecondary
                    };
                    return Reply::new(reply, tag);
                }
                Err(e) => {
                    tracing::warn!(
                        stage = TurnStage::Think.label(),
                        provider = provider.name(),
                        error = %e,
                        "provider failed"
                    );
                }
            }
        }

        tracing::error!(stage = TurnStage::Think.label(), "all remote providers failed");
        Reply::new(APOLOGY, ReplyProvider::FallbackMessage)
    }
}
