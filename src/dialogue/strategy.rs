//! Listen/respond capabilities and their per-connectivity pairing

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Reply, Utterance};
use crate::Result;
use crate::connectivity::ConnectivityState;

/// Turns captured audio into text
///
/// Implementations hold audio device handles, which are not `Send`, so the
/// returned future is not either. The dialogue loop runs on one task.
#[async_trait(?Send)]
pub trait Listener {
    /// Capture one utterance
    ///
    /// Returns an empty utterance when nothing was said. Implementations that
    /// may block indefinitely must return [`Error::Cancelled`](crate::Error::Cancelled)
    /// once `cancel` fires.
    async fn listen(&mut self, cancel: &CancellationToken) -> Result<Utterance>;
}

/// Turns a prompt into a reply
///
/// Never fails: every fault is folded into a
/// [`ReplyProvider::FallbackMessage`](super::ReplyProvider::FallbackMessage) reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, text: &str) -> Reply;
}

/// The listener and responder used together for one connectivity state
pub struct Strategy {
    pub listener: Box<dyn Listener>,
    pub responder: Box<dyn Responder>,
}

impl Strategy {
    #[must_use]
    pub fn new(listener: Box<dyn Listener>, responder: Box<dyn Responder>) -> Self {
        Self {
            listener,
            responder,
        }
    }
}

/// Remote and local strategy pairs
pub struct Strategies {
    pub online: Strategy,
    pub offline: Strategy,
}

impl Strategies {
    /// Pick the pair for this turn's connectivity
    pub fn select(&mut self, state: ConnectivityState) -> &mut Strategy {
        match state {
            ConnectivityState::Online => &mut self.online,
            ConnectivityState::Offline => &mut self.offline,
        }
    }
}
