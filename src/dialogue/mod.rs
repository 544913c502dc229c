//! Mode-adaptive dialogue loop
//!
//! Every turn probes connectivity, picks the matching listen/respond strategy
//! pair, and then runs listen → respond → speak. All values here live for a
//! single turn; nothing survives into the next one.

mod orchestrator;
mod strategy;

pub use orchestrator::{DialogueOrchestrator, TurnOutcome};
pub use strategy::{Listener, Responder, Strategies, Strategy};

use crate::connectivity::ConnectivityState;

/// Stage of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Probe,
    Listen,
    Think,
    Speak,
    Idle,
}

impl TurnStage {
    /// Lowercase name for logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Listen => "listen",
            Self::Think => "think",
            Self::Speak => "speak",
            Self::Idle => "idle",
        }
    }
}

/// Where a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceSource {
    Local,
    Remote,
}

/// Recognized text for one turn
///
/// Blank text means no speech was detected and ends the turn early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    source: UtteranceSource,
}

impl Utterance {
    #[must_use]
    pub fn new(text: impl Into<String>, source: UtteranceSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn source(&self) -> UtteranceSource {
        self.source
    }

    /// True if nothing but whitespace was recognized
    #[must_use]
    pub fn is_silence(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Which link of the response chain produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyProvider {
    Local,
    RemotePrimary,
    RemoteSecondary,
    FallbackMessage,
}

impl ReplyProvider {
    /// Stable lowercase name for logs and CLI output
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RemotePrimary => "remote_primary",
            Self::RemoteSecondary => "remote_secondary",
            Self::FallbackMessage => "fallback_message",
        }
    }
}

/// Generated answer for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    text: String,
    provider: ReplyProvider,
}

impl Reply {
    #[must_use]
    pub fn new(text: impl Into<String>, provider: ReplyProvider) -> Self {
        Self {
            text: text.into(),
            provider,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn provider(&self) -> ReplyProvider {
        self.provider
    }
}

/// Everything one completed turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub connectivity: ConnectivityState,
    pub utterance: Utterance,
    pub reply: Reply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_detection() {
        assert!(Utterance::new("", UtteranceSource::Local).is_silence());
        assert!(Utterance::new(" \t\n ", UtteranceSource::Remote).is_silence());
        assert!(!Utterance::new(" hi ", UtteranceSource::Remote).is_silence());
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(TurnStage::Think.label(), "think");
        assert_eq!(TurnStage::Listen.label(), "listen");
    }

    #[test]
    fn test_provider_labels() {
        assert_eq!(ReplyProvider::RemoteSecondary.label(), "remote_secondary");
        assert_eq!(ReplyProvider::FallbackMessage.label(), "fallback_message");
    }
}
