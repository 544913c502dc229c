//! AIVA - connectivity-adaptive voice assistant
//!
//! This library provides the building blocks of the assistant:
//! - Connectivity probing that picks the turn strategy
//! - Remote (Deepgram) and offline (Vosk) speech recognition
//! - Remote (Gemini, Groq) and local (Ollama) reply generation
//! - Piper speech synthesis and playback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Dialogue Orchestrator                │
//! │   PROBE → LISTEN → THINK → SPEAK (or IDLE) → PROBE  │
//! └───────────┬──────────────────────────┬──────────────┘
//!             │ online                   │ offline
//! ┌───────────▼────────────┐ ┌───────────▼──────────────┐
//! │ Deepgram clip STT      │ │ Vosk streaming STT       │
//! │ Gemini → Groq → sorry  │ │ Ollama or diagnostic     │
//! └───────────┬────────────┘ └───────────┬──────────────┘
//!             └────────────┬─────────────┘
//! ┌────────────────────────▼────────────────────────────┐
//! │              Piper TTS → speakers                   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod connectivity;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod voice;

pub use config::Config;
pub use connectivity::{ConnectivityState, Probe, TcpProbe};
pub use dialogue::{DialogueOrchestrator, TurnOutcome};
pub use error::{Error, Result};
