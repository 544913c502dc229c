//! Configuration management for AIVA
//!
//! Settings are resolved once at startup with priority env > `.env` > TOML > default
//! and then handed to every component by reference. Nothing re-reads the
//! environment after [`Config::load`] returns.

pub mod file;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub use file::{AivaConfigFile, config_file_path, load_config_file, read_config_file};

use crate::{Error, Result};

/// Default persona given to every language model
pub const DEFAULT_PERSONA: &str = "You are AIVA, a helpful robot assistant for students. \
Keep your answers very short, simple, and conversational (maximum 2 to 3 lines). \
Avoid using bold or special characters.";

/// AIVA configuration
#[derive(Debug)]
pub struct Config {
    /// System persona for every language model
    pub persona: String,

    /// API keys
    pub api_keys: ApiKeys,

    /// Audio capture configuration
    pub audio: AudioConfig,

    /// Connectivity probe configuration
    pub probe: ProbeConfig,

    /// Remote transcription endpoint
    pub deepgram: EndpointConfig,

    /// Primary remote language model
    pub gemini: EndpointConfig,

    /// Secondary remote language model
    pub groq: ChatEndpointConfig,

    /// Local model server
    pub ollama: EndpointConfig,

    /// Vosk model directory
    pub vosk_model_dir: PathBuf,

    /// Speech synthesis configuration
    pub piper: PiperConfig,

    /// Turn loop pacing
    pub timing: TimingConfig,
}

/// API keys for remote providers
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Deepgram key (remote STT)
    pub deepgram: Option<SecretString>,

    /// Google Gemini key (primary LLM)
    pub gemini: Option<SecretString>,

    /// Groq key (secondary LLM)
    pub groq: Option<SecretString>,
}

impl ApiKeys {
    /// Log which credentials are present without revealing them
    pub fn log_presence(&self) {
        tracing::info!(
            deepgram = self.deepgram.is_some(),
            gemini = self.gemini.is_some(),
            groq = self.groq.is_some(),
            "api keys loaded"
        );
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Capture sample rate in Hz (mono, 16-bit)
    pub sample_rate: u32,

    /// Length of the fixed clip recorded for remote transcription
    pub record_duration: Duration,

    /// Samples per frame handed to the streaming decoder
    pub block_size: usize,
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    /// Well-known host and port to connect to
    pub target: SocketAddr,

    /// Upper bound on a single connection attempt
    pub timeout: Duration,
}

/// An HTTP provider endpoint
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL without trailing slash
    pub base_url: String,

    /// Model identifier (optional for providers with a server-side default)
    pub model: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Chat-completions endpoint with sampling temperature
#[derive(Debug, Clone)]
pub struct ChatEndpointConfig {
    pub endpoint: EndpointConfig,
    pub temperature: f32,
}

/// Piper speech synthesis configuration
#[derive(Debug, Clone)]
pub struct PiperConfig {
    /// Path to the piper executable
    pub binary: PathBuf,

    /// Voice model (`.onnx`)
    pub model: PathBuf,

    /// Voice model config (`.onnx.json`)
    pub config: PathBuf,

    /// WAV file piper writes the reply to
    pub output: PathBuf,
}

/// Turn loop pacing
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    /// Pause after every completed or silent turn
    pub idle: Duration,

    /// Pause after a turn that failed
    pub backoff: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_millis(500),
            backoff: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, `.env`, and the TOML file
    ///
    /// `config_path` overrides the default `~/.config/aiva/config.toml` location;
    /// unlike the default location, an explicit path must exist and parse.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or a setting is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env"),
        }

        let fc = match config_path {
            Some(path) => read_config_file(path)?,
            None => load_config_file(),
        };

        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an environment lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a setting is present but invalid
    pub fn from_sources<F>(env: F, fc: AivaConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
            gemini: env("GEMINI_API_KEY")
                .or(fc.api_keys.gemini)
                .map(SecretString::from),
            groq: env("GROQ_API_KEY")
                .or(fc.api_keys.groq)
                .map(SecretString::from),
        };

        let audio = AudioConfig {
            sample_rate: parse_env(&env, "AIVA_SAMPLE_RATE")?
                .or(fc.audio.sample_rate)
                .unwrap_or(16_000),
            record_duration: Duration::from_secs(
                parse_env(&env, "AIVA_RECORD_SECONDS")?
                    .or(fc.audio.record_seconds)
                    .unwrap_or(5),
            ),
            block_size: parse_env(&env, "AIVA_BLOCK_SIZE")?
                .or(fc.audio.block_size)
                .unwrap_or(8000),
        };

        let probe_addr = env("AIVA_PROBE_ADDR")
            .or(fc.probe.addr)
            .unwrap_or_else(|| "8.8.8.8:53".to_string());
        let probe = ProbeConfig {
            target: probe_addr
                .parse()
                .map_err(|e| Error::Config(format!("invalid probe address {probe_addr:?}: {e}")))?,
            timeout: Duration::from_millis(
                parse_env(&env, "AIVA_PROBE_TIMEOUT_MS")?
                    .or(fc.probe.timeout_ms)
                    .unwrap_or(2000),
            ),
        };

        let deepgram = EndpointConfig {
            base_url: base_url(
                env("AIVA_DEEPGRAM_URL").or(fc.deepgram.url),
                "https://api.deepgram.com",
            ),
            model: env("AIVA_DEEPGRAM_MODEL").or(fc.deepgram.model),
            timeout: Duration::from_secs(fc.deepgram.timeout_secs.unwrap_or(30)),
        };

        let gemini = EndpointConfig {
            base_url: base_url(
                env("AIVA_GEMINI_URL").or(fc.gemini.url),
                "https://generativelanguage.googleapis.com",
            ),
            model: Some(
                env("AIVA_GEMINI_MODEL")
                    .or(fc.gemini.model)
                    .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            ),
            timeout: Duration::from_secs(fc.gemini.timeout_secs.unwrap_or(15)),
        };

        let groq = ChatEndpointConfig {
            endpoint: EndpointConfig {
                base_url: base_url(env("AIVA_GROQ_URL").or(fc.groq.url), "https://api.groq.com"),
                model: Some(
                    env("AIVA_GROQ_MODEL")
                        .or(fc.groq.model)
                        .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
                ),
                timeout: Duration::from_secs(fc.groq.timeout_secs.unwrap_or(20)),
            },
            temperature: fc.groq.temperature.unwrap_or(0.5),
        };

        let ollama = EndpointConfig {
            base_url: base_url(
                env("AIVA_OLLAMA_URL").or(fc.ollama.url),
                "http://localhost:11434",
            ),
            model: Some(
                env("AIVA_OLLAMA_MODEL")
                    .or(fc.ollama.model)
                    .unwrap_or_else(|| {
                        "hf.co/ailearner2218/qwen2.5-0.5B-Instruct:Q4_K_M".to_string()
                    }),
            ),
            timeout: Duration::from_secs(fc.ollama.timeout_secs.unwrap_or(30)),
        };

        let vosk_model_dir = PathBuf::from(
            env("AIVA_VOSK_MODEL")
                .or(fc.vosk.model_dir)
                .unwrap_or_else(|| "vosk_model/vosk-model-small-en-us-0.15".to_string()),
        );

        let piper = PiperConfig {
            binary: PathBuf::from(
                env("AIVA_PIPER_BIN")
                    .or(fc.piper.binary)
                    .unwrap_or_else(|| default_piper_binary().to_string()),
            ),
            model: PathBuf::from(
                env("AIVA_PIPER_MODEL")
                    .or(fc.piper.model)
                    .unwrap_or_else(|| "piper/en_US-amy-medium.onnx".to_string()),
            ),
            config: PathBuf::from(
                env("AIVA_PIPER_CONFIG")
                    .or(fc.piper.config)
                    .unwrap_or_else(|| "piper/en_US-amy-medium.onnx.json".to_string()),
            ),
            output: PathBuf::from(
                env("AIVA_REPLY_WAV")
                    .or(fc.piper.output)
                    .unwrap_or_else(|| "reply.wav".to_string()),
            ),
        };

        let defaults = TimingConfig::default();
        let timing = TimingConfig {
            idle: parse_env(&env, "AIVA_IDLE_MS")?
                .or(fc.timing.idle_ms)
                .map_or(defaults.idle, Duration::from_millis),
            backoff: parse_env(&env, "AIVA_BACKOFF_MS")?
                .or(fc.timing.backoff_ms)
                .map_or(defaults.backoff, Duration::from_millis),
        };

        let persona = env("AIVA_PERSONA")
            .or(fc.persona)
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        let config = Self {
            persona,
            api_keys,
            audio,
            probe,
            deepgram,
            gemini,
            groq,
            ollama,
            vosk_model_dir,
            piper,
            timing,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would make a stage meaningless
    fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("sample rate must be positive".to_string()));
        }
        if self.audio.record_duration.is_zero() {
            return Err(Error::Config("record duration must be positive".to_string()));
        }
        if self.audio.block_size == 0 {
            return Err(Error::Config("block size must be positive".to_string()));
        }
        if self.probe.timeout.is_zero() {
            return Err(Error::Config("probe timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Copy a secret without exposing it outside the call
#[must_use]
pub fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// Parse an optional numeric environment variable
fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key}={v:?}: {e}")))
        })
        .transpose()
}

fn base_url(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

const fn default_piper_binary() -> &'static str {
    if cfg!(windows) {
        "piper/piper.exe"
    } else {
        "piper/piper"
    }
}
