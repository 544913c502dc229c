//! TOML configuration file loading
//!
//! Supports `~/.config/aiva/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AivaConfigFile {
    /// System persona given to every language model
    #[serde(default)]
    pub persona: Option<String>,

    /// Audio capture settings
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Connectivity probe settings
    #[serde(default)]
    pub probe: ProbeFileConfig,

    /// API keys for remote providers
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Remote transcription endpoint
    #[serde(default)]
    pub deepgram: EndpointFileConfig,

    /// Primary remote language model
    #[serde(default)]
    pub gemini: EndpointFileConfig,

    /// Secondary remote language model
    #[serde(default)]
    pub groq: EndpointFileConfig,

    /// Local model server
    #[serde(default)]
    pub ollama: EndpointFileConfig,

    /// Offline recognizer
    #[serde(default)]
    pub vosk: VoskFileConfig,

    /// Speech synthesis
    #[serde(default)]
    pub piper: PiperFileConfig,

    /// Loop pacing
    #[serde(default)]
    pub timing: TimingFileConfig,
}

/// Audio capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    pub sample_rate: Option<u32>,
    pub record_seconds: Option<u64>,
    pub block_size: Option<usize>,
}

/// Connectivity probe configuration
#[derive(Debug, Default, Deserialize)]
pub struct ProbeFileConfig {
    /// Socket address to connect to (e.g. "8.8.8.8:53")
    pub addr: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub deepgram: Option<String>,
    pub gemini: Option<String>,
    pub groq: Option<String>,
}

/// HTTP endpoint overrides shared by every provider section
#[derive(Debug, Default, Deserialize)]
pub struct EndpointFileConfig {
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Only read for the chat-completions provider
    pub temperature: Option<f32>,
}

/// Vosk configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoskFileConfig {
    pub model_dir: Option<String>,
}

/// Piper configuration
#[derive(Debug, Default, Deserialize)]
pub struct PiperFileConfig {
    pub binary: Option<String>,
    pub model: Option<String>,
    pub config: Option<String>,
    pub output: Option<String>,
}

/// Turn loop pacing
#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    pub idle_ms: Option<u64>,
    pub backoff_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AivaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AivaConfigFile {
    let Some(path) = config_file_path() else {
        return AivaConfigFile::default();
    };

    if !path.exists() {
        return AivaConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            AivaConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<AivaConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/aiva/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("aiva").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
persona = "Be brief."

[audio]
record_seconds = 3

[groq]
model = "llama-3.1-8b-instant"
temperature = 0.2
"#
        )
        .unwrap();

        let fc = read_config_file(file.path()).unwrap();
        assert_eq!(fc.persona.as_deref(), Some("Be brief."));
        assert_eq!(fc.audio.record_seconds, Some(3));
        assert_eq!(fc.audio.sample_rate, None);
        assert_eq!(fc.groq.model.as_deref(), Some("llama-3.1-8b-instant"));
        assert_eq!(fc.groq.temperature, Some(0.2));
        assert!(fc.gemini.url.is_none());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audio\nsample_rate = ").unwrap();

        assert!(matches!(
            read_config_file(file.path()),
            Err(crate::Error::Toml(_))
        ));
    }
}
