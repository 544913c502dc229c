//! Remote speech-to-text (Deepgram) over a fixed-length clip

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use super::capture::{AudioCapture, samples_to_wav};
use crate::config::EndpointConfig;
use crate::dialogue::{Listener, Utterance, UtteranceSource};
use crate::{Error, Result};

/// Response from Deepgram transcription API
///
/// Every level is optional so that missing or `null` nesting reads as an
/// empty transcript.
#[derive(Debug, Default, serde::Deserialize)]
struct DeepgramResponse {
    results: Option<DeepgramResults>,
}

#[derive(Debug, serde::Deserialize)]
struct DeepgramResults {
    channels: Option<Vec<DeepgramChannel>>,
}

#[derive(Debug, serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Option<Vec<DeepgramAlternative>>,
}

#[derive(Debug, serde::Deserialize)]
struct DeepgramAlternative {
    transcript: Option<String>,
}

impl DeepgramResponse {
    /// Top alternative of the first channel, trimmed
    fn transcript(&self) -> String {
        self.results
            .as_ref()
            .and_then(|r| r.channels.as_deref())
            .and_then(<[_]>::first)
            .and_then(|c| c.alternatives.as_deref())
            .and_then(<[_]>::first)
            .and_then(|a| a.transcript.as_deref())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }
}

/// Transcribes WAV audio with Deepgram's pre-recorded API
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    base_url: String,
    model: Option<String>,
    api_key: Option<SecretString>,
}

impl DeepgramTranscriber {
    /// Create a Deepgram transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: &EndpointConfig, api_key: Option<SecretString>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: endpoint.base_url.clone(),
            model: endpoint.model.clone(),
            api_key,
        })
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error on a missing key, transport failure, or non-success status
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("DEEPGRAM_API_KEY not set".to_string()))?;

        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let mut request = self
            .client
            .post(format!("{}/v1/listen", self.base_url))
            .header("Authorization", format!("Token {}", api_key.expose_secret()))
            .header("Content-Type", "audio/wav")
            .body(audio);

        if let Some(model) = &self.model {
            request = request.query(&[("model", model)]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Deepgram request failed");
            e
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Transcription(format!(
                "Deepgram API error {status}: {body}"
            )));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcript = result.transcript();
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Source of fixed-length mono clips
#[async_trait(?Send)]
pub trait ClipRecorder {
    /// Record one clip of `duration`
    async fn record_clip(&mut self, duration: Duration) -> Result<Vec<f32>>;

    fn sample_rate(&self) -> u32;
}

#[async_trait(?Send)]
impl ClipRecorder for AudioCapture {
    async fn record_clip(&mut self, duration: Duration) -> Result<Vec<f32>> {
        self.record(duration).await
    }

    fn sample_rate(&self) -> u32 {
        Self::sample_rate(self)
    }
}

/// Online listener: record a clip, then transcribe it remotely
///
/// Failures propagate; there is no fallback to local recognition inside a turn.
pub struct RemoteRecognizer<R = AudioCapture> {
    recorder: R,
    transcriber: DeepgramTranscriber,
    duration: Duration,
}

impl<R: ClipRecorder> RemoteRecognizer<R> {
    #[must_use]
    pub const fn new(recorder: R, transcriber: DeepgramTranscriber, duration: Duration) -> Self {
        Self {
            recorder,
            transcriber,
            duration,
        }
    }
}

#[async_trait(?Send)]
impl<R: ClipRecorder> Listener for RemoteRecognizer<R> {
    async fn listen(&mut self, cancel: &CancellationToken) -> Result<Utterance> {
        tracing::info!(duration = ?self.duration, "recording for remote transcription");

        let samples = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            samples = self.recorder.record_clip(self.duration) => samples?,
        };

        let wav = samples_to_wav(&samples, self.recorder.sample_rate())?;
        let text = self.transcriber.transcribe(wav).await?;

        Ok(Utterance::new(text, UtteranceSource::Remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_response() {
        let body = r#"{"results":{"channels":[{"alternatives":[
            {"transcript":" what is two plus two ","confidence":0.98},
            {"transcript":"what is too plus two"}]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.transcript(), "what is two plus two");
    }

    #[test]
    fn test_missing_nesting_is_empty() {
        for body in [
            "{}",
            r#"{"results":{}}"#,
            r#"{"results":{"channels":[]}}"#,
            r#"{"results":{"channels":[{}]}}"#,
            r#"{"results":{"channels":[{"alternatives":[{}]}]}}"#,
            r#"{"results":null}"#,
            r#"{"results":{"channels":null}}"#,
            r#"{"results":{"channels":[{"alternatives":null}]}}"#,
            r#"{"results":{"channels":[{"alternatives":[{"transcript":null}]}]}}"#,
        ] {
            let parsed: DeepgramResponse = serde_json::from_str(body).unwrap();
            assert_eq!(parsed.transcript(), "", "body: {body}");
        }
    }
}
