//! Vosk streaming decoder

use std::path::Path;

use vosk::{DecodingState, Model, Recognizer};

use super::recognizer::StreamingDecoder;
use crate::{Error, Result};

/// Kaldi-based offline decoder loaded from a model directory
pub struct VoskDecoder {
    recognizer: Recognizer,
    _model: Model,
}

impl VoskDecoder {
    /// Load the model at `model_dir` and build a recognizer for `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if the directory is missing or the model fails to load
    #[allow(clippy::cast_precision_loss)]
    pub fn new(model_dir: &Path, sample_rate: u32) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(Error::Config(format!(
                "Vosk model not found at {}",
                model_dir.display()
            )));
        }

        vosk::set_log_level(vosk::LogLevel::Warn);

        let model = Model::new(model_dir.to_string_lossy()).ok_or_else(|| {
            Error::Transcription(format!("failed to load Vosk model from {}", model_dir.display()))
        })?;
        let recognizer = Recognizer::new(&model, sample_rate as f32)
            .ok_or_else(|| Error::Transcription("failed to create Vosk recognizer".to_string()))?;

        tracing::info!(model = %model_dir.display(), sample_rate, "Vosk model loaded");

        Ok(Self {
            recognizer,
            _model: model,
        })
    }
}

impl StreamingDecoder for VoskDecoder {
    fn reset(&mut self) {
        self.recognizer.reset();
    }

    fn accept(&mut self, frame: &[i16]) -> Result<Option<String>> {
        match self.recognizer.accept_waveform(frame) {
            Ok(DecodingState::Finalized) => Ok(self
                .recognizer
                .result()
                .single()
                .map(|r| r.text.to_string())),
            Ok(DecodingState::Running) => Ok(None),
            Ok(DecodingState::Failed) => {
                Err(Error::Transcription("Vosk decoding failed".to_string()))
            }
            Err(e) => Err(Error::Transcription(format!("Vosk rejected audio: {e:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_dir() {
        let err = VoskDecoder::new(Path::new("/nonexistent/vosk-model"), 16_000)
            .err()
            .unwrap();

        assert!(matches!(err, Error::Config(msg) if msg.contains("/nonexistent/vosk-model")));
    }
}
