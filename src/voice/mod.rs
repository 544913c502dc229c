//! Voice processing module
//!
//! Handles audio capture and playback, remote and offline speech
//! recognition, and Piper speech synthesis.

mod capture;
mod playback;
mod recognizer;
mod stt;
mod tts;
#[cfg(feature = "vosk")]
mod vosk;

pub use capture::{AudioCapture, FrameSink, calculate_rms, f32_to_i16, samples_to_wav};
pub use playback::{AudioPlayback, WavPlayer, read_wav_mono};
pub use recognizer::{
    FRAME_QUEUE_DEPTH, FrameSource, LocalRecognizer, NullSource, StreamingDecoder,
    UnavailableDecoder,
};
pub use stt::{ClipRecorder, DeepgramTranscriber, RemoteRecognizer};
pub use tts::{PiperSpeaker, Speaker, strip_markup};
#[cfg(feature = "vosk")]
pub use vosk::VoskDecoder;
