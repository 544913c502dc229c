//! Offline streaming recognition
//!
//! Audio frames flow from the device callback through a bounded queue into a
//! [`StreamingDecoder`]. Both the decoder and the queue are cleared at the start
//! of every listen so nothing from a previous turn can leak into the next.
//! A frame dropped on a full queue fails the turn rather than leaving a gap
//! in the decoded audio.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::capture::{AudioCapture, FrameSink};
use crate::dialogue::{Listener, Utterance, UtteranceSource};
use crate::{Error, Result};

/// Frames buffered between the capture callback and the decoder
pub const FRAME_QUEUE_DEPTH: usize = 64;

/// Incremental recognizer that reports a transcript at each utterance boundary
pub trait StreamingDecoder {
    /// Drop any partial hypothesis and buffered audio
    fn reset(&mut self);

    /// Feed one frame of 16-bit mono audio
    ///
    /// Returns the final transcript when this frame completes an utterance.
    fn accept(&mut self, frame: &[i16]) -> Result<Option<String>>;
}

/// Producer of live audio frames
pub trait FrameSource {
    /// Keeps the producer running; dropping it stops capture
    type Guard;

    /// Start pushing frames into `sink`
    fn start(&mut self, sink: FrameSink) -> Result<Self::Guard>;
}

impl FrameSource for AudioCapture {
    type Guard = cpal::Stream;

    fn start(&mut self, sink: FrameSink) -> Result<Self::Guard> {
        self.stream_frames(sink)
    }
}

/// Offline listener that waits, without timeout, for a complete utterance
pub struct LocalRecognizer<D, S = AudioCapture> {
    decoder: D,
    source: S,
    sink: FrameSink,
    frames_rx: mpsc::Receiver<Vec<i16>>,
}

impl<D: StreamingDecoder, S: FrameSource> LocalRecognizer<D, S> {
    #[must_use]
    pub fn new(decoder: D, source: S) -> Self {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        Self {
            decoder,
            source,
            sink: FrameSink::new(frames_tx),
            frames_rx,
        }
    }

    /// Clear decoder state, the drop count, and any frames still queued from a previous turn
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.sink.reset_dropped();

        let mut drained = 0usize;
        while self.frames_rx.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(frames = drained, "discarded stale audio frames");
        }
    }
}

#[async_trait(?Send)]
impl<D: StreamingDecoder, S: FrameSource> Listener for LocalRecognizer<D, S> {
    async fn listen(&mut self, cancel: &CancellationToken) -> Result<Utterance> {
        self.reset();
        let _guard = self.source.start(self.sink.clone())?;
        tracing::info!("listening (offline)");

        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                frame = self.frames_rx.recv() => frame
                    .ok_or_else(|| Error::Audio("audio frame queue closed".to_string()))?,
            };

            let dropped = self.sink.dropped();
            if dropped > 0 {
                return Err(Error::Audio(format!(
                    "audio frame queue overflowed, {dropped} frames dropped"
                )));
            }

            if let Some(text) = self.decoder.accept(&frame)? {
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(Utterance::new(text, UtteranceSource::Local));
                }
            }
        }
    }
}

/// Placeholder decoder for builds without an offline engine, or without a model on disk
///
/// Every frame is rejected, so offline turns fail and back off instead of
/// blocking forever.
#[derive(Debug, Clone)]
pub struct UnavailableDecoder {
    reason: String,
}

impl UnavailableDecoder {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StreamingDecoder for UnavailableDecoder {
    fn reset(&mut self) {}

    fn accept(&mut self, _frame: &[i16]) -> Result<Option<String>> {
        Err(Error::Transcription(format!(
            "offline recognizer unavailable: {}",
            self.reason
        )))
    }
}

/// Frame source for builds where the decoder can never succeed
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl FrameSource for NullSource {
    type Guard = ();

    fn start(&mut self, sink: FrameSink) -> Result<Self::Guard> {
        // One empty frame lets the decoder report why it is unavailable
        sink.push(Vec::new());
        Ok(())
    }
}
