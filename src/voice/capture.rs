//! Audio capture from microphone

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::AudioConfig;
use crate::{Error, Result};

/// Producer end of the bounded frame queue
///
/// A full queue never blocks the device callback; the frame is dropped and
/// counted so the consumer can fail the turn instead of decoding a gap.
#[derive(Debug, Clone)]
pub struct FrameSink {
    frames: mpsc::Sender<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
}

impl FrameSink {
    #[must_use]
    pub fn new(frames: mpsc::Sender<Vec<i16>>) -> Self {
        Self {
            frames,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a frame, counting it as dropped if the queue is full
    pub fn push(&self, frame: Vec<i16>) {
        match self.frames.try_send(frame) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped, "audio frame queue full, dropping frame");
            }
        }
    }

    /// Frames dropped since the last reset
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }
}

/// Captures audio from the default input device, downmixed to mono
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
    block_size: usize,
}

impl AudioCapture {
    /// Open the default input device at the configured sample rate
    ///
    /// # Errors
    ///
    /// Returns error if no input device supports the sample rate
    pub fn new(audio: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();
        let sample_rate = audio.sample_rate;

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        // Prefer mono; fall back to the narrowest layout that supports the rate
        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| {
                c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            sample_rate,
            block_size: audio.block_size,
        })
    }

    /// Build a running input stream that hands mono samples to `on_samples`
    fn build_stream<F>(&self, mut on_samples: F) -> Result<Stream>
    where
        F: FnMut(&[f32]) + Send + 'static,
    {
        let channels = usize::from(self.config.channels.max(1));
        let mut mono = Vec::new();

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels == 1 {
                        on_samples(data);
                    } else {
                        mono.clear();
                        mono.extend(data.chunks(channels).map(downmix));
                        on_samples(&mono);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        Ok(stream)
    }

    /// Record a fixed-length clip
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    #[allow(clippy::future_not_send)]
    pub async fn record(&self, duration: Duration) -> Result<Vec<f32>> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let stream = self.build_stream(move |data| {
            if let Ok(mut buf) = sink.lock() {
                buf.extend_from_slice(data);
            }
        })?;
        tracing::debug!(duration = ?duration, "recording clip");

        tokio::time::sleep(duration).await;
        drop(stream);

        let samples = buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        tracing::debug!(samples = samples.len(), "clip recorded");
        Ok(samples)
    }

    /// Stream fixed-size 16-bit frames into `sink` until the returned stream is dropped
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn stream_frames(&self, sink: FrameSink) -> Result<Stream> {
        let block_size = self.block_size;
        let mut pending: Vec<i16> = Vec::with_capacity(block_size);

        let stream = self.build_stream(move |data| {
            for &sample in data {
                pending.push(f32_to_i16(sample));
                if pending.len() == block_size {
                    sink.push(std::mem::replace(&mut pending, Vec::with_capacity(block_size)));
                }
            }
        })?;

        tracing::debug!(block_size, "audio streaming started");
        Ok(stream)
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[allow(clippy::cast_precision_loss)]
fn downmix(frame: &[f32]) -> f32 {
    frame.iter().sum::<f32>() / frame.len() as f32
}

/// Convert an f32 sample in [-1.0, 1.0] to i16
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(f32_to_i16(sample))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Calculate RMS energy
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32768);
    }

    #[test]
    fn test_downmix_averages() {
        assert!((downmix(&[0.5, -0.5]) - 0.0).abs() < f32::EPSILON);
        assert!((downmix(&[0.2, 0.4]) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_full_queue_counts_dropped_frames() {
        let (tx, mut rx) = mpsc::channel(2);
        let sink = FrameSink::new(tx);

        for id in 0..5 {
            sink.push(vec![id; 4]);
        }

        assert_eq!(sink.dropped(), 3);
        assert_eq!(rx.try_recv().unwrap(), vec![0; 4]);
        assert_eq!(rx.try_recv().unwrap(), vec![1; 4]);

        sink.reset_dropped();
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_closed_queue_is_not_a_drop() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = FrameSink::new(tx);

        sink.push(vec![0; 4]);

        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_rms() {
        assert!(calculate_rms(&[]).abs() < f32::EPSILON);
        assert!((calculate_rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
