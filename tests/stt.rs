//! Remote transcription against a mock Deepgram server

use std::time::Duration;

use aiva::Error;
use aiva::dialogue::{Listener, UtteranceSource};
use aiva::voice::{ClipRecorder, DeepgramTranscriber, RemoteRecognizer, samples_to_wav};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use tokio_util::sync::CancellationToken;

mod common;
use common::{endpoint, secret, spawn_mock};

fn deepgram_body(transcript: &str) -> serde_json::Value {
    json!({
        "metadata": { "request_id": "test" },
        "results": { "channels": [{ "alternatives": [{ "transcript": transcript, "confidence": 0.9 }] }] }
    })
}

/// Returns a fixed clip, or waits `delay` first
struct FakeRecorder {
    samples: Vec<f32>,
    delay: Duration,
}

impl FakeRecorder {
    fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait(?Send)]
impl ClipRecorder for FakeRecorder {
    async fn record_clip(&mut self, _duration: Duration) -> aiva::Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.samples.clone())
    }

    fn sample_rate(&self) -> u32 {
        16_000
    }
}

#[tokio::test]
async fn test_deepgram_request() {
    let server = spawn_mock(StatusCode::OK, deepgram_body("  what is two plus two  ")).await;
    let transcriber = DeepgramTranscriber::new(
        &endpoint(&server.base_url, Some("nova-2")),
        Some(secret("dg-key")),
    )
    .unwrap();
    let wav = samples_to_wav(&[0.0, 0.1, -0.1], 16_000).unwrap();

    let text = transcriber.transcribe(wav.clone()).await.unwrap();

    assert_eq!(text, "what is two plus two");

    let request = &server.requests()[0];
    assert_eq!(request.path, "/v1/listen");
    assert_eq!(request.query.as_deref(), Some("model=nova-2"));
    assert_eq!(request.header("authorization"), Some("Token dg-key"));
    assert_eq!(request.header("content-type"), Some("audio/wav"));
    assert_eq!(request.body.as_ref(), wav.as_slice());
}

#[tokio::test]
async fn test_deepgram_without_model_sends_no_query() {
    let server = spawn_mock(StatusCode::OK, deepgram_body("hi")).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();

    transcriber.transcribe(Vec::new()).await.unwrap();

    assert_eq!(server.requests()[0].query, None);
}

#[tokio::test]
async fn test_deepgram_error_status() {
    let server = spawn_mock(StatusCode::UNAUTHORIZED, json!({ "err_msg": "bad key" })).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();

    let err = transcriber.transcribe(Vec::new()).await.unwrap_err();

    assert!(matches!(&err, Error::Transcription(msg) if msg.contains("401")), "{err}");
}

#[tokio::test]
async fn test_deepgram_missing_key() {
    let server = spawn_mock(StatusCode::OK, deepgram_body("unused")).await;
    let transcriber = DeepgramTranscriber::new(&endpoint(&server.base_url, None), None).unwrap();

    let err = transcriber.transcribe(Vec::new()).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_remote_recognizer_records_then_transcribes() {
    let server = spawn_mock(StatusCode::OK, deepgram_body("hello aiva")).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();
    let recorder = FakeRecorder::new(vec![0.2; 1600]);
    let mut recognizer = RemoteRecognizer::new(recorder, transcriber, Duration::from_secs(5));

    let utterance = recognizer.listen(&CancellationToken::new()).await.unwrap();

    assert_eq!(utterance.text(), "hello aiva");
    assert_eq!(utterance.source(), UtteranceSource::Remote);

    let body = &server.requests()[0].body;
    assert_eq!(&body[0..4], b"RIFF");
}

#[tokio::test]
async fn test_remote_recognizer_empty_transcript_is_silence() {
    let server = spawn_mock(StatusCode::OK, json!({ "results": { "channels": [] } })).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();
    let mut recognizer =
        RemoteRecognizer::new(FakeRecorder::new(vec![0.0; 160]), transcriber, Duration::from_secs(5));

    let utterance = recognizer.listen(&CancellationToken::new()).await.unwrap();

    assert!(utterance.is_silence());
}

#[tokio::test]
async fn test_remote_recognizer_cancelled_while_recording() {
    let server = spawn_mock(StatusCode::OK, deepgram_body("unused")).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();
    let recorder = FakeRecorder {
        delay: Duration::from_secs(30),
        ..FakeRecorder::new(Vec::new())
    };
    let mut recognizer = RemoteRecognizer::new(recorder, transcriber, Duration::from_secs(30));

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = recognizer.listen(&cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_remote_recognizer_null_nesting_is_silence() {
    let body = json!({ "results": { "channels": [{ "alternatives": [{ "transcript": null }] }] } });
    let server = spawn_mock(StatusCode::OK, body).await;
    let transcriber =
        DeepgramTranscriber::new(&endpoint(&server.base_url, None), Some(secret("k"))).unwrap();
    let mut recognizer =
        RemoteRecognizer::new(FakeRecorder::new(vec![0.0; 160]), transcriber, Duration::from_secs(5));

    let utterance = recognizer.listen(&CancellationToken::new()).await.unwrap();

    assert!(utterance.is_silence());
}
