//! Text-to-speech through the Piper command-line synthesizer

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::playback::{AudioPlayback, WavPlayer};
use crate::config::PiperConfig;
use crate::{Error, Result};

/// Characters that read badly when spoken
const MARKUP_CHARS: &[char] = &['*', '#', '`'];

/// Speaks reply text aloud
#[async_trait]
pub trait Speaker: Send {
    /// Synthesize and play `text`, returning once playback ends
    async fn speak(&mut self, text: &str) -> Result<()>;
}

/// Remove markdown emphasis characters and collapse whitespace
///
/// Underscores become spaces so `snake_case` is read as two words.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    text.replace(MARKUP_CHARS, "")
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs Piper to render a WAV file, then plays it
pub struct PiperSpeaker<P = AudioPlayback> {
    binary: PathBuf,
    model: PathBuf,
    config: PathBuf,
    output: PathBuf,
    player: P,
}

impl<P: WavPlayer> PiperSpeaker<P> {
    #[must_use]
    pub fn new(piper: &PiperConfig, player: P) -> Self {
        Self {
            binary: piper.binary.clone(),
            model: piper.model.clone(),
            config: piper.config.clone(),
            output: piper.output.clone(),
            player,
        }
    }

    /// Render `text` to the output WAV
    async fn synthesize(&self, text: &str) -> Result<()> {
        // A stale file from the last turn must never be replayed
        match tokio::fs::remove_file(&self.output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.model)
            .arg("--config")
            .arg(&self.config)
            .arg("--output_file")
            .arg(&self.output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Synthesis(format!(
                    "failed to start {}: {e}",
                    self.binary.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr.trim(), "piper stderr");
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::Synthesis(format!("piper exited with code {code}")));
        }

        if !self.output.is_file() {
            return Err(Error::Synthesis(format!(
                "piper produced no audio at {}",
                self.output.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl<P: WavPlayer> Speaker for PiperSpeaker<P> {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let clean = strip_markup(text);
        if clean.is_empty() {
            tracing::debug!("nothing to speak");
            return Ok(());
        }

        tracing::debug!(chars = clean.len(), "synthesizing speech");
        self.synthesize(&clean).await?;
        self.player.play_wav(&self.output).await?;

        tracing::info!("speech played");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("**Bold** and `code`"), "Bold and code");
        assert_eq!(strip_markup("# Title\n\n  _x_  y"), "Title x y");
        assert_eq!(strip_markup("It's 4!"), "It's 4!");
        assert_eq!(strip_markup(" *** "), "");
        assert_eq!(strip_markup("call snake_case_name"), "call snake case name");
    }

    #[cfg(unix)]
    mod piper {
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use std::sync::{Arc, Mutex};

        use super::super::*;

        /// Records the contents of every file it is asked to play
        #[derive(Default, Clone)]
        struct RecordingPlayer {
            played: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl WavPlayer for RecordingPlayer {
            async fn play_wav(&self, path: &Path) -> Result<()> {
                let contents = std::fs::read_to_string(path)?;
                self.played.lock().unwrap().push(contents);
                Ok(())
            }
        }

        fn fake_piper(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("piper");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn speaker(dir: &Path, binary: PathBuf) -> (PiperSpeaker<RecordingPlayer>, RecordingPlayer) {
            let config = PiperConfig {
                binary,
                model: dir.join("voice.onnx"),
                config: dir.join("voice.onnx.json"),
                output: dir.join("reply.wav"),
            };
            let player = RecordingPlayer::default();
            (PiperSpeaker::new(&config, player.clone()), player)
        }

        #[tokio::test]
        async fn test_speaks_stripped_text() {
            let dir = tempfile::tempdir().unwrap();
            // $6 is the value of --output_file
            let binary = fake_piper(dir.path(), r#"cat > "$6""#);
            let (mut speaker, player) = speaker(dir.path(), binary);

            speaker.speak("**It's 4!**").await.unwrap();

            assert_eq!(*player.played.lock().unwrap(), vec!["It's 4!".to_string()]);
        }

        #[tokio::test]
        async fn test_blank_text_is_noop() {
            let dir = tempfile::tempdir().unwrap();
            let marker = dir.path().join("ran");
            let binary = fake_piper(dir.path(), &format!("touch {}", marker.display()));
            let (mut speaker, player) = speaker(dir.path(), binary);

            speaker.speak(" ** ").await.unwrap();

            assert!(!marker.exists());
            assert!(player.played.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_failure_exit_is_error() {
            let dir = tempfile::tempdir().unwrap();
            let binary = fake_piper(dir.path(), "exit 3");
            let (mut speaker, player) = speaker(dir.path(), binary);

            let err = speaker.speak("hello").await.unwrap_err();

            assert!(matches!(err, Error::Synthesis(msg) if msg.contains('3')));
            assert!(player.played.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_stale_output_is_not_replayed() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("reply.wav"), "previous turn").unwrap();
            // Exits cleanly without writing anything
            let binary = fake_piper(dir.path(), "cat > /dev/null");
            let (mut speaker, player) = speaker(dir.path(), binary);

            let err = speaker.speak("hello").await.unwrap_err();

            assert!(matches!(err, Error::Synthesis(_)));
            assert!(player.played.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_abandoned_synthesis_kills_piper() {
            let dir = tempfile::tempdir().unwrap();
            let marker = dir.path().join("finished");
            let body = format!("sleep 1\ntouch {}\ncat > \"$6\"", marker.display());
            let binary = fake_piper(dir.path(), &body);
            let (mut speaker, player) = speaker(dir.path(), binary);

            let result =
                tokio::time::timeout(std::time::Duration::from_millis(200), speaker.speak("hello"))
                    .await;
            assert!(result.is_err());

            tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

            assert!(!marker.exists());
            assert!(player.played.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_missing_binary_is_error() {
            let dir = tempfile::tempdir().unwrap();
            let (mut speaker, _) = speaker(dir.path(), dir.path().join("no-such-piper"));

            assert!(matches!(
                speaker.speak("hello").await,
                Err(Error::Synthesis(_))
            ));
        }
    }
}
