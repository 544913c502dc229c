//! Turn state machine: PROBE → LISTEN → (THINK → SPEAK | IDLE) → PROBE

use tokio_util::sync::CancellationToken;

use super::{Strategies, TurnContext, TurnStage};
use crate::config::TimingConfig;
use crate::connectivity::{ConnectivityState, Probe};
use crate::voice::Speaker;
use crate::{Error, Result};

/// What a single turn ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was said; THINK and SPEAK were skipped
    Silence(ConnectivityState),

    /// A reply was produced; `spoken` is false if synthesis failed
    Replied { context: TurnContext, spoken: bool },
}

/// Drives the probe/listen/respond/speak loop until shutdown
pub struct DialogueOrchestrator {
    probe: Box<dyn Probe>,
    strategies: Strategies,
    speaker: Box<dyn Speaker>,
    timing: TimingConfig,
}

impl DialogueOrchestrator {
    #[must_use]
    pub fn new(
        probe: Box<dyn Probe>,
        strategies: Strategies,
        speaker: Box<dyn Speaker>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            probe,
            strategies,
            speaker,
            timing,
        }
    }

    /// Run turns until `shutdown` is cancelled
    ///
    /// A failed turn is logged and followed by the backoff pause; it never ends
    /// the loop.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok` once shutdown is requested
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("dialogue loop started");
        let mut consecutive_failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                outcome = self.run_turn(&shutdown) => outcome,
            };

            let pause = match outcome {
                Ok(_) => {
                    consecutive_failures = 0;
                    self.timing.idle
                }
                Err(Error::Cancelled) => break,
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    tracing::error!(
                        error = %e,
                        consecutive_failures,
                        backoff = ?self.timing.backoff,
                        "turn failed"
                    );
                    self.timing.backoff
                }
            };

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("dialogue loop stopped");
        Ok(())
    }

    /// Run a single turn
    ///
    /// # Errors
    ///
    /// Returns error if listening fails or is cancelled. Generation faults never
    /// surface here, and synthesis faults only mark the turn as unspoken.
    #[allow(clippy::future_not_send)]
    pub async fn run_turn(&mut self, cancel: &CancellationToken) -> Result<TurnOutcome> {
        let connectivity = self.probe.probe().await;
        tracing::info!(
            stage = TurnStage::Probe.label(),
            mode = connectivity.label(),
            "connectivity checked"
        );

        let strategy = self.strategies.select(connectivity);

        let utterance = strategy.listener.listen(cancel).await.inspect_err(|e| {
            if !matches!(e, Error::Cancelled) {
                tracing::warn!(
                    stage = TurnStage::Listen.label(),
                    mode = connectivity.label(),
                    error = %e,
                    "transcription failed"
                );
            }
        })?;

        if utterance.is_silence() {
            tracing::info!(stage = TurnStage::Idle.label(), "silence");
            return Ok(TurnOutcome::Silence(connectivity));
        }
        tracing::info!(stage = TurnStage::Listen.label(), text = utterance.text(), "heard");

        let reply = strategy.responder.respond(utterance.text()).await;
        tracing::info!(
            stage = TurnStage::Think.label(),
            provider = reply.provider().label(),
            text = reply.text(),
            "reply ready"
        );

        let spoken = match self.speaker.speak(reply.text()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(stage = TurnStage::Speak.label(), error = %e, "synthesis failed");
                false
            }
        };

        Ok(TurnOutcome::Replied {
            context: TurnContext {
                connectivity,
                utterance,
                reply,
            },
            spoken,
        })
    }
}
