use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use aiva::config::clone_secret;
use aiva::connectivity::FixedProbe;
use aiva::dialogue::{Listener, Responder, Strategies, Strategy};
use aiva::llm::{ChatCompletionsProvider, GeminiProvider, LocalGenerator, RemoteGeneratorChain};
use aiva::voice::{
    AudioCapture, AudioPlayback, DeepgramTranscriber, LocalRecognizer, NullSource, PiperSpeaker,
    RemoteRecognizer, Speaker, UnavailableDecoder, calculate_rms,
};
use aiva::{Config, ConnectivityState, DialogueOrchestrator, Probe, TcpProbe};

/// AIVA - voice assistant that adapts to connectivity
#[derive(Parser)]
#[command(name = "aiva", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/aiva/config.toml)
    #[arg(short, long, env = "AIVA_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the connectivity probe and always use the offline strategy
    #[arg(long, env = "AIVA_OFFLINE_ONLY")]
    offline_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the connectivity probe once
    Probe,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speech synthesis and playback
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Generate one reply and print it with its provider
    Ask {
        /// Use the local model instead of the remote chain
        #[arg(long)]
        offline: bool,
        /// Prompt text
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,aiva=info",
        1 => "info,aiva=debug",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over the verbosity flag
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Probe => probe_once(&config).await,
            Command::TestMic { duration } => test_mic(&config, duration).await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Ask { offline, text } => ask(&config, offline, &text).await,
        };
    }

    tracing::info!(offline_only = cli.offline_only, "starting aiva");
    config.api_keys.log_presence();

    let mut orchestrator = build_orchestrator(&config, cli.offline_only)?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    tracing::info!("aiva ready");
    orchestrator.run(shutdown).await?;

    Ok(())
}

/// Wire every component from configuration
fn build_orchestrator(
    config: &Config,
    offline_only: bool,
) -> anyhow::Result<DialogueOrchestrator> {
    let probe: Box<dyn Probe> = if offline_only {
        Box::new(FixedProbe(ConnectivityState::Offline))
    } else {
        Box::new(TcpProbe::from_config(&config.probe))
    };

    let online = Strategy::new(remote_listener(config)?, remote_responder(config)?);
    let offline = Strategy::new(local_listener(config)?, local_responder(config)?);

    let speaker: Box<dyn Speaker> =
        Box::new(PiperSpeaker::new(&config.piper, AudioPlayback::new()?));

    Ok(DialogueOrchestrator::new(
        probe,
        Strategies { online, offline },
        speaker,
        config.timing,
    ))
}

fn remote_listener(config: &Config) -> anyhow::Result<Box<dyn Listener>> {
    let transcriber = DeepgramTranscriber::new(
        &config.deepgram,
        config.api_keys.deepgram.as_ref().map(clone_secret),
    )?;
    let capture = AudioCapture::new(&config.audio)?;

    Ok(Box::new(RemoteRecognizer::new(
        capture,
        transcriber,
        config.audio.record_duration,
    )))
}

fn remote_responder(config: &Config) -> anyhow::Result<Box<dyn Responder>> {
    let gemini = GeminiProvider::new(
        &config.gemini,
        config.api_keys.gemini.as_ref().map(clone_secret),
        config.persona.as_str(),
    )?;
    let groq = ChatCompletionsProvider::new(
        &config.groq,
        config.api_keys.groq.as_ref().map(clone_secret),
        config.persona.as_str(),
    )?;

    let chain = RemoteGeneratorChain::new(Box::new(gemini), Box::new(groq));
    tracing::debug!(providers = ?chain.provider_names(), "remote chain ready");
    Ok(Box::new(chain))
}

fn local_responder(config: &Config) -> anyhow::Result<Box<dyn Responder>> {
    Ok(Box::new(LocalGenerator::new(&config.ollama)?))
}

#[cfg(feature = "vosk")]
fn local_listener(config: &Config) -> anyhow::Result<Box<dyn Listener>> {
    match aiva::voice::VoskDecoder::new(&config.vosk_model_dir, config.audio.sample_rate) {
        Ok(decoder) => {
            let capture = AudioCapture::new(&config.audio)?;
            Ok(Box::new(LocalRecognizer::new(decoder, capture)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "offline recognition disabled");
            Ok(unavailable_listener(e.to_string()))
        }
    }
}

#[cfg(not(feature = "vosk"))]
fn local_listener(_config: &Config) -> anyhow::Result<Box<dyn Listener>> {
    tracing::warn!("built without the vosk feature, offline recognition disabled");
    Ok(unavailable_listener("built without the vosk feature".to_string()))
}

fn unavailable_listener(reason: String) -> Box<dyn Listener> {
    Box::new(LocalRecognizer::new(UnavailableDecoder::new(reason), NullSource))
}

/// Run the connectivity probe once
async fn probe_once(config: &Config) -> anyhow::Result<()> {
    let probe = TcpProbe::from_config(&config.probe);
    let state = probe.probe().await;
    println!("{} ({})", state, config.probe.target);
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::new(&config.audio)?;
    println!("Sample rate: {} Hz", capture.sample_rate());

    let samples = capture.record(Duration::from_secs(duration)).await?;
    let energy = calculate_rms(&samples);
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

    println!("---");
    println!("Samples: {} | RMS: {energy:.4} | Peak: {peak:.4}", samples.len());

    println!("\n---");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speech synthesis through Piper
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let mut speaker = PiperSpeaker::new(&config.piper, AudioPlayback::new()?);
    speaker.speak(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}

/// Run one THINK stage and print the reply
async fn ask(config: &Config, offline: bool, text: &str) -> anyhow::Result<()> {
    let responder = if offline {
        local_responder(config)?
    } else {
        remote_responder(config)?
    };

    let reply = responder.respond(text).await;
    println!("[{}] {}", reply.provider().label(), reply.text());
    Ok(())
}
