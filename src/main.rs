use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use colloquy_gateway::audio::{AudioCapture, AudioPlayback, TARGET_SAMPLE_RATE, downsample, pcm16_bytes};
use colloquy_gateway::channel::AudioChannel;
use colloquy_gateway::turn::{ReplySource, SpeechPlayer, SpeechSource, TurnCoordinator, UtteranceSource};
use colloquy_gateway::{Config, Error, Result};

/// Colloquy - voice streaming gateway for AI conversation practice
#[derive(Parser)]
#[command(name = "colloquy", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a spoken conversation against a running gateway
    Converse {
        /// Gateway base URL
        #[arg(long, env = "COLLOQUY_SERVER", default_value = "http://localhost:3000")]
        server: String,
        /// AI turns before the conversation completes
        #[arg(long, default_value = "3")]
        max_turns: u32,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,colloquy_gateway=info",
        1 => "info,colloquy_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Converse { server, max_turns } => converse(&server, max_turns).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
        };
    }

    let config = Config::from_env();
    tracing::info!(port = config.port, "starting colloquy gateway");

    let server = colloquy_gateway::api::ApiServerBuilder::from_config(&config).build();
    server.run().await?;

    Ok(())
}

/// Drive the full conversation loop against a running gateway
async fn converse(server: &str, max_turns: u32) -> anyhow::Result<()> {
    let stream_url = stream_url_for(server)?;
    let client = reqwest::Client::new();

    println!("Conversation with {max_turns} AI turns. The AI speaks first;");
    println!("after each AI turn, speak and press Enter to stop recording.\n");

    let mut coordinator = TurnCoordinator::new(
        HttpReplySource {
            client: client.clone(),
            base: server.trim_end_matches('/').to_string(),
        },
        HttpSpeechSource {
            client,
            base: server.trim_end_matches('/').to_string(),
        },
        Mp3Player {
            playback: AudioPlayback::new()?,
        },
        MicRecorder { stream_url },
    )
    .with_max_turns(max_turns);

    // Channel failures leave the turn re-armed; everything else ends the
    // conversation
    loop {
        match coordinator.run().await {
            Ok(()) => break,
            Err(e @ Error::Channel(_)) => {
                println!("Recording failed: {e}");
                println!("Press Enter to retry that turn, or Ctrl-C to quit.");
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nConversation complete.");
    Ok(())
}

/// Derive the ws audio stream endpoint from the HTTP base URL
fn stream_url_for(server: &str) -> Result<String> {
    let mut url = url::Url::parse(server)
        .map_err(|e| Error::Config(format!("invalid server url: {e}")))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::Config(format!("unsupported server scheme: {other}")));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::Config("invalid server url".to_string()))?;
    let endpoint = url
        .join("ws/audio")
        .map_err(|e| Error::Config(format!("invalid server url: {e}")))?;
    Ok(endpoint.to_string())
}

#[derive(serde::Deserialize)]
struct ReplyBody {
    response: String,
}

#[derive(serde::Deserialize)]
struct AudioBody {
    audio: String,
}

/// Generates replies through the gateway's speech endpoints
struct HttpReplySource {
    client: reqwest::Client,
    base: String,
}

impl HttpReplySource {
    async fn post_reply(&self, path: &str, body: serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("{path} failed ({status}): {body}")));
        }

        let body: ReplyBody = response.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl ReplySource for HttpReplySource {
    async fn opening(&self) -> Result<String> {
        self.post_reply("/initial-speech", serde_json::json!({})).await
    }

    async fn reply(&self, text: &str) -> Result<String> {
        self.post_reply("/chat", serde_json::json!({ "text": text })).await
    }
}

/// Synthesizes speech through the gateway's synthesis endpoint
struct HttpSpeechSource {
    client: reqwest::Client,
    base: String,
}

#[async_trait]
impl SpeechSource for HttpSpeechSource {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesize", self.base))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("synthesize failed ({status}): {body}")));
        }

        let body: AudioBody = response.json().await?;
        base64::engine::general_purpose::STANDARD
            .decode(&body.audio)
            .map_err(|e| Error::Synthesis(format!("invalid audio encoding: {e}")))
    }
}

/// Plays synthesized MP3 buffers to completion
struct Mp3Player {
    playback: AudioPlayback,
}

#[async_trait]
impl SpeechPlayer for Mp3Player {
    async fn play(&mut self, audio: &[u8]) -> Result<()> {
        self.playback.play_mp3(audio).await
    }
}

/// Records one utterance from the microphone and streams it to the gateway
///
/// The cpal stream lives on a dedicated thread (it is not `Send`); resampled
/// PCM chunks cross to the async side over a bounded channel.
struct MicRecorder {
    stream_url: String,
}

const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

#[async_trait]
impl UtteranceSource for MicRecorder {
    async fn next_utterance(&mut self) -> Result<String> {
        let mut channel = AudioChannel::connect(&self.stream_url).await?;
        channel.send_start().await?;

        let stop = Arc::new(AtomicBool::new(false));
        let (pcm_tx, mut pcm_rx) = mpsc::channel::<Vec<u8>>(32);

        let capture_stop = Arc::clone(&stop);
        let capture_thread = std::thread::spawn(move || -> Result<()> {
            let mut capture = AudioCapture::new()?;
            capture.start()?;
            let rate = capture.sample_rate();

            loop {
                std::thread::sleep(CHUNK_INTERVAL);
                let samples = capture.take_buffer();
                if !samples.is_empty() {
                    let pcm = pcm16_bytes(&downsample(&samples, rate, TARGET_SAMPLE_RATE));
                    if pcm_tx.blocking_send(pcm).is_err() {
                        break;
                    }
                }
                if capture_stop.load(Ordering::Relaxed) {
                    break;
                }
            }

            capture.stop();
            Ok(())
        });

        println!("Recording... press Enter to stop.");
        let (enter_tx, mut enter_rx) = tokio::sync::oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            let _ = enter_tx.send(());
        });

        // Forward chunks in arrival order until the user stops
        loop {
            tokio::select! {
                chunk = pcm_rx.recv() => match chunk {
                    Some(pcm) => channel.send_audio(pcm).await?,
                    None => break,
                },
                _ = &mut enter_rx => {
                    stop.store(true, Ordering::Relaxed);
                    // Drain the tail the capture thread flushes on its way out
                    while let Some(pcm) = pcm_rx.recv().await {
                        channel.send_audio(pcm).await?;
                    }
                    break;
                }
            }
        }

        match capture_thread.join() {
            Ok(result) => result?,
            Err(_) => return Err(Error::Audio("capture thread panicked".to_string())),
        }

        let transcript = channel.stop_and_wait_final().await?;
        channel.close().await;

        if transcript.trim().is_empty() {
            println!("No speech detected, try again.");
        } else {
            println!("You said: {transcript}");
        }

        Ok(transcript)
    }
}

/// Microphone level check: one meter line per second
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!(
        "Listening on the default input at {} Hz for {duration}s; say something.\n",
        capture.sample_rate()
    );

    for second in 1..=duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let rms = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filled = ((rms * 80.0).min(40.0)) as usize;
        println!(
            "{second:>3}s  rms {rms:.4}  peak {peak:.4}  |{}{}|",
            "=".repeat(filled),
            " ".repeat(40 - filled)
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\nA moving bar means the input device works.");
    println!("Flat readings usually mean the wrong default source is selected.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Speaker check: two seconds of a 440 Hz tone at moderate volume
async fn test_speaker() -> anyhow::Result<()> {
    let mut playback = AudioPlayback::new()?;

    let sample_rate = 24_000_u32;
    let seconds = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let total = (sample_rate as f32 * seconds) as usize;

    #[allow(clippy::cast_precision_loss)]
    let tone: Vec<f32> = (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    println!("Playing a 440 Hz tone on the default output for {seconds}s...");
    playback.play(tone, sample_rate).await?;

    println!("Done. Silence means the default sink is muted or misselected.");

    Ok(())
}
