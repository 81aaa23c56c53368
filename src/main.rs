use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cruddy::robot::DEFAULT_CONFIG_FILE;
use cruddy::voice::{AudioCapture, AudioPlayback, TextToSpeech};
use cruddy::{
    ApiServerBuilder, Config, ModelRegistry, OllamaBackend, RelayClient, Robot, RobotConfig,
};

/// Cruddy - chat relay for local language models and a voice robot client
#[derive(Parser)]
#[command(name = "cruddy", version, about)]
struct Cli {
    /// Relay server config file (defaults to ~/.config/cruddy/config.toml)
    #[arg(short, long, env = "CRUDDY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server (default)
    Serve,
    /// Run the voice robot chat loop
    Robot {
        /// Robot config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        robot_config: PathBuf,
    },
    /// Check that the relay is reachable
    Ping {
        /// Robot config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        robot_config: PathBuf,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,

        /// Language code
        #[arg(long, default_value = "en")]
        lang: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = match cli.verbose {
        0 => "info,cruddy=info",
        1 => "info,cruddy=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config, cli.port).await,
        Command::Robot { robot_config } => robot(&robot_config).await,
        Command::Ping { robot_config } => ping(&robot_config).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text, lang } => test_tts(&text, &lang).await,
    }
}

/// Run the relay server until Ctrl+C
async fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load(config_path.as_deref());
    if let Some(port) = port {
        config.port = port;
    }

    tracing::info!(
        addr = %config.bind_addr(),
        models_file = %config.models_file.display(),
        backend = %config.backend.base_url,
        "starting relay server"
    );

    if !config.models_file.exists() {
        tracing::warn!(
            path = %config.models_file.display(),
            "model registry file not found, model endpoints will fail until it exists"
        );
    }

    let registry = Arc::new(ModelRegistry::open(&config.models_file));
    let backend = Arc::new(OllamaBackend::new(
        config.backend.base_url.clone(),
        config.backend.timeout,
    ));

    ApiServerBuilder::new(registry, backend)
        .auth_token(config.auth_token.clone())
        .bind_addr(config.bind_addr())
        .build()
        .run()
        .await?;

    Ok(())
}

/// Run the robot chat loop
#[allow(clippy::future_not_send)]
async fn robot(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = RobotConfig::load(config_path)?;
    Robot::new(config)?.run().await?;
    Ok(())
}

/// Check relay connectivity
async fn ping(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = RobotConfig::load(config_path)?;
    let client = RelayClient::new(&config)?;

    match client.status().await {
        Ok(status) => {
            println!("Connection successful!");
            println!("Server status: {status}");
        }
        Err(e) => println!("Connection failed: {e}"),
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

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

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_u16;
    let frequency = 440.0_f32;
    let samples: Vec<f32> = (0..u32::from(sample_rate) * 2)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / f32::from(sample_rate);
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str, lang: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::google(lang);

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    AudioPlayback::new()?.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
