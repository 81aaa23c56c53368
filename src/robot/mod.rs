//! Voice robot client
//!
//! Each turn: wait for Enter, record from the microphone, read the typed
//! message, ask the relay, speak the reply, nod the head servo. The
//! recording is saved but not transcribed yet.

mod client;
mod config;
mod servo;

use std::path::PathBuf;
use std::time::Duration;

pub use client::RelayClient;
pub use config::{DEFAULT_CONFIG_FILE, RobotConfig};
pub use servo::Servo;

use crate::voice::{AudioCapture, AudioPlayback, TextToSpeech, save_wav};
use crate::Result;

/// The robot: relay client, voice, and servos
pub struct Robot {
    config: RobotConfig,
    client: RelayClient,
    tts: TextToSpeech,
    servo: Servo,
}

impl Robot {
    /// Build a robot from its config
    ///
    /// # Errors
    ///
    /// Returns error if the relay client can't be built
    pub fn new(config: RobotConfig) -> Result<Self> {
        let client = RelayClient::new(&config)?;
        let tts = TextToSpeech::google(config.tts_lang.clone());

        Ok(Self {
            config,
            client,
            tts,
            servo: Servo,
        })
    }

    /// Run turns until Ctrl+C or end of input
    ///
    /// # Errors
    ///
    /// Returns error if audio capture, synthesis, or playback fails
    #[allow(clippy::future_not_send)]
    pub async fn run(&self) -> Result<()> {
        println!("Cruddy is ready! Press Ctrl+C to exit");

        loop {
            tokio::select! {
                turn = self.turn() => {
                    if !turn? {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        println!("\nCruddy going to sleep...");
        Ok(())
    }

    /// One listen/ask/speak cycle; `false` when input has ended
    #[allow(clippy::future_not_send)]
    async fn turn(&self) -> Result<bool> {
        if prompt_line("Press Enter to start listening...").await.is_none() {
            return Ok(false);
        }

        let recording = self.listen().await?;
        tracing::debug!(path = %recording.display(), "recording saved");

        let Some(message) = prompt_line("Type your message").await else {
            return Ok(false);
        };

        let reply = self.client.send_message(&message).await;
        self.speak(&reply).await?;

        self.servo.move_to("head", 30);
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.servo.move_to("head", 0);

        Ok(true)
    }

    /// Record from the microphone and save the clip
    #[allow(clippy::future_not_send)]
    async fn listen(&self) -> Result<PathBuf> {
        println!("Listening...");

        let mut capture = AudioCapture::new()?;
        let samples = capture.record(self.config.record_duration()).await?;
        save_wav(&self.config.recording_path, &samples, capture.sample_rate())?;

        Ok(self.config.recording_path.clone())
    }

    /// Print and speak a reply
    async fn speak(&self, text: &str) -> Result<()> {
        println!("Cruddy says: {text}");
        if text.trim().is_empty() {
            return Ok(());
        }

        let mp3 = self.tts.synthesize(text).await?;
        AudioPlayback::new()?.play_mp3(&mp3).await
    }
}

/// Read one line from the terminal, `None` on EOF or terminal error
///
/// The read runs on a detached thread so Ctrl+C can end the loop while a
/// prompt is still waiting.
async fn prompt_line(prompt: &'static str) -> Option<String> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    std::thread::spawn(move || {
        let line = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        // Receiver is gone if the loop already ended
        let _ = tx.send(line);
    });

    match rx.await {
        Ok(Ok(line)) => Some(line),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "input closed");
            None
        }
        Err(_) => None,
    }
}
