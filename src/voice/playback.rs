//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig, SupportedStreamConfigRange};

use crate::{Error, Result};

/// Sample rate used when the caller doesn't know better (matches gTTS output)
const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Read position into a clip, shared with the output callback
struct Cursor32 {
    samples: Vec<f32>,
    position: usize,
}

/// Plays mono audio to the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Play f32 samples at the default rate
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub async fn play(&self, samples: Vec<f32>) -> Result<()> {
        self.play_at(samples, DEFAULT_SAMPLE_RATE).await
    }

    /// Decode MP3 bytes and play them at their native rate
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_mp3(mp3_data)?;
        self.play_at(samples, sample_rate).await
    }

    /// Play samples and wait until the clip has been consumed
    #[allow(clippy::unused_async)]
    async fn play_at(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.output_config(sample_rate)?;
        let channels = usize::from(config.channels);
        let sample_count = samples.len();

        let cursor = Arc::new(Mutex::new(Cursor32 {
            samples,
            position: 0,
        }));
        let callback_cursor = Arc::clone(&cursor);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut cursor) = callback_cursor.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = cursor.samples.get(cursor.position).copied();
                        frame.fill(sample.unwrap_or(0.0));
                        if sample.is_some() {
                            cursor.position += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Poll for completion, bounded by the clip length plus slack
        let clip_ms = (sample_count as u64 * 1000) / u64::from(sample_rate.max(1));
        let deadline = Instant::now() + Duration::from_millis(clip_ms + 500);

        loop {
            let done = !cursor
                .lock()
                .is_ok_and(|c| c.position < c.samples.len());
            if done || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, sample_rate, "playback complete");

        Ok(())
    }

    /// Pick a mono (or stereo fallback) output config at `sample_rate`
    fn output_config(&self, sample_rate: u32) -> Result<StreamConfig> {
        let supports = |c: &SupportedStreamConfigRange, channels: u16| {
            c.channels() == channels
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        };

        let configs: Vec<SupportedStreamConfigRange> = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .collect();

        configs
            .iter()
            .find(|c| supports(c, 1))
            .or_else(|| configs.iter().find(|c| supports(c, 2)))
            .map(|c| c.clone().with_sample_rate(SampleRate(sample_rate)).config())
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })
    }
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error if the data isn't decodable MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = DEFAULT_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if let Ok(rate) = u32::try_from(frame.sample_rate) {
                    sample_rate = rate;
                }

                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}
