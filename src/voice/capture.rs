//! Microphone recording for the robot's listen step

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};

use crate::{Error, Result};

/// Recording rate (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Mono samples collected by the input callback
///
/// Interleaved frames from multi-channel devices are averaged down to mono.
#[derive(Debug, Default)]
pub struct MonoSink {
    samples: Vec<f32>,
}

impl MonoSink {
    /// Append interleaved frames of `channels` samples each
    pub fn push_frames(&mut self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.samples.extend_from_slice(data);
            return;
        }

        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / channels as f32;
        self.samples
            .extend(data.chunks(channels).map(|frame| frame.iter().sum::<f32>() * scale));
    }

    /// Take everything collected so far
    pub fn drain(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Records mono audio from the default input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    sink: Arc<Mutex<MonoSink>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device at [`SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it can't record at
    /// [`SAMPLE_RATE`] in mono or stereo
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;
        let config = input_config(&device)?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            sink: Arc::new(Mutex::new(MonoSink::default())),
            stream: None,
        })
    }

    /// Begin filling the sink; no-op while already recording
    ///
    /// # Errors
    ///
    /// Returns error if the input stream can't be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let sink = Arc::clone(&self.sink);
        let channels = usize::from(self.config.channels);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut sink) = sink.lock() {
                        sink.push_frames(data, channels);
                    }
                },
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop recording, keeping whatever is in the sink
    pub fn stop(&mut self) {
        self.stream = None;
    }

    /// Record a fresh clip of `duration`
    ///
    /// # Errors
    ///
    /// Returns error if the microphone can't start
    #[allow(clippy::future_not_send)]
    pub async fn record(&mut self, duration: Duration) -> Result<Vec<f32>> {
        self.drain();
        self.start()?;
        tokio::time::sleep(duration).await;
        self.stop();

        let samples = self.drain();
        tracing::debug!(samples = samples.len(), ?duration, "recording finished");
        Ok(samples)
    }

    /// Take the samples recorded since the last drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.sink
            .lock()
            .map(|mut sink| sink.drain())
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Mono at [`SAMPLE_RATE`] if the device has it, otherwise stereo
fn input_config(device: &Device) -> Result<StreamConfig> {
    let configs: Vec<SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .collect();

    let supports = |c: &&SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels
            && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
            && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
    };

    configs
        .iter()
        .find(|c| supports(c, 1))
        .or_else(|| configs.iter().find(|c| supports(c, 2)))
        .map(|c| c.clone().with_sample_rate(SampleRate(SAMPLE_RATE)).config())
        .ok_or_else(|| Error::Audio(format!("microphone can't record at {SAMPLE_RATE} Hz")))
}

/// Encode f32 samples as 16-bit mono WAV
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
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write samples to a WAV file, replacing it if present
///
/// # Errors
///
/// Returns error if encoding or writing fails
pub fn save_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let wav = samples_to_wav(samples, sample_rate)?;
    std::fs::write(path, wav)?;
    tracing::debug!(path = %path.display(), "saved recording");
    Ok(())
}
