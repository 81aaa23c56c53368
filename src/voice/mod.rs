//! Voice I/O for the robot client
//!
//! Handles microphone capture, speaker playback, and text-to-speech.

mod capture;
mod playback;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav, save_wav};
pub use playback::{AudioPlayback, decode_mp3};
pub use tts::{GOOGLE_CHUNK_CHARS, TextToSpeech, split_text};
