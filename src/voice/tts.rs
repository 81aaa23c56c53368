//! Text-to-speech (TTS) synthesis

use crate::{Error, Result};

/// Longest text chunk the Google translate endpoint accepts
pub const GOOGLE_CHUNK_CHARS: usize = 100;

const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";
const OPENAI_TTS_URL: &str = "https://api.openai.com/v1/audio/speech";

/// TTS provider backend
#[derive(Clone, Debug)]
enum TtsProvider {
    /// Keyless Google translate voice, as used by gTTS
    Google { lang: String },
    OpenAI {
        api_key: String,
        voice: String,
        speed: f32,
        model: String,
    },
}

/// Synthesizes speech from text as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Google translate voice for `lang` (e.g. "en")
    #[must_use]
    pub fn google(lang: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider: TtsProvider::Google { lang: lang.into() },
        }
    }

    /// `OpenAI` TTS with the `tts-1` model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn openai(api_key: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider: TtsProvider::OpenAI {
                api_key,
                voice,
                speed,
                model: "tts-1".to_string(),
            },
        })
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match &self.provider {
            TtsProvider::Google { lang } => self.synthesize_google(text, lang).await,
            TtsProvider::OpenAI {
                api_key,
                voice,
                speed,
                model,
            } => {
                self.synthesize_openai(text, api_key, voice, *speed, model)
                    .await
            }
        }
    }

    /// One request per chunk; MP3 frames concatenate cleanly
    async fn synthesize_google(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let chunks = split_text(text, GOOGLE_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(Error::Tts("nothing to speak".to_string()));
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let url = format!(
                "{GOOGLE_TTS_URL}?ie=UTF-8&client=tw-ob&tl={}&q={}&total={total}&idx={idx}&textlen={}",
                urlencoding::encode(lang),
                urlencoding::encode(chunk),
                chunk.chars().count(),
            );

            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                return Err(Error::Tts(format!("Google TTS error {status} on chunk {idx}")));
            }

            audio.extend_from_slice(&response.bytes().await?);
        }

        tracing::debug!(chunks = chunks.len(), bytes = audio.len(), "synthesized speech");
        Ok(audio)
    }

    async fn synthesize_openai(
        &self,
        text: &str,
        api_key: &str,
        voice: &str,
        speed: f32,
        model: &str,
    ) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let response = self
            .client
            .post(OPENAI_TTS_URL)
            .bearer_auth(api_key)
            .json(&TtsRequest {
                model,
                input: text,
                voice,
                speed,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Split text into chunks of at most `max_chars`, breaking on whitespace
///
/// Words longer than `max_chars` are cut mid-word.
#[must_use]
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };

        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("  hello   there ", 100), vec!["hello there"]);
    }

    #[test]
    fn test_chunks_respect_limit_and_word_boundaries() {
        let text = "the quick brown fox jumps over the lazy dog";
        let chunks = split_text(text, 10);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join(" "), text);
        assert_eq!(chunks[0], "the quick");
    }

    #[test]
    fn test_long_word_is_cut() {
        let chunks = split_text("ab abcdefghij c", 4);
        assert_eq!(chunks, vec!["ab", "abcd", "efgh", "ij c"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn test_openai_requires_key() {
        assert!(TextToSpeech::openai(String::new(), "alloy".to_string(), 1.0).is_err());
    }
}
