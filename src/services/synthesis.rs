use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize an utterance to encoded audio (MP3).
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>>;
}

pub struct ElevenLabsProvider {
    api_key: String,
    voice_id: String,
    client: reqwest::Client,
}

impl ElevenLabsProvider {
    pub fn new(api_key: String, voice_id: String) -> Self {
        Self {
            api_key,
            voice_id,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SynthesisProvider for ElevenLabsProvider {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );

        let resp = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.api_key)
            .json(&json!({ "text": text }))
            .send()
            .await
            .context("failed to call ElevenLabs API")?
            .error_for_status()
            .context("ElevenLabs API returned error")?;

        let audio = resp
            .bytes()
            .await
            .context("failed to read synthesized audio")?;

        tracing::debug!(bytes = audio.len(), "received synthesized audio");
        Ok(audio.to_vec())
    }
}
