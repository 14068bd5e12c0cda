use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe a PCM audio batch. Empty text is a valid "nothing
    /// understood" result, not an error.
    async fn transcribe(&self, pcm: Vec<u8>) -> anyhow::Result<String>;
}

#[derive(Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
}

/// Client for a Whisper transcription sidecar exposing POST /transcribe.
pub struct WhisperHttpProvider {
    url: String,
    client: reqwest::Client,
}

impl WhisperHttpProvider {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperHttpProvider {
    async fn transcribe(&self, pcm: Vec<u8>) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(format!("{}/transcribe", self.url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(pcm)
            .send()
            .await
            .context("failed to call transcription service")?
            .error_for_status()
            .context("transcription service returned error")?;

        let data: TranscribeResponse = resp
            .json()
            .await
            .context("failed to parse transcription response")?;

        Ok(data.text.trim().to_string())
    }
}
