use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Converts between the telephony codec (8 kHz mono mu-law) and the formats
/// the transcription and synthesis services work with.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Inbound: mu-law 8 kHz → 16 kHz s16le PCM for transcription.
    async fn mulaw_to_pcm(&self, mulaw: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Outbound: synthesized MP3 → mu-law 8 kHz for the media stream.
    async fn mp3_to_mulaw(&self, mp3: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Shells out to ffmpeg over stdin/stdout pipes.
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    async fn run(args: &[&str], input: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn ffmpeg")?;

        let mut stdin = child
            .stdin
            .take()
            .context("ffmpeg stdin unavailable")?;
        let input = input.to_vec();
        // Write on a separate task so a full stdout pipe can't deadlock the
        // write; dropping stdin closes the pipe and lets ffmpeg finish.
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
        });

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for ffmpeg")?;
        let _ = writer.await;

        anyhow::ensure!(
            output.status.success(),
            "ffmpeg exited with {}",
            output.status
        );
        Ok(output.stdout)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn mulaw_to_pcm(&self, mulaw: &[u8]) -> anyhow::Result<Vec<u8>> {
        Self::run(
            &[
                "-f", "mulaw", "-ar", "8000", "-ac", "1", "-i", "pipe:0",
                "-ar", "16000", "-ac", "1", "-f", "s16le", "pipe:1",
            ],
            mulaw,
        )
        .await
    }

    async fn mp3_to_mulaw(&self, mp3: &[u8]) -> anyhow::Result<Vec<u8>> {
        Self::run(
            &[
                "-i", "pipe:0",
                "-f", "mulaw", "-ar", "8000", "-ac", "1", "pipe:1",
            ],
            mp3,
        )
        .await
    }
}
