use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use base64::Engine;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::models::CallSession;
use crate::services::audio::{
    playback_duration, AudioBatchBuffer, GateDecision, TranscriptionGate,
};
use crate::services::{conversation, scheduling};
use crate::state::AppState;

/// Cadence of the loop that drives batching, transitions and scheduling.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Events delivered from the media stream reader to the session task.
#[derive(Debug)]
enum StreamEvent {
    Start { stream_sid: String },
    Frame(Vec<u8>),
    Closed,
}

/// Inbound Twilio Media Stream message, as far as this layer cares.
#[derive(Deserialize)]
struct MediaMessage {
    event: String,
    #[serde(rename = "streamSid")]
    stream_sid: Option<String>,
    media: Option<MediaPayload>,
}

#[derive(Deserialize)]
struct MediaPayload {
    payload: String,
}

/// Run one call session to completion. The session task exclusively owns the
/// call context; the reader task only feeds it events over the channel.
pub async fn run(state: Arc<AppState>, socket: WebSocket) {
    let (sink, stream) = socket.split();
    // 256 slots hold about five seconds of 20 ms frames, enough to ride out
    // a slow calendar or oracle call blocking the tick handler.
    let (tx, events) = mpsc::channel(256);
    tokio::spawn(read_stream(stream, tx));

    let id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session = %id, "call connected");

    let mut engine = SessionEngine {
        state,
        session: CallSession::new(id),
        buffer: AudioBatchBuffer::new(),
        gate: TranscriptionGate::new(),
        unmute_at: None,
        sink,
    };
    engine.run(events).await;
}

/// Parse raw WebSocket traffic into stream events. Malformed messages are
/// logged and skipped; the call goes on.
async fn read_stream(mut stream: SplitStream<WebSocket>, tx: mpsc::Sender<StreamEvent>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<MediaMessage>(&text) {
                Ok(msg) => match msg.event.as_str() {
                    "start" => {
                        if let Some(sid) = msg.stream_sid {
                            if tx.send(StreamEvent::Start { stream_sid: sid }).await.is_err() {
                                return;
                            }
                        }
                    }
                    "media" => {
                        let Some(media) = msg.media else { continue };
                        match base64::engine::general_purpose::STANDARD.decode(media.payload) {
                            Ok(frame) => {
                                if tx.send(StreamEvent::Frame(frame)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "undecodable media payload");
                            }
                        }
                    }
                    "stop" => break,
                    _ => {}
                },
                Err(e) => tracing::warn!(error = %e, "ignoring malformed stream message"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                // Transport errors tear the session down like a normal close.
                tracing::warn!(error = %e, "media stream error");
                break;
            }
        }
    }
    let _ = tx.send(StreamEvent::Closed).await;
}

struct SessionEngine {
    state: Arc<AppState>,
    session: CallSession,
    buffer: AudioBatchBuffer,
    gate: TranscriptionGate,
    /// Deadline of the one-shot playback timer, when playback is underway.
    unmute_at: Option<tokio::time::Instant>,
    sink: SplitSink<WebSocket, Message>,
}

impl SessionEngine {
    async fn run(&mut self, mut events: mpsc::Receiver<StreamEvent>) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        loop {
            // Armed only while an utterance is playing out.
            let unmute_at = self.unmute_at;
            let unmute = async move {
                match unmute_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = events.recv() => match event {
                    Some(StreamEvent::Start { stream_sid }) => {
                        tracing::info!(session = %self.session.id, %stream_sid, "captured stream sid");
                        self.session.stream_sid = Some(stream_sid);
                    }
                    Some(StreamEvent::Frame(frame)) => self.buffer.push(frame),
                    Some(StreamEvent::Closed) | None => break,
                },
                _ = tick.tick() => self.on_tick().await,
                _ = unmute => {
                    self.session.ai_speaking = false;
                    self.buffer.set_suppressed(false);
                    self.buffer.clear();
                    self.unmute_at = None;
                    tracing::debug!(session = %self.session.id, "playback window ended, capture resumed");
                }
            }
        }

        self.session.reset();
        tracing::info!(session = %self.session.id, "call disconnected");
    }

    async fn on_tick(&mut self) {
        if self.session.ai_speaking {
            return;
        }

        // A pending booking takes the tick: availability calls are slow and
        // the caller is waiting on the answer.
        if self.session.pending_booking().is_some() {
            let reply = scheduling::resolve_pending_booking(
                self.state.calendar.as_ref(),
                &self.state.business,
                &mut self.session,
            )
            .await;
            if let Some(reply) = reply {
                self.speak(&reply).await;
            }
            return;
        }

        if !self.buffer.is_ready() {
            return;
        }
        let mulaw = self.buffer.drain();

        let text = match self.transcribe(mulaw).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session = %self.session.id, error = %e, "transcription failed");
                return;
            }
        };

        match self.gate.observe(&text, Instant::now()) {
            GateDecision::Forward(text) => {
                tracing::info!(session = %self.session.id, transcript = %text, "transcript accepted");
                let reply = conversation::handle_transcript(
                    self.state.llm.as_ref(),
                    &self.state.business,
                    &mut self.session,
                    &text,
                )
                .await;
                if let Some(reply) = reply {
                    self.speak(&reply).await;
                }
            }
            GateDecision::Duplicate => {
                tracing::debug!(session = %self.session.id, "skipping duplicate transcription");
            }
            GateDecision::Fallback => {
                tracing::info!(session = %self.session.id, "no usable speech, speaking fallback");
                let fallback = self.state.business.fallback_response().to_string();
                self.speak(&fallback).await;
            }
            GateDecision::Silent => {}
        }
    }

    async fn transcribe(&self, mulaw: Vec<u8>) -> anyhow::Result<String> {
        let pcm = self.state.transcoder.mulaw_to_pcm(&mulaw).await?;
        self.state.transcriber.transcribe(pcm).await
    }

    /// Synthesize and send one utterance, then suppress capture for its
    /// estimated playback duration.
    async fn speak(&mut self, text: &str) {
        let Some(stream_sid) = self.session.stream_sid.clone() else {
            tracing::warn!(session = %self.session.id, "no stream sid yet, dropping utterance");
            return;
        };

        let mulaw = match self.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                // The turn produces no audio; the session itself survives.
                tracing::error!(session = %self.session.id, error = %e, "synthesis failed");
                return;
            }
        };

        let payload = base64::engine::general_purpose::STANDARD.encode(&mulaw);
        let message = serde_json::json!({
            "event": "media",
            "streamSid": stream_sid,
            "media": { "payload": payload },
        });

        self.session.ai_speaking = true;
        self.buffer.set_suppressed(true);
        if let Err(e) = self.sink.send(Message::Text(message.to_string())).await {
            tracing::error!(session = %self.session.id, error = %e, "failed to send audio");
            self.session.ai_speaking = false;
            self.buffer.set_suppressed(false);
            return;
        }

        let duration = playback_duration(mulaw.len());
        self.unmute_at = Some(tokio::time::Instant::now() + duration);
        tracing::debug!(
            session = %self.session.id,
            duration_ms = duration.as_millis() as u64,
            "playback started"
        );
    }

    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let mp3 = self.state.synthesizer.synthesize(text).await?;
        self.state.transcoder.mp3_to_mulaw(&mp3).await
    }
}
