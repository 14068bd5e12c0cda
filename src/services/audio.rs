use std::time::{Duration, Instant};

/// Inbound frames accumulated before a transcription batch is worth sending.
pub const BATCH_THRESHOLD: usize = 80;

/// Identical transcripts inside this window are treated as streaming echoes;
/// repetition after it is treated as intentional.
pub const DUPLICATE_COOLDOWN: Duration = Duration::from_secs(3);

/// Consecutive empty transcription results before the fallback utterance.
pub const MAX_FAILED_TRANSCRIPTIONS: u32 = 3;

/// 8 kHz mono 8-bit mu-law.
const MULAW_BYTES_PER_SECOND: u64 = 8000;

/// Ordered in-memory buffer of inbound codec frames for one session. Only
/// the session task touches it, so no locking.
#[derive(Debug, Default)]
pub struct AudioBatchBuffer {
    frames: Vec<Vec<u8>>,
    suppressed: bool,
}

impl AudioBatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. Discarded outright while capture is suppressed:
    /// anything arriving then is an echo of our own playback.
    pub fn push(&mut self, frame: Vec<u8>) {
        if self.suppressed {
            return;
        }
        self.frames.push(frame);
    }

    /// Toggled by the playback arbiter for the duration of an outbound
    /// utterance.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    pub fn is_ready(&self) -> bool {
        self.frames.len() >= BATCH_THRESHOLD
    }

    /// Take the whole batch, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<u8> {
        let frames = std::mem::take(&mut self.frames);
        frames.concat()
    }

    /// Discard everything captured so far (stale audio after playback).
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// What to do with a transcription result.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// New (or intentionally repeated) speech; run it through the
    /// conversation engine.
    Forward(String),
    /// Streaming echo of the previous transcript; drop it.
    Duplicate,
    /// Third consecutive empty result; speak the fallback utterance.
    Fallback,
    /// Empty result below the fallback threshold; wait for more audio.
    Silent,
}

/// Deduplicates transcription results and counts consecutive empty ones.
#[derive(Debug, Default)]
pub struct TranscriptionGate {
    last_text: Option<String>,
    last_at: Option<Instant>,
    failed: u32,
}

impl TranscriptionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, text: &str, now: Instant) -> GateDecision {
        if text.is_empty() {
            self.failed += 1;
            if self.failed >= MAX_FAILED_TRANSCRIPTIONS {
                self.failed = 0;
                return GateDecision::Fallback;
            }
            return GateDecision::Silent;
        }

        let within_cooldown = self
            .last_at
            .map(|at| now.duration_since(at) < DUPLICATE_COOLDOWN)
            .unwrap_or(false);
        if self.last_text.as_deref() == Some(text) && within_cooldown {
            self.failed = 0;
            return GateDecision::Duplicate;
        }

        self.failed = 0;
        self.last_text = Some(text.to_string());
        self.last_at = Some(now);
        GateDecision::Forward(text.to_string())
    }
}

/// Estimated playback duration of an encoded mu-law payload, rounded up to
/// whole milliseconds. An estimate only: the telephony transport gives no
/// playback-finished signal.
pub fn playback_duration(payload_len: usize) -> Duration {
    let ms = (payload_len as u64 * 1000).div_ceil(MULAW_BYTES_PER_SECOND);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Vec<u8> {
        vec![0u8; 160]
    }

    #[test]
    fn test_buffer_not_ready_below_threshold() {
        let mut buffer = AudioBatchBuffer::new();
        for _ in 0..BATCH_THRESHOLD - 1 {
            buffer.push(frame());
        }
        assert!(!buffer.is_ready());
        buffer.push(frame());
        assert!(buffer.is_ready());
    }

    #[test]
    fn test_drain_concatenates_and_empties() {
        let mut buffer = AudioBatchBuffer::new();
        buffer.push(vec![1, 2]);
        buffer.push(vec![3]);
        assert_eq!(buffer.drain(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_push_discards_frames_while_suppressed() {
        let mut buffer = AudioBatchBuffer::new();
        buffer.set_suppressed(true);
        for _ in 0..BATCH_THRESHOLD {
            buffer.push(frame());
        }
        assert!(buffer.is_empty());
        assert!(!buffer.is_ready());
    }

    #[test]
    fn test_push_accumulates_again_after_suppression_lifts() {
        let mut buffer = AudioBatchBuffer::new();
        buffer.set_suppressed(true);
        buffer.push(frame());
        buffer.set_suppressed(false);
        buffer.push(frame());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_clear_discards_frames() {
        let mut buffer = AudioBatchBuffer::new();
        buffer.push(frame());
        buffer.clear();
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_gate_forwards_new_text() {
        let mut gate = TranscriptionGate::new();
        let now = Instant::now();
        assert_eq!(
            gate.observe("hello", now),
            GateDecision::Forward("hello".to_string())
        );
    }

    #[test]
    fn test_gate_suppresses_duplicate_within_cooldown() {
        let mut gate = TranscriptionGate::new();
        let now = Instant::now();
        gate.observe("book me in", now);
        assert_eq!(
            gate.observe("book me in", now + Duration::from_secs(1)),
            GateDecision::Duplicate
        );
    }

    #[test]
    fn test_gate_forwards_repeat_after_cooldown() {
        let mut gate = TranscriptionGate::new();
        let now = Instant::now();
        gate.observe("book me in", now);
        assert_eq!(
            gate.observe("book me in", now + Duration::from_secs(3)),
            GateDecision::Forward("book me in".to_string())
        );
    }

    #[test]
    fn test_gate_fallback_after_three_empty_results() {
        let mut gate = TranscriptionGate::new();
        let now = Instant::now();
        assert_eq!(gate.observe("", now), GateDecision::Silent);
        assert_eq!(gate.observe("", now), GateDecision::Silent);
        assert_eq!(gate.observe("", now), GateDecision::Fallback);
        // Counter reset: the next empty result starts over.
        assert_eq!(gate.observe("", now), GateDecision::Silent);
    }

    #[test]
    fn test_gate_duplicate_resets_failure_counter() {
        let mut gate = TranscriptionGate::new();
        let now = Instant::now();
        gate.observe("hello", now);
        gate.observe("", now);
        gate.observe("", now);
        // Duplicate in between resets the empty-result streak.
        gate.observe("hello", now + Duration::from_secs(1));
        assert_eq!(gate.observe("", now), GateDecision::Silent);
    }

    #[test]
    fn test_playback_duration_exact() {
        assert_eq!(playback_duration(8000), Duration::from_millis(1000));
        assert_eq!(playback_duration(4000), Duration::from_millis(500));
    }

    #[test]
    fn test_playback_duration_rounds_up() {
        assert_eq!(playback_duration(1), Duration::from_millis(1));
        assert_eq!(playback_duration(12345), Duration::from_millis(1544));
        assert_eq!(playback_duration(0), Duration::from_millis(0));
    }
}
