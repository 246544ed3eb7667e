//! Speech output
//!
//! `SpeechSynthesizer` speaks bot replies and reports when each utterance
//! becomes audible and when it ends. Utterances are played in the order
//! they were requested.

use crate::{ChatError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Events emitted by a synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// Utterance became audible
    Started(u64),
    /// Utterance finished or was cancelled
    Ended(u64),
    /// Utterance could not be spoken
    Error { utterance_id: u64, error: String },
}

/// Text-to-speech engine
pub trait SpeechSynthesizer: Send {
    /// Queue `text` for speaking
    fn speak(&mut self, utterance_id: u64, text: &str) -> Result<()>;

    /// Cancel the active utterance and everything queued behind it
    fn cancel(&mut self);
}

/// Rough speaking time for `text`
pub fn estimate_duration(text: &str, words_per_minute: u32) -> Duration {
    let words = text.split_whitespace().count().max(1) as u64;
    let ms = words * 60_000 / u64::from(words_per_minute.max(1));
    Duration::from_millis(ms.max(300))
}

enum PacedCommand {
    Speak { utterance_id: u64, text: String },
    Cancel,
    Shutdown,
}

/// Silent synthesizer that keeps real-time pacing
///
/// No audio is produced. Each utterance "plays" for as long as it would take
/// to read aloud, so start/end notifications drive the speaking indicator
/// the same way an audio engine would.
pub struct PacedSynthesizer {
    command_tx: Sender<PacedCommand>,
}

impl PacedSynthesizer {
    /// Spawn the pacing thread; events go to `event_tx`
    pub fn start(words_per_minute: u32, language: &str, event_tx: Sender<SynthesisEvent>) -> Result<Self> {
        let (command_tx, command_rx) = bounded(100);
        info!("Paced synthesizer ({} wpm, {})", words_per_minute, language);

        std::thread::Builder::new()
            .name("speech-output".to_string())
            .spawn(move || run_paced(words_per_minute, command_rx, event_tx))
            .map_err(|e| ChatError::Channel(format!("failed to spawn synthesizer: {e}")))?;

        Ok(Self { command_tx })
    }
}

impl SpeechSynthesizer for PacedSynthesizer {
    fn speak(&mut self, utterance_id: u64, text: &str) -> Result<()> {
        self.command_tx
            .send(PacedCommand::Speak {
                utterance_id,
                text: text.to_string(),
            })
            .map_err(|e| ChatError::Channel(format!("synthesizer stopped: {e}")))
    }

    fn cancel(&mut self) {
        let _ = self.command_tx.send(PacedCommand::Cancel);
    }
}

impl Drop for PacedSynthesizer {
    fn drop(&mut self) {
        let _ = self.command_tx.send(PacedCommand::Shutdown);
    }
}

fn run_paced(words_per_minute: u32, command_rx: Receiver<PacedCommand>, event_tx: Sender<SynthesisEvent>) {
    let mut queue: VecDeque<(u64, String)> = VecDeque::new();

    'outer: loop {
        if queue.is_empty() {
            match command_rx.recv() {
                Ok(PacedCommand::Speak { utterance_id, text }) => queue.push_back((utterance_id, text)),
                Ok(PacedCommand::Cancel) => continue,
                Ok(PacedCommand::Shutdown) | Err(_) => break,
            }
        }

        let Some((utterance_id, text)) = queue.pop_front() else {
            continue;
        };

        let deadline = Instant::now() + estimate_duration(&text, words_per_minute);
        debug!(utterance_id, "Speaking: {}", text);
        let _ = event_tx.send(SynthesisEvent::Started(utterance_id));

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match command_rx.recv_timeout(remaining) {
                Ok(PacedCommand::Speak { utterance_id, text }) => queue.push_back((utterance_id, text)),
                Ok(PacedCommand::Cancel) => {
                    debug!(utterance_id, "Speech cancelled");
                    queue.clear();
                    break;
                }
                Ok(PacedCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = event_tx.send(SynthesisEvent::Ended(utterance_id));
                    break 'outer;
                }
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        let _ = event_tx.send(SynthesisEvent::Ended(utterance_id));
    }

    debug!("Speech output thread stopped");
}

/// Create the event channel a synthesizer reports on
pub fn synthesis_channel() -> (Sender<SynthesisEvent>, Receiver<SynthesisEvent>) {
    unbounded()
}

/// Speech output component owned by the UI thread
pub struct SpeechOutput {
    synthesizer: Box<dyn SpeechSynthesizer>,
    event_rx: Receiver<SynthesisEvent>,
}

impl SpeechOutput {
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>, event_rx: Receiver<SynthesisEvent>) -> Self {
        Self {
            synthesizer,
            event_rx,
        }
    }

    pub fn speak(&mut self, utterance_id: u64, text: &str) {
        if let Err(e) = self.synthesizer.speak(utterance_id, text) {
            tracing::warn!(utterance_id, "Speech synthesis failed: {}", e);
        }
    }

    pub fn cancel(&mut self) {
        self.synthesizer.cancel();
    }

    /// Try to receive a synthesis event
    pub fn try_recv_event(&self) -> Option<SynthesisEvent> {
        self.event_rx.try_recv().ok()
    }
}
