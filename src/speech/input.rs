//! Speech input
//!
//! Wraps a continuous speech recognizer behind `SpeechRecognizer`. Events
//! (started, stopped, finalized transcripts) arrive on a channel that the
//! UI thread drains every frame.

use crate::{ChatError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Events emitted by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// Recognition is running
    Started,
    /// Recognition stopped
    Stopped,
    /// Finalized transcript for one utterance
    Transcript(String),
    /// Engine error; recognition may still be running
    Error(String),
}

/// A continuous speech recognizer
pub trait SpeechRecognizer: Send {
    /// Whether the platform offers recognition at all
    fn is_available(&self) -> bool;

    /// Begin listening. `Started` is reported through the event channel.
    fn start(&mut self) -> Result<()>;

    /// Stop listening. `Stopped` is reported through the event channel.
    fn stop(&mut self) -> Result<()>;
}

/// Create the event channel a recognizer reports on
pub fn recognizer_channel() -> (Sender<RecognizerEvent>, Receiver<RecognizerEvent>) {
    unbounded()
}

/// Recognition is not supported on this platform
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<()> {
        Err(ChatError::Capability("speech recognition not supported".to_string()))
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Replays a fixed list of transcripts, one per `start`
///
/// Useful for demos without a microphone and for driving the session in tests.
pub struct ScriptedRecognizer {
    event_tx: Sender<RecognizerEvent>,
    transcripts: VecDeque<String>,
    listening: bool,
}

impl ScriptedRecognizer {
    pub fn new(event_tx: Sender<RecognizerEvent>, transcripts: Vec<String>) -> Self {
        Self {
            event_tx,
            transcripts: transcripts.into(),
            listening: false,
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<()> {
        if self.listening {
            return Ok(());
        }
        self.listening = true;
        self.send(RecognizerEvent::Started)?;
        if let Some(transcript) = self.transcripts.pop_front() {
            self.send(RecognizerEvent::Transcript(transcript))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.listening {
            return Ok(());
        }
        self.listening = false;
        self.send(RecognizerEvent::Stopped)
    }
}

impl ScriptedRecognizer {
    fn send(&self, event: RecognizerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| ChatError::Channel(format!("recognizer event channel closed: {e}")))
    }
}

/// Speech input component owned by the UI thread
pub struct SpeechInput {
    recognizer: Box<dyn SpeechRecognizer>,
    event_rx: Receiver<RecognizerEvent>,
    available: bool,
}

impl SpeechInput {
    /// Availability is checked once; an unavailable recognizer stays inert
    pub fn new(recognizer: Box<dyn SpeechRecognizer>, event_rx: Receiver<RecognizerEvent>) -> Self {
        let available = recognizer.is_available();
        if available {
            info!("Speech recognition available");
        } else {
            warn!("Speech recognition not supported on this platform, mic control disabled");
        }

        Self {
            recognizer,
            event_rx,
            available,
        }
    }

    /// A speech input that never listens
    pub fn unavailable() -> Self {
        let (_tx, rx) = recognizer_channel();
        Self::new(Box::new(UnavailableRecognizer), rx)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn start(&mut self) {
        if !self.available {
            return;
        }
        debug!("Starting speech recognition");
        if let Err(e) = self.recognizer.start() {
            warn!("Failed to start speech recognition: {}", e);
        }
    }

    pub fn stop(&mut self) {
        if !self.available {
            return;
        }
        debug!("Stopping speech recognition");
        if let Err(e) = self.recognizer.stop() {
            warn!("Failed to stop speech recognition: {}", e);
        }
    }

    /// Try to receive a recognizer event
    pub fn try_recv_event(&self) -> Option<RecognizerEvent> {
        self.event_rx.try_recv().ok()
    }
}
