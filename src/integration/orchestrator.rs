//! Orchestrator for the call session
//!
//! Owns the workers and capabilities: Capture -> Presence socket,
//! Recognizer -> Chat endpoint -> Synthesizer. The UI thread drains their
//! events with `drain_events` and hands session effects back via `execute`.

use crate::chat::{ChatCommand, ChatDispatcher, ChatEvent, ChatRequest, DispatcherConfig};
use crate::integration::config::IntegrationConfig;
use crate::presence::{
    CaptureLoop, DirectoryFrameSource, FrameSource, NoFrameSource, PresenceChannel, PresenceEvent,
    PresenceHandle,
};
use crate::session::Effect;
use crate::speech::{
    recognizer_channel, synthesis_channel, PacedSynthesizer, RecognizerEvent, SpeechInput,
    SpeechOutput, SpeechRecognizer, SpeechSynthesizer, SynthesisEvent, UnavailableRecognizer,
};
use crate::{ChatError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Events from every worker, in the order they were drained
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    Presence(PresenceEvent),
    Chat(ChatEvent),
    Recognizer(RecognizerEvent),
    Synthesis(SynthesisEvent),
}

/// Platform capabilities the session runs on
pub struct Capabilities {
    pub frame_source: Box<dyn FrameSource>,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub recognizer_events: Receiver<RecognizerEvent>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub synthesis_events: Receiver<SynthesisEvent>,
}

impl Capabilities {
    /// Desktop defaults: frames from `frames_dir` if set, no recognizer,
    /// paced silent synthesis
    pub fn from_config(config: &IntegrationConfig) -> Result<Self> {
        let frame_source: Box<dyn FrameSource> = match &config.frames_dir {
            Some(dir) => Box::new(DirectoryFrameSource::open(dir)?),
            None => {
                warn!("No camera frames configured, presence detection will see nothing");
                Box::new(NoFrameSource)
            }
        };

        let (_recognizer_tx, recognizer_events) = recognizer_channel();
        let (synthesis_tx, synthesis_events) = synthesis_channel();
        let synthesizer = PacedSynthesizer::start(config.words_per_minute, &config.language, synthesis_tx)?;

        Ok(Self {
            frame_source,
            recognizer: Box::new(UnavailableRecognizer),
            recognizer_events,
            synthesizer: Box::new(synthesizer),
            synthesis_events,
        })
    }
}

/// Main orchestrator that coordinates all components
pub struct Orchestrator {
    presence: PresenceHandle,
    chat_tx: Sender<ChatCommand>,
    chat_rx: Receiver<ChatEvent>,
    speech_input: SpeechInput,
    speech_output: SpeechOutput,
    frame_source: String,
    /// Events produced locally, delivered before worker events
    feedback: VecDeque<OrchestratorEvent>,
    shut_down: bool,
}

impl Orchestrator {
    /// Start all workers
    pub fn start(config: &IntegrationConfig, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;

        let frame_source = capabilities.frame_source.describe();
        let capture = CaptureLoop::new(capabilities.frame_source);
        let presence = PresenceChannel::new(config.presence_url()?, config.capture_interval)
            .with_reconnect(config.reconnect.clone())
            .start(capture)?;
        info!("Presence channel started ({})", frame_source);

        let dispatcher = ChatDispatcher::new(DispatcherConfig {
            chat_url: config.chat_url()?,
            health_url: config.health_url()?,
            timeout: config.chat_timeout,
        });
        let chat_tx = dispatcher.command_sender();
        let chat_rx = dispatcher.event_receiver();
        dispatcher.start_worker()?;
        info!("Chat dispatcher started");

        if config.health_check {
            let _ = chat_tx.send(ChatCommand::HealthCheck);
        }

        let speech_input = SpeechInput::new(capabilities.recognizer, capabilities.recognizer_events);
        let speech_output = SpeechOutput::new(capabilities.synthesizer, capabilities.synthesis_events);

        Ok(Self {
            presence,
            chat_tx,
            chat_rx,
            speech_input,
            speech_output,
            frame_source,
            feedback: VecDeque::new(),
            shut_down: false,
        })
    }

    pub fn recognizer_available(&self) -> bool {
        self.speech_input.is_available()
    }

    pub fn frame_source(&self) -> &str {
        &self.frame_source
    }

    /// Collect every pending event without blocking
    pub fn drain_events(&mut self) -> Vec<OrchestratorEvent> {
        let mut events: Vec<OrchestratorEvent> = self.feedback.drain(..).collect();

        while let Some(event) = self.presence.try_recv_event() {
            events.push(OrchestratorEvent::Presence(event));
        }
        while let Ok(event) = self.chat_rx.try_recv() {
            events.push(OrchestratorEvent::Chat(event));
        }
        while let Some(event) = self.speech_input.try_recv_event() {
            events.push(OrchestratorEvent::Recognizer(event));
        }
        while let Some(event) = self.speech_output.try_recv_event() {
            events.push(OrchestratorEvent::Synthesis(event));
        }

        events
    }

    /// Carry out one session effect
    pub fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Speak { utterance_id, text } => self.speech_output.speak(utterance_id, &text),
            Effect::CancelSpeech => self.speech_output.cancel(),
            Effect::StartRecognition => self.speech_input.start(),
            Effect::StopRecognition => self.speech_input.stop(),
            Effect::SendChat {
                request_id,
                text,
                user,
            } => {
                let command = ChatCommand::Send {
                    request_id,
                    request: ChatRequest::new(text).with_user(user),
                };
                if let Err(e) = self.chat_tx.send(command) {
                    // Report it so the session does not wait forever
                    let error = ChatError::Channel(format!("chat dispatcher unavailable: {e}"));
                    self.feedback
                        .push_back(OrchestratorEvent::Chat(ChatEvent::Failed { request_id, error }));
                }
            }
            Effect::ClosePresence => self.presence.close(),
        }
    }

    /// Stop every worker
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        debug!("Orchestrator shutting down");

        self.speech_output.cancel();
        self.speech_input.stop();
        self.presence.close();
        let _ = self.chat_tx.send(ChatCommand::Shutdown);
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::MemoryFrameSource;
    use crate::speech::ScriptedRecognizer;
    use std::time::{Duration, Instant};

    struct MuteSynthesizer;

    impl SpeechSynthesizer for MuteSynthesizer {
        fn speak(&mut self, _utterance_id: u64, _text: &str) -> Result<()> {
            Ok(())
        }

        fn cancel(&mut self) {}
    }

    fn offline_config() -> IntegrationConfig {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        IntegrationConfig::default()
            .with_backend("127.0.0.1", port)
            .with_chat_timeout(Duration::from_secs(5))
            .without_health_check()
    }

    fn capabilities(transcripts: Vec<String>) -> Capabilities {
        let (rec_tx, rec_rx) = recognizer_channel();
        let (_syn_tx, syn_rx) = synthesis_channel();
        Capabilities {
            frame_source: Box::new(MemoryFrameSource::new(vec![vec![0xFF, 0xD8]])),
            recognizer: Box::new(ScriptedRecognizer::new(rec_tx, transcripts)),
            recognizer_events: rec_rx,
            synthesizer: Box::new(MuteSynthesizer),
            synthesis_events: syn_rx,
        }
    }

    #[test]
    fn test_orchestrator_reports_offline_backend() {
        let mut orchestrator = Orchestrator::start(&offline_config(), capabilities(Vec::new())).unwrap();
        assert!(orchestrator.recognizer_available());

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut saw_presence_error = false;
        while Instant::now() < deadline && !saw_presence_error {
            saw_presence_error = orchestrator
                .drain_events()
                .iter()
                .any(|e| matches!(e, OrchestratorEvent::Presence(PresenceEvent::Error(_))));
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(saw_presence_error);
    }

    #[test]
    fn test_execute_routes_recognition_effects() {
        let mut orchestrator =
            Orchestrator::start(&offline_config(), capabilities(vec!["hello".to_string()])).unwrap();

        orchestrator.execute(Effect::StartRecognition);
        let events = orchestrator.drain_events();
        let recognizer: Vec<_> = events
            .into_iter()
            .filter_map(|e| match e {
                OrchestratorEvent::Recognizer(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(
            recognizer,
            vec![
                RecognizerEvent::Started,
                RecognizerEvent::Transcript("hello".to_string())
            ]
        );
    }
}
