//! Application state management
//!
//! This module provides the central state for the UI. `AppState` is the
//! single owner of the session; worker events are applied here once per
//! frame and the resulting effects are handed to the orchestrator.

use crate::chat::ChatEvent;
use crate::integration::{Orchestrator, OrchestratorEvent};
use crate::presence::PresenceEvent;
use crate::session::{Effect, SessionState};
use crate::speech::{RecognizerEvent, SynthesisEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Presence socket status shown in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected(String),
    Closed,
}

impl ConnectionStatus {
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Connecting => "Connecting…".to_string(),
            ConnectionStatus::Connected => "Connected".to_string(),
            ConnectionStatus::Disconnected(reason) => format!("Disconnected: {reason}"),
            ConnectionStatus::Closed => "Closed".to_string(),
        }
    }
}

/// Debug information displayed in the debug panel
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    /// Frames sent over the presence socket
    pub frames_sent: u64,
    /// Round trip of the last chat reply
    pub last_reply_ms: Option<u64>,
    /// Context snippets of the last chat reply
    pub last_context: Vec<String>,
    /// Backend health probe result
    pub health: Option<(bool, String)>,
    /// Frame source description
    pub frame_source: String,
    /// Current frame rate
    pub fps: f32,
    /// Recent log messages
    pub log_messages: VecDeque<String>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self {
            log_messages: VecDeque::with_capacity(100),
            ..Default::default()
        }
    }

    pub fn add_log(&mut self, message: String) {
        if self.log_messages.len() >= 100 {
            self.log_messages.pop_front();
        }
        self.log_messages.push_back(message);
    }
}

/// Central application state
pub struct AppState {
    /// Conversation and flags
    pub session: SessionState,

    /// Current text input
    pub input_text: String,

    /// Presence socket status
    pub connection: ConnectionStatus,

    /// Latest frame sent to the backend, for the preview pane
    pub latest_frame: Option<Arc<Vec<u8>>>,

    /// Debug information
    pub debug_info: DebugInfo,

    /// Whether to show the debug panel
    pub show_debug_panel: bool,

    /// Running workers; absent in tests and previews
    orchestrator: Option<Orchestrator>,

    /// Frame time tracking for FPS
    frame_times: VecDeque<f64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// State without workers. Effects are logged and dropped.
    pub fn new() -> Self {
        Self::with_session(SessionState::new(false))
    }

    /// State around an existing session
    pub fn with_session(session: SessionState) -> Self {
        Self {
            session,
            input_text: String::new(),
            connection: ConnectionStatus::Connecting,
            latest_frame: None,
            debug_info: DebugInfo::new(),
            show_debug_panel: false,
            orchestrator: None,
            frame_times: VecDeque::with_capacity(60),
        }
    }

    /// State driven by running workers
    pub fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        let mut state = Self::with_session(SessionState::new(orchestrator.recognizer_available()));
        state.debug_info.frame_source = orchestrator.frame_source().to_string();
        state.orchestrator = Some(orchestrator);
        state
    }

    /// Whether workers are attached
    pub fn has_workers(&self) -> bool {
        self.orchestrator.is_some()
    }

    /// Update FPS calculation
    pub fn update_fps(&mut self, delta_time: f64) {
        self.frame_times.push_back(delta_time);
        if self.frame_times.len() > 60 {
            self.frame_times.pop_front();
        }

        if !self.frame_times.is_empty() {
            let avg_time: f64 = self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64;
            self.debug_info.fps = if avg_time > 0.0 { 1.0 / avg_time as f32 } else { 0.0 };
        }
    }

    /// Send the typed message
    pub fn send_message(&mut self) {
        if self.input_text.trim().is_empty() {
            return;
        }

        let effects = self.session.submit_text(&self.input_text);
        self.apply(effects);
        self.input_text.clear();
    }

    /// Mic button
    pub fn toggle_mic(&mut self) {
        let effects = self.session.toggle_mic();
        self.apply(effects);
    }

    /// Stop-speaking button
    pub fn stop_speaking(&mut self) {
        let effects = self.session.stop_speaking();
        self.apply(effects);
    }

    /// End-call button
    pub fn end_call(&mut self) {
        let effects = self.session.end_call();
        if !effects.is_empty() {
            self.debug_info.add_log("Call ended".to_string());
            self.connection = ConnectionStatus::Closed;
        }
        self.apply(effects);
    }

    /// Process incoming events from the workers
    pub fn poll_events(&mut self) {
        let events = match self.orchestrator.as_mut() {
            Some(orchestrator) => orchestrator.drain_events(),
            None => return,
        };

        for event in events {
            self.handle_event(event);
        }
    }

    /// Apply one worker event to the session
    pub fn handle_event(&mut self, event: OrchestratorEvent) {
        let effects = match event {
            OrchestratorEvent::Presence(event) => self.handle_presence(event),
            OrchestratorEvent::Chat(event) => self.handle_chat(event),
            OrchestratorEvent::Recognizer(event) => self.handle_recognizer(event),
            OrchestratorEvent::Synthesis(event) => {
                match event {
                    SynthesisEvent::Started(id) => self.session.on_speech_started(id),
                    SynthesisEvent::Ended(id) => self.session.on_speech_ended(id),
                    SynthesisEvent::Error { utterance_id, error } => {
                        self.session.on_speech_ended(utterance_id);
                        self.debug_info.add_log(format!("TTS error: {}", error));
                    }
                }
                Vec::new()
            }
        };

        self.apply(effects);
    }

    fn handle_presence(&mut self, event: PresenceEvent) -> Vec<Effect> {
        match event {
            PresenceEvent::Connected => {
                self.connection = ConnectionStatus::Connected;
                self.session.on_channel_opened();
                self.debug_info.add_log("Presence channel connected".to_string());
                Vec::new()
            }
            PresenceEvent::Update(update) => {
                let effects = self.session.on_presence(&update);
                if !effects.is_empty() {
                    self.debug_info
                        .add_log(format!("Greeted {}", update.user.as_deref().unwrap_or("?")));
                }
                effects
            }
            // Frames still queued when the call ended are not shown
            PresenceEvent::FrameSent { .. } if self.session.is_call_ended() => Vec::new(),
            PresenceEvent::FrameSent { jpeg, count } => {
                self.latest_frame = Some(jpeg);
                self.debug_info.frames_sent = count;
                Vec::new()
            }
            PresenceEvent::Disconnected { reason } => {
                self.debug_info.add_log(format!("Presence channel closed: {}", reason));
                if !self.session.is_call_ended() {
                    self.connection = ConnectionStatus::Disconnected(reason);
                }
                Vec::new()
            }
            PresenceEvent::Error(error) => {
                self.debug_info.add_log(format!("Presence error: {}", error));
                self.session.record_error(error.clone());
                if !self.session.is_call_ended() {
                    self.connection = ConnectionStatus::Disconnected(error);
                }
                Vec::new()
            }
            PresenceEvent::Shutdown => {
                debug!("Presence worker shut down");
                if self.connection == ConnectionStatus::Connected {
                    self.connection = ConnectionStatus::Closed;
                }
                Vec::new()
            }
        }
    }

    fn handle_chat(&mut self, event: ChatEvent) -> Vec<Effect> {
        match event {
            ChatEvent::Reply {
                request_id,
                reply,
                elapsed_ms,
            } => {
                self.debug_info.last_reply_ms = Some(elapsed_ms);
                self.debug_info.last_context = reply.context;
                self.session.on_chat_reply(request_id, &reply.reply)
            }
            ChatEvent::Failed { request_id, error } => {
                self.debug_info.add_log(format!("Chat error: {}", error));
                self.session.on_chat_failed(request_id, &error.to_string())
            }
            ChatEvent::Health { healthy, detail } => {
                self.debug_info
                    .add_log(format!("Backend health: {}", if healthy { "ok" } else { "down" }));
                self.debug_info.health = Some((healthy, detail));
                Vec::new()
            }
            ChatEvent::Shutdown => {
                debug!("Chat dispatcher shut down");
                Vec::new()
            }
        }
    }

    fn handle_recognizer(&mut self, event: RecognizerEvent) -> Vec<Effect> {
        match event {
            RecognizerEvent::Started => {
                self.debug_info.add_log("Listening…".to_string());
                self.session.on_recognition_started()
            }
            RecognizerEvent::Stopped => {
                self.debug_info.add_log("Stopped listening".to_string());
                self.session.on_recognition_stopped();
                Vec::new()
            }
            RecognizerEvent::Transcript(transcript) => {
                info!("Final result: {}", transcript);
                self.session.on_transcript(&transcript)
            }
            RecognizerEvent::Error(error) => {
                self.debug_info.add_log(format!("Recognition error: {}", error));
                Vec::new()
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match self.orchestrator.as_mut() {
                Some(orchestrator) => orchestrator.execute(effect),
                None => debug!(?effect, "No workers attached, dropping effect"),
            }
        }
    }

    /// Stop all workers
    pub fn shutdown(&mut self) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.shutdown();
        }
    }
}
