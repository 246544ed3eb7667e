//! Session state machine
//!
//! `SessionState` owns the conversation history and the UI flags. Every
//! event source has its own transition method which mutates the state and
//! returns the side effects the caller must carry out. Nothing in here talks
//! to a socket, a camera or a speech engine.

use crate::messages::{Message, MessageStorage};
use crate::presence::PresenceUpdate;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Greeting spoken the first time an identified user shows up
pub fn greeting_for(user: &str) -> String {
    format!("Hello {user}, how is your day going?")
}

/// Call lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Active,
    Ended,
}

/// Flags read by the presentation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// Speech recognition is running
    pub listening: bool,
    /// Presence backend currently sees someone
    pub user_active: bool,
    /// Greeting already issued on this presence connection
    pub greeted: bool,
    /// At least one chat request is in flight
    pub bot_typing: bool,
    /// Synthesized speech is audible
    pub speaking: bool,
    /// Call has ended
    pub call_ended: bool,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Synthesize `text`
    Speak { utterance_id: u64, text: String },
    /// Cancel all pending and active synthesis
    CancelSpeech,
    /// Start speech recognition
    StartRecognition,
    /// Stop speech recognition
    StopRecognition,
    /// Post `text` to the chat endpoint
    SendChat {
        request_id: Uuid,
        text: String,
        user: Option<String>,
    },
    /// Stop capturing and close the presence socket
    ClosePresence,
}

/// Central session state
#[derive(Debug)]
pub struct SessionState {
    messages: MessageStorage,
    flags: SessionFlags,
    phase: CallPhase,
    /// Chat requests awaiting a reply
    pending_requests: HashSet<Uuid>,
    /// Last identity reported by the presence backend
    current_user: Option<String>,
    recognizer_available: bool,
    next_utterance: u64,
    /// Utterances below this id were cancelled
    cancelled_before: u64,
    last_error: Option<String>,
}

impl SessionState {
    /// Create a fresh session
    pub fn new(recognizer_available: bool) -> Self {
        Self {
            messages: MessageStorage::new(),
            flags: SessionFlags::default(),
            phase: CallPhase::Active,
            pending_requests: HashSet::new(),
            current_user: None,
            recognizer_available,
            next_utterance: 0,
            cancelled_before: 0,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &MessageStorage {
        &self.messages
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn is_call_ended(&self) -> bool {
        self.phase == CallPhase::Ended
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn recognizer_available(&self) -> bool {
        self.recognizer_available
    }

    pub fn pending_requests(&self) -> usize {
        self.pending_requests.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a failure for the debug panel
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    // --- presence ---

    /// The presence socket (re)opened; a new connection may greet again
    pub fn on_channel_opened(&mut self) {
        if self.flags.greeted {
            debug!("Presence channel reopened, greeting re-armed");
        }
        self.flags.greeted = false;
    }

    /// Presence update from the backend
    pub fn on_presence(&mut self, update: &PresenceUpdate) -> Vec<Effect> {
        if self.is_call_ended() {
            debug!("Ignoring presence update after call end");
            return Vec::new();
        }

        self.flags.user_active = update.active;

        let user = match update.identified_user() {
            Some(user) => user.to_string(),
            None => return Vec::new(),
        };
        self.current_user = Some(user.clone());

        if !update.active || self.flags.greeted {
            return Vec::new();
        }

        let greeting = greeting_for(&user);
        info!(user = %user, "Greeting identified user");
        self.messages.add(Message::bot(greeting.clone()));
        self.flags.greeted = true;

        vec![self.speak(greeting)]
    }

    // --- chat ---

    /// Typed input from the chat form
    pub fn submit_text(&mut self, text: &str) -> Vec<Effect> {
        if self.is_call_ended() {
            debug!("Chat form is closed, dropping input");
            return Vec::new();
        }

        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        self.send_user_text(text.to_string())
    }

    /// Finalized transcript from speech recognition
    pub fn on_transcript(&mut self, transcript: &str) -> Vec<Effect> {
        if self.is_call_ended() {
            debug!("Ignoring transcript after call end");
            return Vec::new();
        }

        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("Ignoring empty transcript");
            return Vec::new();
        }

        self.send_user_text(transcript.to_string())
    }

    fn send_user_text(&mut self, text: String) -> Vec<Effect> {
        self.messages.add(Message::user(text.clone()));

        let request_id = Uuid::new_v4();
        self.pending_requests.insert(request_id);
        self.flags.bot_typing = true;

        vec![Effect::SendChat {
            request_id,
            text,
            user: self.current_user.clone(),
        }]
    }

    /// Successful chat reply
    pub fn on_chat_reply(&mut self, request_id: Uuid, reply: &str) -> Vec<Effect> {
        self.finish_request(request_id);

        if self.is_call_ended() {
            info!(%request_id, "Discarding chat reply that arrived after call end");
            return Vec::new();
        }

        self.messages.add(Message::bot(reply));
        vec![self.speak(reply.to_string())]
    }

    /// Failed chat request. Nothing is appended.
    pub fn on_chat_failed(&mut self, request_id: Uuid, error: &str) -> Vec<Effect> {
        self.finish_request(request_id);
        warn!(%request_id, "Chat request failed: {}", error);
        self.last_error = Some(error.to_string());
        Vec::new()
    }

    fn finish_request(&mut self, request_id: Uuid) {
        if !self.pending_requests.remove(&request_id) {
            debug!(%request_id, "Completion for unknown chat request");
        }
        self.flags.bot_typing = !self.pending_requests.is_empty();
    }

    // --- speech input ---

    /// Mic button
    pub fn toggle_mic(&mut self) -> Vec<Effect> {
        if !self.recognizer_available {
            debug!("Mic toggle ignored, speech recognition unavailable");
            return Vec::new();
        }

        if self.is_call_ended() {
            return Vec::new();
        }

        if self.flags.listening {
            vec![Effect::StopRecognition]
        } else {
            vec![Effect::StartRecognition]
        }
    }

    pub fn on_recognition_started(&mut self) -> Vec<Effect> {
        if self.is_call_ended() {
            // Started racing with end-call; shut it down again
            return vec![Effect::StopRecognition];
        }
        self.flags.listening = true;
        Vec::new()
    }

    pub fn on_recognition_stopped(&mut self) {
        self.flags.listening = false;
    }

    // --- speech output ---

    fn speak(&mut self, text: String) -> Effect {
        let utterance_id = self.next_utterance;
        self.next_utterance += 1;
        Effect::Speak { utterance_id, text }
    }

    pub fn on_speech_started(&mut self, utterance_id: u64) {
        if self.is_call_ended() || utterance_id < self.cancelled_before {
            return;
        }
        self.flags.speaking = true;
    }

    pub fn on_speech_ended(&mut self, _utterance_id: u64) {
        self.flags.speaking = false;
    }

    /// Stop-speaking button. Always clears `speaking`.
    pub fn stop_speaking(&mut self) -> Vec<Effect> {
        self.flags.speaking = false;
        self.cancelled_before = self.next_utterance;
        vec![Effect::CancelSpeech]
    }

    // --- end call ---

    /// Enter the terminal `Ended` phase
    pub fn end_call(&mut self) -> Vec<Effect> {
        if self.is_call_ended() {
            return Vec::new();
        }

        info!("Call ended");
        self.phase = CallPhase::Ended;
        self.flags.call_ended = true;
        self.flags.speaking = false;
        self.flags.listening = false;
        self.cancelled_before = self.next_utterance;

        vec![
            Effect::CancelSpeech,
            Effect::StopRecognition,
            Effect::ClosePresence,
        ]
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;

    fn update(active: bool, user: Option<&str>) -> PresenceUpdate {
        PresenceUpdate {
            active,
            user: user.map(str::to_string),
        }
    }

    fn sent_request(effects: &[Effect]) -> Uuid {
        match effects {
            [Effect::SendChat { request_id, .. }] => *request_id,
            other => panic!("expected a single SendChat, got {:?}", other),
        }
    }

    #[test]
    fn test_greets_once_per_connection() {
        let mut session = SessionState::new(true);
        session.on_channel_opened();

        let effects = session.on_presence(&update(true, Some("Sam")));
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Speak { text, .. } if text == "Hello Sam, how is your day going?"));

        let again = session.on_presence(&update(true, Some("Sam")));
        assert!(again.is_empty());

        let messages = session.messages().get_all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert!(session.flags().greeted);
    }

    #[test]
    fn test_no_greeting_without_identity_or_activity() {
        let mut session = SessionState::new(true);

        assert!(session.on_presence(&update(true, None)).is_empty());
        assert!(session.flags().user_active);
        assert!(session.on_presence(&update(true, Some(""))).is_empty());
        assert!(session.on_presence(&update(false, Some("Sam"))).is_empty());
        assert!(!session.flags().user_active);
        assert!(session.messages().is_empty());
        assert!(!session.flags().greeted);
        assert_eq!(session.current_user(), Some("Sam"));
    }

    #[test]
    fn test_reconnect_rearms_greeting() {
        let mut session = SessionState::new(true);
        session.on_presence(&update(true, Some("Ada")));
        session.on_channel_opened();
        let effects = session.on_presence(&update(true, Some("Ada")));
        assert_eq!(effects.len(), 1);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_typed_chat_round_trip() {
        let mut session = SessionState::new(true);

        let effects = session.submit_text("hi");
        let request_id = sent_request(&effects);
        assert!(session.flags().bot_typing);

        let effects = session.on_chat_reply(request_id, "hello!");
        assert!(matches!(&effects[..], [Effect::Speak { text, .. }] if text == "hello!"));
        assert!(!session.flags().bot_typing);

        let log: Vec<_> = session
            .messages()
            .get_all()
            .into_iter()
            .map(|m| (m.sender, m.text))
            .collect();
        assert_eq!(
            log,
            vec![(Sender::User, "hi".to_string()), (Sender::Bot, "hello!".to_string())]
        );
    }

    #[test]
    fn test_failed_chat_appends_nothing() {
        let mut session = SessionState::new(true);
        let request_id = sent_request(&session.submit_text("hi"));

        let effects = session.on_chat_failed(request_id, "connection refused");
        assert!(effects.is_empty());
        assert_eq!(session.messages().len(), 1);
        assert!(!session.flags().bot_typing);
        assert_eq!(session.last_error(), Some("connection refused"));
    }

    #[test]
    fn test_bot_typing_tracks_overlapping_requests() {
        let mut session = SessionState::new(true);
        let first = sent_request(&session.submit_text("one"));
        let second = sent_request(&session.on_transcript("two"));

        session.on_chat_reply(first, "r1");
        assert!(session.flags().bot_typing);
        session.on_chat_failed(second, "timeout");
        assert!(!session.flags().bot_typing);
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut session = SessionState::new(true);
        assert!(session.submit_text("   ").is_empty());
        assert!(session.on_transcript("").is_empty());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_chat_carries_identified_user() {
        let mut session = SessionState::new(true);
        session.on_presence(&update(true, Some("Sam")));
        let effects = session.submit_text("hi");
        assert!(matches!(&effects[..], [Effect::SendChat { user: Some(u), .. }] if u == "Sam"));
    }

    #[test]
    fn test_mic_toggle_without_recognizer_is_inert() {
        let mut session = SessionState::new(false);
        assert!(session.toggle_mic().is_empty());
        assert!(session.toggle_mic().is_empty());
        assert!(!session.flags().listening);
    }

    #[test]
    fn test_mic_toggle_follows_listening_flag() {
        let mut session = SessionState::new(true);
        assert_eq!(session.toggle_mic(), vec![Effect::StartRecognition]);
        session.on_recognition_started();
        assert_eq!(session.toggle_mic(), vec![Effect::StopRecognition]);
        session.on_recognition_stopped();
        assert!(!session.flags().listening);
    }

    #[test]
    fn test_stop_speaking_always_clears_flag() {
        let mut session = SessionState::new(true);
        assert_eq!(session.stop_speaking(), vec![Effect::CancelSpeech]);
        assert!(!session.flags().speaking);

        let effects = session.on_presence(&update(true, Some("Sam")));
        let id = match &effects[0] {
            Effect::Speak { utterance_id, .. } => *utterance_id,
            other => panic!("unexpected {:?}", other),
        };
        session.on_speech_started(id);
        assert!(session.flags().speaking);
        session.stop_speaking();
        assert!(!session.flags().speaking);

        // A start notification that was already queued is ignored
        session.on_speech_started(id);
        assert!(!session.flags().speaking);
    }

    #[test]
    fn test_end_call_is_terminal() {
        let mut session = SessionState::new(true);
        session.on_recognition_started();

        let effects = session.end_call();
        assert_eq!(
            effects,
            vec![Effect::CancelSpeech, Effect::StopRecognition, Effect::ClosePresence]
        );
        assert!(session.flags().call_ended);
        assert!(!session.flags().listening);
        assert!(session.end_call().is_empty());

        assert!(session.toggle_mic().is_empty());
        assert!(session.submit_text("hello").is_empty());
        assert!(session.on_transcript("hello").is_empty());
        assert!(session.on_presence(&update(true, Some("Sam"))).is_empty());
        assert_eq!(session.on_recognition_started(), vec![Effect::StopRecognition]);
        assert!(!session.flags().listening);
        session.on_speech_started(99);
        assert!(!session.flags().speaking);
        assert!(session.flags().call_ended);
        assert_eq!(session.phase(), CallPhase::Ended);
    }

    #[test]
    fn test_reply_after_end_call_is_discarded() {
        let mut session = SessionState::new(true);
        let request_id = sent_request(&session.submit_text("hi"));
        session.end_call();

        assert!(session.on_chat_reply(request_id, "late").is_empty());
        assert_eq!(session.messages().len(), 1);
        assert!(!session.flags().bot_typing);
    }
}
