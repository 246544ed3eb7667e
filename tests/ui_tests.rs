//! UI automation tests using egui_kittest and AccessKit
//!
//! These tests drive the real application window without workers attached
//! and check the accessibility tree for expected elements.

use egui_kittest::kittest::Queryable;
use egui_kittest::Harness;
use presence_chat::integration::OrchestratorEvent;
use presence_chat::messages::Sender;
use presence_chat::presence::{PresenceEvent, PresenceUpdate};
use presence_chat::session::SessionState;
use presence_chat::speech::{RecognizerEvent, SynthesisEvent};
use presence_chat::ui::components::{END_CALL_LABEL, MIC_START_LABEL, MIC_STOP_LABEL, STOP_SPEAKING_LABEL};
use presence_chat::ui::{AppState, PresenceChatApp, Theme};

fn app(state: AppState) -> PresenceChatApp {
    PresenceChatApp::with_theme(state, Theme::dark())
}

fn harness(state: AppState) -> Harness<'static, PresenceChatApp> {
    Harness::builder()
        .with_size(egui::Vec2::new(1100.0, 720.0))
        .build_state(|ctx, app: &mut PresenceChatApp| app.render(ctx), app(state))
}

#[test]
fn test_chat_form_exists() {
    let mut harness = harness(AppState::new());
    harness.run();

    let _input = harness.get_by_label("Message input");
    let _send = harness.get_by_label("Send message");
    let _end = harness.get_by_label(END_CALL_LABEL);
}

#[test]
fn test_type_and_send_message() {
    let mut harness = harness(AppState::new());
    harness.run();

    harness.get_by_label("Message input").focus();
    harness.run();
    harness.get_by_label("Message input").type_text("Hello there");
    harness.run();
    assert_eq!(harness.state().state().input_text, "Hello there");

    harness.get_by_label("Send message").click();
    harness.run();

    let state = harness.state().state();
    let messages = state.session.messages().get_all();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "Hello there");
    assert!(state.input_text.is_empty(), "Input should be cleared after send");
    assert!(state.session.flags().bot_typing);

    let _message = harness.get_by_label("User message: Hello there");
}

#[test]
fn test_cannot_send_empty_message() {
    let mut harness = harness(AppState::new());
    harness.run();

    harness.get_by_label("Send message").click();
    harness.run();

    assert!(harness.state().state().session.messages().is_empty());
}

#[test]
fn test_greeting_is_rendered() {
    let mut state = AppState::new();
    state.handle_event(OrchestratorEvent::Presence(PresenceEvent::Connected));
    state.handle_event(OrchestratorEvent::Presence(PresenceEvent::Update(PresenceUpdate {
        active: true,
        user: Some("Sam".to_string()),
    })));

    let mut harness = harness(state);
    harness.run();

    let _greeting = harness.get_by_label("Bot message: Hello Sam, how is your day going?");
}

#[test]
fn test_mic_disabled_without_recognizer() {
    let mut harness = harness(AppState::new());
    harness.run();

    harness.get_by_label(MIC_START_LABEL).click();
    harness.run();

    assert!(!harness.state().state().session.flags().listening);
}

#[test]
fn test_mic_label_follows_recognizer() {
    let mut harness = harness(AppState::with_session(SessionState::new(true)));
    harness.run();

    harness.get_by_label(MIC_START_LABEL).click();
    harness.run();
    // Nothing is listening until the recognizer reports it started
    assert!(!harness.state().state().session.flags().listening);

    harness
        .state_mut()
        .state_mut()
        .handle_event(OrchestratorEvent::Recognizer(RecognizerEvent::Started));
    harness.run();

    assert!(harness.state().state().session.flags().listening);
    let _stop = harness.get_by_label(MIC_STOP_LABEL);
    let _listening = harness.get_by_label("Listening…");
}

#[test]
fn test_stop_speaking_button() {
    let mut harness = harness(AppState::new());
    harness.run();
    assert!(harness.query_by_label(STOP_SPEAKING_LABEL).is_none());

    harness
        .state_mut()
        .state_mut()
        .handle_event(OrchestratorEvent::Synthesis(SynthesisEvent::Started(0)));
    harness.run();

    harness.get_by_label(STOP_SPEAKING_LABEL).click();
    harness.run();

    assert!(!harness.state().state().session.flags().speaking);
    assert!(harness.query_by_label(STOP_SPEAKING_LABEL).is_none());
}

#[test]
fn test_end_call_hides_chat_and_controls() {
    let mut harness = harness(AppState::new());
    harness.run();

    harness.get_by_label(END_CALL_LABEL).click();
    harness.run();

    let state = harness.state().state();
    assert!(state.session.is_call_ended());
    assert!(harness.query_by_label(END_CALL_LABEL).is_none());
    assert!(harness.query_by_label("Message input").is_none());
    assert!(harness.query_by_label("Send message").is_none());
}

#[test]
fn test_speaking_after_end_call_shows_no_stop_button() {
    let mut state = AppState::new();
    state.end_call();
    state.handle_event(OrchestratorEvent::Synthesis(SynthesisEvent::Started(3)));

    let mut harness = harness(state);
    harness.run();

    assert!(harness.query_by_label(STOP_SPEAKING_LABEL).is_none());
}
