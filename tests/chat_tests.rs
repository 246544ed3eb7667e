//! Chat dispatcher tests against a mocked backend

use presence_chat::chat::{
    check_health, post_chat, ChatCommand, ChatDispatcher, ChatEvent, ChatRequest, DispatcherConfig,
};
use presence_chat::ChatError;
use serde_json::json;
use std::time::Duration;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).unwrap()
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Wait for the next dispatcher event without blocking the test runtime
async fn next_event(rx: &crossbeam_channel::Receiver<ChatEvent>) -> ChatEvent {
    let rx = rx.clone();
    tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(10)))
        .await
        .unwrap()
        .expect("dispatcher event")
}

#[tokio::test]
async fn test_reply_is_delivered_with_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"text": "hi"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"reply": "Nice to meet you!", "context": ["likes tea"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = ChatDispatcher::new(DispatcherConfig {
        chat_url: endpoint(&server, "/chat"),
        health_url: endpoint(&server, "/health"),
        timeout: Duration::from_secs(5),
    });
    let tx = dispatcher.command_sender();
    let rx = dispatcher.event_receiver();
    dispatcher.start_worker().unwrap();

    let request_id = Uuid::new_v4();
    tx.send(ChatCommand::Send {
        request_id,
        request: ChatRequest::new("hi"),
    })
    .unwrap();

    match next_event(&rx).await {
        ChatEvent::Reply {
            request_id: id,
            reply,
            ..
        } => {
            assert_eq!(id, request_id);
            assert_eq!(reply.reply, "Nice to meet you!");
            assert_eq!(reply.context, vec!["likes tea"]);
        }
        other => panic!("expected reply, got {other:?}"),
    }

    tx.send(ChatCommand::Shutdown).unwrap();
}

#[tokio::test]
async fn test_identified_user_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"text": "hello", "user": "Sam"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new("hello").with_user(Some("Sam".to_string()));
    let reply = post_chat(&client(), &endpoint(&server, "/chat"), &request)
        .await
        .unwrap();

    assert_eq!(reply.reply, "ok");
    assert!(reply.context.is_empty());
}

#[tokio::test]
async fn test_server_error_is_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = post_chat(&client(), &endpoint(&server, "/chat"), &ChatRequest::new("hi")).await;

    match result {
        Err(error) => assert!(matches!(error, ChatError::Http(_)), "got {error:?}"),
        Ok(reply) => panic!("expected failure, got {reply:?}"),
    }
}

#[tokio::test]
async fn test_malformed_reply_is_protocol_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": 42})))
        .mount(&server)
        .await;

    let error = post_chat(&client(), &endpoint(&server, "/chat"), &ChatRequest::new("hi"))
        .await
        .unwrap_err();

    assert!(matches!(error, ChatError::Protocol(_)), "got {error:?}");
    assert!(!error.is_recoverable());
}

#[tokio::test]
async fn test_failed_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = ChatDispatcher::new(DispatcherConfig {
        chat_url: endpoint(&server, "/chat"),
        health_url: endpoint(&server, "/health"),
        timeout: Duration::from_secs(5),
    });
    let tx = dispatcher.command_sender();
    let rx = dispatcher.event_receiver();
    dispatcher.start_worker().unwrap();

    let request_id = Uuid::new_v4();
    tx.send(ChatCommand::Send {
        request_id,
        request: ChatRequest::new("hi"),
    })
    .unwrap();

    match next_event(&rx).await {
        ChatEvent::Failed { request_id: id, error } => {
            assert_eq!(id, request_id);
            assert!(matches!(error, ChatError::Http(_)), "got {error:?}");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    tx.send(ChatCommand::Shutdown).unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(check_health(&client(), &endpoint(&server, "/health")).await.is_ok());

    let missing = check_health(&client(), &endpoint(&server, "/nope")).await;
    assert!(matches!(missing, Err(ChatError::Http(_))), "got {missing:?}");
}
