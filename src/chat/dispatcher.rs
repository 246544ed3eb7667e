//! Chat dispatcher for the backend `/chat` endpoint
//!
//! Channel-based like the other workers: the UI sends `ChatCommand`s and
//! polls `ChatEvent`s. Every request ends in exactly one `Reply` or `Failed`.

use crate::chat::types::{ChatReply, ChatRequest};
use crate::{ChatError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// Commands that can be sent to the dispatcher
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Post a message to the chat endpoint
    Send {
        request_id: Uuid,
        request: ChatRequest,
    },

    /// Probe the backend health endpoint
    HealthCheck,

    /// Shutdown the dispatcher
    Shutdown,
}

/// Events emitted by the dispatcher
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The backend answered
    Reply {
        request_id: Uuid,
        reply: ChatReply,
        elapsed_ms: u64,
    },

    /// Network error, non-success status or malformed body
    Failed { request_id: Uuid, error: ChatError },

    /// Result of a health probe
    Health { healthy: bool, detail: String },

    /// Dispatcher has shut down
    Shutdown,
}

/// Endpoints and timeout for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub chat_url: Url,
    pub health_url: Url,
    pub timeout: Duration,
}

/// Post one chat request and decode the reply
pub async fn post_chat(client: &reqwest::Client, url: &Url, request: &ChatRequest) -> Result<ChatReply> {
    let response = client.post(url.clone()).json(request).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ChatError::Http(format!("chat endpoint returned {status}")));
    }

    let body = response.bytes().await?;
    ChatReply::parse(&body)
}

/// `GET /health`; any 2xx counts as healthy
pub async fn check_health(client: &reqwest::Client, url: &Url) -> Result<()> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ChatError::Http(format!("health endpoint returned {status}")))
    }
}

/// Chat dispatcher with channel-based communication
pub struct ChatDispatcher {
    config: DispatcherConfig,
    command_tx: Sender<ChatCommand>,
    command_rx: Receiver<ChatCommand>,
    event_tx: Sender<ChatEvent>,
    event_rx: Receiver<ChatEvent>,
}

impl ChatDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let (command_tx, command_rx) = bounded(100);
        let (event_tx, event_rx) = bounded(100);

        Self {
            config,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for commands
    pub fn command_sender(&self) -> Sender<ChatCommand> {
        self.command_tx.clone()
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<ChatEvent> {
        self.event_rx.clone()
    }

    /// Start the dispatcher worker thread
    ///
    /// Requests run concurrently on the worker's runtime; replies are
    /// reported in completion order.
    pub fn start_worker(self) -> Result<()> {
        let config = self.config.clone();
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;

        std::thread::Builder::new()
            .name("chat-dispatcher".to_string())
            .spawn(move || {
                info!("Chat dispatcher starting");

                let runtime = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        let _ = event_tx.send(ChatEvent::Shutdown);
                        return;
                    }
                };

                loop {
                    match command_rx.recv() {
                        Ok(ChatCommand::Send { request_id, request }) => {
                            debug!(%request_id, "Dispatching chat request");
                            let client = client.clone();
                            let url = config.chat_url.clone();
                            let event_tx = event_tx.clone();

                            runtime.spawn(async move {
                                let start = Instant::now();
                                let event = match post_chat(&client, &url, &request).await {
                                    Ok(reply) => ChatEvent::Reply {
                                        request_id,
                                        reply,
                                        elapsed_ms: start.elapsed().as_millis() as u64,
                                    },
                                    Err(error) => {
                                        warn!(%request_id, "Error sending to backend: {}", error);
                                        ChatEvent::Failed { request_id, error }
                                    }
                                };
                                let _ = event_tx.send(event);
                            });
                        }

                        Ok(ChatCommand::HealthCheck) => {
                            let client = client.clone();
                            let url = config.health_url.clone();
                            let event_tx = event_tx.clone();

                            runtime.spawn(async move {
                                let event = match check_health(&client, &url).await {
                                    Ok(()) => ChatEvent::Health {
                                        healthy: true,
                                        detail: format!("{url} ok"),
                                    },
                                    Err(e) => ChatEvent::Health {
                                        healthy: false,
                                        detail: e.to_string(),
                                    },
                                };
                                let _ = event_tx.send(event);
                            });
                        }

                        Ok(ChatCommand::Shutdown) => {
                            info!("Chat dispatcher shutting down");
                            break;
                        }

                        Err(_) => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }

                // In-flight requests are dropped with the runtime
                runtime.shutdown_timeout(Duration::from_millis(100));
                let _ = event_tx.send(ChatEvent::Shutdown);
                info!("Chat dispatcher stopped");
            })
            .map_err(|e| ChatError::Channel(format!("failed to spawn chat dispatcher: {e}")))?;

        Ok(())
    }
}
