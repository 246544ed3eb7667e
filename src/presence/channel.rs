//! Presence channel over a WebSocket
//!
//! A worker thread owns a small tokio runtime. It connects to the backend's
//! `/video-stream` socket, pushes one captured frame per tick and turns
//! inbound JSON into `PresenceEvent`s for the UI thread.

use crate::integration::config::ReconnectPolicy;
use crate::presence::capture::{capture_interval, CaptureLoop};
use crate::{ChatError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

/// Presence signal pushed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub active: bool,
    #[serde(default)]
    pub user: Option<String>,
}

impl PresenceUpdate {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| ChatError::Protocol(format!("bad presence update: {e}")))
    }

    /// The user name, if one was recognized
    pub fn identified_user(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.trim().is_empty())
    }
}

/// Commands accepted by the presence worker
#[derive(Debug, Clone)]
pub enum PresenceCommand {
    /// Stop capturing and close the socket for good
    Close,
}

/// Events emitted by the presence worker
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// Socket opened
    Connected,

    /// Presence update received
    Update(PresenceUpdate),

    /// A frame went out on the socket
    FrameSent { jpeg: Arc<Vec<u8>>, count: u64 },

    /// Socket closed or failed after being open
    Disconnected { reason: String },

    /// Could not connect
    Error(String),

    /// Worker has exited
    Shutdown,
}

/// UI-side handle for the presence worker
pub struct PresenceHandle {
    command_tx: UnboundedSender<PresenceCommand>,
    event_rx: Receiver<PresenceEvent>,
    stopped: Arc<AtomicBool>,
}

impl PresenceHandle {
    /// Stop the capture loop immediately and ask the worker to close the socket
    pub fn close(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Closing presence channel");
        }
        let _ = self.command_tx.send(PresenceCommand::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Try to receive an event from the worker
    pub fn try_recv_event(&self) -> Option<PresenceEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn event_receiver(&self) -> Receiver<PresenceEvent> {
        self.event_rx.clone()
    }
}

impl Drop for PresenceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// How a served connection ended
enum ConnectionEnd {
    /// Closed on request; do not reconnect
    Closed,
    /// Dropped by the peer or the network
    Dropped(String),
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Presence channel configuration
pub struct PresenceChannel {
    url: Url,
    interval: Duration,
    reconnect: Option<ReconnectPolicy>,
}

impl PresenceChannel {
    pub fn new(url: Url, interval: Duration) -> Self {
        Self {
            url,
            interval,
            reconnect: None,
        }
    }

    pub fn with_reconnect(mut self, policy: Option<ReconnectPolicy>) -> Self {
        self.reconnect = policy;
        self
    }

    /// Spawn the worker thread
    pub fn start(self, capture: CaptureLoop) -> Result<PresenceHandle> {
        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, event_rx) = bounded(256);
        let stopped = capture.stop_flag();

        std::thread::Builder::new()
            .name("presence-channel".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        let _ = event_tx.send(PresenceEvent::Error(format!("Runtime creation failed: {}", e)));
                        let _ = event_tx.send(PresenceEvent::Shutdown);
                        return;
                    }
                };

                runtime.block_on(self.run(capture, command_rx, &event_tx));

                info!("Presence channel worker stopped");
                let _ = event_tx.send(PresenceEvent::Shutdown);
            })
            .map_err(|e| ChatError::Channel(format!("failed to spawn presence worker: {e}")))?;

        Ok(PresenceHandle {
            command_tx,
            event_rx,
            stopped,
        })
    }

    async fn run(
        self,
        mut capture: CaptureLoop,
        mut command_rx: UnboundedReceiver<PresenceCommand>,
        event_tx: &Sender<PresenceEvent>,
    ) {
        let mut attempt = 0u32;

        loop {
            if capture.is_stopped() {
                break;
            }

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = command_rx.recv() => break,
            };

            match connected {
                Ok((socket, _)) => {
                    attempt = 0;
                    info!("Presence channel connected to {}", self.url);
                    let _ = event_tx.send(PresenceEvent::Connected);

                    match serve(socket, self.interval, &mut capture, &mut command_rx, event_tx).await {
                        ConnectionEnd::Closed => break,
                        ConnectionEnd::Dropped(reason) => {
                            warn!("Presence channel closed: {}", reason);
                            let _ = event_tx.send(PresenceEvent::Disconnected { reason });
                        }
                    }
                }
                Err(e) => {
                    warn!("Presence channel connect to {} failed: {}", self.url, e);
                    let _ = event_tx.send(PresenceEvent::Error(ChatError::from(e).to_string()));
                }
            }

            let Some(policy) = &self.reconnect else {
                debug!("Reconnect disabled, presence channel stays closed");
                break;
            };

            if attempt >= policy.max_attempts {
                warn!("Giving up on presence channel after {} attempts", attempt);
                break;
            }

            let delay = policy.delay_for_attempt(attempt);
            attempt += 1;
            info!("Reconnecting presence channel in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = command_rx.recv() => break,
            }
        }

        capture.stop();
    }
}

async fn serve(
    socket: Socket,
    interval: Duration,
    capture: &mut CaptureLoop,
    command_rx: &mut UnboundedReceiver<PresenceCommand>,
    event_tx: &Sender<PresenceEvent>,
) -> ConnectionEnd {
    let (mut sink, mut stream) = socket.split();
    let mut ticker = capture_interval(interval);

    loop {
        tokio::select! {
            _ = command_rx.recv() => {
                capture.stop();
                if let Err(e) = sink.close().await {
                    debug!("Error while closing presence socket: {}", e);
                }
                return ConnectionEnd::Closed;
            }

            _ = ticker.tick() => {
                let Some(frame) = capture.tick() else {
                    continue;
                };
                if let Err(e) = sink.send(Message::Text(frame.encoded)).await {
                    return ConnectionEnd::Dropped(e.to_string());
                }
                let _ = event_tx.try_send(PresenceEvent::FrameSent {
                    jpeg: frame.jpeg,
                    count: capture.frames_captured(),
                });
            }

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => handle_payload(text.as_bytes(), event_tx),
                Some(Ok(Message::Binary(bytes))) => handle_payload(&bytes, event_tx),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by server: {} {}", f.code, f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return ConnectionEnd::Dropped(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return ConnectionEnd::Dropped(e.to_string()),
                None => return ConnectionEnd::Dropped("stream ended".to_string()),
            },
        }
    }
}

fn handle_payload(payload: &[u8], event_tx: &Sender<PresenceEvent>) {
    match PresenceUpdate::parse(payload) {
        Ok(update) => {
            debug!(active = update.active, user = ?update.user, "Presence update");
            let _ = event_tx.send(PresenceEvent::Update(update));
        }
        Err(e) => warn!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_update() {
        let update = PresenceUpdate::parse(br#"{"active": true, "user": "Sam"}"#).unwrap();
        assert!(update.active);
        assert_eq!(update.identified_user(), Some("Sam"));
    }

    #[test]
    fn test_parse_null_and_missing_user() {
        let update = PresenceUpdate::parse(br#"{"active": false, "user": null}"#).unwrap();
        assert_eq!(update.identified_user(), None);

        let update = PresenceUpdate::parse(br#"{"active": true}"#).unwrap();
        assert!(update.active);
        assert_eq!(update.user, None);
    }

    #[test]
    fn test_blank_user_is_not_identified() {
        let update = PresenceUpdate {
            active: true,
            user: Some("  ".to_string()),
        };
        assert_eq!(update.identified_user(), None);
    }

    #[test]
    fn test_malformed_update_is_protocol_error() {
        let err = PresenceUpdate::parse(b"not json").unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
        assert!(PresenceUpdate::parse(br#"{"user": "Sam"}"#).is_err());
    }

    #[test]
    fn test_handle_close_stops_capture() {
        use crate::presence::capture::NoFrameSource;

        // Nothing listens on port 9; the worker fails to connect and exits
        let url = Url::parse("ws://127.0.0.1:9/video-stream").unwrap();
        let capture = CaptureLoop::new(Box::new(NoFrameSource));
        let flag = capture.stop_flag();
        let handle = PresenceChannel::new(url, Duration::from_millis(50))
            .start(capture)
            .unwrap();

        handle.close();
        assert!(handle.is_closed());
        assert!(flag.load(Ordering::SeqCst));

        let events = handle.event_receiver();
        let mut saw_shutdown = false;
        while let Ok(event) = events.recv_timeout(Duration::from_secs(5)) {
            if matches!(event, PresenceEvent::Shutdown) {
                saw_shutdown = true;
                break;
            }
        }
        assert!(saw_shutdown);
    }
}
