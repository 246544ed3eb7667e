//! Configuration for the integration layer
//!
//! Defaults reproduce the fixed backend address `localhost:8000`. A few
//! environment variables can override them for local development.

use crate::{ChatError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable for the backend `host:port`
pub const ENV_BACKEND: &str = "PRESENCE_CHAT_BACKEND";
/// Environment variable for a directory of JPEG frames
pub const ENV_FRAMES_DIR: &str = "PRESENCE_CHAT_FRAMES_DIR";
/// Environment variable for the capture interval in milliseconds
pub const ENV_CAPTURE_MS: &str = "PRESENCE_CHAT_CAPTURE_MS";

/// Backoff for re-opening the presence socket after it drops
#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectPolicy {
    /// Maximum number of reconnect attempts
    pub max_attempts: u32,
    /// Delay before the first attempt (doubles each attempt)
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (zero based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Configuration for the complete client
#[derive(Clone, Debug)]
pub struct IntegrationConfig {
    /// Backend host
    pub host: String,

    /// Backend port
    pub port: u16,

    /// Interval between captured frames
    pub capture_interval: Duration,

    /// Timeout for a single chat request
    pub chat_timeout: Duration,

    /// Language tag passed to recognition and synthesis
    pub language: String,

    /// Directory of JPEG frames used instead of a camera
    pub frames_dir: Option<PathBuf>,

    /// Presence socket reconnect policy; `None` means no retry
    pub reconnect: Option<ReconnectPolicy>,

    /// Speaking rate used to pace the silent synthesizer
    pub words_per_minute: u32,

    /// Whether to probe `/health` at startup
    pub health_check: bool,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            capture_interval: Duration::from_millis(500),
            // Backend allows its LLM call 120 s
            chat_timeout: Duration::from_secs(130),
            language: "en-US".to_string(),
            frames_dir: None,
            reconnect: None,
            words_per_minute: 170,
            health_check: true,
        }
    }
}

impl IntegrationConfig {
    /// Build a configuration from defaults overlaid with environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(backend) = std::env::var(ENV_BACKEND) {
            config = config.with_backend_addr(&backend)?;
        }

        if let Ok(dir) = std::env::var(ENV_FRAMES_DIR) {
            config = config.with_frames_dir(dir);
        }

        if let Ok(ms) = std::env::var(ENV_CAPTURE_MS) {
            let ms: u64 = ms
                .parse()
                .map_err(|_| ChatError::Config(format!("{ENV_CAPTURE_MS} must be an integer, got {ms:?}")))?;
            config = config.with_capture_interval(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Set the backend host and port
    pub fn with_backend(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Parse a `host:port` pair
    pub fn with_backend_addr(self, addr: &str) -> Result<Self> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| ChatError::Config(format!("expected host:port, got {addr:?}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ChatError::Config(format!("invalid port in {addr:?}")))?;
        Ok(self.with_backend(host, port))
    }

    /// Set the capture interval
    pub fn with_capture_interval(mut self, interval: Duration) -> Self {
        self.capture_interval = interval;
        self
    }

    /// Use a directory of JPEG files as the frame source
    pub fn with_frames_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = Some(dir.into());
        self
    }

    /// Enable presence socket reconnects
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Set the chat request timeout
    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    /// Skip the startup health probe
    pub fn without_health_check(mut self) -> Self {
        self.health_check = false;
        self
    }

    /// `ws://host:port/video-stream`
    pub fn presence_url(&self) -> Result<Url> {
        self.endpoint("ws", "video-stream")
    }

    /// `http://host:port/chat`
    pub fn chat_url(&self) -> Result<Url> {
        self.endpoint("http", "chat")
    }

    /// `http://host:port/health`
    pub fn health_url(&self) -> Result<Url> {
        self.endpoint("http", "health")
    }

    fn endpoint(&self, scheme: &str, path: &str) -> Result<Url> {
        let raw = format!("{scheme}://{}:{}/{path}", self.host, self.port);
        Url::parse(&raw).map_err(|e| ChatError::Config(format!("invalid endpoint {raw}: {e}")))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ChatError::Config("backend host is empty".to_string()));
        }

        self.presence_url()?;
        self.chat_url()?;

        if self.capture_interval.is_zero() {
            return Err(ChatError::Config("capture interval must be positive".to_string()));
        }

        if let Some(dir) = &self.frames_dir {
            if !dir.is_dir() {
                return Err(ChatError::Config(format!("frames directory not found: {:?}", dir)));
            }
        }

        if self.words_per_minute == 0 {
            return Err(ChatError::Config("words_per_minute must be positive".to_string()));
        }

        Ok(())
    }
}
