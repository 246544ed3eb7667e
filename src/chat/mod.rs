//! Backend chat endpoint client

pub mod dispatcher;
pub mod types;

pub use dispatcher::{check_health, post_chat, ChatCommand, ChatDispatcher, ChatEvent, DispatcherConfig};
pub use types::{ChatReply, ChatRequest};
