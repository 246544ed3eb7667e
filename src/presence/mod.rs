//! Presence detection plumbing
//!
//! - `capture`: frame sources and the fixed-interval capture loop
//! - `channel`: the WebSocket worker that ships frames and receives updates

pub mod capture;
pub mod channel;

pub use capture::{
    encode_frame, CaptureLoop, CapturedFrame, DirectoryFrameSource, FrameSource,
    MemoryFrameSource, NoFrameSource,
};
pub use channel::{PresenceChannel, PresenceCommand, PresenceEvent, PresenceHandle, PresenceUpdate};
