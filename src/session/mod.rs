//! Session coordination
//!
//! Holds the conversation history, the UI flags and the end-call state
//! machine as plain data with explicit transitions.

pub mod state;

pub use state::{greeting_for, CallPhase, Effect, SessionFlags, SessionState};
