//! Speech capabilities
//!
//! This module provides:
//! - Speech input: continuous recognition behind `SpeechRecognizer`
//! - Speech output: synthesis behind `SpeechSynthesizer`

pub mod input;
pub mod output;

// Re-export commonly used types
pub use input::{
    recognizer_channel, RecognizerEvent, ScriptedRecognizer, SpeechInput, SpeechRecognizer,
    UnavailableRecognizer,
};
pub use output::{
    estimate_duration, synthesis_channel, PacedSynthesizer, SpeechOutput, SpeechSynthesizer,
    SynthesisEvent,
};
