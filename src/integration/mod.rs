//! Integration layer wiring the workers to the session

pub mod config;
pub mod orchestrator;

pub use config::{IntegrationConfig, ReconnectPolicy};
pub use orchestrator::{Capabilities, Orchestrator, OrchestratorEvent};
