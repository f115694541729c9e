//! Live call session management
//!
//! This module provides the `CallController` that manages:
//! - The call lifecycle (Idle → Connecting → Active → Disconnecting → Idle)
//! - Microphone uplink to the remote speech session
//! - Transcript aggregation and gapless playback of the agent's speech
//! - Barge-in handling and guaranteed, idempotent teardown

mod config;
mod controller;
pub mod language;
mod lifecycle;
pub mod messages;
mod remote;
mod state;
mod stats;

pub use config::{system_instruction, SessionConfig};
pub use controller::{CallController, StartOutcome};
pub use language::{default_language, find_language, Language, SUPPORTED_LANGUAGES};
pub use lifecycle::CallResources;
pub use messages::{ServerContent, ServerMessage};
pub use remote::{SessionEvent, SpeechConnector, SpeechSession};
pub use state::CallState;
pub use stats::CallStats;
