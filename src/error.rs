use thiserror::Error;

use crate::playback::UnitId;

/// Errors surfaced by the call engine.
///
/// Every failure path ends in a full teardown back to `Idle`; nothing here
/// is retried.
#[derive(Debug, Error)]
pub enum CallError {
    /// Opening the session failed (device permission, network, handshake).
    #[error("failed to open speech session: {0}")]
    Connection(String),

    /// The open session reported an asynchronous error.
    #[error("speech session stream error: {0}")]
    Stream(String),

    /// Closing the session failed. Logged and swallowed by teardown.
    #[error("failed to close speech session: {0}")]
    Close(String),

    /// Stopping a playback unit that already finished.
    #[error("playback unit {0} already finished")]
    PlaybackStop(UnitId),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("failed to decode audio payload: {0}")]
    Decode(String),

    #[error("unsupported language code: {0}")]
    UnknownLanguage(String),
}

pub type CallResult<T> = Result<T, CallError>;
