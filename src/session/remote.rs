use std::sync::Arc;
use tokio::sync::mpsc;

use super::config::SessionConfig;
use super::messages::ServerContent;
use crate::audio::WireAudioChunk;
use crate::error::CallResult;

/// Everything the remote speech service can tell an open call
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The service finished setup and accepts realtime input
    Opened,
    /// Transcription deltas, audio, turn and interruption signals
    Message(ServerContent),
    /// Asynchronous stream failure
    Error(String),
    /// The remote side closed the session
    Closed { reason: Option<String> },
}

/// Opens sessions with the remote speech service
#[async_trait::async_trait]
pub trait SpeechConnector: Send + Sync {
    /// Open a session; inbound events are delivered on `events` in arrival order
    async fn connect(
        &self,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> CallResult<Arc<dyn SpeechSession>>;
}

/// An open bidirectional session
#[async_trait::async_trait]
pub trait SpeechSession: Send + Sync {
    /// Queue one chunk for the uplink; never waits for acknowledgement
    fn send_realtime_input(&self, chunk: WireAudioChunk) -> CallResult<()>;

    /// Close the session
    async fn close(&self) -> CallResult<()>;
}
