use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::WireAudioChunk;
use crate::error::{CallError, CallResult};
use crate::session::messages::{RealtimeInputMessage, ServerMessage, SetupMessage};
use crate::session::{SessionConfig, SessionEvent, SpeechConnector, SpeechSession};

/// Subjects used for one call on the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSubjects {
    pub setup: String,
    pub input: String,
    pub server: String,
    pub close: String,
}

impl CallSubjects {
    pub fn new(call_id: &str) -> Self {
        Self {
            setup: format!("live.{}.setup", call_id),
            input: format!("live.{}.input", call_id),
            server: format!("live.{}.server", call_id),
            close: format!("live.{}.close", call_id),
        }
    }
}

/// Translate one relay payload into a session event
pub fn parse_server_payload(payload: &[u8]) -> Result<Vec<SessionEvent>> {
    let message: ServerMessage =
        serde_json::from_slice(payload).context("Failed to parse server message")?;

    let mut events = Vec::new();
    if message.setup_complete.is_some() {
        events.push(SessionEvent::Opened);
    }
    if let Some(content) = message.server_content {
        events.push(SessionEvent::Message(content));
    }
    Ok(events)
}

/// Connects calls to the live speech relay over NATS
pub struct NatsConnector {
    client: Client,
}

impl NatsConnector {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SpeechConnector for NatsConnector {
    async fn connect(
        &self,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> CallResult<Arc<dyn SpeechSession>> {
        let subjects = CallSubjects::new(&config.call_id);

        // Subscribe before sending setup so setupComplete cannot be missed
        let mut subscriber = self
            .client
            .subscribe(subjects.server.clone())
            .await
            .map_err(|e| CallError::Connection(format!("subscribe failed: {}", e)))?;

        let setup = serde_json::to_vec(&SetupMessage::from(config))
            .map_err(|e| CallError::Connection(e.to_string()))?;

        self.client
            .publish(subjects.setup.clone(), setup.into())
            .await
            .map_err(|e| CallError::Connection(format!("setup publish failed: {}", e)))?;

        info!("Sent session setup to {}", subjects.setup);

        let reader = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match parse_server_payload(&msg.payload) {
                    Ok(parsed) => {
                        for event in parsed {
                            if events.send(event).await.is_err() {
                                debug!("Call dispatcher gone; stopping reader");
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("{:#}", e),
                }
            }

            let _ = events
                .send(SessionEvent::Closed {
                    reason: Some("relay subscription ended".to_string()),
                })
                .await;
        });

        // Single writer keeps uplink chunks in send order
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let writer_client = self.client.clone();
        let input_subject = subjects.input.clone();
        let writer = tokio::spawn(async move {
            while let Some(payload) = outbound_rx.recv().await {
                if let Err(e) = writer_client
                    .publish(input_subject.clone(), payload.into())
                    .await
                {
                    error!("Failed to publish realtime input: {}", e);
                }
            }
        });

        Ok(Arc::new(NatsSession {
            client: self.client.clone(),
            subjects,
            outbound: outbound_tx,
            reader,
            writer,
        }))
    }
}

/// One open call on the relay
pub struct NatsSession {
    client: Client,
    subjects: CallSubjects,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

#[async_trait::async_trait]
impl SpeechSession for NatsSession {
    fn send_realtime_input(&self, chunk: WireAudioChunk) -> CallResult<()> {
        let payload = serde_json::to_vec(&RealtimeInputMessage::from(&chunk))
            .map_err(|e| CallError::Stream(e.to_string()))?;

        self.outbound
            .send(payload)
            .map_err(|_| CallError::Stream("uplink writer stopped".to_string()))
    }

    async fn close(&self) -> CallResult<()> {
        info!("Closing live session on {}", self.subjects.close);
        self.reader.abort();
        self.writer.abort();

        self.client
            .publish(self.subjects.close.clone(), Vec::<u8>::new().into())
            .await
            .map_err(|e| CallError::Close(e.to_string()))?;

        self.client
            .flush()
            .await
            .map_err(|e| CallError::Close(e.to_string()))
    }
}
