use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::language::{find_language, Language};
use super::lifecycle::CallResources;
use super::messages::ServerContent;
use super::remote::{SessionEvent, SpeechConnector, SpeechSession};
use super::state::CallState;
use super::stats::CallStats;
use crate::audio::{decode_payload, encode_frame, rate_from_mime, AudioDevices, AudioFrame, PcmBuffer};
use crate::config::{AudioConfig, Config, LiveConfig};
use crate::error::{CallError, CallResult};
use crate::playback::{PlaybackScheduler, UnitId};
use crate::transcript::{TranscriptAggregator, TranscriptEntry};

/// Inbound events buffered between the transport and the dispatcher
const EVENT_BUFFER: usize = 256;

type PendingDecode = BoxFuture<'static, (u64, CallResult<PcmBuffer>)>;

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new call is connecting
    Started { call_id: String },
    /// A call is already in progress; nothing was done
    Ignored(CallState),
}

/// Drives one call at a time: lifecycle, uplink, transcript and playback
///
/// Cheap to clone; all clones control the same engine.
#[derive(Clone)]
pub struct CallController {
    shared: Arc<Shared>,
}

struct Shared {
    live: LiveConfig,
    audio: AudioConfig,
    connector: Arc<dyn SpeechConnector>,
    devices: Arc<dyn AudioDevices>,
    state: watch::Sender<CallState>,
    counters: Arc<Counters>,
    inner: Mutex<CallInner>,
}

#[derive(Default)]
struct Counters {
    chunks_sent: AtomicUsize,
    frames_dropped: AtomicUsize,
    teardowns: AtomicUsize,
}

#[derive(Default)]
struct CallInner {
    call_id: Option<String>,
    language: Option<Language>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    resources: CallResources,
    scheduler: PlaybackScheduler,
    transcript: TranscriptAggregator,
}

impl CallController {
    pub fn new(
        config: &Config,
        connector: Arc<dyn SpeechConnector>,
        devices: Arc<dyn AudioDevices>,
    ) -> Self {
        let (state, _) = watch::channel(CallState::Idle);

        Self {
            shared: Arc::new(Shared {
                live: config.live.clone(),
                audio: config.audio.clone(),
                connector,
                devices,
                state,
                counters: Arc::new(Counters::default()),
                inner: Mutex::new(CallInner::default()),
            }),
        }
    }

    pub fn state(&self) -> CallState {
        *self.shared.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<CallState> {
        self.shared.state.subscribe()
    }

    /// Start a call in the given language code, or the configured default
    pub async fn start(&self, language_code: Option<&str>) -> CallResult<StartOutcome> {
        let code = language_code.unwrap_or(&self.shared.live.default_language);
        let language = find_language(code)?;
        self.start_call(language).await
    }

    /// Open a session and acquire devices
    ///
    /// A request while a call is in progress is ignored. On failure every
    /// partially acquired resource is released and the state returns to
    /// `Idle`.
    pub async fn start_call(&self, language: Language) -> CallResult<StartOutcome> {
        let shared = &self.shared;
        let (session_config, completions_rx, shutdown_rx) = {
            let mut inner = shared.inner.lock().await;

            let state = self.state();
            if state.is_busy() {
                warn!("Start request ignored: call is {}", state);
                return Ok(StartOutcome::Ignored(state));
            }

            let session_config = SessionConfig::for_language(&shared.live, &shared.audio, &language);
            info!(
                "Starting call {} in {} ({})",
                session_config.call_id, language.name, language.code
            );
            self.transition(CallState::Connecting);

            inner.call_id = Some(session_config.call_id.clone());
            inner.language = Some(language);
            inner.started_at = Some(Utc::now());
            inner.ended_at = None;
            inner.transcript = TranscriptAggregator::new();
            inner.scheduler = PlaybackScheduler::new();
            shared.counters.chunks_sent.store(0, Ordering::SeqCst);
            shared.counters.frames_dropped.store(0, Ordering::SeqCst);

            let (completions_tx, completions_rx) = mpsc::unbounded_channel();
            let (shutdown_tx, shutdown_rx) = oneshot::channel();

            if let Err(e) = self.acquire_devices(&mut inner, completions_tx).await {
                error!("Failed to acquire audio devices: {}", e);
                self.release(&mut inner).await;
                self.transition(CallState::Idle);
                return Err(into_connection_error(e));
            }
            inner.resources.set_shutdown(shutdown_tx);

            (session_config, completions_rx, shutdown_rx)
        };
        let call_id = session_config.call_id.clone();

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let connected = shared.connector.connect(&session_config, events_tx).await;

        let mut inner = shared.inner.lock().await;
        let still_connecting =
            self.state() == CallState::Connecting && inner.call_id.as_deref() == Some(call_id.as_str());

        let session = match connected {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to start call {}: {}", call_id, e);
                if still_connecting {
                    self.release(&mut inner).await;
                    self.transition(CallState::Idle);
                }
                return Err(into_connection_error(e));
            }
        };

        if !still_connecting {
            drop(inner);
            warn!("Call {} was hung up while connecting", call_id);
            if let Err(e) = session.close().await {
                error!("Error closing session: {}", e);
            }
            return Err(CallError::Connection(
                "call was hung up before the session opened".to_string(),
            ));
        }

        inner.resources.set_session(session);
        drop(inner);

        let dispatcher = Dispatcher {
            controller: self.clone(),
            call_id: call_id.clone(),
        };
        tokio::spawn(dispatcher.run(events_rx, completions_rx, shutdown_rx));

        info!("Call {} connecting", call_id);
        Ok(StartOutcome::Started { call_id })
    }

    /// End the call: close the session, then release every resource
    ///
    /// A failed close is logged and does not stop teardown. Calling this
    /// when no call is in progress does nothing.
    pub async fn hangup(&self) -> CallResult<()> {
        let session = {
            let mut inner = self.shared.inner.lock().await;
            let state = self.state();
            if !matches!(state, CallState::Active | CallState::Connecting) {
                debug!("Hangup ignored: call is {}", state);
                return Ok(());
            }

            self.transition(CallState::Disconnecting);
            inner.resources.take_session()
        };

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                error!("Error closing session: {}", e);
            }
        }

        let mut inner = self.shared.inner.lock().await;
        self.release(&mut inner).await;
        self.transition(CallState::Idle);

        info!(
            "Call {} ended",
            inner.call_id.as_deref().unwrap_or("<unknown>")
        );

        Ok(())
    }

    /// Finalized transcript of the current or most recent call
    pub async fn history(&self) -> Vec<TranscriptEntry> {
        let inner = self.shared.inner.lock().await;
        inner.transcript.history().to_vec()
    }

    /// Get current engine statistics
    pub async fn stats(&self) -> CallStats {
        let inner = self.shared.inner.lock().await;
        let counters = &self.shared.counters;

        let end = inner.ended_at.unwrap_or_else(Utc::now);
        let duration_secs = inner
            .started_at
            .map(|t| end.signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        CallStats {
            state: self.state(),
            call_id: inner.call_id.clone(),
            language: inner.language.map(|l| l.code.to_string()),
            started_at: inner.started_at,
            ended_at: inner.ended_at,
            duration_secs,
            chunks_sent: counters.chunks_sent.load(Ordering::SeqCst),
            frames_dropped: counters.frames_dropped.load(Ordering::SeqCst),
            units_scheduled: inner.scheduler.scheduled_total(),
            units_active: inner.scheduler.active_count(),
            next_start_time: inner.scheduler.next_start_time(),
            history_len: inner.transcript.history().len(),
            pending_user_text: inner.transcript.pending_user().to_string(),
            pending_model_text: inner.transcript.pending_model().to_string(),
            teardowns: counters.teardowns.load(Ordering::SeqCst),
        }
    }

    fn transition(&self, next: CallState) {
        let prev = self.state();
        if prev == next {
            return;
        }
        if !prev.can_transition_to(next) {
            warn!("Unexpected call state transition {} -> {}", prev, next);
        }
        self.shared.state.send_replace(next);
        info!("Call state: {} -> {}", prev, next);
    }

    async fn acquire_devices(
        &self,
        inner: &mut CallInner,
        completions: mpsc::UnboundedSender<UnitId>,
    ) -> CallResult<()> {
        let output = self
            .shared
            .devices
            .open_output(&self.shared.audio, completions)
            .await?;
        inner.resources.set_output(output);

        let capture = self.shared.devices.open_input(&self.shared.audio).await?;
        inner.resources.set_capture(capture);

        Ok(())
    }

    async fn release(&self, inner: &mut CallInner) {
        let CallInner {
            resources,
            scheduler,
            ended_at,
            ..
        } = inner;

        if resources.release(scheduler).await {
            self.shared.counters.teardowns.fetch_add(1, Ordering::SeqCst);
            debug!("Call resources released");
        }
        *ended_at = Some(Utc::now());
    }

    async fn on_opened(&self, call_id: &str) {
        let mut inner = self.shared.inner.lock().await;

        if self.state() != CallState::Connecting {
            warn!("Session opened while call is {}; ignoring", self.state());
            return;
        }

        info!("Live session opened for call {}", call_id);
        self.transition(CallState::Active);

        let frames = match inner.resources.capture_mut() {
            Some(capture) => capture.start().await,
            None => Err(anyhow::anyhow!("capture device not acquired")),
        };

        let (frames, session) = match (frames, inner.resources.session()) {
            (Ok(frames), Some(session)) => (frames, session),
            (Err(e), _) => {
                error!("Failed to start capture: {:#}", e);
                drop(inner);
                self.end_after_failure().await;
                return;
            }
            (Ok(_), None) => {
                warn!("Session handle missing after open");
                return;
            }
        };

        let uplink = tokio::spawn(run_uplink(
            frames,
            session,
            self.subscribe_state(),
            Arc::clone(&self.shared.counters),
        ));
        inner.resources.set_uplink(uplink);
    }

    /// Transcript and playback handling for one inbound message
    async fn on_message(&self, content: ServerContent, decodes: &mut FuturesOrdered<PendingDecode>) {
        let mut inner = self.shared.inner.lock().await;

        if self.state() != CallState::Active {
            debug!("Dropping server message while call is {}", self.state());
            return;
        }

        if let Some(text) = content.output_text() {
            inner.transcript.push_model(text);
        }
        if let Some(text) = content.input_text() {
            inner.transcript.push_user(text);
        }

        if content.turn_complete {
            inner.transcript.complete_turn(Utc::now());
        }

        if let Some(audio) = content.audio() {
            let epoch = inner.scheduler.epoch();
            let data = audio.data.clone();
            let rate = rate_from_mime(&audio.mime_type).unwrap_or(self.shared.audio.output_sample_rate);

            decodes.push_back(Box::pin(async move {
                let result = tokio::task::spawn_blocking(move || decode_payload(&data, rate))
                    .await
                    .unwrap_or_else(|e| Err(CallError::Decode(e.to_string())));
                (epoch, result)
            }));
        }

        if content.interrupted {
            let CallInner {
                resources,
                scheduler,
                transcript,
                ..
            } = &mut *inner;

            let stopped = match resources.output_mut() {
                Some(output) => scheduler.interrupt(output),
                None => scheduler.clear(),
            };
            transcript.interrupt();
            info!("Interrupted: stopped {} playback units", stopped);
        }
    }

    /// Schedule one decoded buffer; runs in arrival order
    async fn on_decoded(&self, epoch: u64, result: CallResult<PcmBuffer>) {
        let mut inner = self.shared.inner.lock().await;

        if !inner.scheduler.is_current(epoch) {
            debug!("Dropping audio decoded before an interruption");
            return;
        }

        let buffer = match result {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Dropping inbound audio: {}", e);
                return;
            }
        };

        let CallInner {
            resources,
            scheduler,
            ..
        } = &mut *inner;

        if let Some(output) = resources.output_mut() {
            if let Err(e) = scheduler.schedule(output, &buffer) {
                warn!("Failed to schedule playback: {}", e);
            }
        }
    }

    async fn on_unit_finished(&self, id: UnitId) {
        let mut inner = self.shared.inner.lock().await;
        if inner.scheduler.complete(id) {
            debug!("Unit {} finished playing", id);
        }
    }

    /// Stream errors and remote closes end the call the same way a hangup does
    async fn end_after_failure(&self) {
        if let Err(e) = self.hangup().await {
            error!("Teardown after failure reported: {}", e);
        }
    }
}

fn into_connection_error(e: CallError) -> CallError {
    match e {
        CallError::Connection(_) => e,
        other => CallError::Connection(other.to_string()),
    }
}

/// Forward captured frames to the session while the call is active
async fn run_uplink(
    mut frames: mpsc::Receiver<AudioFrame>,
    session: Arc<dyn SpeechSession>,
    state: watch::Receiver<CallState>,
    counters: Arc<Counters>,
) {
    debug!("Uplink started");

    while let Some(frame) = frames.recv().await {
        if *state.borrow() != CallState::Active {
            counters.frames_dropped.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        let chunk = encode_frame(&frame);
        match session.send_realtime_input(chunk) {
            Ok(()) => {
                counters.chunks_sent.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => warn!("Failed to send audio chunk: {}", e),
        }
    }

    debug!("Uplink stopped");
}

/// Routes one call's inbound events, playback completions and decodes
struct Dispatcher {
    controller: CallController,
    call_id: String,
}

impl Dispatcher {
    async fn run(
        self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut completions: mpsc::UnboundedReceiver<UnitId>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut decodes: FuturesOrdered<PendingDecode> = FuturesOrdered::new();
        debug!("Dispatcher started for call {}", self.call_id);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                Some((epoch, result)) = decodes.next(), if !decodes.is_empty() => {
                    self.controller.on_decoded(epoch, result).await;
                }

                Some(id) = completions.recv() => {
                    self.controller.on_unit_finished(id).await;
                }

                event = events.recv() => match event {
                    Some(SessionEvent::Opened) => self.controller.on_opened(&self.call_id).await,
                    Some(SessionEvent::Message(content)) => {
                        self.controller.on_message(content, &mut decodes).await;
                    }
                    Some(SessionEvent::Error(message)) => {
                        let e = CallError::Stream(message);
                        error!("Live session error on call {}: {}", self.call_id, e);
                        self.controller.end_after_failure().await;
                    }
                    Some(SessionEvent::Closed { reason }) => {
                        info!(
                            "Live session closed for call {} ({})",
                            self.call_id,
                            reason.as_deref().unwrap_or("no reason given")
                        );
                        self.controller.end_after_failure().await;
                    }
                    None => {
                        info!("Session event stream ended for call {}", self.call_id);
                        self.controller.end_after_failure().await;
                        break;
                    }
                },
            }
        }

        debug!("Dispatcher stopped for call {}", self.call_id);
    }
}
