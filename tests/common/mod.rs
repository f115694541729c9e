// Shared test doubles for the call engine
//
// A scripted remote session and hand-driven audio devices, so tests can
// feed server events and microphone frames and observe what the engine
// sends, schedules and stops.

#![allow(dead_code)]

use anyhow::Result;
use base64::Engine;
use loqa_live::audio::{AudioDevices, AudioFrame, CaptureDevice, OutputDevice, PcmBuffer};
use loqa_live::config::AudioConfig;
use loqa_live::session::ServerMessage;
use loqa_live::{
    CallController, CallError, CallResult, CallState, CallStats, Config, SessionConfig,
    SessionEvent, SpeechConnector, SpeechSession, UnitId, WireAudioChunk,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Remote session
// ============================================================================

#[derive(Default)]
pub struct ScriptedConnector {
    events: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    configs: Mutex<Vec<SessionConfig>>,
    pub sent: Arc<Mutex<Vec<WireAudioChunk>>>,
    pub closes: Arc<AtomicUsize>,
    pub fail_connect: AtomicBool,
    pub fail_close: Arc<AtomicBool>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver one event as if the service sent it
    pub async fn emit(&self, event: SessionEvent) {
        let sender = self.events.lock().unwrap().clone();
        sender
            .expect("no session connected")
            .send(event)
            .await
            .expect("dispatcher gone");
    }

    /// Deliver a server message given as JSON
    pub async fn emit_json(&self, value: serde_json::Value) {
        let message: ServerMessage = serde_json::from_value(value).expect("valid server message");
        let content = message.server_content.expect("server content");
        self.emit(SessionEvent::Message(content)).await;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<SessionConfig> {
        self.configs.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl SpeechConnector for ScriptedConnector {
    async fn connect(
        &self,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> CallResult<Arc<dyn SpeechSession>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CallError::Connection("connection refused".to_string()));
        }

        self.configs.lock().unwrap().push(config.clone());
        *self.events.lock().unwrap() = Some(events);

        Ok(Arc::new(ScriptedSession {
            sent: Arc::clone(&self.sent),
            closes: Arc::clone(&self.closes),
            fail_close: Arc::clone(&self.fail_close),
        }))
    }
}

pub struct ScriptedSession {
    sent: Arc<Mutex<Vec<WireAudioChunk>>>,
    closes: Arc<AtomicUsize>,
    fail_close: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl SpeechSession for ScriptedSession {
    fn send_realtime_input(&self, chunk: WireAudioChunk) -> CallResult<()> {
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn close(&self) -> CallResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(CallError::Close("socket already gone".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Audio devices
// ============================================================================

/// What the engine did to the output device
#[derive(Default)]
pub struct OutputLog {
    pub clock: f64,
    pub scheduled: Vec<(UnitId, f64, f64)>,
    pub stopped: Vec<UnitId>,
    pub finished: HashSet<UnitId>,
    pub closes: usize,
    pub completions: Option<mpsc::UnboundedSender<UnitId>>,
}

#[derive(Default)]
pub struct ManualDevices {
    frames: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    capture_stops: Arc<AtomicUsize>,
    pub output: Arc<Mutex<OutputLog>>,
    pub fail_input: AtomicBool,
}

impl ManualDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// True once capture has started and until it stops
    pub fn capturing(&self) -> bool {
        self.frames.lock().unwrap().is_some()
    }

    /// Push one microphone frame of `len` samples
    pub async fn send_frame(&self, len: usize) {
        let sender = self.frames.lock().unwrap().clone();
        let frame = AudioFrame {
            samples: vec![0.25; len],
            sample_rate: 16000,
            timestamp_ms: 0,
        };
        sender
            .expect("capture not started")
            .send(frame)
            .await
            .expect("uplink gone");
    }

    pub fn capture_stops(&self) -> usize {
        self.capture_stops.load(Ordering::SeqCst)
    }

    pub fn set_clock(&self, secs: f64) {
        self.output.lock().unwrap().clock = secs;
    }

    pub fn scheduled(&self) -> Vec<(UnitId, f64, f64)> {
        self.output.lock().unwrap().scheduled.clone()
    }

    pub fn stopped(&self) -> Vec<UnitId> {
        self.output.lock().unwrap().stopped.clone()
    }

    pub fn output_closes(&self) -> usize {
        self.output.lock().unwrap().closes
    }

    /// Report a unit as played to its end
    pub fn finish(&self, id: UnitId) {
        let mut log = self.output.lock().unwrap();
        log.finished.insert(id);
        if let Some(tx) = &log.completions {
            let _ = tx.send(id);
        }
    }
}

#[async_trait::async_trait]
impl AudioDevices for ManualDevices {
    async fn open_input(&self, _config: &AudioConfig) -> CallResult<Box<dyn CaptureDevice>> {
        if self.fail_input.load(Ordering::SeqCst) {
            return Err(CallError::Device("microphone permission denied".to_string()));
        }
        Ok(Box::new(ManualCapture {
            frames: Arc::clone(&self.frames),
            stops: Arc::clone(&self.capture_stops),
        }))
    }

    async fn open_output(
        &self,
        _config: &AudioConfig,
        completions: mpsc::UnboundedSender<UnitId>,
    ) -> CallResult<Box<dyn OutputDevice>> {
        {
            let mut log = self.output.lock().unwrap();
            *log = OutputLog::default();
            log.completions = Some(completions);
        }
        Ok(Box::new(ManualOutput {
            log: Arc::clone(&self.output),
        }))
    }
}

struct ManualCapture {
    frames: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    stops: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CaptureDevice for ManualCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(64);
        *self.frames.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.frames.lock().unwrap() = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frames.lock().unwrap().is_some()
    }

    fn name(&self) -> &str {
        "manual-mic"
    }
}

struct ManualOutput {
    log: Arc<Mutex<OutputLog>>,
}

#[async_trait::async_trait]
impl OutputDevice for ManualOutput {
    fn current_time(&self) -> f64 {
        self.log.lock().unwrap().clock
    }

    fn sample_rate(&self) -> u32 {
        24000
    }

    fn schedule(&mut self, id: UnitId, buffer: &PcmBuffer, start_at: f64) -> CallResult<()> {
        self.log
            .lock()
            .unwrap()
            .scheduled
            .push((id, start_at, buffer.duration()));
        Ok(())
    }

    fn stop(&mut self, id: UnitId) -> CallResult<()> {
        let mut log = self.log.lock().unwrap();
        if log.finished.contains(&id) {
            return Err(CallError::PlaybackStop(id));
        }
        log.stopped.push(id);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "manual-speaker"
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct Harness {
    pub call: CallController,
    pub remote: Arc<ScriptedConnector>,
    pub devices: Arc<ManualDevices>,
}

pub fn harness() -> Harness {
    let remote = ScriptedConnector::new();
    let devices = ManualDevices::new();
    let call = CallController::new(
        &Config::default(),
        Arc::clone(&remote) as Arc<dyn SpeechConnector>,
        Arc::clone(&devices) as Arc<dyn AudioDevices>,
    );

    Harness {
        call,
        remote,
        devices,
    }
}

/// Base64 PCM16 silence lasting `secs` at 24kHz
pub fn speech_payload(secs: f64) -> String {
    let samples = (secs * 24000.0).round() as usize;
    base64::engine::general_purpose::STANDARD.encode(vec![0u8; samples * 2])
}

pub fn audio_message(secs: f64) -> serde_json::Value {
    serde_json::json!({
        "serverContent": {
            "modelTurn": {
                "parts": [{
                    "inlineData": {
                        "mimeType": "audio/pcm;rate=24000",
                        "data": speech_payload(secs)
                    }
                }]
            }
        }
    })
}

/// Poll `check` until it holds, panicking after two seconds
pub async fn wait_for<F>(what: &str, check: F)
where
    F: FnMut() -> bool,
{
    wait_for_within(what, Duration::from_secs(2), check).await;
}

/// Poll `check` until it holds, panicking once `limit` has passed
pub async fn wait_for_within<F>(what: &str, limit: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let polls = (limit.as_millis() / 10).max(1);
    for _ in 0..polls {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Poll engine statistics until `check` holds
pub async fn wait_for_stats<F>(call: &CallController, what: &str, mut check: F) -> CallStats
where
    F: FnMut(&CallStats) -> bool,
{
    for _ in 0..200 {
        let stats = call.stats().await;
        if check(&stats) {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Start a call and drive it to `Active`
pub async fn open_call(h: &Harness) {
    h.call.start(None).await.expect("start call");
    h.remote.emit(SessionEvent::Opened).await;
    wait_for_stats(&h.call, "call to become active", |s| s.state == CallState::Active).await;
    wait_for("capture to start", || h.devices.capturing()).await;
}
