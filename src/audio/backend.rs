use anyhow::Result;
use tokio::sync::mpsc;

use super::decode::PcmBuffer;
use crate::config::AudioConfig;
use crate::error::CallResult;
use crate::playback::UnitId;

/// One block of microphone audio (mono, normalized f32 in [-1.0, 1.0])
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of the frame in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Microphone capture device
///
/// Implementations deliver fixed-size frames at a steady cadence on the
/// returned channel until stopped.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the underlying tracks
    async fn stop(&mut self) -> Result<()>;

    /// Check if device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Speaker output with its own playback clock
///
/// Buffers are scheduled against `current_time()`; a unit that plays to its
/// end is reported on the completion channel given to the device when it
/// was opened.
#[async_trait::async_trait]
pub trait OutputDevice: Send + Sync {
    /// Current playback clock time in seconds
    fn current_time(&self) -> f64;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Schedule a buffer to start at `start_at` on the playback clock
    fn schedule(&mut self, id: UnitId, buffer: &PcmBuffer, start_at: f64) -> CallResult<()>;

    /// Stop a unit immediately
    ///
    /// Returns `CallError::PlaybackStop` if the unit already finished.
    fn stop(&mut self, id: UnitId) -> CallResult<()>;

    /// Close the output context
    async fn close(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Opens the per-call input and output devices
#[async_trait::async_trait]
pub trait AudioDevices: Send + Sync {
    async fn open_input(&self, config: &AudioConfig) -> CallResult<Box<dyn CaptureDevice>>;

    async fn open_output(
        &self,
        config: &AudioConfig,
        completions: mpsc::UnboundedSender<UnitId>,
    ) -> CallResult<Box<dyn OutputDevice>>;
}
