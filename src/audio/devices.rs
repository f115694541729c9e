use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

use super::backend::{AudioDevices, CaptureDevice, OutputDevice};
use super::file::WavCaptureDevice;
use super::render::WavOutputDevice;
use crate::config::AudioConfig;
use crate::error::{CallError, CallResult};
use crate::playback::UnitId;

/// File-backed devices: a WAV file stands in for the microphone and
/// the agent's speech is rendered to a WAV file.
#[derive(Debug, Clone)]
pub struct WavDevices {
    input_path: PathBuf,
    output_path: Option<PathBuf>,
}

impl WavDevices {
    pub fn new(input_path: impl Into<PathBuf>, output_path: Option<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path,
        }
    }
}

#[async_trait::async_trait]
impl AudioDevices for WavDevices {
    async fn open_input(&self, config: &AudioConfig) -> CallResult<Box<dyn CaptureDevice>> {
        let device = WavCaptureDevice::open(
            &self.input_path,
            config.input_sample_rate,
            config.frame_size,
        )
        .map_err(|e| CallError::Device(format!("{:#}", e)))?;

        Ok(Box::new(device))
    }

    async fn open_output(
        &self,
        config: &AudioConfig,
        completions: mpsc::UnboundedSender<UnitId>,
    ) -> CallResult<Box<dyn OutputDevice>> {
        info!(
            "Opening render output at {}Hz ({:?})",
            config.output_sample_rate, self.output_path
        );

        Ok(Box::new(WavOutputDevice::new(
            self.output_path.clone(),
            config.output_sample_rate,
            completions,
        )))
    }
}
