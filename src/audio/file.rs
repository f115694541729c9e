use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioFrame, CaptureDevice};

/// A mono WAV file loaded as normalized samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let spec = reader.spec();

        if spec.channels != 1 {
            anyhow::bail!(
                "Expected mono input, got {} channels in {}",
                spec.channels,
                path.display()
            );
        }

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Int => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} samples",
            duration_seconds,
            spec.sample_rate,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            samples,
        })
    }

    /// Split into fixed-size frames; the last frame is zero-padded
    pub fn frames(&self, frame_size: usize) -> Vec<AudioFrame> {
        if frame_size == 0 {
            return Vec::new();
        }

        self.samples
            .chunks(frame_size)
            .enumerate()
            .map(|(i, chunk)| {
                let mut samples = chunk.to_vec();
                samples.resize(frame_size, 0.0);
                AudioFrame {
                    samples,
                    sample_rate: self.sample_rate,
                    timestamp_ms: (i * frame_size) as u64 * 1000 / self.sample_rate as u64,
                }
            })
            .collect()
    }
}

/// Capture device that plays a WAV file into the call as if it were a microphone
///
/// Frames are delivered at real-time cadence (frame length / sample rate).
pub struct WavCaptureDevice {
    frames: Vec<AudioFrame>,
    path: String,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavCaptureDevice {
    pub fn open(path: impl AsRef<Path>, sample_rate: u32, frame_size: usize) -> Result<Self> {
        let file = AudioFile::open(path)?;

        if file.sample_rate != sample_rate {
            anyhow::bail!(
                "Resampling not supported. Expected {}Hz mono, got {}Hz",
                sample_rate,
                file.sample_rate
            );
        }

        Ok(Self {
            frames: file.frames(frame_size),
            path: file.path,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavCaptureDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            anyhow::bail!("Capture already started for {}", self.path);
        }

        let (tx, rx) = mpsc::channel(32);
        let frames = std::mem::take(&mut self.frames);
        let capturing = Arc::clone(&self.capturing);
        let cadence = frames
            .first()
            .map(|f| Duration::from_secs_f64(f.duration_secs()))
            .unwrap_or(Duration::from_millis(256));

        info!("Starting WAV capture: {} ({} frames)", self.path, frames.len());

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            for frame in frames {
                ticker.tick().await;
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("WAV capture finished");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-capture"
    }
}
