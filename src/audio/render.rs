// Rendering output device
//
// Keeps a playback timeline against a tokio clock instead of a sound card.
// Units fire their completion when the clock passes their end time; a stop
// truncates the unit at the current clock time. On close the timeline is
// mixed down and written as a 16-bit WAV file.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::backend::OutputDevice;
use super::decode::PcmBuffer;
use super::encode::sample_to_i16;
use crate::error::{CallError, CallResult};
use crate::playback::UnitId;

struct RenderedUnit {
    samples: Vec<f32>,
    start_at: f64,
    end_at: f64,
    stopped_at: Option<f64>,
    timer: Option<JoinHandle<()>>,
}

impl RenderedUnit {
    fn effective_end(&self) -> f64 {
        self.stopped_at.unwrap_or(self.end_at).min(self.end_at)
    }
}

pub struct WavOutputDevice {
    path: Option<PathBuf>,
    sample_rate: u32,
    opened_at: Instant,
    units: HashMap<UnitId, RenderedUnit>,
    completions: mpsc::UnboundedSender<UnitId>,
    closed: bool,
}

impl WavOutputDevice {
    /// Create a device; with `path = None` the timeline is kept but never written
    pub fn new(
        path: Option<PathBuf>,
        sample_rate: u32,
        completions: mpsc::UnboundedSender<UnitId>,
    ) -> Self {
        Self {
            path,
            sample_rate,
            opened_at: Instant::now(),
            units: HashMap::new(),
            completions,
            closed: false,
        }
    }

    /// Mix every unit into one buffer starting at clock time zero
    pub fn render_timeline(&self) -> Vec<f32> {
        let rate = self.sample_rate as f64;
        let total_end = self
            .units
            .values()
            .map(RenderedUnit::effective_end)
            .fold(0.0_f64, f64::max);

        let mut mix = vec![0.0_f32; (total_end * rate).ceil() as usize];

        for unit in self.units.values() {
            let offset = (unit.start_at * rate).round() as usize;
            let played = ((unit.effective_end() - unit.start_at).max(0.0) * rate).round() as usize;

            for (i, sample) in unit.samples.iter().take(played).enumerate() {
                if let Some(slot) = mix.get_mut(offset + i) {
                    *slot = (*slot + sample).clamp(-1.0, 1.0);
                }
            }
        }

        mix
    }

    fn write_wav(&self, path: &PathBuf) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mix = self.render_timeline();
        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for &sample in &mix {
            writer
                .write_sample(sample_to_i16(sample))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        info!(
            "Rendered playback to {:?} ({:.2}s, {} units)",
            path,
            mix.len() as f64 / self.sample_rate as f64,
            self.units.len()
        );

        Ok(())
    }
}

#[async_trait::async_trait]
impl OutputDevice for WavOutputDevice {
    fn current_time(&self) -> f64 {
        self.opened_at.elapsed().as_secs_f64()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn schedule(&mut self, id: UnitId, buffer: &PcmBuffer, start_at: f64) -> CallResult<()> {
        if self.closed {
            return Err(CallError::Device("output device is closed".to_string()));
        }

        let end_at = start_at + buffer.duration();
        let deadline = self.opened_at + Duration::from_secs_f64(end_at.max(0.0));
        let completions = self.completions.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = completions.send(id);
        });

        self.units.insert(
            id,
            RenderedUnit {
                samples: buffer.samples.clone(),
                start_at,
                end_at,
                stopped_at: None,
                timer: Some(timer),
            },
        );

        Ok(())
    }

    fn stop(&mut self, id: UnitId) -> CallResult<()> {
        let now = self.current_time();
        let unit = self.units.get_mut(&id).ok_or(CallError::PlaybackStop(id))?;

        if unit.stopped_at.is_some() || now >= unit.end_at {
            return Err(CallError::PlaybackStop(id));
        }

        unit.stopped_at = Some(now.max(unit.start_at));
        if let Some(timer) = unit.timer.take() {
            timer.abort();
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        for unit in self.units.values_mut() {
            if let Some(timer) = unit.timer.take() {
                timer.abort();
            }
        }

        match &self.path {
            Some(path) => self.write_wav(path),
            None => {
                debug!("Output device closed without a render target");
                Ok(())
            }
        }
    }

    fn name(&self) -> &str {
        "wav-render"
    }
}
