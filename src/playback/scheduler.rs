use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::audio::{OutputDevice, PcmBuffer};
use crate::error::{CallError, CallResult};

/// Identifier of one scheduled playback buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A buffer placed on the playback clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackUnit {
    pub id: UnitId,
    /// Start time on the playback clock, seconds
    pub start_at: f64,
    /// Buffer duration, seconds
    pub duration: f64,
}

impl PlaybackUnit {
    pub fn end_at(&self) -> f64 {
        self.start_at + self.duration
    }
}

/// Gapless scheduler for inbound speech
///
/// Each buffer starts at `max(next_start_time, clock)` and pushes
/// `next_start_time` forward by its duration, so consecutive buffers play
/// back to back. The active set holds exactly the units that are scheduled
/// or playing.
///
/// `epoch` changes on every interruption or reset; decodes requested under
/// an older epoch must not be scheduled.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start_time: f64,
    active: BTreeMap<UnitId, PlaybackUnit>,
    next_id: u64,
    epoch: u64,
    scheduled_total: usize,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total units scheduled since creation
    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total
    }

    /// Schedule a decoded buffer on the output device
    pub fn schedule(
        &mut self,
        output: &mut dyn OutputDevice,
        buffer: &PcmBuffer,
    ) -> CallResult<PlaybackUnit> {
        let start_at = self.next_start_time.max(output.current_time());
        let id = UnitId(self.next_id);
        self.next_id += 1;

        output.schedule(id, buffer, start_at)?;

        let unit = PlaybackUnit {
            id,
            start_at,
            duration: buffer.duration(),
        };
        self.next_start_time = unit.end_at();
        self.active.insert(id, unit);
        self.scheduled_total += 1;

        debug!(
            "Scheduled unit {} at {:.3}s for {:.3}s (next start {:.3}s)",
            id, start_at, unit.duration, self.next_start_time
        );

        Ok(unit)
    }

    /// Natural completion; returns false if the unit was already removed
    pub fn complete(&mut self, id: UnitId) -> bool {
        self.active.remove(&id).is_some()
    }

    /// Stop everything in flight and rewind the start clock to zero
    ///
    /// Returns the number of units removed from the active set.
    pub fn interrupt(&mut self, output: &mut dyn OutputDevice) -> usize {
        let units = self.drain();

        for id in &units {
            match output.stop(*id) {
                Ok(()) => {}
                Err(CallError::PlaybackStop(id)) => {
                    debug!("Unit {} already finished", id);
                }
                Err(e) => debug!("Failed to stop unit {}: {}", id, e),
            }
        }

        units.len()
    }

    /// Forget every unit without a device to stop them on
    pub fn clear(&mut self) -> usize {
        self.drain().len()
    }

    fn drain(&mut self) -> Vec<UnitId> {
        let units = std::mem::take(&mut self.active);
        self.next_start_time = 0.0;
        self.epoch += 1;
        units.into_keys().collect()
    }
}
