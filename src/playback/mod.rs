//! Gapless playback of inbound speech and its barge-in unwinding

mod scheduler;

pub use scheduler::{PlaybackScheduler, PlaybackUnit, UnitId};
