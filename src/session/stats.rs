use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::CallState;

/// Point-in-time view of the call engine
#[derive(Debug, Clone, Serialize)]
pub struct CallStats {
    /// Current lifecycle state
    pub state: CallState,

    /// Identifier of the current or most recent call
    pub call_id: Option<String>,

    /// Language code of the current or most recent call
    pub language: Option<String>,

    /// When the current or most recent call started
    pub started_at: Option<DateTime<Utc>>,

    /// When the most recent call was torn down
    pub ended_at: Option<DateTime<Utc>>,

    /// Seconds from start to teardown, or to now while the call runs
    pub duration_secs: f64,

    /// Audio chunks handed to the uplink
    pub chunks_sent: usize,

    /// Captured frames dropped because the call was not active
    pub frames_dropped: usize,

    /// Playback units scheduled this call
    pub units_scheduled: usize,

    /// Playback units currently scheduled or playing
    pub units_active: usize,

    /// Playback clock time the next buffer would start at
    pub next_start_time: f64,

    /// Finalized transcript entries
    pub history_len: usize,

    /// Person's speech not yet finalized
    pub pending_user_text: String,

    /// Agent's speech not yet finalized
    pub pending_model_text: String,

    /// Full resource releases performed since the engine was created
    pub teardowns: usize,
}
