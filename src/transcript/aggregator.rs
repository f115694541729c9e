use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who spoke a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One finalized side of a conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulates streaming transcription deltas into finalized turns
///
/// History is append-only. Pending text is reset only on turn completion
/// (both sides) or interruption (model side).
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    pending_user: String,
    pending_model: String,
    history: Vec<TranscriptEntry>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta of the person's transcribed speech
    pub fn push_user(&mut self, delta: &str) {
        self.pending_user.push_str(delta);
    }

    /// Append a delta of the agent's transcribed speech
    pub fn push_model(&mut self, delta: &str) {
        self.pending_model.push_str(delta);
    }

    /// Finalize the turn: append user then model entry, even when empty
    pub fn complete_turn(&mut self, now: DateTime<Utc>) -> [TranscriptEntry; 2] {
        let user = TranscriptEntry {
            role: Role::User,
            text: std::mem::take(&mut self.pending_user),
            timestamp: now,
        };
        let model = TranscriptEntry {
            role: Role::Model,
            text: std::mem::take(&mut self.pending_model),
            timestamp: now,
        };

        debug!(
            "Turn complete: user={} chars, model={} chars",
            user.text.len(),
            model.text.len()
        );

        self.history.push(user.clone());
        self.history.push(model.clone());
        [user, model]
    }

    /// Discard the in-progress model reply; history is untouched
    pub fn interrupt(&mut self) {
        self.pending_model.clear();
    }

    pub fn pending_user(&self) -> &str {
        &self.pending_user
    }

    pub fn pending_model(&self) -> &str {
        &self.pending_model
    }

    pub fn history(&self) -> &[TranscriptEntry] {
        &self.history
    }
}
