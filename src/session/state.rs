use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one call
///
/// ```text
/// Idle ──start──▶ Connecting ──opened──▶ Active
///                     │                    │
///                     ├──hangup────────────┴──▶ Disconnecting ──released──▶ Idle
///                     └──failure / remote close / stream error ──────────▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallState {
    #[default]
    Idle,
    Connecting,
    Active,
    Disconnecting,
}

impl CallState {
    /// A call is in progress in every state but `Idle`
    pub fn is_busy(&self) -> bool {
        !matches!(self, CallState::Idle)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Active)
                | (Connecting, Disconnecting)
                | (Active, Disconnecting)
                | (Connecting, Idle)
                | (Active, Idle)
                | (Disconnecting, Idle)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "IDLE",
            CallState::Connecting => "CONNECTING",
            CallState::Active => "ACTIVE",
            CallState::Disconnecting => "DISCONNECTING",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(CallState::default(), CallState::Idle);
        assert!(!CallState::Idle.is_busy());
        assert!(CallState::Connecting.is_busy());
    }

    #[test]
    fn test_forward_path() {
        assert!(CallState::Idle.can_transition_to(CallState::Connecting));
        assert!(CallState::Connecting.can_transition_to(CallState::Active));
        assert!(CallState::Active.can_transition_to(CallState::Disconnecting));
        assert!(CallState::Disconnecting.can_transition_to(CallState::Idle));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!CallState::Idle.can_transition_to(CallState::Active));
        assert!(!CallState::Idle.can_transition_to(CallState::Disconnecting));
        assert!(!CallState::Disconnecting.can_transition_to(CallState::Active));
        assert!(!CallState::Active.can_transition_to(CallState::Connecting));
    }

    #[test]
    fn test_failure_returns_to_idle() {
        assert!(CallState::Connecting.can_transition_to(CallState::Idle));
        assert!(CallState::Active.can_transition_to(CallState::Idle));
    }

    #[test]
    fn test_serializes_uppercase() {
        let json = serde_json::to_string(&CallState::Disconnecting).unwrap();
        assert_eq!(json, "\"DISCONNECTING\"");
    }
}
