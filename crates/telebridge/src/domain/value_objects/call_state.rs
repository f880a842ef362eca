//! CallState - lifecycle of a bridged call

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`CallSession`](crate::domain::CallSession).
///
/// Forward-only: `Initializing → Connected → Streaming → Transferring`, with
/// `Ended` reachable from every state and never left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Initializing,
    Connected,
    Streaming,
    Transferring,
    Ended,
}

impl CallState {
    fn rank(self) -> u8 {
        match self {
            CallState::Initializing => 0,
            CallState::Connected => 1,
            CallState::Streaming => 2,
            CallState::Transferring => 3,
            CallState::Ended => 4,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Transferring → Transferring` is accepted so a transfer event that
    /// follows a transfer tool call is not reported as an error.
    pub fn can_transition_to(self, next: CallState) -> bool {
        match (self, next) {
            (CallState::Ended, _) => false,
            (_, CallState::Ended) => true,
            (CallState::Transferring, CallState::Transferring) => true,
            (CallState::Initializing, CallState::Transferring) => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == CallState::Ended
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallState::Initializing => write!(f, "initializing"),
            CallState::Connected => write!(f, "connected"),
            CallState::Streaming => write!(f, "streaming"),
            CallState::Transferring => write!(f, "transferring"),
            CallState::Ended => write!(f, "ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(CallState::Initializing.can_transition_to(CallState::Connected));
        assert!(CallState::Connected.can_transition_to(CallState::Streaming));
        assert!(CallState::Streaming.can_transition_to(CallState::Transferring));
        assert!(CallState::Connected.can_transition_to(CallState::Transferring));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!CallState::Streaming.can_transition_to(CallState::Connected));
        assert!(!CallState::Transferring.can_transition_to(CallState::Streaming));
        assert!(!CallState::Initializing.can_transition_to(CallState::Transferring));
    }

    #[test]
    fn test_ended_is_absorbing() {
        for state in [
            CallState::Initializing,
            CallState::Connected,
            CallState::Streaming,
            CallState::Transferring,
        ] {
            assert!(state.can_transition_to(CallState::Ended));
            assert!(!CallState::Ended.can_transition_to(state));
        }
        assert!(!CallState::Ended.can_transition_to(CallState::Ended));
    }
}
