//! CallSession - per-call state machine and counters
//!
//! A session is shared (`Arc<CallSession>`) between the session manager, the
//! audio bridge and the handoff coordinator. All mutation goes through its own
//! methods; observers subscribe to [`SessionEvent`]s.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::value_objects::CallState;

const EVENT_CAPACITY: usize = 64;

/// Monotonic per-call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    pub audio_packets_received: u64,
    pub audio_packets_sent: u64,
    pub user_utterances: u64,
    pub agent_responses: u64,
    pub tool_calls: u64,
}

/// Identity and timing of a finished call, published with [`SessionEvent::Ended`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub call_id: String,
    pub caller: String,
    pub called_number: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub transfer_queue: Option<String>,
    pub transfer_reason: Option<String>,
}

/// Events published by a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        state: CallState,
        previous: CallState,
    },
    Ended {
        metadata: CallMetadata,
        stats: CallStats,
    },
}

/// Read-only copy of a session at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: CallState,
    pub metadata: CallMetadata,
    pub stats: CallStats,
}

#[derive(Debug)]
struct TransferInfo {
    queue: String,
    reason: Option<String>,
}

#[derive(Debug)]
struct SessionInner {
    state: CallState,
    end_time: Option<DateTime<Utc>>,
    stats: CallStats,
    transfer: Option<TransferInfo>,
}

/// One bridged call
#[derive(Debug)]
pub struct CallSession {
    call_id: String,
    caller: String,
    called_number: Option<String>,
    start_time: DateTime<Utc>,
    inner: RwLock<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, caller: impl Into<String>, called_number: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            call_id: call_id.into(),
            caller: caller.into(),
            called_number,
            start_time: Utc::now(),
            inner: RwLock::new(SessionInner {
                state: CallState::Initializing,
                end_time: None,
                stats: CallStats::default(),
                transfer: None,
            }),
            events,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn called_number(&self) -> Option<&str> {
        self.called_number.as_deref()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn state(&self) -> CallState {
        self.inner.read().state
    }

    pub fn is_ended(&self) -> bool {
        self.state() == CallState::Ended
    }

    pub fn stats(&self) -> CallStats {
        self.inner.read().stats
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Move to `next`. Returns `false` when the transition is not allowed.
    ///
    /// `CallState::Ended` is routed through [`CallSession::end`].
    pub fn set_state(&self, next: CallState) -> bool {
        if next == CallState::Ended {
            return self.end();
        }

        let previous = {
            let mut inner = self.inner.write();
            let current = inner.state;
            if current == next {
                return false;
            }
            if !current.can_transition_to(next) {
                if current == CallState::Ended {
                    debug!(call_id = %self.call_id, to = %next, "Ignoring state change on ended session");
                } else {
                    warn!(
                        call_id = %self.call_id,
                        from = %current,
                        to = %next,
                        "Rejected call state transition"
                    );
                }
                return false;
            }
            inner.state = next;
            current
        };

        info!(call_id = %self.call_id, from = %previous, to = %next, "Call state changed");
        let _ = self.events.send(SessionEvent::StateChanged {
            state: next,
            previous,
        });
        true
    }

    /// Record transfer metadata and move to `Transferring`.
    ///
    /// The first request wins; later requests are logged and ignored, as are
    /// requests made before the session is `Connected`.
    pub fn set_transfer(&self, queue: impl Into<String>, reason: Option<String>) -> bool {
        let queue = queue.into();
        {
            let mut inner = self.inner.write();
            if !inner.state.can_transition_to(CallState::Transferring) {
                if inner.state != CallState::Ended {
                    warn!(
                        call_id = %self.call_id,
                        state = %inner.state,
                        requested_queue = %queue,
                        "Transfer requested before the agent connected, ignoring"
                    );
                }
                return false;
            }
            if let Some(existing) = &inner.transfer {
                warn!(
                    call_id = %self.call_id,
                    existing_queue = %existing.queue,
                    requested_queue = %queue,
                    "Transfer already requested for call, ignoring later request"
                );
                return false;
            }
            inner.transfer = Some(TransferInfo { queue, reason });
        }
        self.set_state(CallState::Transferring);
        true
    }

    /// End the session. Idempotent; returns `true` only on the first call.
    pub fn end(&self) -> bool {
        let (previous, metadata, stats) = {
            let mut inner = self.inner.write();
            if inner.state == CallState::Ended {
                return false;
            }
            let previous = inner.state;
            inner.state = CallState::Ended;
            inner.end_time = Some(Utc::now());
            (previous, self.metadata_locked(&inner), inner.stats)
        };

        info!(
            call_id = %self.call_id,
            duration_ms = metadata.duration_ms.unwrap_or_default(),
            received = stats.audio_packets_received,
            sent = stats.audio_packets_sent,
            "📴 Call session ended"
        );
        let _ = self.events.send(SessionEvent::StateChanged {
            state: CallState::Ended,
            previous,
        });
        let _ = self.events.send(SessionEvent::Ended { metadata, stats });
        true
    }

    pub fn record_audio_received(&self) {
        self.bump(|stats| stats.audio_packets_received += 1);
    }

    pub fn record_audio_sent(&self) {
        self.bump(|stats| stats.audio_packets_sent += 1);
    }

    pub fn record_user_utterance(&self) {
        self.bump(|stats| stats.user_utterances += 1);
    }

    pub fn record_agent_response(&self) {
        self.bump(|stats| stats.agent_responses += 1);
    }

    pub fn record_tool_call(&self) {
        self.bump(|stats| stats.tool_calls += 1);
    }

    /// Counters freeze once the session has ended.
    fn bump(&self, update: impl FnOnce(&mut CallStats)) {
        let mut inner = self.inner.write();
        if inner.state == CallState::Ended {
            debug!(call_id = %self.call_id, "Ignoring counter update on ended session");
            return;
        }
        update(&mut inner.stats);
    }

    pub fn metadata(&self) -> CallMetadata {
        let inner = self.inner.read();
        self.metadata_locked(&inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read();
        SessionSnapshot {
            state: inner.state,
            metadata: self.metadata_locked(&inner),
            stats: inner.stats,
        }
    }

    fn metadata_locked(&self, inner: &SessionInner) -> CallMetadata {
        CallMetadata {
            call_id: self.call_id.clone(),
            caller: self.caller.clone(),
            called_number: self.called_number.clone(),
            start_time: self.start_time,
            end_time: inner.end_time,
            duration_ms: inner
                .end_time
                .map(|end| (end - self.start_time).num_milliseconds()),
            transfer_queue: inner.transfer.as_ref().map(|t| t.queue.clone()),
            transfer_reason: inner.transfer.as_ref().and_then(|t| t.reason.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CallSession {
        CallSession::new("call-1", "+573001112233", Some("+5714440000".into()))
    }

    #[test]
    fn test_new_session_is_initializing() {
        let s = session();
        assert_eq!(s.state(), CallState::Initializing);
        assert_eq!(s.stats(), CallStats::default());
        assert!(s.metadata().end_time.is_none());
    }

    #[test]
    fn test_lifecycle_emits_state_changes() {
        let s = session();
        let mut rx = s.subscribe();

        assert!(s.set_state(CallState::Connected));
        assert!(s.set_state(CallState::Streaming));

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged {
                state: CallState::Connected,
                previous: CallState::Initializing
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged {
                state: CallState::Streaming,
                previous: CallState::Connected
            }
        );
    }

    #[test]
    fn test_backward_transition_rejected() {
        let s = session();
        s.set_state(CallState::Connected);
        s.set_state(CallState::Streaming);
        assert!(!s.set_state(CallState::Connected));
        assert_eq!(s.state(), CallState::Streaming);
    }

    #[test]
    fn test_end_is_idempotent_and_sets_end_time() {
        let s = session();
        let mut rx = s.subscribe();

        assert!(s.end());
        assert!(!s.end());

        let metadata = s.metadata();
        assert!(metadata.end_time.is_some());
        assert!(metadata.duration_ms.unwrap() >= 0);

        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged {
                state: CallState::Ended,
                ..
            }
        ));
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::Ended { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ended_session_is_frozen() {
        let s = session();
        s.set_state(CallState::Connected);
        s.record_audio_received();
        s.end();

        s.record_audio_received();
        s.record_agent_response();
        assert!(!s.set_state(CallState::Streaming));
        assert!(!s.set_transfer("PC", Some("late".into())));

        assert_eq!(s.state(), CallState::Ended);
        assert_eq!(s.stats().audio_packets_received, 1);
        assert_eq!(s.stats().agent_responses, 0);
        assert!(s.metadata().transfer_queue.is_none());
    }

    #[test]
    fn test_first_transfer_wins() {
        let s = session();
        s.set_state(CallState::Connected);
        s.set_state(CallState::Streaming);

        assert!(s.set_transfer("PC", Some("siniestro".into())));
        assert!(!s.set_transfer("AUTOS", None));

        let metadata = s.metadata();
        assert_eq!(s.state(), CallState::Transferring);
        assert_eq!(metadata.transfer_queue.as_deref(), Some("PC"));
        assert_eq!(metadata.transfer_reason.as_deref(), Some("siniestro"));
    }

    #[test]
    fn test_transfer_refused_before_connected() {
        let s = session();
        assert!(!s.set_transfer("PC", None));
        assert_eq!(s.state(), CallState::Initializing);
        assert!(s.metadata().transfer_queue.is_none());

        s.set_state(CallState::Connected);
        assert!(s.set_transfer("PC", None));
        assert_eq!(s.state(), CallState::Transferring);
    }

    #[test]
    fn test_counters_accumulate() {
        let s = session();
        for _ in 0..3 {
            s.record_audio_received();
        }
        s.record_audio_sent();
        s.record_user_utterance();
        s.record_tool_call();

        let stats = s.stats();
        assert_eq!(stats.audio_packets_received, 3);
        assert_eq!(stats.audio_packets_sent, 1);
        assert_eq!(stats.user_utterances, 1);
        assert_eq!(stats.tool_calls, 1);
    }
}
