//! Session Manager
//!
//! Registry of live call sessions keyed by call id. Ended sessions stay
//! readable for a retention window, then are dropped.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use telebridge::{CallSession, DomainError, SessionEvent, SessionSnapshot};

pub struct SessionManager {
    sessions: Arc<DashMap<String, Arc<CallSession>>>,
    retention: Duration,
}

impl SessionManager {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Register a new session. Fails with `Conflict` if the id is taken.
    ///
    /// Must be called inside a tokio runtime; it spawns the retention task.
    pub fn create(
        &self,
        call_id: &str,
        caller: &str,
        called_number: Option<String>,
    ) -> Result<Arc<CallSession>, DomainError> {
        let session = match self.sessions.entry(call_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "call session {} already exists",
                    call_id
                )))
            }
            Entry::Vacant(slot) => {
                let session = Arc::new(CallSession::new(call_id, caller, called_number));
                slot.insert(Arc::clone(&session));
                session
            }
        };

        self.schedule_removal(Arc::clone(&session));
        info!(call_id, caller, "📞 Call session created");
        Ok(session)
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.get(call_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> =
            self.sessions.iter().map(|entry| entry.value().snapshot()).collect();
        snapshots.sort_by_key(|s| s.metadata.start_time);
        snapshots
    }

    /// Remove the session `retention` after it ends.
    ///
    /// Only the same `Arc` is removed, so a new session that reuses the id
    /// after removal is left alone.
    fn schedule_removal(&self, session: Arc<CallSession>) {
        let sessions = Arc::clone(&self.sessions);
        let retention = self.retention;
        let mut events = session.subscribe();

        tokio::spawn(async move {
            if !session.is_ended() {
                loop {
                    match events.recv().await {
                        Ok(SessionEvent::Ended { .. }) | Err(RecvError::Closed) => break,
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => {
                            if session.is_ended() {
                                break;
                            }
                        }
                    }
                }
            }

            tokio::time::sleep(retention).await;
            let call_id = session.call_id().to_string();
            if sessions
                .remove_if(&call_id, |_, current| Arc::ptr_eq(current, &session))
                .is_some()
            {
                debug!(call_id = %call_id, "Call session removed after retention");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_call_id_is_conflict() {
        let manager = SessionManager::new(Duration::from_secs(60));
        manager.create("abc123", "+571", None).unwrap();

        let err = manager.create("abc123", "+572", None).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_ended_session_readable_then_removed() {
        let manager = SessionManager::new(Duration::from_millis(50));
        let session = manager.create("abc123", "+571", None).unwrap();

        session.end();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.get("abc123").is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(manager.get("abc123").is_none());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_live_session_is_kept() {
        let manager = SessionManager::new(Duration::from_millis(10));
        manager.create("live", "+571", None).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.get("live").is_some());
        assert_eq!(manager.snapshots().len(), 1);
    }
}
