//! Call Orchestrator - reconciles contact-center agent state with bot handoffs
//!
//! Polls the contact center for agents on a call, tracks each such call as an
//! [`ActiveCall`], and hands calls to a human skill when they run too long, a
//! transfer keyword is heard, or an operator forces it.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use telebridge::domain::services::handoff::{build_summary, find_keyword, SummaryInput};
use telebridge::ports::{ContactCenter, ConversationHook};
use telebridge::{
    ActiveCall, DomainError, InteractionLog, RealtimeAgent, SkillTransfer, TransferReason,
};

use super::best_effort::best_effort;

const EVENT_CAPACITY: usize = 128;

pub const REASON_ENDED_IN_PLATFORM: &str = "call ended in platform";
pub const REASON_ORCHESTRATOR_STOPPED: &str = "orchestrator stopped";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Interval between poll cycles
    pub poll_interval: Duration,
    /// Calls older than this are handed to a human
    pub max_call_duration: Duration,
    /// Skill used when a transfer names none
    pub default_skill: Option<String>,
    /// Agent status the contact center reports for a live call
    pub on_call_status: String,
    pub transfer_keywords: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_call_duration: Duration::from_secs(600),
            default_skill: None,
            on_call_status: "Talk".to_string(),
            transfer_keywords: Vec::new(),
        }
    }
}

/// Orchestrator lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    CallStarted {
        call_id: String,
        agent_id: String,
        phone_number: String,
    },
    CallEnded {
        call_id: String,
        reason: String,
    },
    TransferCompleted {
        call_id: String,
        skill_id: String,
    },
    TransferFailed {
        call_id: String,
        error: String,
    },
}

/// Read-only copy of the orchestrator state
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub is_running: bool,
    pub active_calls: usize,
    pub calls: Vec<ActiveCall>,
}

/// Result of a transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed { skill_id: String },
    /// The call was already marked for transfer
    AlreadyInProgress,
    Failed { error: String },
}

/// Counts from one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub on_call: usize,
    pub started: usize,
    pub ended: usize,
    pub transferred: usize,
}

#[derive(Default)]
struct Tracking {
    calls: HashMap<String, ActiveCall>,
    /// Agents whose call was handed off and may still report on-call
    handed_off: HashSet<String>,
}

pub struct CallOrchestrator {
    contact_center: Arc<dyn ContactCenter>,
    hook: Arc<dyn ConversationHook>,
    config: OrchestratorConfig,
    tracking: Mutex<Tracking>,
    running: AtomicBool,
    poller: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl CallOrchestrator {
    pub fn new(
        contact_center: Arc<dyn ContactCenter>,
        hook: Arc<dyn ConversationHook>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            contact_center,
            hook,
            config,
            tracking: Mutex::new(Tracking::default()),
            running: AtomicBool::new(false),
            poller: Mutex::new(None),
            events,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Health-check the contact center, poll once, then keep polling.
    ///
    /// Starting a running orchestrator is a no-op.
    pub async fn start(self: &Arc<Self>) -> Result<(), DomainError> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Orchestrator already running");
            return Ok(());
        }
        let mut running = RunningGuard::new(&self.running);

        let healthy = match self.contact_center.health_check().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DomainError::ExternalService(format!(
                "{} health check failed",
                self.contact_center.name()
            ))),
            Err(e) => Err(e),
        };
        if let Err(e) = healthy {
            error!(error = %e, "Orchestrator failed to start");
            return Err(e);
        }

        if let Err(e) = self.poll_once().await {
            warn!(error = %e, "Initial orchestrator poll failed");
        }

        let handle = spawn_poller(Arc::downgrade(self), self.config.poll_interval);
        if let Some(previous) = self.poller.lock().replace(handle) {
            previous.abort();
        }
        running.disarm();

        info!(
            contact_center = self.contact_center.name(),
            "🎛️ Orchestrator started (interval: {:?})",
            self.config.poll_interval
        );
        Ok(())
    }

    /// Stop polling and end every tracked call.
    pub async fn stop(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }

        let calls: Vec<ActiveCall> = {
            let mut tracking = self.tracking.lock();
            tracking.handed_off.clear();
            tracking.calls.drain().map(|(_, call)| call).collect()
        };
        for call in &calls {
            self.finish_call(call, REASON_ORCHESTRATOR_STOPPED).await;
        }

        self.running.store(false, Ordering::SeqCst);
        info!(ended = calls.len(), "🛑 Orchestrator stopped");
    }

    /// One reconcile pass against the contact center.
    pub async fn poll_once(&self) -> Result<PollSummary, DomainError> {
        let status = self.config.on_call_status.as_str();
        let on_call: HashMap<String, RealtimeAgent> = self
            .contact_center
            .list_agents(Some(status))
            .await?
            .into_iter()
            .filter(|agent| agent.status.eq_ignore_ascii_case(status))
            .map(|agent| (agent.agent_id.clone(), agent))
            .collect();

        let mut summary = PollSummary {
            on_call: on_call.len(),
            ..PollSummary::default()
        };

        let (detected, ended) = {
            let mut tracking = self.tracking.lock();
            tracking.handed_off.retain(|agent_id| on_call.contains_key(agent_id));

            let detected: Vec<ActiveCall> = on_call
                .values()
                .filter(|agent| {
                    !tracking.handed_off.contains(&agent.agent_id)
                        && !tracking.calls.values().any(|c| c.agent_id == agent.agent_id)
                })
                .map(|agent| {
                    ActiveCall::new(
                        agent.agent_id.clone(),
                        agent.phone_number.clone().unwrap_or_default(),
                    )
                })
                .collect();

            let ended_ids: Vec<String> = tracking
                .calls
                .values()
                .filter(|c| !c.should_transfer && !on_call.contains_key(&c.agent_id))
                .map(|c| c.call_id.clone())
                .collect();
            let ended: Vec<ActiveCall> = ended_ids
                .iter()
                .filter_map(|id| tracking.calls.remove(id))
                .collect();

            (detected, ended)
        };

        for mut call in detected {
            call.agent_connected = match self.hook.on_call_detected(&call).await {
                Ok(connected) => connected,
                Err(e) => {
                    warn!(call_id = %call.call_id, error = %e, "Conversation hook failed on detection");
                    false
                }
            };

            let inserted = {
                let mut tracking = self.tracking.lock();
                let already_tracked = tracking
                    .calls
                    .values()
                    .any(|c| c.agent_id == call.agent_id);
                if already_tracked || tracking.handed_off.contains(&call.agent_id) {
                    false
                } else {
                    tracking.calls.insert(call.call_id.clone(), call.clone());
                    true
                }
            };
            if !inserted {
                continue;
            }

            summary.started += 1;
            info!(
                call_id = %call.call_id,
                agent_id = %call.agent_id,
                phone = %call.phone_number,
                "📞 Contact-center call detected"
            );
            self.emit(OrchestratorEvent::CallStarted {
                call_id: call.call_id,
                agent_id: call.agent_id,
                phone_number: call.phone_number,
            });
        }

        for call in &ended {
            summary.ended += 1;
            self.finish_call(call, REASON_ENDED_IN_PLATFORM).await;
        }

        let max = chrono::Duration::from_std(self.config.max_call_duration)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let now = Utc::now();
        let overdue: Vec<String> = self
            .tracking
            .lock()
            .calls
            .values()
            .filter(|c| !c.should_transfer && c.exceeds(max, now))
            .map(|c| c.call_id.clone())
            .collect();
        for call_id in overdue {
            match self
                .handle_transfer_request(&call_id, TransferReason::MaxDurationExceeded, None)
                .await
            {
                Ok(TransferOutcome::Completed { .. }) | Ok(TransferOutcome::Failed { .. }) => {
                    summary.transferred += 1;
                }
                Ok(TransferOutcome::AlreadyInProgress) | Err(_) => {}
            }
        }

        debug!(
            on_call = summary.on_call,
            started = summary.started,
            ended = summary.ended,
            transferred = summary.transferred,
            "Orchestrator poll completed"
        );
        Ok(summary)
    }

    /// Hand a tracked call to a human skill. At most one transfer per call.
    ///
    /// Transfer and logging failures are reported through the outcome and a
    /// `TransferFailed` event; only an unknown call id is an error.
    pub async fn handle_transfer_request(
        &self,
        call_id: &str,
        reason: TransferReason,
        skill_override: Option<String>,
    ) -> Result<TransferOutcome, DomainError> {
        let call = {
            let mut tracking = self.tracking.lock();
            let call = tracking
                .calls
                .get_mut(call_id)
                .ok_or_else(|| DomainError::not_found("ActiveCall", call_id))?;
            if !call.mark_for_transfer(reason.clone()) {
                debug!(call_id, "Transfer already in progress");
                return Ok(TransferOutcome::AlreadyInProgress);
            }
            let reason_text = reason.to_string();
            call.summary = build_summary(&SummaryInput {
                phone_number: &call.phone_number,
                bot_duration: call.elapsed(Utc::now()),
                reason: &reason_text,
                transcript: &call.transcript,
            });
            call.clone()
        };
        let handoff = HandoffGuard {
            tracking: &self.tracking,
            call_id,
            agent_id: call.agent_id.clone(),
        };

        info!(call_id, reason = %reason, "🔀 Transferring call to a human");

        let skill_id = skill_override
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.config.default_skill.clone());
        let transfer_result = match &skill_id {
            Some(skill_id) => {
                let request = SkillTransfer {
                    agent_id: Some(call.agent_id.clone()),
                    skill_id: skill_id.clone(),
                    phone_number: call.phone_number.clone(),
                    summary: call.summary.clone(),
                };
                self.contact_center.transfer_to_skill(&request).await
            }
            None => Err(DomainError::Validation(
                "no target skill configured for transfer".into(),
            )),
        };

        let log = InteractionLog {
            call_id: call.call_id.clone(),
            phone_number: call.phone_number.clone(),
            transcript: call.transcript.clone(),
            summary: call.summary.clone(),
            duration_secs: call.elapsed(Utc::now()).num_seconds().max(0),
            outcome: if transfer_result.is_ok() {
                "transferred".into()
            } else {
                "transfer_failed".into()
            },
            recorded_at: Utc::now(),
        };
        best_effort(
            "orchestrator.log_interaction",
            self.contact_center.log_interaction(&log),
        )
        .await;

        drop(handoff);
        best_effort(
            "orchestrator.on_call_finished",
            self.hook.on_call_finished(&call, &reason.to_string()),
        )
        .await;

        Ok(match (transfer_result, skill_id) {
            (Ok(()), Some(skill_id)) => {
                info!(call_id, skill_id = %skill_id, "✅ Transfer completed");
                self.emit(OrchestratorEvent::TransferCompleted {
                    call_id: call_id.to_string(),
                    skill_id: skill_id.clone(),
                });
                TransferOutcome::Completed { skill_id }
            }
            (Err(e), _) => {
                error!(call_id, error = %e, "❌ Transfer failed");
                let error = e.to_string();
                self.emit(OrchestratorEvent::TransferFailed {
                    call_id: call_id.to_string(),
                    error: error.clone(),
                });
                TransferOutcome::Failed { error }
            }
            (Ok(()), None) => TransferOutcome::Failed {
                error: "no target skill configured for transfer".into(),
            },
        })
    }

    /// Operator-initiated transfer, optionally to a specific skill.
    pub async fn force_transfer(
        &self,
        call_id: &str,
        skill_id: Option<String>,
    ) -> Result<TransferOutcome, DomainError> {
        self.handle_transfer_request(call_id, TransferReason::Manual, skill_id)
            .await
    }

    /// Append to a call's transcript and transfer on a configured keyword.
    pub async fn append_transcript(
        &self,
        call_id: &str,
        text: &str,
    ) -> Result<Option<TransferOutcome>, DomainError> {
        let keyword = {
            let mut tracking = self.tracking.lock();
            let call = tracking
                .calls
                .get_mut(call_id)
                .ok_or_else(|| DomainError::not_found("ActiveCall", call_id))?;
            call.append_transcript(text);
            if call.should_transfer {
                None
            } else {
                find_keyword(text, &self.config.transfer_keywords).map(str::to_string)
            }
        };

        match keyword {
            Some(keyword) => {
                info!(call_id, keyword = %keyword, "Transfer keyword heard");
                self.handle_transfer_request(call_id, TransferReason::Keyword(keyword), None)
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn get_status(&self) -> OrchestratorStatus {
        let mut calls: Vec<ActiveCall> = self.tracking.lock().calls.values().cloned().collect();
        calls.sort_by_key(|c| c.start_time);
        OrchestratorStatus {
            is_running: self.is_running(),
            active_calls: calls.len(),
            calls,
        }
    }

    async fn finish_call(&self, call: &ActiveCall, reason: &str) {
        info!(call_id = %call.call_id, agent_id = %call.agent_id, reason, "Contact-center call ended");
        best_effort(
            "orchestrator.on_call_finished",
            self.hook.on_call_finished(call, reason),
        )
        .await;
        self.emit(OrchestratorEvent::CallEnded {
            call_id: call.call_id.clone(),
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: OrchestratorEvent) {
        let _ = self.events.send(event);
    }
}

/// Removes a call marked for transfer from tracking and suppresses its
/// agent. Runs on completion and when the transfer future is dropped.
struct HandoffGuard<'a> {
    tracking: &'a Mutex<Tracking>,
    call_id: &'a str,
    agent_id: String,
}

impl Drop for HandoffGuard<'_> {
    fn drop(&mut self) {
        let mut tracking = self.tracking.lock();
        tracking.calls.remove(self.call_id);
        tracking.handed_off.insert(std::mem::take(&mut self.agent_id));
    }
}

/// Clears the running flag unless the start completed.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
    armed: bool,
}

impl<'a> RunningGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

fn spawn_poller(orchestrator: Weak<CallOrchestrator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        // a slow poll pushes the schedule back instead of bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(orchestrator) = orchestrator.upgrade() else {
                break;
            };
            if let Err(e) = orchestrator.poll_once().await {
                warn!(error = %e, "Orchestrator poll failed, retrying next tick");
            }
        }
    })
}
