//! Application Layer
//!
//! Call-handling services built on the domain ports.

pub mod best_effort;
pub mod bridge;
pub mod handoff;
pub mod orchestrator;
pub mod session_manager;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{AudioBridge, BridgeConfig, BridgeEvent};
pub use handoff::{HandoffCoordinator, TransferRouting};
pub use orchestrator::{
    CallOrchestrator, OrchestratorConfig, OrchestratorEvent, OrchestratorStatus, TransferOutcome,
};
pub use session_manager::SessionManager;
pub use tools::{ContextStore, ToolExecutor};
