//! Telebridge Domain Library
//!
//! Core domain types and interfaces for the telephony ↔ conversational-agent bridge.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (CallSession, ActiveCall, ToolCall, RealtimeAgent)
//!   - `value_objects/`: Immutable value types (CallState, TelephonyProvider, TransferReason)
//!   - `services/`: Pure functions (audio codec, handoff summary, XML helpers)
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `agent`: Conversational agent connection
//!   - `contact_center`: Contact-center platform operations
//!   - `call_control`: Live call transfer on the telephony carrier
//!   - `directory`: Customer lookups backing agent tools
//!   - `conversation_hook`: Extension point for orchestrator-detected calls
//!
//! # Usage
//!
//! ```rust,ignore
//! use telebridge::domain::{CallSession, CallState};
//! use telebridge::domain::services::audio;
//! use telebridge::ports::{AgentConnector, ContactCenter};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ActiveCall, CallMetadata, CallSession, CallState, CallStats, CustomerRecord, DomainError,
    HandoffContext, InteractionLog, PolicySummary, RealtimeAgent, SessionEvent,
    SessionSnapshot, SkillTransfer, TelephonyProvider, ToolCall, ToolKind, TransferReason,
};
pub use ports::{
    AgentCommand, AgentConnector, AgentEvent, AgentLink, CallTransferer, ContactCenter,
    ConversationContext, ConversationHook, CustomerDirectory, NoopConversationHook, ToolResult,
};
